// Incremental fetch gate
// Entry point of the read path: resolves the client's checkpoint, reads only
// newer records, and runs them through grouping and assembly

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::assemble::assemble_transcript;
use crate::error::FetchError;
use crate::feed::MessageFeed;
use crate::grouping::group_turns;
use crate::types::DisplayMessage;

/// Query parameters of a transcript fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub task_id: Option<String>,
    pub last_message_id: Option<String>,
}

impl FetchRequest {
    pub fn new(task_id: impl Into<String>) -> Self {
        FetchRequest {
            task_id: Some(task_id.into()),
            last_message_id: None,
        }
    }

    pub fn after(mut self, last_message_id: impl Into<String>) -> Self {
        self.last_message_id = Some(last_message_id.into());
        self
    }
}

/// Where a fetch resumes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// No checkpoint requested, or the id no longer resolves
    Start,
    Resolved(DateTime<Utc>),
}

impl Checkpoint {
    pub fn resolve(feed: &dyn MessageFeed, last_message_id: Option<&str>) -> Result<Self, FetchError> {
        let Some(id) = last_message_id else {
            return Ok(Checkpoint::Start);
        };

        match feed.record_created_at(id)? {
            Some(created_at) => Ok(Checkpoint::Resolved(created_at)),
            None => {
                warn!(last_message_id = id, feed = feed.name(), "checkpoint not found, returning full transcript");
                Ok(Checkpoint::Start)
            }
        }
    }

    pub fn lower_bound(&self) -> Option<DateTime<Utc>> {
        match self {
            Checkpoint::Start => None,
            Checkpoint::Resolved(created_at) => Some(*created_at),
        }
    }
}

/// Result of a fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub messages: Vec<DisplayMessage>,
    /// Newest raw record consumed; pass back as `lastMessageId` to resume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_record_id: Option<String>,
}

pub fn fetch_transcript(feed: &dyn MessageFeed, request: &FetchRequest) -> Result<Transcript, FetchError> {
    let task_id = request
        .task_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(FetchError::MissingTaskId)?;

    let checkpoint = Checkpoint::resolve(feed, request.last_message_id.as_deref())?;
    let after = checkpoint.lower_bound();

    let mut records = feed.records(task_id, after, None)?;
    records.retain(|r| after.map_or(true, |t| r.created_at > t));
    info!(task_id, feed = feed.name(), count = records.len(), "found new records");

    let record_count = records.len();
    let last_record_id = records.last().map(|r| r.id.clone());
    let messages = assemble_transcript(&group_turns(records));
    info!(task_id, records = record_count, messages = messages.len(), "transformed records into chat messages");

    Ok(Transcript {
        messages,
        last_record_id,
    })
}

/// Fetch and wrap the outcome in a status code plus JSON body.
///
/// `200 {"messages": [...]}`, `400 {"error": "Task ID is required"}`, or
/// `500 {"error": "Failed to fetch messages"}`.
pub fn handle_request(feed: &dyn MessageFeed, request: &FetchRequest) -> (u16, Value) {
    match fetch_transcript(feed, request) {
        Ok(transcript) => match serde_json::to_value(&transcript) {
            Ok(body) => (200, body),
            Err(err) => {
                error!(%err, "failed to serialize transcript");
                (500, json!({ "error": "Failed to fetch messages" }))
            }
        },
        Err(err @ FetchError::MissingTaskId) => (err.status(), json!({ "error": err.to_string() })),
        Err(err) => {
            error!(%err, "error fetching messages");
            (err.status(), json!({ "error": "Failed to fetch messages" }))
        }
    }
}
