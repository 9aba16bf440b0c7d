// In-memory feed, for embedding callers that already hold the records

use chrono::{DateTime, Utc};

use super::{MessageFeed, Page};
use crate::error::FeedError;
use crate::types::RawRecord;

#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    records: Vec<RawRecord>,
    outage: Option<String>,
}

impl MemoryFeed {
    pub fn new(records: Vec<RawRecord>) -> Self {
        MemoryFeed {
            records,
            outage: None,
        }
    }

    /// A feed whose every read fails, simulating an unreachable store
    pub fn unavailable(reason: impl Into<String>) -> Self {
        MemoryFeed {
            records: Vec::new(),
            outage: Some(reason.into()),
        }
    }

    fn check_available(&self) -> Result<(), FeedError> {
        match &self.outage {
            Some(reason) => Err(FeedError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl MessageFeed for MemoryFeed {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn record_created_at(&self, id: &str) -> Result<Option<DateTime<Utc>>, FeedError> {
        self.check_available()?;
        Ok(self.records.iter().find(|r| r.id == id).map(|r| r.created_at))
    }

    fn records(
        &self,
        task_id: &str,
        after: Option<DateTime<Utc>>,
        page: Option<Page>,
    ) -> Result<Vec<RawRecord>, FeedError> {
        self.check_available()?;

        let mut matching: Vec<RawRecord> = self
            .records
            .iter()
            .filter(|r| r.task_id == task_id)
            .filter(|r| after.map_or(true, |t| r.created_at > t))
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.created_at);

        Ok(match page {
            Some(page) => page.apply(matching),
            None => matching,
        })
    }
}
