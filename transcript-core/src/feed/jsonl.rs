// JSONL feed
// Reads an export of raw records, one JSON object per line

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;

use super::{MessageFeed, Page};
use crate::error::FeedError;
use crate::types::RawRecord;

pub struct JsonlFeed {
    path: PathBuf,
}

impl JsonlFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonlFeed {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Stream every decodable record in the file, in file order
    fn stream(&self) -> Result<impl Iterator<Item = RawRecord>, FeedError> {
        let file = File::open(&self.path).map_err(|err| {
            FeedError::Unavailable(format!("failed to open {}: {}", self.path.display(), err))
        })?;
        let reader = BufReader::new(file);

        // Split on raw bytes; a line that is not UTF-8 is just another malformed line
        let lines = reader.split(b'\n').collect::<Result<Vec<_>, _>>()?;

        Ok(lines.into_iter().enumerate().filter_map(|(idx, line)| {
            if line.iter().all(u8::is_ascii_whitespace) {
                return None;
            }
            serde_json::from_slice::<RawRecord>(&line)
                .map_err(|err| warn!(line = idx + 1, %err, "skipping malformed record line"))
                .ok()
        }))
    }
}

impl MessageFeed for JsonlFeed {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn record_created_at(&self, id: &str) -> Result<Option<DateTime<Utc>>, FeedError> {
        Ok(self.stream()?.find(|r| r.id == id).map(|r| r.created_at))
    }

    fn records(
        &self,
        task_id: &str,
        after: Option<DateTime<Utc>>,
        page: Option<Page>,
    ) -> Result<Vec<RawRecord>, FeedError> {
        let mut records: Vec<RawRecord> = self
            .stream()?
            .filter(|r| r.task_id == task_id)
            .filter(|r| after.map_or(true, |t| r.created_at > t))
            .collect();
        records.sort_by_key(|r| r.created_at);

        Ok(match page {
            Some(page) => page.apply(records),
            None => records,
        })
    }
}
