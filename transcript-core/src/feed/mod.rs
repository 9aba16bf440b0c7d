// Feed traits and implementations for the raw record stores we read from

use chrono::{DateTime, Utc};

use crate::error::FeedError;
use crate::types::RawRecord;

pub mod jsonl;
pub mod memory;
pub mod sqlite;

pub use jsonl::JsonlFeed;
pub use memory::MemoryFeed;
pub use sqlite::SqliteFeed;

pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// 1-based page window over a task's records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub page: usize,
}

impl Page {
    pub fn new(limit: Option<usize>, page: Option<usize>) -> Self {
        Page {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1),
            page: page.unwrap_or(1).max(1),
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Slice an already-ordered batch down to this page
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset()).take(self.limit).collect()
    }
}

/// Source of persisted conversation records for a task
pub trait MessageFeed {
    /// Name of the feed (e.g., "sqlite", "jsonl")
    fn name(&self) -> &'static str;

    /// Look up when a record was created; `Ok(None)` if the id is unknown
    fn record_created_at(&self, id: &str) -> Result<Option<DateTime<Utc>>, FeedError>;

    /// Records of a task in ascending `created_at` order, restricted to those
    /// created strictly after `after` when given
    fn records(
        &self,
        task_id: &str,
        after: Option<DateTime<Utc>>,
        page: Option<Page>,
    ) -> Result<Vec<RawRecord>, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamping() {
        assert_eq!(Page::new(None, None), Page { limit: 10, page: 1 });
        assert_eq!(Page::new(Some(0), Some(0)), Page { limit: 1, page: 1 });
        assert_eq!(Page::new(Some(5), Some(3)).offset(), 10);
    }

    #[test]
    fn test_page_apply() {
        let page = Page::new(Some(2), Some(2));
        assert_eq!(page.apply(vec![1, 2, 3, 4, 5]), vec![3, 4]);
        assert!(Page::new(Some(2), Some(9)).apply(vec![1, 2]).is_empty());
    }

    #[test]
    fn test_page_offset_saturates() {
        let page = Page::new(Some(usize::MAX), Some(usize::MAX));
        assert_eq!(page.offset(), usize::MAX);
        assert!(page.apply(vec![1, 2, 3]).is_empty());
    }
}
