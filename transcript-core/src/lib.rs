// Transcript Core Library
// Rebuilds readable chat transcripts from raw, provider-shaped agent conversation records

pub mod types;
pub mod error;
pub mod blocks;
pub mod grouping;
pub mod flatten;
pub mod assemble;
pub mod visibility;
pub mod feed;
pub mod gate;
pub mod export;

// Re-export commonly used types
pub use types::*;
pub use error::{FeedError, FetchError};
pub use blocks::{ContentBlock, RecordContent, ToolResultPart};
pub use grouping::{group_turns, Turn};
pub use flatten::flatten_turn;
pub use assemble::assemble_transcript;
pub use visibility::{is_block_visible, visible_blocks};
pub use feed::{JsonlFeed, MemoryFeed, MessageFeed, Page, SqliteFeed};
pub use gate::{fetch_transcript, handle_request, FetchRequest, Transcript};
pub use export::TranscriptWriter;
