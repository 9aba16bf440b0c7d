// Content flattening
// Folds one turn's records into display text plus the images it carries

use crate::blocks::{ContentBlock, RecordContent, ToolResultBlock, ToolResultPart};
use crate::grouping::Turn;
use crate::types::DisplayImage;

/// Tool result text is only surfaced when it contains this marker
pub const ERROR_MARKER: &str = "ERROR";

/// Visible output of a single turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedTurn {
    /// Untrimmed concatenation of visible text
    pub content: String,
    pub images: Vec<DisplayImage>,
    /// Whether any text-bearing element was encountered
    pub has_text: bool,
}

impl FlattenedTurn {
    fn with_text(mut self, text: &str) -> Self {
        self.content.push_str(text);
        self.has_text = true;
        self
    }

    fn with_image(mut self, image: Option<DisplayImage>) -> Self {
        self.images.extend(image);
        self
    }

    fn absorb_record(self, content: RecordContent) -> Self {
        match content {
            RecordContent::Plain(text) => self.with_text(&text),
            RecordContent::Blocks(blocks) => blocks.iter().fold(self, Self::absorb_block),
            RecordContent::Unrecognized => self,
        }
    }

    fn absorb_block(self, block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text(text) => self.with_text(&text.text),
            ContentBlock::Image(image) => self.with_image(image.source.to_display_image()),
            ContentBlock::ToolUse(_) => self,
            ContentBlock::ToolResult(result) => self.absorb_tool_result(result),
        }
    }

    fn absorb_tool_result(self, result: &ToolResultBlock) -> Self {
        result.content.iter().fold(self, |acc, part| match part {
            ToolResultPart::Text { text } if text.contains(ERROR_MARKER) => {
                acc.with_text(&format!("\n{}\n", text))
            }
            ToolResultPart::Text { .. } => acc,
            ToolResultPart::Image(image) => acc.with_image(image.source.to_display_image()),
        })
    }
}

/// Flatten a turn in record order, then block order, then nested part order.
pub fn flatten_turn(turn: &Turn) -> FlattenedTurn {
    turn.records()
        .iter()
        .map(|record| RecordContent::classify(&record.content))
        .fold(FlattenedTurn::default(), FlattenedTurn::absorb_record)
}
