// Block visibility for renderers that show raw content blocks directly.
// Mirrors the flattener: routine tool output stays hidden, screenshots and
// failures are shown.

use crate::blocks::ContentBlock;

/// Whether a renderer should show this block
pub fn is_block_visible(block: &ContentBlock) -> bool {
    match block {
        ContentBlock::ToolResult(result) => {
            result.first_part().is_some_and(|part| part.is_image()) || result.is_error
        }
        _ => true,
    }
}

pub fn visible_blocks(blocks: &[ContentBlock]) -> Vec<&ContentBlock> {
    blocks.iter().filter(|block| is_block_visible(block)).collect()
}
