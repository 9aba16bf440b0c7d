// Transcript assembly
// Converts grouped turns into the ordered list of display messages

use crate::flatten::flatten_turn;
use crate::grouping::Turn;
use crate::types::DisplayMessage;

/// Build one display message per visible turn, ordered by creation time.
///
/// Turns with neither text nor images are dropped, as are whitespace-only
/// text turns. The sort is stable, so equal timestamps keep turn order.
pub fn assemble_transcript(turns: &[Turn]) -> Vec<DisplayMessage> {
    let mut messages: Vec<DisplayMessage> = turns
        .iter()
        .filter_map(|turn| {
            let flat = flatten_turn(turn);
            if !flat.has_text && flat.images.is_empty() {
                return None;
            }

            let content = flat.content.trim().to_string();
            if content.is_empty() && flat.images.is_empty() {
                return None;
            }

            let first = turn.first();
            Some(DisplayMessage {
                id: first.id.clone(),
                content,
                role: turn.role(),
                created_at: first.created_at,
                images: (!flat.images.is_empty()).then_some(flat.images),
            })
        })
        .collect();

    messages.sort_by_key(|m| m.created_at);
    messages
}
