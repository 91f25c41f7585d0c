pub mod chunk;
pub mod markdown;

use chunk::{TEXT_LIMIT, split_blocks};
use markdown::to_markdown;

/// Turn raw text into the ordered MarkdownV2 messages that carry it.
pub fn render_blocks(text: &str) -> Vec<String> {
    split_blocks(&to_markdown(text), TEXT_LIMIT)
}
