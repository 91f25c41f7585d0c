pub mod telegram;

use std::time::Duration;

use anyhow::Result;

use crate::domain::session::ChatId;

/// One update from the bot API, reduced to what the relay needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub update_id: i64,
    pub chat_id: Option<ChatId>,
    pub text: Option<String>,
}

/// The chat side of the relay.
pub trait Transport {
    /// Long-poll for events with `update_id >= offset`.
    fn get_updates(&self, offset: Option<i64>, wait: Duration) -> Result<Vec<InboundEvent>>;

    /// Send one already-formatted MarkdownV2 block.
    fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Upload a file; `Ok(false)` when the API refused it.
    fn send_document(&self, chat_id: ChatId, file_name: &str, data: &[u8]) -> Result<bool>;
}
