use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info, warn};

use crate::bot::{InboundEvent, Transport};
use crate::domain::session::ChatId;
use crate::format::render_blocks;
use crate::mail::extract::extract_message;
use crate::mail::imap_client::MailSource;
use crate::session::{self, Effect, prompts};
use crate::store::repo::SessionRepository;

/// Meta key holding the first update id not yet handled.
pub const OFFSET_KEY: &str = "next_update_offset";

/// One bot, one mail source, one session store.
pub struct Relay<'a> {
    transport: &'a dyn Transport,
    mail: &'a dyn MailSource,
    repo: &'a dyn SessionRepository,
    poll_timeout: Duration,
    offset: Option<i64>,
}

impl<'a> Relay<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        mail: &'a dyn MailSource,
        repo: &'a dyn SessionRepository,
        poll_timeout: Duration,
    ) -> Result<Self> {
        let offset = repo.get_meta_i64(OFFSET_KEY)?;
        Ok(Self {
            transport,
            mail,
            repo,
            poll_timeout,
            offset,
        })
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Handle pending bot events, then relay mail. Mail is relayed even
    /// when polling the bot failed.
    pub fn run_once(&mut self) -> Result<()> {
        let polled = self.poll_updates();
        let delivered = self.deliver_mail();
        polled.map(|_| ()).and(delivered)
    }

    /// Returns the number of events received.
    pub fn poll_updates(&mut self) -> Result<usize> {
        let events = self.transport.get_updates(self.offset, self.poll_timeout)?;
        let Some(last) = events.iter().map(|e| e.update_id).max() else {
            return Ok(0);
        };

        // Acknowledge first: a failure below must not replay onboarding input.
        self.offset = Some(last + 1);
        self.repo.set_meta_i64(OFFSET_KEY, last + 1)?;

        for (chat_id, texts) in group_by_chat(&events) {
            for text in texts {
                self.handle_text(chat_id, text)?;
            }
        }
        Ok(events.len())
    }

    fn handle_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let current = self.repo.get(chat_id)?;
        let t = session::step(chat_id, current.as_ref(), text);

        match &t.effect {
            Effect::None => {}
            Effect::Save(s) => {
                self.repo.upsert(s)?;
                info!(
                    "chat {chat_id}: {:?} -> {:?}",
                    current.as_ref().map(|c| c.state),
                    s.state
                );
            }
            Effect::Delete => {
                self.repo.delete(chat_id)?;
                info!("chat {chat_id}: session removed");
            }
        }

        if let Some(reply) = t.reply {
            self.send_text(chat_id, reply);
        }
        Ok(())
    }

    /// Fetch and forward unread mail for every configured session.
    pub fn deliver_mail(&self) -> Result<()> {
        for s in self.repo.list_configured()? {
            let Some((login, credential)) = s.credentials() else {
                continue;
            };

            match self.mail.fetch_unseen(login, credential) {
                Ok(messages) => {
                    for raw in &messages {
                        self.relay_message(s.chat_id, raw);
                    }
                }
                Err(e) if e.is_terminal() => {
                    warn!("chat {}: mailbox {login} rejected: {e}", s.chat_id);
                    // no notice while the session is still stored
                    if let Err(e) = self.repo.delete(s.chat_id) {
                        error!("chat {}: removing rejected session failed: {e:#}", s.chat_id);
                        continue;
                    }
                    self.send_text(s.chat_id, prompts::INVALID_CREDENTIALS);
                }
                Err(e) => {
                    warn!(
                        "chat {}: mailbox {login} unavailable, will retry: {e}",
                        s.chat_id
                    );
                }
            }
        }
        Ok(())
    }

    fn relay_message(&self, chat_id: ChatId, raw: &[u8]) {
        // The message is already flagged seen; a parse failure loses it.
        let email = match extract_message(raw) {
            Ok(m) => m,
            Err(e) => {
                warn!("chat {chat_id}: dropping unparsable message: {e}");
                return;
            }
        };

        info!(
            "chat {chat_id}: relaying \"{}\" ({} attachment(s))",
            email.subject,
            email.attachments.len()
        );
        self.send_text(chat_id, &email.render());

        for att in &email.attachments {
            match self
                .transport
                .send_document(chat_id, &att.filename, &att.data)
            {
                Ok(true) => debug!("chat {chat_id}: sent {}", att.filename),
                Ok(false) => warn!("chat {chat_id}: {} was refused", att.filename),
                Err(e) => error!("chat {chat_id}: sending {} failed: {e:#}", att.filename),
            }
        }
    }

    /// Format and send, block by block. Failed blocks are logged only.
    fn send_text(&self, chat_id: ChatId, text: &str) {
        for block in render_blocks(text) {
            if let Err(e) = self.transport.send_message(chat_id, &block) {
                error!("chat {chat_id}: sendMessage failed: {e:#}");
            }
        }
    }
}

/// Texts per chat, chats in order of first appearance, events by id.
fn group_by_chat(events: &[InboundEvent]) -> Vec<(ChatId, Vec<&str>)> {
    let mut sorted: Vec<&InboundEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.update_id);

    let mut groups: Vec<(ChatId, Vec<&str>)> = Vec::new();
    for e in sorted {
        let (Some(chat_id), Some(text)) = (e.chat_id, e.text.as_deref()) else {
            continue;
        };
        match groups.iter_mut().find(|(id, _)| *id == chat_id) {
            Some((_, texts)) => texts.push(text),
            None => groups.push((chat_id, vec![text])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(update_id: i64, chat_id: Option<ChatId>, text: Option<&str>) -> InboundEvent {
        InboundEvent {
            update_id,
            chat_id,
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn events_grouped_per_chat_in_order() {
        let events = vec![
            ev(3, Some(2), Some("b1")),
            ev(1, Some(1), Some("a1")),
            ev(4, Some(1), Some("a2")),
            ev(2, Some(1), None),
            ev(5, None, None),
        ];
        assert_eq!(
            group_by_chat(&events),
            vec![(1, vec!["a1", "a2"]), (2, vec!["b1"])]
        );
    }
}
