use anyhow::Result;

use crate::domain::session::{ChatId, Session};

/// Persistent sessions keyed by chat, plus a few integer settings.
///
/// Every mutating call commits on its own.
pub trait SessionRepository {
    fn get(&self, chat_id: ChatId) -> Result<Option<Session>>;
    fn upsert(&self, session: &Session) -> Result<()>;
    fn delete(&self, chat_id: ChatId) -> Result<()>;

    /// Idle sessions holding both login and credential, by chat id.
    fn list_configured(&self) -> Result<Vec<Session>>;

    fn get_meta_i64(&self, key: &str) -> Result<Option<i64>>;
    fn set_meta_i64(&self, key: &str, value: i64) -> Result<()>;
}
