pub type ChatId = i64;

/// Onboarding position of a chat. Stored as its integer discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle = 0,
    AwaitingEmail = 1,
    AwaitingPassword = 2,
}

impl SessionState {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Unknown values fall back to `Idle`.
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => SessionState::AwaitingEmail,
            2 => SessionState::AwaitingPassword,
            _ => SessionState::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub chat_id: ChatId,
    pub state: SessionState,
    pub mailbox_login: Option<String>,
    pub mailbox_credential: Option<String>,
}

impl Session {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            state: SessionState::Idle,
            mailbox_login: None,
            mailbox_credential: None,
        }
    }

    /// Login and credential for a session that may be polled for mail.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.state != SessionState::Idle {
            return None;
        }
        match (
            self.mailbox_login.as_deref(),
            self.mailbox_credential.as_deref(),
        ) {
            (Some(l), Some(c)) if !l.is_empty() && !c.is_empty() => Some((l, c)),
            _ => None,
        }
    }
}
