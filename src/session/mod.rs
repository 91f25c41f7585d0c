//! Per-chat onboarding dialogue.
//!
//! `step` is pure: it looks at the stored session and one incoming text and
//! says what to store and what to answer. The relay applies the result.

pub mod prompts;

use crate::domain::session::{ChatId, Session, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Save(Session),
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub effect: Effect,
    pub reply: Option<&'static str>,
}

impl Transition {
    fn ignore() -> Self {
        Self {
            effect: Effect::None,
            reply: None,
        }
    }

    fn reply(text: &'static str) -> Self {
        Self {
            effect: Effect::None,
            reply: Some(text),
        }
    }

    fn save(session: Session, text: &'static str) -> Self {
        Self {
            effect: Effect::Save(session),
            reply: Some(text),
        }
    }
}

/// "/new@MyBot" -> "/new"; anything else is returned trimmed.
fn command(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with('/') {
        text.split('@').next().unwrap_or(text)
    } else {
        text
    }
}

pub fn step(chat_id: ChatId, session: Option<&Session>, text: &str) -> Transition {
    let state = session.map_or(SessionState::Idle, |s| s.state);
    let mut next = session
        .cloned()
        .unwrap_or_else(|| Session::new(chat_id));

    match state {
        SessionState::Idle => match command(text) {
            "/start" => Transition::reply(prompts::WELCOME),
            "/new" => {
                next.state = SessionState::AwaitingEmail;
                next.mailbox_login = None;
                next.mailbox_credential = None;
                Transition::save(next, prompts::ENTER_EMAIL)
            }
            "/stop" => Transition {
                effect: if session.is_some() {
                    Effect::Delete
                } else {
                    Effect::None
                },
                reply: Some(prompts::DISCONNECTED),
            },
            _ => Transition::ignore(),
        },
        SessionState::AwaitingEmail => {
            next.state = SessionState::AwaitingPassword;
            next.mailbox_login = Some(text.trim().to_string());
            Transition::save(next, prompts::ENTER_PASSWORD)
        }
        SessionState::AwaitingPassword => {
            next.state = SessionState::Idle;
            next.mailbox_credential = Some(text.to_string());
            Transition::save(next, prompts::DONE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(session: Option<Session>, t: &Transition) -> Option<Session> {
        match &t.effect {
            Effect::None => session,
            Effect::Save(s) => Some(s.clone()),
            Effect::Delete => None,
        }
    }

    #[test]
    fn onboarding_then_stop() {
        let mut s = None;
        for (input, reply) in [
            ("/new", prompts::ENTER_EMAIL),
            ("a@b.com", prompts::ENTER_PASSWORD),
            ("secret", prompts::DONE),
        ] {
            let t = step(7, s.as_ref(), input);
            assert_eq!(t.reply, Some(reply));
            s = apply(s, &t);
        }
        let done = s.clone().unwrap();
        assert_eq!(done.chat_id, 7);
        assert_eq!(done.state, SessionState::Idle);
        assert_eq!(done.mailbox_login.as_deref(), Some("a@b.com"));
        assert_eq!(done.mailbox_credential.as_deref(), Some("secret"));

        let t = step(7, s.as_ref(), "/stop");
        assert_eq!(t.effect, Effect::Delete);
        assert_eq!(t.reply, Some(prompts::DISCONNECTED));
    }

    #[test]
    fn start_only_replies() {
        let t = step(1, None, "/start");
        assert_eq!(t, Transition::reply(prompts::WELCOME));
    }

    #[test]
    fn stop_without_session_still_answers() {
        let t = step(1, None, "/stop");
        assert_eq!(t.effect, Effect::None);
        assert_eq!(t.reply, Some(prompts::DISCONNECTED));
    }

    #[test]
    fn idle_chatter_is_ignored() {
        assert_eq!(step(1, None, "hello"), Transition::ignore());
        let mut s = Session::new(1);
        s.mailbox_login = Some("a@b.com".into());
        s.mailbox_credential = Some("pw".into());
        assert_eq!(step(1, Some(&s), "what?"), Transition::ignore());
    }

    #[test]
    fn commands_are_data_while_onboarding() {
        let mut s = Session::new(1);
        s.state = SessionState::AwaitingEmail;
        let t = step(1, Some(&s), "/stop");
        match t.effect {
            Effect::Save(next) => {
                assert_eq!(next.state, SessionState::AwaitingPassword);
                assert_eq!(next.mailbox_login.as_deref(), Some("/stop"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn new_restarts_onboarding_and_clears_credentials() {
        let mut s = Session::new(1);
        s.mailbox_login = Some("old@b.com".into());
        s.mailbox_credential = Some("old".into());
        let t = step(1, Some(&s), "/new@Emails2TelegramBot");
        match t.effect {
            Effect::Save(next) => {
                assert_eq!(next.state, SessionState::AwaitingEmail);
                assert!(next.mailbox_login.is_none());
                assert!(next.mailbox_credential.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
