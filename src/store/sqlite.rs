use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::session::{ChatId, Session, SessionState};
use crate::store::repo::SessionRepository;

pub struct SqliteRepo {
    conn: Connection,
}

impl SqliteRepo {
    pub fn open(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.migrate()?;
        Ok(repo)
    }

    pub fn open_in_memory() -> Result<Self> {
        let repo = Self {
            conn: Connection::open_in_memory()?,
        };
        repo.migrate()?;
        Ok(repo)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS sessions (
                chat_id     INTEGER PRIMARY KEY,
                state       INTEGER NOT NULL,
                login       TEXT,
                credential  TEXT
            );

            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

fn session_from_row(r: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        chat_id: r.get(0)?,
        state: SessionState::from_i64(r.get(1)?),
        mailbox_login: r.get(2)?,
        mailbox_credential: r.get(3)?,
    })
}

impl SessionRepository for SqliteRepo {
    fn get(&self, chat_id: ChatId) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                r#"SELECT chat_id, state, login, credential FROM sessions WHERE chat_id=?1"#,
                params![chat_id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn upsert(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions (chat_id, state, login, credential)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(chat_id) DO UPDATE SET
              state=excluded.state,
              login=excluded.login,
              credential=excluded.credential
            "#,
            params![
                session.chat_id,
                session.state.as_i64(),
                session.mailbox_login,
                session.mailbox_credential
            ],
        )?;
        Ok(())
    }

    fn delete(&self, chat_id: ChatId) -> Result<()> {
        self.conn
            .execute(r#"DELETE FROM sessions WHERE chat_id=?1"#, params![chat_id])?;
        Ok(())
    }

    fn list_configured(&self) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT chat_id, state, login, credential
            FROM sessions
            WHERE state = ?1
              AND login IS NOT NULL AND login != ''
              AND credential IS NOT NULL AND credential != ''
            ORDER BY chat_id
            "#,
        )?;

        let rows = stmt.query_map(params![SessionState::Idle.as_i64()], session_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn get_meta_i64(&self, key: &str) -> Result<Option<i64>> {
        let mut stmt = self
            .conn
            .prepare(r#"SELECT value FROM meta WHERE key=?1"#)?;
        let mut rows = stmt.query(params![key])?;
        if let Some(r) = rows.next()? {
            Ok(Some(r.get(0)?))
        } else {
            Ok(None)
        }
    }

    fn set_meta_i64(&self, key: &str, value: i64) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO meta (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value=excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(chat_id: ChatId) -> Session {
        Session {
            chat_id,
            state: SessionState::Idle,
            mailbox_login: Some(format!("user{chat_id}@example.com")),
            mailbox_credential: Some("pw".into()),
        }
    }

    #[test]
    fn upsert_get_delete() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        assert!(repo.get(5).unwrap().is_none());

        let mut s = Session::new(5);
        s.state = SessionState::AwaitingEmail;
        repo.upsert(&s).unwrap();
        assert_eq!(repo.get(5).unwrap(), Some(s.clone()));

        s.state = SessionState::AwaitingPassword;
        s.mailbox_login = Some("a@b.com".into());
        repo.upsert(&s).unwrap();
        assert_eq!(repo.get(5).unwrap(), Some(s));

        repo.delete(5).unwrap();
        assert!(repo.get(5).unwrap().is_none());
        repo.delete(5).unwrap();
    }

    #[test]
    fn only_idle_sessions_with_credentials_are_listed() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        repo.upsert(&configured(3)).unwrap();
        repo.upsert(&configured(1)).unwrap();

        let mut onboarding = configured(2);
        onboarding.state = SessionState::AwaitingPassword;
        repo.upsert(&onboarding).unwrap();

        repo.upsert(&Session::new(4)).unwrap();

        let mut blank = configured(6);
        blank.mailbox_credential = Some(String::new());
        repo.upsert(&blank).unwrap();

        let ids: Vec<_> = repo
            .list_configured()
            .unwrap()
            .into_iter()
            .map(|s| s.chat_id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn meta_values_overwrite() {
        let repo = SqliteRepo::open_in_memory().unwrap();
        assert_eq!(repo.get_meta_i64("k").unwrap(), None);
        repo.set_meta_i64("k", 1).unwrap();
        repo.set_meta_i64("k", 9).unwrap();
        assert_eq!(repo.get_meta_i64("k").unwrap(), Some(9));
    }

    #[test]
    fn sessions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        {
            let repo = SqliteRepo::open(&path).unwrap();
            repo.upsert(&configured(8)).unwrap();
            repo.set_meta_i64("next_update_offset", 100).unwrap();
        }
        let repo = SqliteRepo::open(&path).unwrap();
        assert_eq!(repo.get(8).unwrap(), Some(configured(8)));
        assert_eq!(repo.get_meta_i64("next_update_offset").unwrap(), Some(100));
    }
}
