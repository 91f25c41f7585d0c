use std::collections::HashMap;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info};
use native_tls::{TlsConnector, TlsStream};
use thiserror::Error;

type ImapSession = imap::Session<TlsStream<TcpStream>>;

/// Why a mailbox could not be polled.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mailbox login {0:?} has no domain part")]
    InvalidLogin(String),
    #[error("authentication rejected: {0}")]
    AuthFailed(String),
    #[error("mail server unreachable: {0}")]
    Transient(String),
    #[error("mail protocol error: {0}")]
    Protocol(String),
}

impl MailError {
    /// Errors after which the stored credentials are useless.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MailError::InvalidLogin(_) | MailError::AuthFailed(_))
    }
}

impl From<imap::error::Error> for MailError {
    fn from(e: imap::error::Error) -> Self {
        use imap::error::Error;
        match e {
            Error::Io(_) | Error::ConnectionLost => MailError::Transient(e.to_string()),
            Error::Tls(_) | Error::TlsHandshake(_) => MailError::Transient(e.to_string()),
            _ => MailError::Protocol(e.to_string()),
        }
    }
}

impl From<std::io::Error> for MailError {
    fn from(e: std::io::Error) -> Self {
        MailError::Transient(e.to_string())
    }
}

/// Something that hands out the unread messages of a mailbox.
///
/// Implementations mark every returned message as seen before returning it,
/// so a message is relayed at most once.
pub trait MailSource {
    fn fetch_unseen(&self, login: &str, credential: &str) -> Result<Vec<Vec<u8>>, MailError>;
}

const BUILTIN_SERVERS: &[(&str, &str)] = &[
    ("bk.ru", "imap.mail.ru"),
    ("phystech.edu", "imap.gmail.com"),
];

pub struct ImapClient {
    pub port: u16,
    pub timeout: Duration,
    servers: HashMap<String, String>,
}

impl ImapClient {
    pub fn new(port: u16, timeout: Duration, overrides: &HashMap<String, String>) -> Self {
        let mut servers: HashMap<String, String> = BUILTIN_SERVERS
            .iter()
            .map(|(d, s)| (d.to_string(), s.to_string()))
            .collect();
        for (domain, server) in overrides {
            servers.insert(domain.to_ascii_lowercase(), server.clone());
        }
        Self {
            port,
            timeout,
            servers,
        }
    }

    /// IMAP host for a mailbox address: `imap.<domain>` unless overridden.
    pub fn server_for(&self, login: &str) -> Result<String, MailError> {
        let domain = login
            .rsplit_once('@')
            .map(|(_, d)| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| MailError::InvalidLogin(login.to_string()))?;

        Ok(self
            .servers
            .get(&domain)
            .cloned()
            .unwrap_or_else(|| format!("imap.{domain}")))
    }

    fn connect_and_login(&self, login: &str, credential: &str) -> Result<ImapSession, MailError> {
        let server = self.server_for(login)?;
        debug!("connecting to {server}:{}", self.port);

        let addr = (server.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| MailError::Transient(format!("{server} did not resolve")))?;
        let tcp = TcpStream::connect_timeout(&addr, self.timeout)?;
        tcp.set_read_timeout(Some(self.timeout))?;
        tcp.set_write_timeout(Some(self.timeout))?;

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| MailError::Transient(e.to_string()))?;
        let stream = tls
            .connect(server.as_str(), tcp)
            .map_err(|e| MailError::Transient(e.to_string()))?;

        let mut client = imap::Client::new(stream);
        client.read_greeting()?;

        match client.login(login, credential) {
            Ok(session) => Ok(session),
            Err((imap::error::Error::No(msg), _)) => Err(MailError::AuthFailed(msg)),
            Err((e, _)) => Err(e.into()),
        }
    }

    fn drain_unseen(&self, session: &mut ImapSession) -> Result<Vec<Vec<u8>>, MailError> {
        session.select("INBOX")?;

        let mut ids: Vec<u32> = session.search("UNSEEN")?.into_iter().collect();
        ids.sort_unstable();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let fetches = session.fetch(id.to_string(), "RFC822")?;
            let raw = fetches.iter().find_map(|f| f.body()).map(|b| b.to_vec());
            // Flag before anything looks at the content.
            session.store(id.to_string(), "+FLAGS (\\Seen)")?;
            match raw {
                Some(raw) => out.push(raw),
                None => debug!("message {id} returned no body"),
            }
        }
        Ok(out)
    }
}

impl MailSource for ImapClient {
    fn fetch_unseen(&self, login: &str, credential: &str) -> Result<Vec<Vec<u8>>, MailError> {
        let mut session = self.connect_and_login(login, credential)?;
        let result = self.drain_unseen(&mut session);
        // best-effort: the messages are already flagged
        let _ = session.close();
        let _ = session.logout();

        let messages = result?;
        if !messages.is_empty() {
            info!("fetched {} unseen message(s) for {login}", messages.len());
        }
        Ok(messages)
    }
}
