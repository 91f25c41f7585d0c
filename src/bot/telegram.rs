use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{debug, error};
use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use url::Url;

use crate::bot::{InboundEvent, Transport};
use crate::domain::session::ChatId;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

impl From<Update> for InboundEvent {
    fn from(u: Update) -> Self {
        let (chat_id, text) = match u.message {
            Some(m) => (Some(m.chat.id), m.text),
            None => (None, None),
        };
        InboundEvent {
            update_id: u.update_id,
            chat_id,
            text,
        }
    }
}

fn parse_updates(body: &str) -> Result<Vec<InboundEvent>> {
    let resp: ApiResponse<Vec<Update>> = serde_json::from_str(body)?;
    if !resp.ok {
        return Err(anyhow!(
            "getUpdates failed: {}",
            resp.description.unwrap_or_default()
        ));
    }
    Ok(resp
        .result
        .unwrap_or_default()
        .into_iter()
        .map(InboundEvent::from)
        .collect())
}

/// Telegram Bot API over blocking HTTP.
pub struct TelegramClient {
    base: Url,
    client: Client,
    request_timeout: Duration,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, request_timeout: Duration) -> Result<Self> {
        let mut root = api_base.to_string();
        if !root.ends_with('/') {
            root.push('/');
        }
        // "./" keeps "bot<id>:<secret>" from parsing as a URL scheme
        let base = Url::parse(&root)?.join(&format!("./bot{token}/"))?;
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base,
            client,
            request_timeout,
        })
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        Ok(self.base.join(method)?)
    }
}

// Request errors carry the URL, which contains the bot token.
fn redact(e: reqwest::Error) -> anyhow::Error {
    anyhow!(e.without_url())
}

impl Transport for TelegramClient {
    fn get_updates(&self, offset: Option<i64>, wait: Duration) -> Result<Vec<InboundEvent>> {
        let mut req = self
            .client
            .get(self.method_url("getUpdates")?)
            .query(&[("timeout", wait.as_secs())])
            .timeout(wait + self.request_timeout);
        if let Some(offset) = offset {
            req = req.query(&[("offset", offset)]);
        }

        let body = req.send().map_err(redact)?.text().map_err(redact)?;
        let events = parse_updates(&body)?;
        if !events.is_empty() {
            debug!("received {} update(s)", events.len());
        }
        Ok(events)
    }

    fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
        debug!("sendMessage to {chat_id}: {text}");
        let chat = chat_id.to_string();
        let resp = self
            .client
            .post(self.method_url("sendMessage")?)
            .form(&[
                ("chat_id", chat.as_str()),
                ("text", text),
                ("parse_mode", "MarkdownV2"),
                ("disable_web_page_preview", "true"),
            ])
            .send()
            .map_err(redact)?;

        let status = resp.status();
        if !status.is_success() {
            let err = resp.text().unwrap_or_default();
            return Err(anyhow!("sendMessage failed ({status}): {err}"));
        }
        Ok(())
    }

    fn send_document(&self, chat_id: ChatId, file_name: &str, data: &[u8]) -> Result<bool> {
        let part = Part::bytes(data.to_vec()).file_name(file_name.to_string());
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let resp = self
            .client
            .post(self.method_url("sendDocument")?)
            .multipart(form)
            .send()
            .map_err(redact)?;

        let status = resp.status();
        if !status.is_success() {
            let err = resp.text().unwrap_or_default();
            error!("sendDocument {file_name} to {chat_id} failed ({status}): {err}");
        }
        Ok(status.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_urls_embed_token_path() {
        let c = TelegramClient::new(
            "https://api.telegram.org",
            "123456:ABC-def",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            c.method_url("getUpdates").unwrap().as_str(),
            "https://api.telegram.org/bot123456:ABC-def/getUpdates"
        );
    }

    #[test]
    fn custom_api_root_with_path() {
        let c = TelegramClient::new("http://localhost:8081/tg", "1:x", Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            c.method_url("sendMessage").unwrap().as_str(),
            "http://localhost:8081/tg/bot1:x/sendMessage"
        );
    }

    #[test]
    fn updates_are_mapped_to_events() {
        let body = r#"{"ok":true,"result":[
            {"update_id":10,"message":{"message_id":1,"chat":{"id":42,"type":"private"},"text":"/new"}},
            {"update_id":11,"message":{"message_id":2,"chat":{"id":42,"type":"private"},"sticker":{}}},
            {"update_id":12,"edited_message":{"message_id":1,"chat":{"id":42},"text":"x"}}
        ]}"#;
        let events = parse_updates(body).unwrap();
        assert_eq!(
            events,
            vec![
                InboundEvent {
                    update_id: 10,
                    chat_id: Some(42),
                    text: Some("/new".into())
                },
                InboundEvent {
                    update_id: 11,
                    chat_id: Some(42),
                    text: None
                },
                InboundEvent {
                    update_id: 12,
                    chat_id: None,
                    text: None
                },
            ]
        );
    }

    #[test]
    fn api_failure_is_an_error() {
        let body = r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#;
        let err = parse_updates(body).unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }
}
