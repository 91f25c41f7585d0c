use log::{debug, warn};
use mailparse::{MailHeaderMap, MailParseError, ParsedMail};

use crate::domain::email::{Attachment, EmailMessage};
use crate::mail::decoders::{decode_mime_str, display_or};

/// Body used when a message carries no `text/plain` part at all.
pub const NO_PLAIN_TEXT_BODY: &str = "This message has only HTML content, can't render it";
/// Body used when the `text/plain` content is empty.
pub const EMPTY_BODY: &str = "No content";

/// Nested multiparts below this depth are not inspected.
const MAX_NESTING: usize = 1;

/// Parse a raw RFC 822 buffer and pull out what gets relayed.
pub fn extract_message(raw: &[u8]) -> Result<EmailMessage, MailParseError> {
    let parsed = mailparse::parse_mail(raw)?;
    Ok(extract_parsed(&parsed))
}

pub fn extract_parsed(mail: &ParsedMail) -> EmailMessage {
    let from = display_or(mail.headers.get_first_value("From"), "(unknown)");
    let subject = display_or(mail.headers.get_first_value("Subject"), "(no subject)");
    let mime = mail.ctype.mimetype.to_ascii_lowercase();

    let mut walk = PartWalk::default();
    if is_multipart(mail) {
        for part in &mail.subparts {
            walk.visit(part, 0);
        }
    } else if mime == "text/plain" {
        walk.push_text(mail);
    }

    let body = walk.body().unwrap_or_else(|| {
        debug!("no text/plain content, message type {mime}");
        NO_PLAIN_TEXT_BODY.to_string()
    });

    EmailMessage {
        from,
        subject,
        body,
        attachments: walk.attachments,
    }
}

#[derive(Default)]
struct PartWalk {
    found_plain: bool,
    texts: Vec<String>,
    attachments: Vec<Attachment>,
}

impl PartWalk {
    fn visit(&mut self, part: &ParsedMail, depth: usize) {
        let mime = part.ctype.mimetype.to_ascii_lowercase();
        debug!("mime part depth={depth} type={mime}");

        if let Some(att) = attachment(part) {
            self.attachments.push(att);
        } else if mime == "text/plain" {
            self.push_text(part);
        } else if is_multipart(part) && depth < MAX_NESTING {
            for sp in &part.subparts {
                self.visit(sp, depth + 1);
            }
        }
    }

    fn push_text(&mut self, part: &ParsedMail) {
        self.found_plain = true;
        // get_body applies transfer decoding and the declared charset
        let text = part.get_body().unwrap_or_else(|e| {
            warn!("text/plain part could not be charset-decoded: {e}");
            String::from_utf8_lossy(&part.get_body_raw().unwrap_or_default()).into_owned()
        });
        if !text.trim().is_empty() {
            self.texts.push(text);
        }
    }

    fn body(&self) -> Option<String> {
        if !self.found_plain {
            return None;
        }
        if self.texts.is_empty() {
            return Some(EMPTY_BODY.to_string());
        }
        Some(self.texts.join("\n"))
    }
}

fn is_multipart(part: &ParsedMail) -> bool {
    part.ctype.mimetype.to_ascii_lowercase().starts_with("multipart/")
}

/// A base64 part that names a file, whatever its content type.
fn attachment(part: &ParsedMail) -> Option<Attachment> {
    let encoding = part.headers.get_first_value("Content-Transfer-Encoding")?;
    if !encoding.trim().eq_ignore_ascii_case("base64") {
        return None;
    }
    let name = filename(part)?;
    match part.get_body_raw() {
        Ok(data) => Some(Attachment {
            filename: decode_mime_str(&name),
            data,
        }),
        Err(e) => {
            warn!("attachment {name} could not be decoded: {e}");
            None
        }
    }
}

fn filename(part: &ParsedMail) -> Option<String> {
    let disposition = part.get_content_disposition();
    disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
