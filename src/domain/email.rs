/// A file carried by an email, already transfer-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// One unread message as it will be relayed to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    /// Text shown in the chat for this message (attachments go separately).
    pub fn render(&self) -> String {
        format!(
            "From: {}\nSubject: {}\n-------------------\n\n{}",
            self.from, self.subject, self.body
        )
    }
}
