//! Plain text to Telegram `MarkdownV2`.
//!
//! Raw URLs are lifted out before escaping and put back as `[label](url)`
//! links afterwards, so the escape pass never touches a link target.

use std::sync::OnceLock;

use regex::Regex;

/// Characters that must be backslash-escaped in MarkdownV2 text.
pub const RESERVED_CHARS: &str = "\\_*[]()~`>#+-=|{}.!";
/// Longest escaped link label shown as-is.
pub const MAX_LABEL_CHARS: usize = 60;
pub const LONG_URL_LABEL: &str = "longURL";

// Private-use code points delimit link placeholders; stripped from input.
const TOKEN_OPEN: char = '\u{E000}';
const TOKEN_CLOSE: char = '\u{E001}';

/// A URL found in the text, split at its query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub base: String,
    pub query: String,
}

impl Link {
    pub fn target(&self) -> String {
        format!("{}{}", self.base, self.query)
    }

    pub fn to_markdown(&self) -> String {
        let label = escape(&self.base);
        let label = if label.chars().count() > MAX_LABEL_CHARS {
            LONG_URL_LABEL.to_string()
        } else {
            label
        };
        format!("[{label}]({})", self.target())
    }
}

fn link_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(https?://[-a-zA-Z0-9._~:/#@!$&'*+,;=%]+)(\?[-a-zA-Z0-9._~:/#@!$&'*+,;=%]*)?",
        )
        .expect("valid link regex")
    })
}

fn token_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\x{E000}(\d+)\x{E001}").expect("valid token regex"))
}

fn line_end_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        // spaces, tabs, form feeds and zero-width joiners/separators before a break
        Regex::new(
            r"[ \t\x0C\x{034F}\x{180E}\x{200B}\x{200C}\x{200D}\x{2060}\x{FEFF}]*(?:\r\n|\r|\n)",
        )
        .expect("valid line end regex")
    })
}

fn blank_lines_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\n{2,}").expect("valid blank lines regex"))
}

fn placeholder(index: usize) -> String {
    format!("{TOKEN_OPEN}{index:06}{TOKEN_CLOSE}")
}

/// Backslash-escape every reserved character.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if RESERVED_CHARS.contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Replace each URL with a numbered placeholder. Links come back in
/// occurrence order, `links[i]` belonging to placeholder `i`.
pub fn extract_links(text: &str) -> (String, Vec<Link>) {
    let clean: String = text
        .chars()
        .filter(|c| *c != TOKEN_OPEN && *c != TOKEN_CLOSE)
        .collect();

    let mut out = String::with_capacity(clean.len());
    let mut links = Vec::new();
    let mut last = 0;
    for caps in link_regex().captures_iter(&clean) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&clean[last..whole.start()]);
        out.push_str(&placeholder(links.len()));
        links.push(Link {
            base: caps[1].to_string(),
            query: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        });
        last = whole.end();
    }
    out.push_str(&clean[last..]);
    (out, links)
}

/// Swap placeholders for their markdown links.
pub fn insert_links(text: &str, links: &[Link]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in token_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let link = caps[1].parse::<usize>().ok().and_then(|i| links.get(i));
        out.push_str(&text[last..whole.start()]);
        match link {
            Some(link) => out.push_str(&link.to_markdown()),
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Drop trailing blanks on every line and keep at most one empty line.
pub fn normalize_breaks(text: &str) -> String {
    let text = line_end_regex().replace_all(text, "\n");
    blank_lines_regex().replace_all(&text, "\n\n").into_owned()
}

/// Full conversion of arbitrary text to MarkdownV2.
pub fn to_markdown(text: &str) -> String {
    let (text, links) = extract_links(text);
    let text = escape(&text);
    let text = insert_links(&text, &links);
    normalize_breaks(&text)
}
