/// Decode a raw header value that may contain RFC 2047 encoded-words.
/// Bytes that cannot be decoded in the declared charset become U+FFFD.
pub fn decode_mime_words(raw: &[u8]) -> String {
    // mailparse expects a full "Key: value" header line
    let mut line = b"X: ".to_vec();
    line.extend_from_slice(raw);
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((h, _idx)) => h.get_value(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// Same as [`decode_mime_words`] for values that are already strings,
/// e.g. MIME parameters such as `filename=`.
pub fn decode_mime_str(value: &str) -> String {
    if !value.contains("=?") {
        return value.to_string();
    }
    decode_mime_words(value.as_bytes())
}

/// Collapse a decoded header to a single trimmed line, or `fallback` if blank.
pub fn display_or(value: Option<String>, fallback: &str) -> String {
    value
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
