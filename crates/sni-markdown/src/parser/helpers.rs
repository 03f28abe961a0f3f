//! Link and escaping helpers shared by the tokenizer and renderer.

use std::borrow::Cow;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters kept as-is in link destinations.
const LINK_SAFE: &[u8] = b";/?:@&=+$,-_.!~*'()#";

/// Percent-encode a link destination, keeping existing `%XX` escapes.
pub(crate) fn normalize_link(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    for (index, ch) in url.char_indices() {
        let is_escape = ch == '%'
            && bytes.get(index + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(index + 2).is_some_and(u8::is_ascii_hexdigit);
        if ch.is_ascii_alphanumeric() || (ch.is_ascii() && LINK_SAFE.contains(&(ch as u8))) || is_escape
        {
            out.push(ch);
        } else {
            let mut buf = [0; 4];
            out.extend(utf8_percent_encode(ch.encode_utf8(&mut buf), NON_ALPHANUMERIC));
        }
    }
    out
}

/// Reject script-capable URL schemes, allowing inline raster images.
pub(crate) fn validate_link(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    let dangerous = ["vbscript:", "javascript:", "file:", "data:"]
        .iter()
        .any(|scheme| url.starts_with(scheme));
    if !dangerous {
        return true;
    }
    ["gif", "png", "jpeg", "webp"]
        .iter()
        .any(|kind| url.starts_with(&format!("data:image/{kind};")))
}

/// HTML-escape text content and attribute values.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
