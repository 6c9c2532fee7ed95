// src/html.rs
//! Announcement bodies arrive as HTML. Chat channels want light markdown:
//! links stay inline as `[text](href)`, emphasis becomes `**`/`_`, block
//! elements become paragraph breaks. No line wrapping is applied.

use once_cell::sync::OnceCell;
use regex::{Captures, Regex};

fn cached(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static html regex"))
}

fn strip_tags(s: &str) -> String {
    static RE_TAG: OnceCell<Regex> = OnceCell::new();
    cached(&RE_TAG, r"(?s)<[^>]*>").replace_all(s, "").into_owned()
}

/// Convert an HTML fragment into trimmed chat markdown.
pub fn html_to_text(html: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    static RE_DROP: OnceCell<Regex> = OnceCell::new();
    static RE_LINK: OnceCell<Regex> = OnceCell::new();
    static RE_BR: OnceCell<Regex> = OnceCell::new();
    static RE_HEADING: OnceCell<Regex> = OnceCell::new();
    static RE_LI: OnceCell<Regex> = OnceCell::new();
    static RE_BLOCK: OnceCell<Regex> = OnceCell::new();
    static RE_STRONG: OnceCell<Regex> = OnceCell::new();
    static RE_EM: OnceCell<Regex> = OnceCell::new();
    static RE_SPACES: OnceCell<Regex> = OnceCell::new();
    static RE_BLANKS: OnceCell<Regex> = OnceCell::new();

    // 1) Source whitespace is insignificant in HTML
    let mut out = cached(&RE_WS, r"\s+").replace_all(html, " ").into_owned();

    // 2) Non-content elements
    out = cached(
        &RE_DROP,
        r"(?is)<(script|style|head)\b[^>]*>.*?</(script|style|head)\s*>",
    )
    .replace_all(&out, "")
    .into_owned();

    // 3) Links, before any other tag handling touches their inner markup
    out = cached(
        &RE_LINK,
        r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a\s*>"#,
    )
    .replace_all(&out, |caps: &Captures| {
        let href = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        let inner = strip_tags(&caps[3]);
        let text = inner.trim();
        match (text.is_empty(), href.is_empty()) {
            (_, true) => text.to_string(),
            (true, false) => href.to_string(),
            (false, false) => format!("[{text}]({href})"),
        }
    })
    .into_owned();

    // 4) Line breaks
    out = cached(&RE_BR, r"(?i)<br\s*/?>")
        .replace_all(&out, "\n")
        .into_owned();

    // 5) Headings open with markdown hashes
    out = cached(&RE_HEADING, r"(?i)<h([1-6])\b[^>]*>")
        .replace_all(&out, |caps: &Captures| {
            let level: usize = caps[1].parse().unwrap_or(1);
            format!("\n\n{} ", "#".repeat(level))
        })
        .into_owned();

    // 6) List items
    out = cached(&RE_LI, r"(?i)<li\b[^>]*>")
        .replace_all(&out, "\n* ")
        .into_owned();

    // 7) Remaining block boundaries
    out = cached(
        &RE_BLOCK,
        r"(?i)</?(p|div|ul|ol|blockquote|table|tr|h[1-6]|section|article|header|footer)\b[^>]*>",
    )
    .replace_all(&out, "\n\n")
    .into_owned();

    // 8) Inline emphasis
    out = cached(&RE_STRONG, r"(?i)</?(strong|b)\b[^>]*>")
        .replace_all(&out, "**")
        .into_owned();
    out = cached(&RE_EM, r"(?i)</?(em|i)\b[^>]*>")
        .replace_all(&out, "_")
        .into_owned();

    // 9) Everything else is dropped; entities decoded last so `&lt;` survives as text
    out = strip_tags(&out);
    let decoded = html_escape::decode_html_entities(&out).replace('\u{00A0}', " ");

    // 10) Tidy lines
    let decoded = cached(&RE_SPACES, r"[ \t]{2,}").replace_all(&decoded, " ");
    let joined = decoded.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    cached(&RE_BLANKS, r"\n{3,}")
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}
