//! Prints the chat message an announcement would produce.
//!
//! Usage: `format-preview <course name> <title> [url] < body.html`
//! `RELAY_MENTION` and `RELAY_MAX_MESSAGE_LENGTH` override the defaults.

use std::io::Read;

use canvas_relay::format::{Formatter, DEFAULT_MAX_MESSAGE_LENGTH};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(course), Some(title)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: format-preview <course name> <title> [url] < body.html");
    };
    let url = args.next();

    let mention = std::env::var("RELAY_MENTION").unwrap_or_else(|_| "@here".to_string());
    let max_len = std::env::var("RELAY_MAX_MESSAGE_LENGTH")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_MESSAGE_LENGTH);

    let mut html = String::new();
    std::io::stdin().read_to_string(&mut html)?;

    let out = Formatter::new(mention, max_len).format(&course, &title, &html, url.as_deref());
    println!("{out}");
    eprintln!("-- {} / {} chars", out.chars().count(), max_len);
    Ok(())
}
