// src/format.rs
//! Chat message layout for a single announcement.
//!
//! ```text
//! <mention>
//! **New Announcement in <course>**
//!
//! **<title>**
//!
//! <body as markdown>
//!
//! [View Announcement](<url>)
//! ```
//!
//! The result never exceeds `max_len` characters. When it would, the body is
//! cut and [`TRUNCATION_SUFFIX`] appended; header and footer are kept intact.

use crate::html::html_to_text;

/// Discord caps messages at 2000 characters; leave some headroom.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 1900;
pub const TRUNCATION_SUFFIX: &str = "...\n\n[MESSAGE TRUNCATED]";

#[derive(Debug, Clone)]
pub struct Formatter {
    mention: String,
    max_len: usize,
}

impl Formatter {
    pub fn new(mention: impl Into<String>, max_len: usize) -> Self {
        Self {
            mention: mention.into(),
            max_len,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn header(&self, course_name: &str, title: &str) -> String {
        format!(
            "{}\n**New Announcement in {course_name}**\n\n**{title}**\n\n",
            self.mention
        )
    }

    pub fn footer(url: Option<&str>) -> String {
        match url.filter(|u| !u.is_empty()) {
            Some(u) => format!("\n\n[View Announcement]({u})"),
            None => String::new(),
        }
    }

    pub fn format(
        &self,
        course_name: &str,
        title: &str,
        raw_message: &str,
        url: Option<&str>,
    ) -> String {
        let header = self.header(course_name, title);
        let body = html_to_text(raw_message);
        let footer = Self::footer(url);

        let full_len = char_len(&header) + char_len(&body) + char_len(&footer);
        if full_len <= self.max_len {
            return format!("{header}{body}{footer}");
        }

        let reserved = char_len(&header) + char_len(&footer) + char_len(TRUNCATION_SUFFIX);
        let available = self.max_len.saturating_sub(reserved);

        let mut cut: String = body.chars().take(available).collect();
        cut.truncate(cut.trim_end().len());
        cut.push_str(TRUNCATION_SUFFIX);

        let message = format!("{header}{cut}{footer}");
        if char_len(&message) <= self.max_len {
            return message;
        }

        // Header + footer + suffix alone overflow the bound (huge title or url).
        tracing::warn!(
            max_len = self.max_len,
            reserved,
            title,
            "announcement frame exceeds message bound; hard cut"
        );
        message.chars().take(self.max_len).collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
