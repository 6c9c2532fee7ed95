// src/feed/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

pub type CourseId = u64;
pub type AnnouncementId = u64;

/// One announcement as fetched from a course feed. Owned by the pipeline for
/// the duration of a single cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub course_id: CourseId,
    pub title: String,
    pub message: String, // raw HTML
    pub url: Option<String>,
}

/// Source of currently active announcements for a course.
///
/// Implementations must return `Err` on transport or parse failures instead of
/// an empty list, otherwise a broken feed looks like a quiet one.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_active(&self, course: CourseId) -> Result<Vec<Announcement>>;
    fn name(&self) -> &'static str;
}
