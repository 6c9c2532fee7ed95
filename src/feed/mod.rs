// src/feed/mod.rs
pub mod canvas;
pub mod types;

pub use canvas::CanvasClient;
pub use types::{Announcement, AnnouncementId, CourseId, FeedSource};
