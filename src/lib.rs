// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod dedup;
pub mod feed;
pub mod format;
pub mod html;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::config::RelayConfig;
pub use crate::dedup::SeenTracker;
pub use crate::feed::{Announcement, CanvasClient, FeedSource};
pub use crate::format::Formatter;
pub use crate::notify::{DiscordTransport, Target, Transport};
pub use crate::pipeline::{CycleReport, RelayEngine};
pub use crate::registry::ChannelRegistry;
pub use crate::scheduler::PollScheduler;
