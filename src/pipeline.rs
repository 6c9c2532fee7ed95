//! # Announcement pipeline
//! One cycle: fetch every registered course, skip what was already seen,
//! format the rest and fan each one out to the course's channels.
//!
//! Courses are walked in registry order and channels in registration order.
//! A failed fetch abandons the remainder of the cycle; the scheduler logs it
//! and tries again on the next tick. A failed send only affects that channel.

use std::collections::HashMap;

use anyhow::{Context, Result};
use metrics::{counter, gauge};
use tracing::{info, warn};

use crate::dedup::SeenTracker;
use crate::feed::{Announcement, CourseId, FeedSource};
use crate::format::Formatter;
use crate::notify::{ChannelId, Target, Transport};
use crate::registry::ChannelRegistry;

/// Counts for one pipeline cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub new: usize,
    pub delivered: usize,
    pub failed: usize,
    pub unresolved: usize,
}

enum Delivery {
    Sent(Target),
    Unresolved,
    Failed(anyhow::Error),
}

/// Everything a cycle needs, owned in one place: collaborators, the static
/// fan-out table, display names, the formatter and the seen set.
pub struct RelayEngine<F, T> {
    feeds: F,
    transport: T,
    registry: ChannelRegistry,
    course_names: HashMap<CourseId, String>,
    formatter: Formatter,
    seen: SeenTracker,
}

impl<F: FeedSource, T: Transport> RelayEngine<F, T> {
    pub fn new(feeds: F, transport: T, registry: ChannelRegistry, formatter: Formatter) -> Self {
        crate::metrics::describe_metrics();
        Self {
            feeds,
            transport,
            registry,
            course_names: HashMap::new(),
            formatter,
            seen: SeenTracker::new(),
        }
    }

    pub fn with_course_names(mut self, names: HashMap<CourseId, String>) -> Self {
        self.course_names = names;
        self
    }

    pub fn course_name(&self, course: CourseId) -> String {
        self.course_names
            .get(&course)
            .cloned()
            .unwrap_or_else(|| format!("Course {course}"))
    }

    pub fn seen(&self) -> &SeenTracker {
        &self.seen
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn feeds(&self) -> &F {
        &self.feeds
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Record every currently active announcement as seen so a restart does
    /// not re-announce them. Courses whose fetch fails are skipped; their
    /// current items will be delivered on the first cycle.
    pub async fn seed_seen(&mut self) -> usize {
        info!("fetching existing announcements");

        let mut ids = Vec::new();
        for course in self.registry.courses() {
            match self.feeds.fetch_active(course).await {
                Ok(items) => ids.extend(items.iter().map(|a| a.id)),
                Err(e) => {
                    warn!(
                        course,
                        error = ?e,
                        "could not seed course; its active announcements will be relayed on the first cycle"
                    );
                    counter!("relay_feed_errors_total").increment(1);
                }
            }
        }

        self.seen.seed(ids);
        gauge!("relay_seen_items").set(self.seen.len() as f64);
        info!(entries = self.seen.len(), "initialized seen announcements");
        self.seen.len()
    }

    /// Run a single fetch → filter → format → deliver pass over all courses.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        info!("checking for new announcements");
        let mut report = CycleReport::default();

        let courses: Vec<CourseId> = self.registry.courses().collect();
        for course in courses {
            let items = match self.feeds.fetch_active(course).await {
                Ok(items) => items,
                Err(e) => {
                    counter!("relay_feed_errors_total").increment(1);
                    return Err(e).with_context(|| {
                        format!("fetching announcements from {} for course {course}", self.feeds.name())
                    });
                }
            };
            report.fetched += items.len();

            for ann in items {
                if self.seen.has(ann.id) {
                    continue;
                }
                report.new += 1;
                counter!("relay_announcements_new_total").increment(1);
                self.relay_announcement(course, &ann, &mut report).await;
            }
        }

        gauge!("relay_seen_items").set(self.seen.len() as f64);
        Ok(report)
    }

    async fn relay_announcement(
        &mut self,
        course: CourseId,
        ann: &Announcement,
        report: &mut CycleReport,
    ) {
        let channels = self.registry.targets(course);
        let mut sent = 0usize;
        let mut failed = 0usize;

        if !channels.is_empty() {
            let name = self.course_name(course);
            let text = self
                .formatter
                .format(&name, &ann.title, &ann.message, ann.url.as_deref());

            for &channel in channels {
                match self.deliver(channel, &text).await {
                    Delivery::Sent(target) => {
                        sent += 1;
                        counter!("relay_deliveries_total").increment(1);
                        info!(
                            title = %ann.title,
                            channel = %target.name,
                            channel_id = target.id,
                            "sent announcement"
                        );
                    }
                    Delivery::Unresolved => {
                        report.unresolved += 1;
                        counter!("relay_unresolved_targets_total").increment(1);
                        warn!(channel_id = channel, "channel not found");
                    }
                    Delivery::Failed(e) => {
                        failed += 1;
                        counter!("relay_delivery_errors_total").increment(1);
                        warn!(
                            channel_id = channel,
                            title = %ann.title,
                            error = ?e,
                            "delivery failed"
                        );
                    }
                }
            }
        }

        report.delivered += sent;
        report.failed += failed;

        // Nothing reached anyone: leave unseen so the next cycle retries.
        if failed > 0 && sent == 0 {
            warn!(
                announcement = ann.id,
                course,
                "every delivery failed; will retry next cycle"
            );
            return;
        }
        self.seen.mark_seen(ann.id);
    }

    async fn deliver(&self, channel: ChannelId, text: &str) -> Delivery {
        let target = match self.transport.resolve_target(channel).await {
            Ok(Some(t)) => t,
            Ok(None) => return Delivery::Unresolved,
            Err(e) => return Delivery::Failed(e),
        };
        match self.transport.send(&target, text).await {
            Ok(()) => Delivery::Sent(target),
            Err(e) => Delivery::Failed(e),
        }
    }
}
