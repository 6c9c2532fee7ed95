//! Process-lifetime record of announcements already relayed.

use std::collections::HashSet;

use crate::feed::AnnouncementId;

/// Append-only set of announcement ids. Nothing is ever evicted; the set
/// lives as long as the process and is rebuilt from a fresh baseline on
/// every start.
#[derive(Debug, Default, Clone)]
pub struct SeenTracker {
    ids: HashSet<AnnouncementId>,
    seeded: bool,
}

impl SeenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the startup baseline. Expected once, before the first live cycle.
    pub fn seed<I: IntoIterator<Item = AnnouncementId>>(&mut self, ids: I) {
        if self.seeded {
            tracing::warn!("seen set seeded more than once; merging");
        }
        self.ids.extend(ids);
        self.seeded = true;
    }

    pub fn has(&self, id: AnnouncementId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns `true` when `id` was not tracked before.
    pub fn mark_seen(&mut self, id: AnnouncementId) -> bool {
        self.ids.insert(id)
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
