//! Course → channel fan-out table.
//!
//! Configuration lists, per chat channel, the courses it follows. The relay
//! needs the inverse (course → channels), built once at startup and read-only
//! afterwards. Iteration follows first-encounter order so fan-out is stable.

use std::collections::HashMap;

use crate::feed::CourseId;
use crate::notify::ChannelId;

#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    order: Vec<CourseId>,
    targets: HashMap<CourseId, Vec<ChannelId>>,
}

impl ChannelRegistry {
    /// Invert a channel → courses mapping.
    ///
    /// Duplicate (channel, course) pairs are kept as-is and produce duplicate
    /// deliveries; configuration is expected to be clean.
    pub fn build<I, C>(channel_courses: I) -> Self
    where
        I: IntoIterator<Item = (ChannelId, C)>,
        C: IntoIterator<Item = CourseId>,
    {
        let mut reg = Self::default();
        for (channel, courses) in channel_courses {
            for course in courses {
                reg.targets
                    .entry(course)
                    .or_insert_with(|| {
                        reg.order.push(course);
                        Vec::new()
                    })
                    .push(channel);
                tracing::info!(channel, course, "registered channel for course");
            }
        }
        reg
    }

    /// Courses in build order.
    pub fn courses(&self) -> impl Iterator<Item = CourseId> + '_ {
        self.order.iter().copied()
    }

    /// Channels for `course`, in registration order. Unknown courses have none.
    pub fn targets(&self, course: CourseId) -> &[ChannelId] {
        self.targets.get(&course).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
