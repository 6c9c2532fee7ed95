// tests/common/mod.rs
// In-process stand-ins for the Canvas feed and the Discord transport.
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use canvas_relay::feed::{Announcement, CourseId, FeedSource};
use canvas_relay::format::Formatter;
use canvas_relay::notify::{ChannelId, Target, Transport};
use canvas_relay::registry::ChannelRegistry;
use canvas_relay::RelayEngine;

pub fn ann(id: u64, course: CourseId, title: &str, body: &str, url: Option<&str>) -> Announcement {
    Announcement {
        id,
        course_id: course,
        title: title.to_string(),
        message: body.to_string(),
        url: url.map(str::to_string),
    }
}

#[derive(Default)]
struct FeedState {
    items: HashMap<CourseId, Vec<Announcement>>,
    failing: HashSet<CourseId>,
    failing_calls: HashSet<usize>,
    calls: usize,
}

#[derive(Clone, Default)]
pub struct MockFeed {
    inner: Arc<Mutex<FeedState>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, a: Announcement) {
        self.inner.lock().items.entry(a.course_id).or_default().push(a);
    }

    pub fn fail_course(&self, course: CourseId, failing: bool) {
        let mut s = self.inner.lock();
        if failing {
            s.failing.insert(course);
        } else {
            s.failing.remove(&course);
        }
    }

    /// Make the n-th fetch (0-based, across all courses) fail.
    pub fn fail_call(&self, n: usize) {
        self.inner.lock().failing_calls.insert(n);
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().calls
    }
}

#[async_trait]
impl FeedSource for MockFeed {
    async fn fetch_active(&self, course: CourseId) -> Result<Vec<Announcement>> {
        let mut s = self.inner.lock();
        let n = s.calls;
        s.calls += 1;
        if s.failing.contains(&course) || s.failing_calls.contains(&n) {
            bail!("feed unavailable (course {course}, call {n})");
        }
        Ok(s.items.get(&course).cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Default)]
struct TransportState {
    channels: HashMap<ChannelId, String>,
    failing: HashSet<ChannelId>,
    sent: Vec<(ChannelId, String)>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub fn with_channels(ids: &[ChannelId]) -> Self {
        let t = Self::default();
        {
            let mut s = t.inner.lock();
            for id in ids {
                s.channels.insert(*id, format!("chan-{id}"));
            }
        }
        t
    }

    pub fn fail_channel(&self, id: ChannelId, failing: bool) {
        let mut s = self.inner.lock();
        if failing {
            s.failing.insert(id);
        } else {
            s.failing.remove(&id);
        }
    }

    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.inner.lock().sent.clone()
    }

    pub fn sent_to(&self, id: ChannelId) -> Vec<String> {
        self.inner
            .lock()
            .sent
            .iter()
            .filter(|(c, _)| *c == id)
            .map(|(_, t)| t.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn resolve_target(&self, id: ChannelId) -> Result<Option<Target>> {
        Ok(self
            .inner
            .lock()
            .channels
            .get(&id)
            .map(|name| Target { id, name: name.clone() }))
    }

    async fn send(&self, target: &Target, text: &str) -> Result<()> {
        let mut s = self.inner.lock();
        if s.failing.contains(&target.id) {
            bail!("send to {} rejected", target.id);
        }
        s.sent.push((target.id, text.to_string()));
        Ok(())
    }
}

pub fn engine(
    feed: &MockFeed,
    transport: &MockTransport,
    channel_courses: Vec<(ChannelId, Vec<CourseId>)>,
) -> RelayEngine<MockFeed, MockTransport> {
    RelayEngine::new(
        feed.clone(),
        transport.clone(),
        ChannelRegistry::build(channel_courses),
        Formatter::new("<@&ROLE>", 1900),
    )
}

/// Serve `router` on an ephemeral local port; returns `http://127.0.0.1:<port>`.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}
