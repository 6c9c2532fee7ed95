use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::{HeaderMap, LINK};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::feed::types::{Announcement, CourseId, FeedSource};

const PER_PAGE: u32 = 50;
// Guard against a server that keeps handing out `rel="next"`.
const MAX_PAGES: usize = 100;

#[derive(Debug, Deserialize)]
struct RawAnnouncement {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
}

impl RawAnnouncement {
    fn into_announcement(self, course_id: CourseId) -> Announcement {
        Announcement {
            id: self.id,
            course_id,
            title: self.title.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
            url: non_blank(self.url).or_else(|| non_blank(self.html_url)),
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|u| !u.trim().is_empty())
}

/// Canvas LMS REST client for course announcements.
pub struct CanvasClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl CanvasClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn first_page(&self, course: CourseId) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/api/v1/announcements", self.base_url))
            .query(&[
                ("context_codes[]", format!("course_{course}")),
                ("active_only", "true".to_string()),
                ("per_page", PER_PAGE.to_string()),
            ])
    }
}

#[async_trait]
impl FeedSource for CanvasClient {
    async fn fetch_active(&self, course: CourseId) -> Result<Vec<Announcement>> {
        let t0 = Instant::now();
        let mut out = Vec::new();
        let mut next: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let req = match next.take() {
                None => self.first_page(course),
                Some(url) => self.client.get(url),
            };
            let resp = req
                .bearer_auth(&self.token)
                .timeout(self.timeout)
                .send()
                .await
                .with_context(|| format!("canvas announcements request (course {course})"))?
                .error_for_status()
                .with_context(|| format!("canvas announcements status (course {course})"))?;

            next = next_link(resp.headers());
            let items: Vec<RawAnnouncement> = resp
                .json()
                .await
                .with_context(|| format!("parsing canvas announcements (course {course})"))?;
            out.extend(items.into_iter().map(|r| r.into_announcement(course)));

            if next.is_none() {
                break;
            }
            if page == MAX_PAGES {
                tracing::warn!(course, pages = MAX_PAGES, "pagination limit hit, remaining pages ignored");
            }
        }

        histogram!("relay_feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(course, count = out.len(), "fetched active announcements");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "Canvas"
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(LINK)?.to_str().ok()?;
    raw.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p.eq_ignore_ascii_case(r#"rel="next""#) || p.eq_ignore_ascii_case("rel=next")
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')?
            .strip_suffix('>')
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn link(v: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(LINK, HeaderValue::from_str(v).unwrap());
        h
    }

    #[test]
    fn picks_next_among_several_relations() {
        let h = link(
            r#"<https://c.test/api/v1/announcements?page=1>; rel="current", <https://c.test/api/v1/announcements?page=2>; rel="next", <https://c.test/api/v1/announcements?page=1>; rel="first""#,
        );
        assert_eq!(
            next_link(&h).as_deref(),
            Some("https://c.test/api/v1/announcements?page=2")
        );
    }

    #[test]
    fn no_next_on_last_page() {
        let h = link(r#"<https://c.test/x?page=3>; rel="current", <https://c.test/x?page=1>; rel="first""#);
        assert!(next_link(&h).is_none());
        assert!(next_link(&HeaderMap::new()).is_none());
    }

    #[test]
    fn blank_url_falls_back_to_html_url() {
        let raw: RawAnnouncement = serde_json::from_str(
            r#"{"id":7,"title":"Midterm","message":"<p>x</p>","url":"","html_url":"https://c.test/7"}"#,
        )
        .unwrap();
        let a = raw.into_announcement(41013);
        assert_eq!(a.id, 7);
        assert_eq!(a.course_id, 41013);
        assert_eq!(a.url.as_deref(), Some("https://c.test/7"));

        let raw: RawAnnouncement = serde_json::from_str(r#"{"id":9,"url":"  "}"#).unwrap();
        assert_eq!(raw.into_announcement(1).url, None);

        let raw: RawAnnouncement =
            serde_json::from_str(r#"{"id":8,"html_url":"https://c.test/8"}"#).unwrap();
        let a = raw.into_announcement(1);
        assert_eq!(a.url.as_deref(), Some("https://c.test/8"));
        assert_eq!(a.title, "");
    }
}
