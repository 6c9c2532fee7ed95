use super::{ChannelId, Target, Transport};
use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Bot identity returned by `GET /users/@me`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

#[derive(Clone)]
pub struct DiscordTransport {
    api_base: String,
    token: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordTransport {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        let base: String = base.into();
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Verify the token and report who we are. A successful call is the
    /// "ready" signal for the poll scheduler.
    pub async fn connect(&self) -> Result<BotUser> {
        self.client
            .get(format!("{}/users/@me", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .timeout(self.timeout)
            .send()
            .await
            .context("discord /users/@me request")?
            .error_for_status()
            .context("discord rejected bot token")?
            .json::<BotUser>()
            .await
            .context("parsing discord bot user")
    }
}

impl std::fmt::Debug for DiscordTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordTransport")
            .field("api_base", &self.api_base)
            .field("token_len", &self.token.len())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[async_trait::async_trait]
impl Transport for DiscordTransport {
    async fn resolve_target(&self, id: ChannelId) -> Result<Option<Target>> {
        let rsp = self
            .client
            .get(format!("{}/channels/{id}", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("discord channel lookup {id}"))?;

        if matches!(rsp.status(), StatusCode::NOT_FOUND | StatusCode::FORBIDDEN) {
            return Ok(None);
        }

        let channel: RawChannel = rsp
            .error_for_status()
            .with_context(|| format!("discord channel lookup {id}"))?
            .json()
            .await
            .with_context(|| format!("parsing discord channel {id}"))?;

        Ok(Some(Target {
            id,
            name: channel.name.unwrap_or_else(|| channel.id.clone()),
        }))
    }

    async fn send(&self, target: &Target, text: &str) -> Result<()> {
        let payload = CreateMessage::role_mentions(text);
        let url = format!("{}/channels/{}/messages", self.api_base, target.id);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, self.auth())
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    let status = rsp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if retryable && attempt < self.max_retries {
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    let body = rsp.text().await.unwrap_or_default();
                    return Err(anyhow!(
                        "Discord API HTTP {status} posting to channel {}: {body}",
                        target.id
                    ));
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(anyhow!(
                        "Discord request to channel {} failed: {e}",
                        target.id
                    ));
                }
            }
        }
    }
}

fn backoff(attempt: u8) -> Duration {
    Duration::from_millis(500u64 << (attempt.saturating_sub(1)).min(6))
}

#[derive(Deserialize)]
struct RawChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
struct AllowedMentions {
    parse: Vec<&'static str>,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
    allowed_mentions: AllowedMentions,
}

impl<'a> CreateMessage<'a> {
    // Only role pings are honoured; user/everyone mentions in course text stay inert.
    fn role_mentions(content: &'a str) -> Self {
        Self {
            content,
            allowed_mentions: AllowedMentions {
                parse: vec!["roles"],
            },
        }
    }
}
