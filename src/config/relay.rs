// src/config/relay.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::feed::CourseId;
use crate::format::DEFAULT_MAX_MESSAGE_LENGTH;
use crate::notify::ChannelId;
use crate::registry::ChannelRegistry;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const ENV_DISCORD_TOKEN: &str = "DISCORD_TOKEN";
pub const ENV_CANVAS_TOKEN: &str = "CANVAS_TOKEN";
pub const ENV_MAX_MESSAGE_LENGTH: &str = "RELAY_MAX_MESSAGE_LENGTH";
pub const ENV_METRICS_ADDR: &str = "RELAY_METRICS_ADDR";
pub const ENV_LOG_FILE: &str = "RELAY_LOG_FILE";

fn default_max_message_length() -> usize {
    DEFAULT_MAX_MESSAGE_LENGTH
}

/// A chat channel and the courses it follows.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChannelCfg {
    pub id: ChannelId,
    #[serde(default)]
    pub courses: Vec<CourseId>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CourseCfg {
    pub id: CourseId,
    pub name: String,
}

/// Startup configuration. Loaded once, immutable afterwards.
#[derive(Clone, Deserialize)]
pub struct RelayConfig {
    pub canvas_url: String,
    /// Prefixed to every announcement, e.g. `<@&1463495777665159304>`.
    pub mention: String,
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    #[serde(default)]
    pub channels: Vec<ChannelCfg>,
    #[serde(default)]
    pub courses: Vec<CourseCfg>,
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    // secrets: env only
    #[serde(skip)]
    pub discord_token: String,
    #[serde(skip)]
    pub canvas_token: String,
}

impl RelayConfig {
    /// Parse the TOML file body. Secrets are left empty.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: RelayConfig = toml::from_str(s).context("parsing relay config")?;
        Ok(cfg)
    }

    /// Load from an explicit path, then apply environment overrides and validate.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&content)
            .with_context(|| format!("in {}", path.display()))?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using `$RELAY_CONFIG_PATH`, falling back to `config/relay.toml`.
    pub fn load_default() -> Result<Self> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    /// Read secrets and optional overrides from the environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.discord_token = required_env(ENV_DISCORD_TOKEN)?;
        self.canvas_token = required_env(ENV_CANVAS_TOKEN)?;

        if let Some(raw) = optional_env(ENV_MAX_MESSAGE_LENGTH) {
            self.max_message_length = raw
                .parse()
                .with_context(|| format!("{ENV_MAX_MESSAGE_LENGTH}={raw} is not a length"))?;
        }
        if let Some(raw) = optional_env(ENV_METRICS_ADDR) {
            self.metrics_addr = Some(
                raw.parse()
                    .with_context(|| format!("{ENV_METRICS_ADDR}={raw} is not a socket address"))?,
            );
        }
        if let Some(raw) = optional_env(ENV_LOG_FILE) {
            self.log_file = Some(PathBuf::from(raw));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.canvas_url.trim().is_empty() {
            bail!("canvas_url must not be empty");
        }
        if self.max_message_length == 0 {
            bail!("max_message_length must be positive");
        }
        if self.channels.is_empty() {
            tracing::warn!("no channels configured; nothing will be relayed");
        }
        Ok(())
    }

    pub fn registry(&self) -> ChannelRegistry {
        ChannelRegistry::build(
            self.channels
                .iter()
                .map(|c| (c.id, c.courses.iter().copied())),
        )
    }

    pub fn course_names(&self) -> HashMap<CourseId, String> {
        self.courses
            .iter()
            .map(|c| (c.id, c.name.clone()))
            .collect()
    }

    /// Display name for a course, `Course <id>` when none is configured.
    pub fn course_name(&self, id: CourseId) -> String {
        self.courses
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("Course {id}"))
    }
}

// Safe diagnostics: token lengths only.
impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("canvas_url", &self.canvas_url)
            .field("mention", &self.mention)
            .field("max_message_length", &self.max_message_length)
            .field("channels", &self.channels)
            .field("courses", &self.courses)
            .field("metrics_addr", &self.metrics_addr)
            .field("log_file", &self.log_file)
            .field("discord_token_len", &self.discord_token.len())
            .field("canvas_token_len", &self.canvas_token.len())
            .finish()
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_env(name: &str) -> Result<String> {
    optional_env(name).ok_or_else(|| anyhow!("missing required env var {name}"))
}
