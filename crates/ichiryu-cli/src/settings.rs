use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ichiryu_rules::DEFAULT_CODE_PREFIX;
use serde::Deserialize;

const DEFAULT_PORT: u16 = 6667;
const DEFAULT_REALNAME: &str = "ichiryu";
const DEFAULT_LOG_LINK_BASE: &str = "http://www.dustinho.com/wonted-logs/";
const DEFAULT_CATALOG_PATH: &str = "mtg_cards.json";
const DEFAULT_CACHE_PATH: &str = "mtg.cache";
const DEFAULT_ART_PATH: &str = "ascii_art.json";
const DEFAULT_EXTERNAL_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BotSettings {
    pub(crate) server: String,
    #[serde(default = "default_port")]
    pub(crate) port: u16,
    pub(crate) channel: String,
    pub(crate) nickname: String,
    #[serde(default)]
    pub(crate) nicknames: Vec<String>,
    #[serde(default = "default_realname")]
    pub(crate) realname: String,
    pub(crate) logroot: PathBuf,
    #[serde(default = "default_log_link_base")]
    pub(crate) log_link_base: String,
    #[serde(default = "default_catalog_path")]
    pub(crate) catalog_path: PathBuf,
    #[serde(default = "default_cache_path")]
    pub(crate) cache_path: PathBuf,
    #[serde(default = "default_art_path")]
    pub(crate) art_path: PathBuf,
    #[serde(default)]
    pub(crate) reconnect_delay_ms: u64,
    #[serde(default)]
    pub(crate) publish: Option<PublishSettings>,
    #[serde(default)]
    pub(crate) sandbox: Option<SandboxSettings>,
    #[serde(default = "default_code_prefix")]
    pub(crate) code_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PublishSettings {
    pub(crate) endpoint: String,
    #[serde(default)]
    pub(crate) token: Option<String>,
    pub(crate) profile_link: String,
    #[serde(default = "default_external_timeout_ms")]
    pub(crate) timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SandboxSettings {
    pub(crate) script: PathBuf,
    #[serde(default = "default_external_timeout_ms")]
    pub(crate) timeout_ms: u64,
    #[serde(default = "default_cpu_limit_marker")]
    pub(crate) cpu_limit_marker: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_realname() -> String {
    DEFAULT_REALNAME.to_string()
}

fn default_log_link_base() -> String {
    DEFAULT_LOG_LINK_BASE.to_string()
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from(DEFAULT_CATALOG_PATH)
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}

fn default_art_path() -> PathBuf {
    PathBuf::from(DEFAULT_ART_PATH)
}

fn default_external_timeout_ms() -> u64 {
    DEFAULT_EXTERNAL_TIMEOUT_MS
}

fn default_cpu_limit_marker() -> String {
    ichiryu_external::DEFAULT_CPU_LIMIT_MARKER.to_string()
}

fn default_code_prefix() -> String {
    DEFAULT_CODE_PREFIX.to_string()
}

impl BotSettings {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid settings file {}", path.display()))
    }

    pub(crate) fn parse(raw: &str) -> Result<Self> {
        let settings =
            serde_json::from_str::<Self>(raw).context("failed to parse settings JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            bail!("server must not be empty");
        }
        if !self.channel.starts_with('#') || self.channel.len() < 2 {
            bail!("channel '{}' must start with '#'", self.channel);
        }
        if self.nickname.trim().is_empty() || self.nickname.contains(char::is_whitespace) {
            bail!("nickname '{}' must be a single non-empty word", self.nickname);
        }
        if self.code_prefix.is_empty() {
            bail!("code_prefix must not be empty");
        }
        if let Some(publish) = &self.publish {
            if publish.endpoint.trim().is_empty() {
                bail!("publish.endpoint must not be empty");
            }
        }
        Ok(())
    }

    /// Names the bot answers to: the nickname first, then the configured
    /// extra aliases without duplicates.
    pub(crate) fn aliases(&self) -> Vec<String> {
        let mut aliases = vec![self.nickname.clone()];
        for alias in &self.nicknames {
            if !alias.is_empty() && !aliases.contains(alias) {
                aliases.push(alias.clone());
            }
        }
        aliases
    }

    pub(crate) fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
