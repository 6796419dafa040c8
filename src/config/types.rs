use crate::api::BROWSER_USER_AGENT;
use crate::config::validation::normalize_cookie;
use crate::state::CrawlMode;
use crate::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Lowest pacing interval the harvester will run with
pub const PACING_FLOOR: Duration = Duration::from_secs(3);

/// Transient decode attempts per page when the config does not say
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

/// Longest accepted period between frontier-size reports (one year)
pub const MAX_REPORT_INTERVAL_HOURS: u64 = 24 * 365;

/// Main configuration structure for Graph-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    pub session: SessionConfig,
    pub api: ApiConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// Traversal behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Which graph to walk
    pub mode: CrawlMode,

    /// Token the traversal is seeded with: a user url token, or the root topic id
    pub root: String,

    /// Requested interval between fetches (milliseconds), before the floor is applied
    #[serde(rename = "pause-interval-ms", default = "default_pause_interval_ms")]
    pub pause_interval_ms: u64,

    /// Malformed-body attempts per page before giving up on it
    #[serde(rename = "retry-limit", default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Treat non-2xx responses as transport failures
    #[serde(rename = "strict-status", default = "default_strict_status")]
    pub strict_status: bool,
}

impl HarvestConfig {
    /// Pacing interval with the floor applied
    pub fn pause_interval(&self) -> Duration {
        Duration::from_millis(self.pause_interval_ms).max(PACING_FLOOR)
    }
}

/// Session credentials presented to the site
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Raw cookie string as copied from a browser
    pub cookie: String,

    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

impl SessionConfig {
    /// The cookie normalized into a `Cookie` header value
    pub fn cookie_header(&self) -> Result<String, ConfigError> {
        normalize_cookie(&self.cookie)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(BROWSER_USER_AGENT)
    }
}

// Keep the cookie out of logs and panic messages
impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("cookie", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Origin every endpoint is built against
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Operator notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Endpoint receiving JSON notifications; log-only when absent
    #[serde(rename = "webhook-url", default)]
    pub webhook_url: Option<String>,

    #[serde(rename = "report-interval-hours", default = "default_report_interval_hours")]
    pub report_interval_hours: u64,
}

impl NotifierConfig {
    /// Period between reports, capped at [`MAX_REPORT_INTERVAL_HOURS`]
    pub fn report_interval(&self) -> Duration {
        let hours = self
            .report_interval_hours
            .clamp(1, MAX_REPORT_INTERVAL_HOURS);
        Duration::from_secs(hours * 60 * 60)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            report_interval_hours: default_report_interval_hours(),
        }
    }
}

fn default_pause_interval_ms() -> u64 {
    3000
}

fn default_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

fn default_strict_status() -> bool {
    true
}

fn default_report_interval_hours() -> u64 {
    24
}
