//! Graph-Harvest: a resumable social graph and topic tree harvester
//!
//! This crate walks a site's cursor-paginated JSON API, collecting follower/followee
//! handles or topic-tree identifiers into a durable, deduplicated frontier. Every run
//! ends by appending a checkpoint, so the next run resumes exactly where this one stopped.

pub mod api;
pub mod config;
pub mod crawler;
pub mod notify;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Graph-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Unexpected response shape from {url}: {source}")]
    Schema {
        url: String,
        source: serde_json::Error,
    },

    #[error("Malformed response from {url} after {attempts} attempts: {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        source: serde_json::Error,
    },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing or unusable session credentials: {0}")]
    MissingCredentials(String),
}

/// Result type alias for Graph-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Harvester, Orchestrator};
pub use state::{CrawlMode, EdgeKind};
