//! Configuration module for Graph-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use graph_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Pacing interval: {:?}", config.harvest.pause_interval());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, HarvestConfig, NotifierConfig, OutputConfig, SessionConfig,
    DEFAULT_RETRY_LIMIT, MAX_REPORT_INTERVAL_HOURS, PACING_FLOOR,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::normalize_cookie;
