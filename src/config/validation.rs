use crate::config::types::{
    ApiConfig, Config, HarvestConfig, NotifierConfig, OutputConfig, SessionConfig,
    MAX_REPORT_INTERVAL_HOURS,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_session_config(&config.session)?;
    validate_api_config(&config.api)?;
    validate_output_config(&config.output)?;
    validate_notifier_config(&config.notifier)?;
    Ok(())
}

/// Validates traversal configuration
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.root.trim().is_empty() {
        return Err(ConfigError::Validation("root cannot be empty".to_string()));
    }

    if config.retry_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_limit must be >= 1, got {}",
            config.retry_limit
        )));
    }

    // Below-floor pause intervals are clamped, not rejected
    Ok(())
}

/// Validates session credentials
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    normalize_cookie(&config.cookie)?;

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the API origin
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", config.base_url, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must be an http(s) URL",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates notifier configuration
fn validate_notifier_config(config: &NotifierConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_REPORT_INTERVAL_HOURS).contains(&config.report_interval_hours) {
        return Err(ConfigError::Validation(format!(
            "report_interval_hours must be between 1 and {}, got {}",
            MAX_REPORT_INTERVAL_HOURS, config.report_interval_hours
        )));
    }

    if let Some(webhook) = &config.webhook_url {
        Url::parse(webhook).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid webhook_url '{}': {}", webhook, e))
        })?;
    }

    Ok(())
}

/// Normalizes a browser cookie string into a `Cookie` header value
///
/// Quotes and spaces are stripped, the string is split on `;`, and every
/// `name=value` part is kept. Parts without a name or without `=` are skipped
/// with a warning.
///
/// # Returns
///
/// * `Ok(String)` - The kept pairs joined with `"; "`
/// * `Err(ConfigError::MissingCredentials)` - No usable pair was found
pub fn normalize_cookie(raw: &str) -> Result<String, ConfigError> {
    let cleaned: String = raw.chars().filter(|c| *c != '"' && *c != ' ').collect();

    let mut pairs = Vec::new();
    for part in cleaned.split(';').filter(|part| !part.is_empty()) {
        match part.split_once('=') {
            Some((name, _)) if !name.is_empty() => pairs.push(part),
            _ => tracing::warn!("Skipping malformed cookie part '{}'", part),
        }
    }

    if pairs.is_empty() {
        return Err(ConfigError::MissingCredentials(
            "cookie contains no name=value pairs".to_string(),
        ));
    }

    Ok(pairs.join("; "))
}
