//! HTTP access to the site
//!
//! The crawler only ever needs "GET this URL and give me the body", so the
//! transport is hidden behind [`PageSource`]. [`ApiClient`] is the reqwest-backed
//! implementation carrying the session cookie and a browser User-Agent.

use crate::config::Config;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::Client;
use std::time::Duration;

/// Desktop Chrome User-Agent sent when the config does not override it
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_2) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/79.0.3945.88 Safari/537.36";

/// Source of raw page bodies
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches `url` and returns the response body
    ///
    /// Transport failures (and non-2xx statuses, if configured) are errors.
    /// Whether the body is usable is the caller's business.
    async fn get(&self, url: &str) -> Result<String, HarvestError>;
}

/// Builds an HTTP client that presents the configured session
///
/// # Arguments
///
/// * `cookie` - Normalized `Cookie` header value
/// * `user_agent` - User-Agent header value
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(HarvestError)` - The cookie is not a valid header value or the client failed to build
pub fn build_http_client(cookie: &str, user_agent: &str) -> Result<Client, HarvestError> {
    let mut cookie_value = HeaderValue::from_str(cookie).map_err(|e| {
        crate::ConfigError::MissingCredentials(format!("cookie is not a valid header: {}", e))
    })?;
    cookie_value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, cookie_value);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );

    let client = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// reqwest-backed [`PageSource`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    strict_status: bool,
}

impl ApiClient {
    /// Wraps an already configured client
    pub fn new(client: Client, strict_status: bool) -> Self {
        Self {
            client,
            strict_status,
        }
    }

    /// Builds a client from the session and harvest sections of the config
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let cookie = config.session.cookie_header()?;
        let client = build_http_client(&cookie, config.session.user_agent())?;
        Ok(Self::new(client, config.harvest.strict_status))
    }
}

#[async_trait]
impl PageSource for ApiClient {
    async fn get(&self, url: &str) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if self.strict_status && !status.is_success() {
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport_error(url, e))
    }
}

fn transport_error(url: &str, error: reqwest::Error) -> HarvestError {
    if error.is_timeout() {
        HarvestError::Timeout {
            url: url.to_string(),
        }
    } else {
        HarvestError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
