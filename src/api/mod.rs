//! Site API access
//!
//! This module covers everything that talks to or describes the remote site:
//! - URL templates for each edge kind and the topic pages
//! - The paging envelope and the entity records inside it
//! - The HTTP client carrying the session credentials

mod client;
mod endpoints;
mod envelope;

pub use client::{build_http_client, ApiClient, PageSource, BROWSER_USER_AGENT};
pub use endpoints::{Endpoints, MEMBER_INCLUDE, MEMBER_PAGE_LIMIT, TOPIC_PAGE_LIMIT};
pub use envelope::{is_malformed, Discovered, DiscoveredPage, Envelope, Member, Paging, Topic};
