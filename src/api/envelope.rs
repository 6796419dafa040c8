//! Page envelope returned by the paginated API
//!
//! Every listing endpoint wraps its items as `{paging: {...}, data: [...]}`.
//! Only the fields the harvester needs are decoded; everything else in the
//! entity records is ignored.

use crate::storage::NewIdentifier;
use serde::{Deserialize, Deserializer};
use serde_json::error::Category;

/// Decodes an explicit `null` as the field type's default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Cursor block of a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Paging {
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_end: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_start: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub next: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub previous: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub totals: u64,
}

/// One decoded page
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(deserialize_with = "null_as_default")]
    pub paging: Paging,

    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<T>,
}

/// User profile summary from a followee/follower listing
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub url_token: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub follower_count: u64,
}

/// Topic summary from a topic children listing
#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// An entity that names a frontier identifier
pub trait Discovered {
    /// The identifier to enqueue, or `None` if the entity carries no usable token
    fn to_identifier(&self) -> Option<NewIdentifier>;
}

impl Discovered for Member {
    fn to_identifier(&self) -> Option<NewIdentifier> {
        // Anonymous and deactivated accounts come back without a token
        if self.url_token.is_empty() {
            return None;
        }
        Some(named(&self.url_token, &self.name))
    }
}

impl Discovered for Topic {
    fn to_identifier(&self) -> Option<NewIdentifier> {
        if self.id.is_empty() {
            return None;
        }
        Some(named(&self.id, &self.name))
    }
}

fn named(token: &str, name: &str) -> NewIdentifier {
    if name.is_empty() {
        NewIdentifier::new(token)
    } else {
        NewIdentifier::with_name(token, name)
    }
}

/// A page reduced to what the orchestrator consumes
#[derive(Debug, Clone)]
pub struct DiscoveredPage {
    pub paging: Paging,

    /// Number of items in the page, including ones without a usable token
    pub item_count: usize,

    pub identifiers: Vec<NewIdentifier>,
}

impl DiscoveredPage {
    /// An empty page ends an edge expansion
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

impl<T: Discovered> From<Envelope<T>> for DiscoveredPage {
    fn from(envelope: Envelope<T>) -> Self {
        Self {
            item_count: envelope.data.len(),
            identifiers: envelope
                .data
                .iter()
                .filter_map(|item| item.to_identifier())
                .collect(),
            paging: envelope.paging,
        }
    }
}

/// Returns true if a decode failure looks like malformed content
///
/// An HTML login page or a truncated body fails as a syntax or EOF error and is
/// worth retrying. Well-formed JSON of the wrong shape is not.
pub fn is_malformed(error: &serde_json::Error) -> bool {
    matches!(error.classify(), Category::Syntax | Category::Eof)
}
