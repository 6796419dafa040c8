//! URL templates for the site's API and topic pages
//!
//! Every edge kind has a fixed seed URL parameterized by the identifier token.
//! Tokens are written as path segments, so they are percent-encoded as needed.

use crate::state::EdgeKind;
use crate::{ConfigError, HarvestError};
use url::Url;

/// Fields requested for every member in a followee/follower page
pub const MEMBER_INCLUDE: &str = "data[*].answer_count,articles_count,gender,follower_count,is_followed,is_following,badge[?(type=best_answerer)].topics";

/// Page size of member listings
pub const MEMBER_PAGE_LIMIT: u32 = 20;

/// Page size of topic children listings
pub const TOPIC_PAGE_LIMIT: u32 = 10;

/// Builds seed URLs against one API origin
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Creates endpoints rooted at `base_url`
    ///
    /// # Returns
    ///
    /// * `Ok(Endpoints)` - The base URL is an http(s) URL that can carry a path
    /// * `Err(HarvestError)` - The base URL is unusable
    pub fn new(base_url: &str) -> Result<Self, HarvestError> {
        let base = Url::parse(base_url)?;

        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "API base URL '{}' must be an http(s) URL",
                base_url
            ))
            .into());
        }

        Ok(Self { base })
    }

    /// First page of `kind` for the identifier `token`
    pub fn seed_url(&self, kind: EdgeKind, token: &str) -> String {
        match kind {
            EdgeKind::Followees => self.member_listing(token, "followees"),
            EdgeKind::Followers => self.member_listing(token, "followers"),
            EdgeKind::TopicChildren => {
                let mut url = self.path(&["api", "v3", "topics", token, "children"]);
                url.query_pairs_mut()
                    .append_pair("limit", &TOPIC_PAGE_LIMIT.to_string())
                    .append_pair("offset", "0");
                url.into()
            }
        }
    }

    /// Seed URLs for every edge kind, in the given order
    pub fn seed_urls(&self, kinds: &[EdgeKind], token: &str) -> Vec<String> {
        kinds.iter().map(|kind| self.seed_url(*kind, token)).collect()
    }

    /// Public HTML page of a topic, carrying its follower and question counters
    pub fn topic_page(&self, topic_id: &str) -> String {
        self.path(&["topic", topic_id, "hot"]).into()
    }

    fn member_listing(&self, token: &str, relation: &str) -> String {
        let mut url = self.path(&["api", "v4", "members", token, relation]);
        url.query_pairs_mut()
            .append_pair("include", MEMBER_INCLUDE)
            .append_pair("offset", "0")
            .append_pair("limit", &MEMBER_PAGE_LIMIT.to_string());
        url.into()
    }

    fn path(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // `new` rejects cannot-be-a-base URLs, so this always succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().extend(segments);
        }
        url
    }
}
