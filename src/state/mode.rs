//! Crawl mode and edge kind definitions
//!
//! A `CrawlMode` fixes which frontier tables are used and which relations are
//! expanded for every identifier, in which order.
use serde::Deserialize;
use std::fmt;

/// The graph a harvest run traverses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum CrawlMode {
    /// Follower/followee edges between user handles
    #[serde(rename = "social-graph")]
    HarvestSocialGraph,

    /// Parent/child edges between topics
    #[serde(rename = "topic-tree")]
    HarvestTopicTree,
}

/// One paginated relation rooted at an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Users the identifier follows
    Followees,

    /// Users following the identifier
    Followers,

    /// Direct child topics of a topic
    TopicChildren,
}

/// Table names backing one crawl mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSet {
    pub identifiers: &'static str,
    pub checkpoints: &'static str,
}

const SOCIAL_EDGES: [EdgeKind; 2] = [EdgeKind::Followees, EdgeKind::Followers];
const TOPIC_EDGES: [EdgeKind; 1] = [EdgeKind::TopicChildren];

impl CrawlMode {
    /// Edge kinds expanded for each identifier, in traversal order
    ///
    /// The position of an edge kind in this slice is also the position of its
    /// resume cursor inside a checkpoint.
    pub fn edge_kinds(&self) -> &'static [EdgeKind] {
        match self {
            Self::HarvestSocialGraph => &SOCIAL_EDGES,
            Self::HarvestTopicTree => &TOPIC_EDGES,
        }
    }

    /// Tables holding this mode's frontier and checkpoints
    pub fn tables(&self) -> TableSet {
        match self {
            Self::HarvestSocialGraph => TableSet {
                identifiers: "user_tokens",
                checkpoints: "user_token_checkpoints",
            },
            Self::HarvestTopicTree => TableSet {
                identifiers: "topic_ids",
                checkpoints: "topic_id_checkpoints",
            },
        }
    }

    /// Converts the mode to its configuration string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HarvestSocialGraph => "social-graph",
            Self::HarvestTopicTree => "topic-tree",
        }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Followees => "followees",
            Self::Followers => "followers",
            Self::TopicChildren => "children",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
