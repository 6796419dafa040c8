//! State module describing what a harvest run traverses
//!
//! # Components
//!
//! - `CrawlMode`: which graph is being harvested (fixed at startup)
//! - `EdgeKind`: one paginated relation expanded per identifier

mod mode;

// Re-export main types
pub use mode::{CrawlMode, EdgeKind, TableSet};
