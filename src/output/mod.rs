//! Output module for harvest summaries
//!
//! This module handles printing what a harvest database holds: frontier size,
//! where the next run resumes, and topic statistics progress.

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};
