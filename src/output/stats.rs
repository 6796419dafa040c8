//! Statistics from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! frontier and resume statistics from the storage layer.

use crate::state::CrawlMode;
use crate::storage::{CheckpointRecord, CheckpointStore, FrontierStore, TopicStatsStore};
use crate::Result;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    pub mode: CrawlMode,

    /// Total number of identifiers in the frontier
    pub total_identifiers: u64,

    /// Most recently written checkpoint, if any run has halted
    pub latest_checkpoint: Option<CheckpointRecord>,

    /// Offset the next run starts at
    pub resume_offset: u64,

    /// Identifier the next run starts at
    pub resume_token: Option<String>,

    /// Topics with recorded page statistics (topic tree mode only)
    pub topic_stats_recorded: Option<u64>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `mode` - The crawl mode the stores belong to
/// * `frontier` - The identifier frontier
/// * `checkpoints` - The checkpoint log of the same mode
/// * `topic_stats` - Topic statistics store
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(
    mode: CrawlMode,
    frontier: &dyn FrontierStore,
    checkpoints: &dyn CheckpointStore,
    topic_stats: &dyn TopicStatsStore,
) -> Result<HarvestStatistics> {
    let total_identifiers = frontier.count()?;

    let latest_checkpoint = match checkpoints.latest() {
        Ok(record) => Some(record),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };

    let resume_offset = match &latest_checkpoint {
        Some(record) => frontier.offset_of(record.checkpoint.reference_row_id)?,
        None => 0,
    };

    let resume_token = match frontier.get_at(resume_offset) {
        Ok(record) => Some(record.token),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e.into()),
    };

    let topic_stats_recorded = match mode {
        CrawlMode::HarvestTopicTree => Some(topic_stats.count_topic_stats()?),
        CrawlMode::HarvestSocialGraph => None,
    };

    Ok(HarvestStatistics {
        mode,
        total_identifiers,
        latest_checkpoint,
        resume_offset,
        resume_token,
        topic_stats_recorded,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ({}) ===\n", stats.mode);

    println!("Frontier:");
    println!("  Total identifiers: {}", stats.total_identifiers);
    println!();

    println!("Resume position:");
    match &stats.latest_checkpoint {
        Some(record) => {
            println!("  Latest checkpoint: #{} written at {}", record.row_id, record.created_at);
            if record.checkpoint.is_restart_from_root() {
                println!("  Next run restarts from the root");
            }
            for cursor in &record.checkpoint.cursors {
                println!("  Cursor: {}", cursor);
            }
        }
        None => println!("  No checkpoint yet, the next run starts from the root"),
    }
    println!(
        "  Offset: {} ({})",
        stats.resume_offset,
        stats.resume_token.as_deref().unwrap_or("frontier empty")
    );

    if let Some(recorded) = stats.topic_stats_recorded {
        println!();
        println!("Topic statistics:");
        println!("  Topics with recorded counters: {}", recorded);
    }
}
