//! Topic page statistics pass
//!
//! Walks the topic frontier one topic page per pacer tick and records the
//! follower and question counters of every topic. The pass keeps its own
//! checkpoint log, so it resumes independently of the topic tree traversal.

use crate::api::{Endpoints, PageSource};
use crate::crawler::lifecycle::Lifecycle;
use crate::crawler::orchestrator::HaltReason;
use crate::crawler::pacer::Pacer;
use crate::crawler::parser::parse_topic_counters;
use crate::storage::{FrontierStore, IdentifierRecord, TopicStats, TopicStatsStore, RESTART_FROM_ROOT};
use crate::{HarvestError, Result};
use std::sync::Arc;
use std::time::Duration;

/// What one statistics pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSummary {
    /// Topic pages fetched
    pub visited: u64,

    /// Topics whose counters were recorded by this pass
    pub recorded: u64,

    /// Whether the pass was stopped or reached the end of the topic frontier
    pub halt: HaltReason,
}

/// Scrapes topic page counters for every topic in the frontier
pub struct TopicStatsScraper {
    topics: Arc<dyn FrontierStore>,
    stats: Arc<dyn TopicStatsStore>,
    source: Arc<dyn PageSource>,
    endpoints: Endpoints,
    pacer: Pacer,
}

impl TopicStatsScraper {
    /// Creates a scraper over the topic frontier `topics`
    pub fn new(
        topics: Arc<dyn FrontierStore>,
        stats: Arc<dyn TopicStatsStore>,
        source: Arc<dyn PageSource>,
        endpoints: Endpoints,
        pacing: Duration,
    ) -> Self {
        Self {
            topics,
            stats,
            source,
            endpoints,
            pacer: Pacer::new(pacing),
        }
    }

    /// Runs the pass until it is stopped or every topic has been visited
    pub async fn run(mut self, lifecycle: Lifecycle) -> Result<StatsSummary> {
        let mut offset = self.start_offset()?;
        tracing::info!(offset, "Starting topic statistics pass at offset {}", offset);

        let mut visited = 0;
        let mut recorded = 0;

        let halt = loop {
            tokio::select! {
                biased;
                _ = lifecycle.stopped() => break HaltReason::Stopped,
                _ = self.pacer.wait() => {}
            }

            let topic = match self.topics.get_at(offset) {
                Ok(topic) => topic,
                Err(e) if e.is_not_found() => break HaltReason::Exhausted,
                Err(e) => {
                    tracing::error!(offset, "Failed to read topic frontier: {}", e);
                    continue;
                }
            };

            visited += 1;
            match self.scrape(&topic).await {
                Ok(true) => recorded += 1,
                Ok(false) => tracing::debug!(topic = %topic.token, "Topic stats already recorded"),
                Err(e) => tracing::error!(topic = %topic.token, "Failed to scrape topic stats: {}", e),
            }
            offset += 1;
        };

        self.persist_checkpoint(offset);

        let summary = StatsSummary {
            visited,
            recorded,
            halt,
        };
        tracing::info!(
            "Topic statistics pass halted ({:?}): {} topics visited, {} recorded",
            summary.halt,
            summary.visited,
            summary.recorded
        );
        Ok(summary)
    }

    fn start_offset(&self) -> Result<u64> {
        match self.stats.latest_stats_checkpoint() {
            Ok(row_id) => Ok(self.topics.offset_of(row_id)?),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches one topic page and records its counters
    ///
    /// Returns `true` if a new stats row was written.
    async fn scrape(&self, topic: &IdentifierRecord) -> Result<bool> {
        let url = self.endpoints.topic_page(&topic.token);
        let html = self.source.get(&url).await?;

        let counters = parse_topic_counters(&html)
            .map_err(|message| HarvestError::HtmlParse { url, message })?;

        let written = self.stats.insert_topic_stats(&TopicStats {
            topic_row_id: topic.row_id,
            follower_count: counters.followers,
            question_count: counters.questions,
        })?;
        Ok(written)
    }

    fn persist_checkpoint(&self, offset: u64) {
        let row_id = match self.topics.get_at(offset) {
            Ok(topic) => topic.row_id,
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!(offset, "Failed to read topic for checkpoint: {}", e);
                }
                RESTART_FROM_ROOT
            }
        };

        if let Err(e) = self.stats.append_stats_checkpoint(row_id) {
            tracing::error!("Failed to write topic stats checkpoint: {}", e);
        }
    }
}
