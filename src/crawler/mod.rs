//! Crawler module for the resumable traversal
//!
//! This module contains the core harvesting logic, including:
//! - Paginated fetching with bounded retry of malformed pages
//! - Fixed-period request pacing
//! - Cooperative stop and completion signalling
//! - Frontier traversal and checkpointing
//! - The topic page statistics pass
//! - The [`Harvester`] process boundary that runs all of it in the background

mod fetcher;
mod lifecycle;
mod orchestrator;
mod pacer;
mod parser;
mod topic_stats;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{FetchOutcome, PaginatedFetcher};
pub use lifecycle::{CompletionGuard, Lifecycle};
pub use orchestrator::{HaltReason, HarvestPlan, Orchestrator, RunSummary};
pub use pacer::Pacer;
pub use parser::{parse_topic_counters, TopicCounters};
pub use topic_stats::{StatsSummary, TopicStatsScraper};

use crate::notify::Reporter;
use crate::{HarvestError, Result};
use std::future::Future;
use tokio::task::JoinHandle;

/// A traversal running in the background, plus its reporter
///
/// The traversal task owns the completion guard. The reporter only watches
/// the stop signal, so it may outlive or predecease the traversal.
pub struct Harvester<T> {
    lifecycle: Lifecycle,
    traversal: JoinHandle<Result<T>>,
    reporter: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Harvester<T> {
    /// Spawns `job` and, if given, the periodic reporter
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(orchestrator: graph_harvest::Orchestrator) {
    /// use graph_harvest::Harvester;
    ///
    /// let harvester = Harvester::start(|lifecycle| orchestrator.run(lifecycle), None);
    /// harvester.await_completion().await;
    /// let summary = harvester.shutdown().await;
    /// # }
    /// ```
    pub fn start<F, Fut>(job: F, reporter: Option<Reporter>) -> Self
    where
        F: FnOnce(Lifecycle) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let lifecycle = Lifecycle::new();
        let guard = lifecycle.completion_guard();
        let run = job(lifecycle.clone());

        let traversal = tokio::spawn(async move {
            let _guard = guard;
            run.await
        });
        let reporter = reporter.map(|reporter| tokio::spawn(reporter.run(lifecycle.clone())));

        Self {
            lifecycle,
            traversal,
            reporter,
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Asks the traversal and the reporter to halt at their next safe point
    pub fn request_stop(&self) {
        self.lifecycle.request_stop();
    }

    /// Resolves once the traversal has finished and persisted its checkpoint
    pub async fn await_completion(&self) {
        self.lifecycle.await_completion().await;
    }

    /// Stops everything, waits for both tasks and returns the traversal's result
    pub async fn shutdown(self) -> Result<T> {
        self.lifecycle.request_stop();
        self.lifecycle.await_completion().await;

        let outcome = match self.traversal.await {
            Ok(outcome) => outcome,
            Err(e) => Err(HarvestError::Task(e.to_string())),
        };

        if let Some(reporter) = self.reporter {
            if let Err(e) = reporter.await {
                tracing::warn!("Reporter task failed: {}", e);
            }
        }

        outcome
    }
}
