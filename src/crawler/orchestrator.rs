//! Crawl orchestration
//!
//! The orchestrator walks the frontier in ascending offset order. Each
//! identifier gets one edge expansion per edge kind of the crawl mode, and
//! every page of every expansion feeds new identifiers back into the frontier.
//! When the walk halts, one checkpoint records where the next run resumes.

use crate::api::{Endpoints, PageSource};
use crate::config::Config;
use crate::crawler::fetcher::PaginatedFetcher;
use crate::crawler::lifecycle::Lifecycle;
use crate::crawler::pacer::Pacer;
use crate::notify::{deliver, Notification, Notifier};
use crate::state::{CrawlMode, EdgeKind};
use crate::storage::{Checkpoint, CheckpointStore, FrontierStore, NewIdentifier};
use crate::{HarvestError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Why a traversal run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// A stop was requested
    Stopped,

    /// Every identifier in the frontier was visited
    Exhausted,
}

/// What one traversal run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifiers whose edges were expanded
    pub visited: u64,

    /// Identifiers added to the frontier
    pub discovered: u64,

    /// Whether the run was stopped or ran out of identifiers
    pub halt: HaltReason,
}

/// The fixed inputs of a traversal
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    pub mode: CrawlMode,
    pub root: String,
    pub endpoints: Endpoints,
    pub pacing: Duration,
    pub retry_limit: u32,
}

impl HarvestPlan {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            mode: config.harvest.mode,
            root: config.harvest.root.clone(),
            endpoints: Endpoints::new(&config.api.base_url)?,
            pacing: config.harvest.pause_interval(),
            retry_limit: config.harvest.retry_limit,
        })
    }

    /// Seed URLs of the root identifier, in edge order
    pub fn root_seeds(&self) -> Vec<String> {
        self.endpoints.seed_urls(self.mode.edge_kinds(), &self.root)
    }
}

/// Drives one traversal run over the frontier
pub struct Orchestrator {
    plan: HarvestPlan,
    frontier: Arc<dyn FrontierStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    notifier: Arc<dyn Notifier>,
    fetcher: PaginatedFetcher,
    pacer: Pacer,
    fresh: bool,
}

impl Orchestrator {
    pub fn new(
        plan: HarvestPlan,
        source: Arc<dyn PageSource>,
        frontier: Arc<dyn FrontierStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let fetcher = PaginatedFetcher::new(source, plan.retry_limit, plan.pacing);
        let pacer = Pacer::new(plan.pacing);

        Self {
            plan,
            frontier,
            checkpoints,
            notifier,
            fetcher,
            pacer,
            fresh: false,
        }
    }

    /// Ignores the latest checkpoint and starts at the root
    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    /// Runs the traversal until it is stopped or the frontier is exhausted
    ///
    /// Errors while expanding an identifier are logged, reported and skipped.
    /// Only a failure to seed the root or to read the resume point ends the
    /// run early, and then no checkpoint is written.
    pub async fn run(mut self, lifecycle: Lifecycle) -> Result<RunSummary> {
        let (mut offset, mut pending) = match self.start_position() {
            Ok(position) => position,
            Err(e) => {
                tracing::error!("Failed to start {} harvest: {}", self.plan.mode, e);
                let notification = Notification::new(
                    format!("{} harvest failed to start", self.plan.mode),
                    format!("root: {}\nerror: {}", self.plan.root, e),
                );
                deliver(self.notifier.as_ref(), &notification).await;
                return Err(e);
            }
        };

        tracing::info!(
            mode = %self.plan.mode,
            offset,
            "Starting harvest at offset {}",
            offset
        );

        let kinds = self.plan.mode.edge_kinds();
        let mut visited = 0;
        let mut discovered = 0;

        let halt = loop {
            let record = match self.frontier.get_at(offset) {
                Ok(record) => record,
                Err(e) if e.is_not_found() => break HaltReason::Exhausted,
                Err(e) => {
                    tracing::error!(offset, "Failed to read frontier: {}", e);
                    tokio::select! {
                        biased;
                        _ = lifecycle.stopped() => break HaltReason::Stopped,
                        _ = tokio::time::sleep(self.plan.pacing) => continue,
                    }
                }
            };

            tracing::debug!(offset, token = %record.token, "Expanding identifier");

            let seeds = self.plan.endpoints.seed_urls(kinds, &record.token);
            let mut cursors = Vec::with_capacity(kinds.len());
            for (i, kind) in kinds.iter().enumerate() {
                let start = pending
                    .get(i)
                    .filter(|cursor| !cursor.is_empty())
                    .cloned()
                    .unwrap_or_else(|| seeds[i].clone());
                let (cursor, added) = self
                    .expand_edge(&lifecycle, &record.token, *kind, &seeds[i], start)
                    .await;
                cursors.push(cursor);
                discovered += added as u64;
            }
            visited += 1;

            if lifecycle.is_stop_requested() {
                pending = cursors;
                break HaltReason::Stopped;
            }

            offset += 1;
            pending.clear();
        };

        self.persist_checkpoint(offset, pending);

        let summary = RunSummary {
            visited,
            discovered,
            halt,
        };
        tracing::info!(
            mode = %self.plan.mode,
            "Harvest halted ({:?}): {} identifiers visited, {} discovered",
            summary.halt,
            summary.visited,
            summary.discovered
        );

        Ok(summary)
    }

    /// Seeds the root and works out the offset and cursors to resume with
    fn start_position(&self) -> Result<(u64, Vec<String>)> {
        self.frontier
            .insert_if_absent(&[NewIdentifier::new(self.plan.root.clone())])?;

        if self.fresh {
            tracing::info!("Fresh run requested, ignoring checkpoints");
            return Ok((0, Vec::new()));
        }

        match self.checkpoints.latest() {
            Ok(record) => {
                let offset = self.frontier.offset_of(record.checkpoint.reference_row_id)?;
                tracing::info!(
                    checkpoint = record.row_id,
                    reference = record.checkpoint.reference_row_id,
                    "Resuming from checkpoint written at {}",
                    record.created_at
                );
                Ok((offset, record.checkpoint.cursors))
            }
            Err(e) if e.is_not_found() => {
                tracing::info!("No checkpoint found, starting from the root");
                Ok((0, Vec::new()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Expands one edge of `token`, starting at `start_url`
    ///
    /// Returns the dangling cursor and the number of identifiers added. An
    /// expansion that never saw a next-page URL returns `start_url`, so an
    /// identifier with no edges is probed again on the next pass.
    async fn expand_edge(
        &mut self,
        lifecycle: &Lifecycle,
        token: &str,
        kind: EdgeKind,
        seed_url: &str,
        start_url: String,
    ) -> (String, usize) {
        let mut url = start_url.clone();
        let mut cursor: Option<String> = None;
        let mut added = 0;

        loop {
            tokio::select! {
                biased;
                _ = lifecycle.stopped() => break,
                _ = self.pacer.wait() => {}
            }

            let page = match self.fetcher.fetch_edge_page(kind, &url).await {
                Ok(page) => page,
                Err(e) => {
                    self.report_failure(token, kind, seed_url, &url, &e).await;
                    break;
                }
            };

            if page.is_empty() {
                break;
            }

            match self.frontier.insert_if_absent(&page.identifiers) {
                Ok(count) => added += count,
                Err(e) => {
                    self.report_failure(token, kind, seed_url, &url, &e.into()).await;
                    break;
                }
            }

            let next = page.paging.next;
            if !next.is_empty() {
                cursor = Some(next.clone());
            }
            if page.paging.is_end || next.is_empty() {
                break;
            }
            url = next;
        }

        (cursor.unwrap_or(start_url), added)
    }

    async fn report_failure(
        &self,
        token: &str,
        kind: EdgeKind,
        seed_url: &str,
        cursor: &str,
        error: &HarvestError,
    ) {
        tracing::error!(
            token = %token,
            edge = %kind,
            url = %cursor,
            "Edge expansion aborted: {}",
            error
        );

        let notification = Notification::new(
            format!("{} harvest: {} of '{}' failed", self.plan.mode, kind, token),
            format!(
                "mode: {}\nidentifier: {}\nedge: {}\nseed url: {}\ncursor: {}\nerror: {}",
                self.plan.mode, token, kind, seed_url, cursor, error
            ),
        );
        deliver(self.notifier.as_ref(), &notification).await;
    }

    /// Appends the checkpoint for a halt at `offset`
    ///
    /// `pending` holds the dangling cursors of the identifier at `offset`, or
    /// nothing if it should start from its seeds. If that identifier cannot be
    /// read back the checkpoint sends the next run to the root.
    fn persist_checkpoint(&self, offset: u64, pending: Vec<String>) {
        let checkpoint = match self.frontier.get_at(offset) {
            Ok(record) => {
                let cursors = if pending.is_empty() {
                    self.plan
                        .endpoints
                        .seed_urls(self.plan.mode.edge_kinds(), &record.token)
                } else {
                    pending
                };
                Checkpoint::new(record.row_id, cursors)
            }
            Err(e) => {
                if !e.is_not_found() {
                    tracing::warn!(offset, "Failed to read identifier for checkpoint: {}", e);
                }
                Checkpoint::restart_from_root(self.plan.root_seeds())
            }
        };

        match self.checkpoints.append(&checkpoint) {
            Ok(row_id) => tracing::info!(
                checkpoint = row_id,
                reference = checkpoint.reference_row_id,
                "Checkpoint written"
            ),
            Err(e) => tracing::error!("Failed to write checkpoint: {}", e),
        }
    }
}
