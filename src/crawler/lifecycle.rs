//! Cooperative stop and completion signalling
//!
//! A stop request is a broadcast: every clone of a [`Lifecycle`] observes it.
//! Completion is one-shot and is raised by the [`CompletionGuard`] the
//! traversal task owns, so it fires exactly once however the task ends.

use tokio_util::sync::CancellationToken;

/// Stop and completion signals shared by the traversal and reporter tasks
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    stop: CancellationToken,
    done: CancellationToken,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every task to halt at its next safe point
    ///
    /// Calling this more than once has no further effect.
    pub fn request_stop(&self) {
        if !self.stop.is_cancelled() {
            tracing::info!("Stop requested");
        }
        self.stop.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Resolves once a stop has been requested
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }

    /// Resolves once the traversal has finished and persisted its checkpoint
    pub async fn await_completion(&self) {
        self.done.cancelled().await
    }

    pub fn is_complete(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Creates the guard that signals completion when dropped
    pub fn completion_guard(&self) -> CompletionGuard {
        CompletionGuard {
            done: self.done.clone(),
        }
    }
}

/// Signals completion when dropped
#[derive(Debug)]
pub struct CompletionGuard {
    done: CancellationToken,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.done.cancel();
    }
}
