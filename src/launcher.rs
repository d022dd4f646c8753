//! Starts a worker on its own task, waits a fixed startup delay and then
//! joins it.

use futures::future::BoxFuture;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::info;

use crate::config::AppError;

pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(1000);

/// A unit of work that runs on its own task until it finishes.
pub trait Worker: Send + 'static {
    fn run(self) -> BoxFuture<'static, Result<WorkerReport, AppError>>;
}

/// Outcome of a finished worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub delivered: u64,
    pub failed: u64,
}

impl WorkerReport {
    pub fn record(&mut self, delivered: bool) {
        if delivered {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to construct worker")]
    Construct(#[source] AppError),
    #[error("worker failed")]
    Worker(#[source] AppError),
    #[error("failed to join worker")]
    Join(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
pub enum LifecycleState {
    Created,
    Started,
    Sleeping,
    Joining,
    Terminated,
}

#[derive(Debug)]
pub struct Launcher {
    startup_delay: Duration,
    state: watch::Sender<LifecycleState>,
}

impl Default for Launcher {
    fn default() -> Self {
        Launcher::new(DEFAULT_STARTUP_DELAY)
    }
}

impl Launcher {
    pub fn new(startup_delay: Duration) -> Self {
        let (state, _) = watch::channel(LifecycleState::Created);
        Launcher {
            startup_delay,
            state,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Follows the lifecycle from outside; the receiver keeps the final state
    /// after the launcher is consumed.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn advance(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        info!(from = %previous, to = %next, "Lifecycle transition");
    }

    /// Builds the worker with `build`, spawns it, sleeps the startup delay and
    /// waits for the worker to finish. The join has no timeout.
    ///
    /// Every failure is returned to the caller; the launcher always ends in
    /// [`LifecycleState::Terminated`].
    #[tracing::instrument(skip_all, fields(startup_delay = ?self.startup_delay))]
    pub async fn launch<W, F>(self, build: F) -> Result<WorkerReport, LaunchError>
    where
        W: Worker,
        F: FnOnce() -> Result<W, AppError>,
    {
        let result = self.drive(build).await;
        self.advance(LifecycleState::Terminated);
        result
    }

    async fn drive<W, F>(&self, build: F) -> Result<WorkerReport, LaunchError>
    where
        W: Worker,
        F: FnOnce() -> Result<W, AppError>,
    {
        let worker = build().map_err(LaunchError::Construct)?;

        let handle = tokio::spawn(worker.run());
        self.advance(LifecycleState::Started);

        self.advance(LifecycleState::Sleeping);
        tokio::time::sleep(self.startup_delay).await;

        self.advance(LifecycleState::Joining);
        handle.await?.map_err(LaunchError::Worker)
    }
}
