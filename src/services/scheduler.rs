//! Periodic job runner behind the status API.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::cleanup::CleanupService;
use crate::models::{JobRun, RunnerHistory};

/// Completed runs kept for the history endpoint.
const HISTORY_LIMIT: usize = 50;

struct SchedulerState {
    running: bool,
    history: Vec<JobRun>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

/// Owns the periodic cleanup sweep and its run history.
///
/// `start` spawns one background loop that runs a sweep per interval, each
/// with a fresh child token off the loop's parent token. `stop` cancels
/// the parent, which both interrupts an in-flight sweep and ends the loop.
/// At most one loop is live at a time.
#[derive(Clone)]
pub struct Scheduler {
    cleanup: Arc<CleanupService>,
    interval: Duration,
    state: Arc<Mutex<SchedulerState>>,
}

impl Scheduler {
    pub fn new(cleanup: CleanupService, interval: Duration) -> Self {
        Self {
            cleanup: Arc::new(cleanup),
            interval,
            state: Arc::new(Mutex::new(SchedulerState {
                running: false,
                history: Vec::new(),
                cancel: None,
                task: None,
            })),
        }
    }

    /// Start the periodic loop. A no-op when already running.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if state.running {
            debug!("Scheduler already running");
            return;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            self.cleanup.clone(),
            self.state.clone(),
            self.interval,
            cancel.clone(),
        ));
        state.cancel = Some(cancel);
        state.task = Some(task);
        state.running = true;
        info!("Scheduler started");
    }

    /// Stop the loop and wait for it to wind down. A no-op when stopped.
    pub async fn stop(&self) {
        let task = {
            let mut state = self.state.lock().await;
            if !state.running {
                debug!("Scheduler already stopped");
                return;
            }
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            state.running = false;
            state.task.take()
        };

        // Await outside the lock; the loop still needs it to record the
        // interrupted run.
        if let Some(task) = task {
            let _ = task.await;
        }
        info!("Scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    /// Run history, most recent first, plus the current running flag.
    pub async fn history(&self) -> RunnerHistory {
        let state = self.state.lock().await;
        RunnerHistory {
            running: state.running,
            history: state.history.iter().rev().cloned().collect(),
        }
    }
}

async fn run_loop(
    cleanup: Arc<CleanupService>,
    state: Arc<Mutex<SchedulerState>>,
    interval: Duration,
    parent: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = parent.cancelled() => break,
            _ = ticker.tick() => {}
        }

        {
            let mut state = state.lock().await;
            state.history.push(JobRun::begin("cleanup"));
            if state.history.len() > HISTORY_LIMIT {
                state.history.remove(0);
            }
        }

        let child = parent.child_token();
        let report = cleanup.sweep(&child).await;

        // One sweep at a time, so the last entry is this run.
        let mut state = state.lock().await;
        if let Some(run) = state.history.last_mut() {
            run.finish(report.outcome);
        }
    }
    debug!("Scheduler loop finished");
}
