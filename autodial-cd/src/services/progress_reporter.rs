//! Read-only progress view for pollers and streams
//!
//! Each reporter holds its own `watch` receiver, so any number of readers
//! can poll or wait for changes without contending with the dialing loop.

use tokio::sync::watch;

use super::orchestrator::OrchestratorState;
use crate::models::{CampaignStatus, ProgressSnapshot};

#[derive(Clone)]
pub struct ProgressReporter {
    rx: watch::Receiver<OrchestratorState>,
}

impl ProgressReporter {
    pub fn new(rx: watch::Receiver<OrchestratorState>) -> Self {
        Self { rx }
    }

    /// Snapshot of the latest published state
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.rx.borrow().snapshot()
    }

    pub fn status(&self) -> CampaignStatus {
        self.rx.borrow().status()
    }

    /// Wait for the next state change and return its snapshot
    ///
    /// Changes published while the caller was busy are coalesced into one.
    /// Returns `None` once the orchestrator is gone.
    pub async fn changed(&mut self) -> Option<ProgressSnapshot> {
        self.rx.changed().await.ok()?;
        let snapshot = self.rx.borrow_and_update().snapshot();
        Some(snapshot)
    }
}
