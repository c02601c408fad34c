//! Campaign orchestrator
//!
//! Owns the current [`Campaign`] and drives its dialing loop.
//!
//! # State
//! Idle → Running → Completed → (next submit) Running ...
//!
//! All state lives in one `watch` channel. Every mutation (submission, a
//! worker transition, cancellation) is a single `send_if_modified` closure,
//! so readers always see a whole, consistent [`OrchestratorState`] and never
//! wait on the dialing loop. Submission's Running check and the swap to the
//! new campaign happen in the same closure.
//!
//! # Dialing
//! Attempts start in queue order. With `max_concurrent_calls = 1` exactly one
//! attempt is Dialing at a time; wider pools keep up to N calls in flight and
//! only the start order is guaranteed. A failed call never stops the queue.
//!
//! # Cancellation
//! Cooperative: Queued attempts become `Failed{Cancelled}` at once, the loop
//! stops starting new attempts, and in-flight calls finish and are recorded
//! normally. Results from a superseded campaign never touch the current one.

use autodial_common::config::DialerSettings;
use autodial_common::events::{DialerEvent, EventBus};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::models::{
    AttemptState, CallAttempt, Campaign, CampaignId, CampaignStatus, DialIntent, FailureReason,
    PhoneNumber, ProgressSnapshot,
};
use crate::services::transport::{CallOutcome, CallTransport};
use crate::services::{CallLogStore, ProgressReporter};

/// Submission and control failures surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CampaignError {
    #[error("No valid phone numbers to call")]
    EmptyQueue,

    #[error("A calling campaign is already running")]
    AlreadyRunning,

    #[error("No calling campaign is running")]
    NotRunning,
}

/// Dialing loop tuning
#[derive(Debug, Clone)]
pub struct DialerOptions {
    /// Calls allowed in flight at once, at least 1
    pub max_concurrent_calls: usize,
    /// Pause after each attempt but the last, before its worker starts the next one
    pub inter_call_delay: Duration,
}

impl Default for DialerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 1,
            inter_call_delay: Duration::ZERO,
        }
    }
}

impl From<&DialerSettings> for DialerOptions {
    fn from(settings: &DialerSettings) -> Self {
        Self {
            max_concurrent_calls: settings.max_concurrent_calls.max(1),
            inter_call_delay: Duration::from_millis(settings.inter_call_delay_ms),
        }
    }
}

/// Everything the orchestrator publishes to readers
#[derive(Debug, Clone, Default)]
pub struct OrchestratorState {
    /// Most recently submitted campaign, replaced on the next accepted submit
    pub current: Option<Campaign>,
    /// Id of the last campaign that reached Completed
    pub last_completed: Option<CampaignId>,
}

impl OrchestratorState {
    pub fn status(&self) -> CampaignStatus {
        self.current
            .as_ref()
            .map(|c| c.status)
            .unwrap_or(CampaignStatus::Idle)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.current
            .as_ref()
            .map(ProgressSnapshot::from_campaign)
            .unwrap_or_else(ProgressSnapshot::idle)
    }
}

/// Result of a successful cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CancelSummary {
    pub campaign_id: CampaignId,
    /// Queued attempts marked failed
    pub cancelled: usize,
}

/// Recorded attempts of the last completed campaign
#[derive(Debug, Clone, Serialize)]
pub struct CallLogReport {
    pub campaign_id: CampaignId,
    pub total: usize,
    pub connected: usize,
    pub failed: usize,
    pub attempts: Vec<CallAttempt>,
}

struct Inner {
    state: watch::Sender<OrchestratorState>,
    transport: Arc<dyn CallTransport>,
    log_store: Arc<dyn CallLogStore>,
    event_bus: EventBus,
    options: DialerOptions,
    cancel_tokens: Mutex<HashMap<CampaignId, CancellationToken>>,
}

/// Campaign orchestrator
///
/// Cloning shares the same state and dialing loop.
#[derive(Clone)]
pub struct CampaignOrchestrator {
    inner: Arc<Inner>,
}

impl CampaignOrchestrator {
    pub fn new(
        transport: Arc<dyn CallTransport>,
        log_store: Arc<dyn CallLogStore>,
        event_bus: EventBus,
        options: DialerOptions,
    ) -> Self {
        let (state, _) = watch::channel(OrchestratorState::default());
        let options = DialerOptions {
            max_concurrent_calls: options.max_concurrent_calls.max(1),
            ..options
        };

        tracing::info!(
            transport = transport.name(),
            log_store = log_store.name(),
            max_concurrent_calls = options.max_concurrent_calls,
            inter_call_delay_ms = options.inter_call_delay.as_millis() as u64,
            "Campaign orchestrator initialized"
        );

        Self {
            inner: Arc::new(Inner {
                state,
                transport,
                log_store,
                event_bus,
                options,
                cancel_tokens: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn options(&self) -> &DialerOptions {
        &self.inner.options
    }

    /// Start a campaign over `numbers`, in the given order
    ///
    /// Returns as soon as the campaign is Running; dialing continues in the
    /// background. A rejected submit leaves the current campaign untouched.
    pub fn submit(
        &self,
        numbers: Vec<PhoneNumber>,
        voice_preference: bool,
    ) -> Result<CampaignId, CampaignError> {
        let token = CancellationToken::new();
        let mut accepted: Result<(CampaignId, usize), CampaignError> =
            Err(CampaignError::EmptyQueue);

        self.inner.state.send_if_modified(|state| {
            if state.current.as_ref().is_some_and(Campaign::is_running) {
                accepted = Err(CampaignError::AlreadyRunning);
                return false;
            }
            if numbers.is_empty() {
                accepted = Err(CampaignError::EmptyQueue);
                return false;
            }

            let campaign = Campaign::new(numbers, voice_preference);
            accepted = Ok((campaign.id, campaign.attempts.len()));
            self.inner.tokens().insert(campaign.id, token.clone());
            state.current = Some(campaign);
            true
        });

        let (campaign_id, total) = match accepted {
            Ok(started) => started,
            Err(e) => {
                tracing::warn!(error = %e, "Campaign submission rejected");
                return Err(e);
            }
        };

        tracing::info!(
            campaign_id = %campaign_id,
            total,
            voice_preference,
            "Campaign started"
        );
        self.inner.event_bus.emit_lossy(DialerEvent::CampaignStarted {
            campaign_id,
            total,
            voice_preference,
            timestamp: Utc::now(),
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.run_campaign(campaign_id, total, voice_preference, token));

        Ok(campaign_id)
    }

    /// Single-number submission for an interpreted command
    pub fn submit_intent(&self, intent: DialIntent) -> Result<CampaignId, CampaignError> {
        self.submit(vec![intent.number], intent.voice_preference)
    }

    /// Cancel the running campaign
    pub async fn cancel(&self) -> Result<CancelSummary, CampaignError> {
        let mut cancelled: Option<(CampaignId, Vec<(usize, CallAttempt)>)> = None;

        self.inner.state.send_if_modified(|state| {
            let Some(campaign) = state.current.as_mut().filter(|c| c.is_running()) else {
                return false;
            };
            let positions = campaign.cancel(Utc::now());
            let attempts = positions
                .into_iter()
                .map(|p| (p, campaign.attempts[p].clone()))
                .collect();
            cancelled = Some((campaign.id, attempts));
            state.last_completed = Some(campaign.id);
            true
        });

        let Some((campaign_id, attempts)) = cancelled else {
            return Err(CampaignError::NotRunning);
        };

        let token = self.inner.tokens().get(&campaign_id).cloned();
        if let Some(token) = token {
            token.cancel();
        }

        for (position, attempt) in &attempts {
            self.inner.persist(campaign_id, *position, attempt).await;
        }

        tracing::info!(
            campaign_id = %campaign_id,
            cancelled = attempts.len(),
            "Campaign cancelled"
        );
        self.inner.event_bus.emit_lossy(DialerEvent::CampaignCancelled {
            campaign_id,
            cancelled: attempts.len(),
            timestamp: Utc::now(),
        });

        Ok(CancelSummary {
            campaign_id,
            cancelled: attempts.len(),
        })
    }

    /// Current progress; never waits on the dialing loop
    pub fn status(&self) -> ProgressSnapshot {
        self.inner.state.borrow().snapshot()
    }

    pub fn campaign_status(&self) -> CampaignStatus {
        self.inner.state.borrow().status()
    }

    pub fn is_running(&self) -> bool {
        self.campaign_status() == CampaignStatus::Running
    }

    /// Copy of the current campaign, if any
    pub fn current_campaign(&self) -> Option<Campaign> {
        self.inner.state.borrow().current.clone()
    }

    /// Independent read handle for pollers and streams
    pub fn reporter(&self) -> ProgressReporter {
        ProgressReporter::new(self.inner.state.subscribe())
    }

    /// Call log of the last completed campaign, `None` before any completes
    pub async fn call_log(&self) -> autodial_common::Result<Option<CallLogReport>> {
        let last_completed = self.inner.state.borrow().last_completed;
        let Some(campaign_id) = last_completed else {
            return Ok(None);
        };

        let attempts = self.inner.log_store.campaign_log(campaign_id).await?;
        let connected = attempts
            .iter()
            .filter(|a| a.state == AttemptState::Connected)
            .count();
        let failed = attempts
            .iter()
            .filter(|a| a.state == AttemptState::Failed)
            .count();

        Ok(Some(CallLogReport {
            campaign_id,
            total: attempts.len(),
            connected,
            failed,
            attempts,
        }))
    }
}

impl Inner {
    fn tokens(&self) -> MutexGuard<'_, HashMap<CampaignId, CancellationToken>> {
        match self.cancel_tokens.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Dialing loop for one campaign
    async fn run_campaign(
        self: Arc<Self>,
        campaign_id: CampaignId,
        total: usize,
        voice_preference: bool,
        token: CancellationToken,
    ) {
        let width = self.options.max_concurrent_calls;
        let mut next = 0;
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < width && next < total && !token.is_cancelled() {
                let position = next;
                next += 1;
                if let Some(attempt) = self.begin_attempt(campaign_id, position) {
                    let pause_after = next < total;
                    in_flight.push(self.dial(
                        campaign_id,
                        position,
                        attempt,
                        voice_preference,
                        pause_after,
                        &token,
                    ));
                }
            }

            if in_flight.next().await.is_none() {
                break;
            }
        }

        self.finish_campaign(campaign_id);
        self.tokens().remove(&campaign_id);
    }

    /// Queued → Dialing for `position`, if the campaign is still current and running
    fn begin_attempt(&self, campaign_id: CampaignId, position: usize) -> Option<CallAttempt> {
        let mut started = None;

        self.state.send_if_modified(|state| {
            let Some(campaign) = state
                .current
                .as_mut()
                .filter(|c| c.id == campaign_id && c.is_running())
            else {
                return false;
            };
            let Some(attempt) = campaign.attempts.get_mut(position) else {
                return false;
            };
            if attempt.begin_dialing(Utc::now()).is_err() {
                return false;
            }
            started = Some(attempt.clone());
            true
        });

        if let Some(attempt) = &started {
            tracing::info!(
                campaign_id = %campaign_id,
                position,
                number = %attempt.number,
                state = attempt.state.as_str(),
                "Dialing"
            );
            self.event_bus.emit_lossy(DialerEvent::AttemptStarted {
                campaign_id,
                position,
                number: attempt.number.to_string(),
                timestamp: Utc::now(),
            });
        }

        started
    }

    /// Place one call, publish its terminal state, then pause unless it was
    /// the last queued attempt
    async fn dial(
        &self,
        campaign_id: CampaignId,
        position: usize,
        mut attempt: CallAttempt,
        voice_preference: bool,
        pause_after: bool,
        token: &CancellationToken,
    ) {
        let outcome = self.transport.place(&attempt.number, voice_preference).await;

        let now = Utc::now();
        let transition = match &outcome {
            CallOutcome::Connected { detail } => attempt.mark_connected(detail.clone(), now),
            CallOutcome::Failed { reason } => {
                attempt.mark_failed(FailureReason::Transport(reason.clone()), now)
            }
        };
        if let Err(e) = transition {
            tracing::error!(campaign_id = %campaign_id, position, error = %e, "Attempt not recorded");
            return;
        }

        let finished = attempt.clone();
        self.state.send_if_modified(|state| {
            let Some(campaign) = state.current.as_mut().filter(|c| c.id == campaign_id) else {
                return false;
            };
            match campaign.attempts.get_mut(position) {
                Some(slot) if slot.state == AttemptState::Dialing => {
                    *slot = finished;
                    true
                }
                _ => false,
            }
        });

        let detail = match (&attempt.failure_reason, &attempt.detail) {
            (Some(reason), _) => Some(reason.to_string()),
            (None, detail) => detail.clone(),
        };
        tracing::info!(
            campaign_id = %campaign_id,
            position,
            number = %attempt.number,
            state = attempt.state.as_str(),
            detail = detail.as_deref().unwrap_or(""),
            "Attempt finished"
        );
        self.event_bus.emit_lossy(DialerEvent::AttemptFinished {
            campaign_id,
            position,
            number: attempt.number.to_string(),
            connected: outcome.is_connected(),
            detail,
            timestamp: Utc::now(),
        });

        self.persist(campaign_id, position, &attempt).await;

        let delay = self.options.inter_call_delay;
        if pause_after && !delay.is_zero() {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Running → Completed once every attempt is terminal
    fn finish_campaign(&self, campaign_id: CampaignId) {
        let mut completed = None;

        self.state.send_if_modified(|state| {
            let Some(campaign) = state.current.as_mut().filter(|c| c.id == campaign_id) else {
                return false;
            };
            if !campaign.is_drained() || !campaign.complete(Utc::now()) {
                return false;
            }
            completed = Some(campaign.counts());
            state.last_completed = Some(campaign_id);
            true
        });

        match completed {
            Some(counts) => {
                tracing::info!(
                    campaign_id = %campaign_id,
                    connected = counts.connected,
                    failed = counts.failed,
                    "Campaign completed"
                );
                self.event_bus.emit_lossy(DialerEvent::CampaignCompleted {
                    campaign_id,
                    connected: counts.connected,
                    failed: counts.failed,
                    timestamp: Utc::now(),
                });
            }
            None => tracing::debug!(campaign_id = %campaign_id, "Dialing loop exited"),
        }
    }

    /// Write a terminal attempt to the log store; failures are only logged
    async fn persist(&self, campaign_id: CampaignId, position: usize, attempt: &CallAttempt) {
        if let Err(e) = self.log_store.record(campaign_id, position, attempt).await {
            tracing::warn!(
                campaign_id = %campaign_id,
                position,
                error = %e,
                "Failed to record call log entry"
            );
        }
    }
}
