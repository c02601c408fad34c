//! Campaign: one run of dialing a queued set of numbers to completion
//!
//! Attempt order is dial order. A campaign is created Running and ends
//! Completed either by draining its queue or by cancellation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{AttemptState, CallAttempt, FailureReason, PhoneNumber};

pub type CampaignId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignStatus {
    /// No campaign has been submitted yet
    Idle,
    Running,
    Completed,
}

/// Per-state attempt counts, taken in one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptCounts {
    pub queued: usize,
    pub dialing: usize,
    pub connected: usize,
    pub failed: usize,
}

impl AttemptCounts {
    pub fn total(&self) -> usize {
        self.queued + self.dialing + self.connected + self.failed
    }

    pub fn finished(&self) -> usize {
        self.connected + self.failed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub attempts: Vec<CallAttempt>,
    pub status: CampaignStatus,
    pub voice_preference: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Ended by an operator rather than by draining the queue
    pub cancelled: bool,
}

impl Campaign {
    /// New Running campaign with every number Queued in the given order
    pub fn new(numbers: Vec<PhoneNumber>, voice_preference: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            attempts: numbers
                .into_iter()
                .map(|n| CallAttempt::new(n, now))
                .collect(),
            status: CampaignStatus::Running,
            voice_preference,
            started_at: now,
            completed_at: None,
            cancelled: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == CampaignStatus::Running
    }

    pub fn counts(&self) -> AttemptCounts {
        self.attempts
            .iter()
            .fold(AttemptCounts::default(), |mut c, a| {
                match a.state {
                    AttemptState::Queued => c.queued += 1,
                    AttemptState::Dialing => c.dialing += 1,
                    AttemptState::Connected => c.connected += 1,
                    AttemptState::Failed => c.failed += 1,
                }
                c
            })
    }

    /// Number of the earliest attempt currently Dialing
    pub fn current_number(&self) -> Option<&PhoneNumber> {
        self.attempts
            .iter()
            .find(|a| a.state == AttemptState::Dialing)
            .map(|a| &a.number)
    }

    /// True when every attempt is Connected or Failed
    pub fn is_drained(&self) -> bool {
        self.attempts.iter().all(CallAttempt::is_terminal)
    }

    /// Running → Completed. Returns false if already Completed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status = CampaignStatus::Completed;
        self.completed_at = Some(now);
        true
    }

    /// Mark every Queued attempt Failed{Cancelled} and complete the campaign
    ///
    /// Attempts already Dialing are left to finish. Returns the positions of
    /// the attempts that were cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Vec<usize> {
        let mut cancelled = Vec::new();
        for (position, attempt) in self.attempts.iter_mut().enumerate() {
            if attempt.state == AttemptState::Queued
                && attempt.mark_failed(FailureReason::Cancelled, now).is_ok()
            {
                cancelled.push(position);
            }
        }
        self.cancelled = true;
        self.complete(now);
        cancelled
    }
}
