//! Lifecycle record for one dial
//!
//! Queued → Dialing → (Connected | Failed). A Queued attempt may also go
//! straight to Failed when its campaign is cancelled. Terminal states never
//! change again.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::PhoneNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttemptState {
    Queued,
    Dialing,
    Connected,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Connected | AttemptState::Failed)
    }

    /// Stored / serialized name
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptState::Queued => "QUEUED",
            AttemptState::Dialing => "DIALING",
            AttemptState::Connected => "CONNECTED",
            AttemptState::Failed => "FAILED",
        }
    }
}

impl FromStr for AttemptState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(AttemptState::Queued),
            "DIALING" => Ok(AttemptState::Dialing),
            "CONNECTED" => Ok(AttemptState::Connected),
            "FAILED" => Ok(AttemptState::Failed),
            other => Err(format!("unknown attempt state '{}'", other)),
        }
    }
}

/// Why an attempt ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Campaign was cancelled before this attempt started dialing
    Cancelled,
    /// The transport reported a failed call
    Transport(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Cancelled => f.write_str("cancelled"),
            FailureReason::Transport(reason) => f.write_str(reason),
        }
    }
}

/// Rejected state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid attempt transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: AttemptState,
    pub to: AttemptState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallAttempt {
    pub number: PhoneNumber,
    pub state: AttemptState,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<FailureReason>,
    /// Transport-provided description of a connected call (e.g. "voicemail")
    pub detail: Option<String>,
}

impl CallAttempt {
    pub fn new(number: PhoneNumber, queued_at: DateTime<Utc>) -> Self {
        Self {
            number,
            state: AttemptState::Queued,
            queued_at,
            started_at: None,
            ended_at: None,
            failure_reason: None,
            detail: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Queued → Dialing
    pub fn begin_dialing(&mut self, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.check(AttemptState::Queued, AttemptState::Dialing)?;
        self.state = AttemptState::Dialing;
        self.started_at = Some(now);
        Ok(())
    }

    /// Dialing → Connected
    pub fn mark_connected(
        &mut self,
        detail: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.check(AttemptState::Dialing, AttemptState::Connected)?;
        self.state = AttemptState::Connected;
        self.detail = detail;
        self.ended_at = Some(now);
        Ok(())
    }

    /// Dialing → Failed, or Queued → Failed for cancellations
    pub fn mark_failed(
        &mut self,
        reason: FailureReason,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        let allowed = match (&reason, self.state) {
            (_, AttemptState::Dialing) => true,
            (FailureReason::Cancelled, AttemptState::Queued) => true,
            _ => false,
        };
        if !allowed {
            return Err(InvalidTransition {
                from: self.state,
                to: AttemptState::Failed,
            });
        }
        self.state = AttemptState::Failed;
        self.failure_reason = Some(reason);
        self.ended_at = Some(now);
        Ok(())
    }

    fn check(&self, expected: AttemptState, to: AttemptState) -> Result<(), InvalidTransition> {
        if self.state == expected {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.state,
                to,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt() -> CallAttempt {
        CallAttempt::new(PhoneNumber::parse("18005551234", None).unwrap(), Utc::now())
    }

    #[test]
    fn test_connected_path_records_timestamps() {
        let mut a = attempt();
        a.begin_dialing(Utc::now()).unwrap();
        assert_eq!(a.state, AttemptState::Dialing);
        assert!(a.started_at.is_some());

        a.mark_connected(Some("call answered".into()), Utc::now()).unwrap();
        assert_eq!(a.state, AttemptState::Connected);
        assert!(a.ended_at.is_some());
        assert_eq!(a.detail.as_deref(), Some("call answered"));
        assert!(a.failure_reason.is_none());
    }

    #[test]
    fn test_failed_path_records_reason() {
        let mut a = attempt();
        a.begin_dialing(Utc::now()).unwrap();
        a.mark_failed(FailureReason::Transport("busy signal".into()), Utc::now())
            .unwrap();
        assert_eq!(a.state, AttemptState::Failed);
        assert_eq!(
            a.failure_reason,
            Some(FailureReason::Transport("busy signal".into()))
        );
        assert!(a.ended_at.is_some());
    }

    #[test]
    fn test_terminal_states_do_not_regress() {
        let mut a = attempt();
        a.begin_dialing(Utc::now()).unwrap();
        a.mark_connected(None, Utc::now()).unwrap();

        assert!(a.begin_dialing(Utc::now()).is_err());
        assert!(a.mark_failed(FailureReason::Cancelled, Utc::now()).is_err());
        assert_eq!(a.state, AttemptState::Connected);
    }

    #[test]
    fn test_queued_can_only_fail_by_cancellation() {
        let mut a = attempt();
        let err = a
            .mark_failed(FailureReason::Transport("x".into()), Utc::now())
            .unwrap_err();
        assert_eq!(err.from, AttemptState::Queued);
        assert!(a.mark_connected(None, Utc::now()).is_err());

        a.mark_failed(FailureReason::Cancelled, Utc::now()).unwrap();
        assert_eq!(a.state, AttemptState::Failed);
        assert!(a.started_at.is_none());
    }

    #[test]
    fn test_state_names_round_trip() {
        for state in [
            AttemptState::Queued,
            AttemptState::Dialing,
            AttemptState::Connected,
            AttemptState::Failed,
        ] {
            assert_eq!(state.as_str().parse::<AttemptState>(), Ok(state));
            assert_eq!(
                serde_json::to_value(state).unwrap(),
                serde_json::Value::String(state.as_str().to_string())
            );
        }
        assert!("RINGING".parse::<AttemptState>().is_err());
    }

    #[test]
    fn test_failure_reason_serialization() {
        let json = serde_json::to_value(FailureReason::Cancelled).unwrap();
        assert_eq!(json["kind"], "cancelled");

        let json = serde_json::to_value(FailureReason::Transport("no answer".into())).unwrap();
        assert_eq!(json["kind"], "transport");
        assert_eq!(json["detail"], "no answer");
    }
}
