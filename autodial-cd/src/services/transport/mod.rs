//! Call transport: the capability that actually places a call
//!
//! The orchestrator only sees [`CallTransport::place`]. Every adapter fault
//! (network, API, credentials) is folded into [`CallOutcome::Failed`] so a
//! bad call never aborts the rest of the queue.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use autodial_common::config::{TransportKind, TransportSettings};

use crate::models::PhoneNumber;

pub mod simulated;
pub mod twilio;

pub use simulated::SimulatedTransport;
pub use twilio::TwilioTransport;

/// Result of one placed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Connected { detail: Option<String> },
    Failed { reason: String },
}

impl CallOutcome {
    pub fn connected(detail: impl Into<String>) -> Self {
        CallOutcome::Connected {
            detail: Some(detail.into()),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        CallOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, CallOutcome::Connected { .. })
    }
}

/// Transport adapter errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<TransportError> for CallOutcome {
    fn from(err: TransportError) -> Self {
        CallOutcome::failed(err.to_string())
    }
}

#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Short adapter name for logs
    fn name(&self) -> &'static str;

    /// Place a call and wait for its outcome
    async fn place(&self, number: &PhoneNumber, voice_preference: bool) -> CallOutcome;
}

/// Build the configured transport
///
/// A Twilio configuration with missing credentials falls back to the
/// simulated transport with a warning.
pub fn build_transport(settings: &TransportSettings) -> Arc<dyn CallTransport> {
    match settings.kind {
        TransportKind::Twilio => match TwilioTransport::new(&settings.twilio) {
            Ok(transport) => {
                tracing::info!("Twilio transport initialized");
                Arc::new(transport)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Twilio transport unavailable, using simulated calls");
                Arc::new(SimulatedTransport::new(settings.simulated.clone()))
            }
        },
        TransportKind::Simulated => {
            tracing::info!("Simulated transport initialized");
            Arc::new(SimulatedTransport::new(settings.simulated.clone()))
        }
    }
}
