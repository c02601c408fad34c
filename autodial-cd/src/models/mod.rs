//! Data models for autodial-cd
//!
//! - PhoneNumber: canonical dialable number
//! - CallAttempt: lifecycle of one dial
//! - Campaign: ordered attempts plus run status
//! - ProgressSnapshot: derived, read-only view
//! - DialIntent: interpreter output

pub mod call_attempt;
pub mod campaign;
pub mod dial_intent;
pub mod phone_number;
pub mod progress;

pub use call_attempt::{AttemptState, CallAttempt, FailureReason, InvalidTransition};
pub use campaign::{AttemptCounts, Campaign, CampaignId, CampaignStatus};
pub use dial_intent::DialIntent;
pub use phone_number::{PhoneNumber, RejectReason};
pub use progress::ProgressSnapshot;
