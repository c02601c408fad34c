//! Services for autodial-cd

pub mod call_log;
pub mod command_interpreter;
pub mod number_validator;
pub mod orchestrator;
pub mod progress_reporter;
pub mod transport;

pub use call_log::{CallLogStore, InMemoryCallLog};
pub use command_interpreter::{CommandInterpreter, InterpretError};
pub use number_validator::{NormalizedNumbers, NumberListValidator, RejectedEntry};
pub use orchestrator::{
    CallLogReport, CampaignError, CampaignOrchestrator, CancelSummary, DialerOptions,
    OrchestratorState,
};
pub use progress_reporter::ProgressReporter;
pub use transport::{build_transport, CallOutcome, CallTransport, TransportError};
