//! HTTP API handlers for autodial-cd

pub mod campaign;
pub mod health;
pub mod sse;

pub use campaign::campaign_routes;
pub use health::health_routes;
pub use sse::event_stream;
