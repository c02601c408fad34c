//! autodial-cd library interface
//!
//! Call Dialer service: validates number lists, interprets free-form call
//! commands, runs outbound call campaigns and reports their progress over
//! HTTP.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use autodial_common::events::EventBus;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::{CampaignOrchestrator, CommandInterpreter, NumberListValidator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: CampaignOrchestrator,
    pub validator: Arc<NumberListValidator>,
    pub interpreter: Arc<CommandInterpreter>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        orchestrator: CampaignOrchestrator,
        validator: NumberListValidator,
        interpreter: CommandInterpreter,
        event_bus: EventBus,
    ) -> Self {
        Self {
            orchestrator,
            validator: Arc::new(validator),
            interpreter: Arc::new(interpreter),
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::campaign_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
