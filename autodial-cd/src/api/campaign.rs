//! Campaign API handlers
//!
//! POST /start_calling, POST /ai_command, POST /cancel_calling,
//! GET /calling_status, GET /call_logs

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::{CallLogReport, CancelSummary, RejectedEntry};
use crate::AppState;

fn default_ai_voice() -> bool {
    true
}

/// POST /start_calling request
#[derive(Debug, Deserialize)]
pub struct StartCallingRequest {
    pub numbers: Vec<String>,
    #[serde(default = "default_ai_voice")]
    pub ai_voice: bool,
}

/// POST /start_calling response
#[derive(Debug, Serialize)]
pub struct StartCallingResponse {
    pub message: String,
    pub campaign_id: Uuid,
    /// Numbers queued for dialing
    pub total: usize,
    /// Entries dropped by validation
    pub rejected: Vec<RejectedEntry>,
}

/// POST /ai_command request
#[derive(Debug, Deserialize)]
pub struct AiCommandRequest {
    pub command: String,
    /// Overrides any voice preference phrased in the command
    #[serde(default)]
    pub ai_voice: Option<bool>,
}

/// POST /ai_command response
#[derive(Debug, Serialize)]
pub struct AiCommandResponse {
    pub message: String,
    pub campaign_id: Uuid,
    pub number: String,
    pub ai_voice: bool,
    pub command_processed: String,
}

/// GET /calling_status response
#[derive(Debug, Serialize)]
pub struct CallingStatusResponse {
    /// Percent complete, 0 - 100
    pub progress: u8,
    pub current_number: String,
    pub running: bool,
    pub connected: usize,
    pub failed: usize,
    pub queued: usize,
    pub total: usize,
    pub campaign_id: Option<Uuid>,
}

/// GET /call_logs response
#[derive(Debug, Serialize)]
pub struct CallLogsResponse {
    pub campaign_id: Option<Uuid>,
    pub total_calls: usize,
    pub connected_calls: usize,
    pub failed_calls: usize,
    pub logs: Vec<crate::models::CallAttempt>,
}

impl From<Option<CallLogReport>> for CallLogsResponse {
    fn from(report: Option<CallLogReport>) -> Self {
        match report {
            Some(report) => Self {
                campaign_id: Some(report.campaign_id),
                total_calls: report.total,
                connected_calls: report.connected,
                failed_calls: report.failed,
                logs: report.attempts,
            },
            None => Self {
                campaign_id: None,
                total_calls: 0,
                connected_calls: 0,
                failed_calls: 0,
                logs: Vec::new(),
            },
        }
    }
}

/// POST /start_calling
///
/// Validate the list and start a campaign. Returns 202 Accepted; dialing
/// continues in the background.
pub async fn start_calling(
    State(state): State<AppState>,
    payload: Result<Json<StartCallingRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StartCallingResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let normalized = state.validator.normalize(&request.numbers);
    for entry in &normalized.rejected {
        tracing::debug!(raw = %entry.raw, reason = %entry.reason, "Number rejected");
    }

    let total = normalized.accepted.len();
    let campaign_id = state
        .orchestrator
        .submit(normalized.accepted, request.ai_voice)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartCallingResponse {
            message: "Calling started".to_string(),
            campaign_id,
            total,
            rejected: normalized.rejected,
        }),
    ))
}

/// POST /ai_command
///
/// Interpret a free-form command and queue it as a one-number campaign.
pub async fn ai_command(
    State(state): State<AppState>,
    payload: Result<Json<AiCommandRequest>, JsonRejection>,
) -> ApiResult<Json<AiCommandResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let command = request.command.trim();
    if command.is_empty() {
        return Err(ApiError::BadRequest("No command provided".to_string()));
    }

    let intent = state
        .interpreter
        .interpret(command)?
        .with_voice_override(request.ai_voice);
    tracing::info!(
        number = %intent.number,
        voice_preference = intent.voice_preference,
        "Command interpreted"
    );

    let number = intent.number.to_string();
    let ai_voice = intent.voice_preference;
    let campaign_id = state.orchestrator.submit_intent(intent)?;

    Ok(Json(AiCommandResponse {
        message: format!("Call initiated to {}", number),
        campaign_id,
        number,
        ai_voice,
        command_processed: command.to_string(),
    }))
}

/// GET /calling_status
///
/// Pure read; safe to poll at any rate.
pub async fn calling_status(State(state): State<AppState>) -> Json<CallingStatusResponse> {
    let snapshot = state.orchestrator.status();

    Json(CallingStatusResponse {
        progress: snapshot.percent_complete,
        current_number: snapshot.current_number,
        running: snapshot.running,
        connected: snapshot.connected_count,
        failed: snapshot.failed_count,
        queued: snapshot.queued_count,
        total: snapshot.total_attempts,
        campaign_id: snapshot.campaign_id,
    })
}

/// GET /call_logs
///
/// Attempts of the last completed campaign in dial order. Empty before any
/// campaign completes.
pub async fn call_logs(State(state): State<AppState>) -> ApiResult<Json<CallLogsResponse>> {
    let report = state.orchestrator.call_log().await?;
    Ok(Json(report.into()))
}

/// POST /cancel_calling
pub async fn cancel_calling(State(state): State<AppState>) -> ApiResult<Json<CancelSummary>> {
    let summary = state.orchestrator.cancel().await?;
    Ok(Json(summary))
}

/// Build campaign routes
pub fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route("/start_calling", post(start_calling))
        .route("/ai_command", post(ai_command))
        .route("/cancel_calling", post(cancel_calling))
        .route("/calling_status", get(calling_status))
        .route("/call_logs", get(call_logs))
}
