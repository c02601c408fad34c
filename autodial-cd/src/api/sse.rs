//! Server-Sent Events stream of campaign progress
//!
//! GET /events sends the current progress snapshot on connect, a fresh
//! `progress` event on every state change, and the lifecycle events from the
//! event bus (CampaignStarted, AttemptStarted, AttemptFinished,
//! CampaignCompleted, CampaignCancelled).

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::models::ProgressSnapshot;
use crate::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

fn progress_event(snapshot: &ProgressSnapshot) -> Option<Event> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Event::default().event("progress").data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize progress snapshot: {}", e);
            None
        }
    }
}

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected");

    let mut reporter = state.orchestrator.reporter();
    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        if let Some(event) = progress_event(&reporter.snapshot()) {
            yield Ok(event);
        }

        loop {
            tokio::select! {
                changed = reporter.changed() => {
                    let Some(snapshot) = changed else {
                        debug!("SSE: Orchestrator gone, closing stream");
                        break;
                    };
                    if let Some(event) = progress_event(&snapshot) {
                        yield Ok(event);
                    }
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            let event_type = event.event_type().to_string();
                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    debug!("SSE: Broadcasting event: {}", event_type);
                                    yield Ok(Event::default().event(event_type).data(json));
                                }
                                Err(e) => warn!("SSE: Failed to serialize event {}: {}", event_type, e),
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("SSE: Client lagged, {} events skipped", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
