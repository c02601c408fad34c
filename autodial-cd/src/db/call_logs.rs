//! `calls` table operations

use async_trait::async_trait;
use autodial_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::{AttemptState, CallAttempt, CampaignId, FailureReason, PhoneNumber};
use crate::services::CallLogStore;

const KIND_CANCELLED: &str = "cancelled";
const KIND_TRANSPORT: &str = "transport";

/// Call log backed by the `calls` table
#[derive(Clone)]
pub struct SqliteCallLog {
    pool: SqlitePool,
}

impl SqliteCallLog {
    /// Wrap a pool whose tables were created by [`super::init_tables`]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallLogStore for SqliteCallLog {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn record(
        &self,
        campaign_id: CampaignId,
        position: usize,
        attempt: &CallAttempt,
    ) -> Result<()> {
        let (failure_kind, failure_detail) = match &attempt.failure_reason {
            Some(FailureReason::Cancelled) => (Some(KIND_CANCELLED), None),
            Some(FailureReason::Transport(reason)) => (Some(KIND_TRANSPORT), Some(reason.clone())),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO calls (
                campaign_id, position, phone_number, status,
                failure_kind, failure_detail, detail,
                queued_at, started_at, ended_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(campaign_id, position) DO UPDATE SET
                status = excluded.status,
                failure_kind = excluded.failure_kind,
                failure_detail = excluded.failure_detail,
                detail = excluded.detail,
                started_at = excluded.started_at,
                ended_at = excluded.ended_at
            "#,
        )
        .bind(campaign_id.to_string())
        .bind(position as i64)
        .bind(attempt.number.as_str())
        .bind(attempt.state.as_str())
        .bind(failure_kind)
        .bind(failure_detail)
        .bind(attempt.detail.as_deref())
        .bind(attempt.queued_at.to_rfc3339())
        .bind(attempt.started_at.map(|dt| dt.to_rfc3339()))
        .bind(attempt.ended_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn campaign_log(&self, campaign_id: CampaignId) -> Result<Vec<CallAttempt>> {
        let rows = sqlx::query(
            r#"
            SELECT phone_number, status, failure_kind, failure_detail, detail,
                   queued_at, started_at, ended_at
            FROM calls
            WHERE campaign_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(campaign_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<CallAttempt> {
                let phone_number: String = row.get("phone_number");
                let status: String = row.get("status");
                let failure_kind: Option<String> = row.get("failure_kind");
                let failure_detail: Option<String> = row.get("failure_detail");
                let queued_at: String = row.get("queued_at");
                let started_at: Option<String> = row.get("started_at");
                let ended_at: Option<String> = row.get("ended_at");

                let number = PhoneNumber::parse(&phone_number, None).map_err(|reason| {
                    Error::Internal(format!("Stored number '{}': {}", phone_number, reason))
                })?;
                let state = status.parse::<AttemptState>().map_err(Error::Internal)?;
                let failure_reason = match failure_kind.as_deref() {
                    Some(KIND_CANCELLED) => Some(FailureReason::Cancelled),
                    Some(_) => Some(FailureReason::Transport(failure_detail.unwrap_or_default())),
                    None => None,
                };

                Ok(CallAttempt {
                    number,
                    state,
                    queued_at: parse_timestamp(&queued_at)?,
                    started_at: started_at.as_deref().map(parse_timestamp).transpose()?,
                    ended_at: ended_at.as_deref().map(parse_timestamp).transpose()?,
                    failure_reason,
                    detail: row.get("detail"),
                })
            })
            .collect()
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", text, e)))
}
