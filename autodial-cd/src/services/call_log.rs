//! Call log store
//!
//! Terminal attempts are recorded one at a time as the dialing loop reaches
//! them, keyed by campaign and dial position. Reads return a campaign's
//! attempts in dial order.

use async_trait::async_trait;
use autodial_common::Result;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;

use crate::models::{CallAttempt, CampaignId};

/// Campaigns retained by [`InMemoryCallLog`] before the oldest is dropped
pub const IN_MEMORY_CAMPAIGN_LIMIT: usize = 20;

#[async_trait]
pub trait CallLogStore: Send + Sync {
    /// Short store name for logs
    fn name(&self) -> &'static str;

    /// Insert or replace the record at `position` of `campaign_id`
    async fn record(
        &self,
        campaign_id: CampaignId,
        position: usize,
        attempt: &CallAttempt,
    ) -> Result<()>;

    /// Recorded attempts of one campaign, in dial order
    async fn campaign_log(&self, campaign_id: CampaignId) -> Result<Vec<CallAttempt>>;
}

struct CampaignLog {
    campaign_id: CampaignId,
    attempts: BTreeMap<usize, CallAttempt>,
}

/// Bounded in-process store, used when no database is configured
pub struct InMemoryCallLog {
    campaigns: RwLock<VecDeque<CampaignLog>>,
    limit: usize,
}

impl Default for InMemoryCallLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCallLog {
    pub fn new() -> Self {
        Self::with_limit(IN_MEMORY_CAMPAIGN_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            campaigns: RwLock::new(VecDeque::new()),
            limit: limit.max(1),
        }
    }
}

#[async_trait]
impl CallLogStore for InMemoryCallLog {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn record(
        &self,
        campaign_id: CampaignId,
        position: usize,
        attempt: &CallAttempt,
    ) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;

        if let Some(log) = campaigns.iter_mut().find(|l| l.campaign_id == campaign_id) {
            log.attempts.insert(position, attempt.clone());
            return Ok(());
        }

        if campaigns.len() >= self.limit {
            if let Some(evicted) = campaigns.pop_front() {
                tracing::debug!(campaign_id = %evicted.campaign_id, "Evicted call log");
            }
        }

        let mut attempts = BTreeMap::new();
        attempts.insert(position, attempt.clone());
        campaigns.push_back(CampaignLog {
            campaign_id,
            attempts,
        });
        Ok(())
    }

    async fn campaign_log(&self, campaign_id: CampaignId) -> Result<Vec<CallAttempt>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns
            .iter()
            .find(|l| l.campaign_id == campaign_id)
            .map(|l| l.attempts.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureReason, PhoneNumber};
    use chrono::Utc;
    use uuid::Uuid;

    fn finished(number: &str, connected: bool) -> CallAttempt {
        let now = Utc::now();
        let mut attempt = CallAttempt::new(PhoneNumber::parse(number, None).unwrap(), now);
        attempt.begin_dialing(now).unwrap();
        if connected {
            attempt.mark_connected(Some("call answered".into()), now).unwrap();
        } else {
            attempt
                .mark_failed(FailureReason::Transport("no answer".into()), now)
                .unwrap();
        }
        attempt
    }

    #[tokio::test]
    async fn test_returns_dial_order_regardless_of_record_order() {
        let store = InMemoryCallLog::new();
        let id = Uuid::new_v4();
        store.record(id, 2, &finished("18005550002", true)).await.unwrap();
        store.record(id, 0, &finished("18005550000", false)).await.unwrap();
        store.record(id, 1, &finished("18005550001", true)).await.unwrap();

        let log = store.campaign_log(id).await.unwrap();
        let numbers: Vec<&str> = log.iter().map(|a| a.number.as_str()).collect();
        assert_eq!(numbers, vec!["18005550000", "18005550001", "18005550002"]);
    }

    #[tokio::test]
    async fn test_unknown_campaign_is_empty() {
        let store = InMemoryCallLog::new();
        assert!(store.campaign_log(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oldest_campaign_evicted() {
        let store = InMemoryCallLog::with_limit(2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            store.record(*id, 0, &finished("18005551234", true)).await.unwrap();
        }

        assert!(store.campaign_log(ids[0]).await.unwrap().is_empty());
        assert_eq!(store.campaign_log(ids[1]).await.unwrap().len(), 1);
        assert_eq!(store.campaign_log(ids[2]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_same_position_replaced() {
        let store = InMemoryCallLog::new();
        let id = Uuid::new_v4();
        store.record(id, 0, &finished("18005551234", false)).await.unwrap();
        store.record(id, 0, &finished("18005551234", true)).await.unwrap();

        let log = store.campaign_log(id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].failure_reason.is_none());
    }
}
