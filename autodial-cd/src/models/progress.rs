//! Point-in-time progress view over a campaign

use serde::Serialize;

use super::{Campaign, CampaignId};

/// Read-only snapshot, recomputed on every read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub campaign_id: Option<CampaignId>,
    /// 0 - 100, rounded down
    pub percent_complete: u8,
    /// Number currently being dialed, empty when none
    pub current_number: String,
    pub connected_count: usize,
    pub failed_count: usize,
    pub queued_count: usize,
    pub dialing_count: usize,
    pub total_attempts: usize,
    pub running: bool,
}

impl ProgressSnapshot {
    /// Snapshot for an orchestrator with no campaign yet
    pub fn idle() -> Self {
        Self::default()
    }

    /// Derive a snapshot from one consistent view of `campaign`
    pub fn from_campaign(campaign: &Campaign) -> Self {
        let counts = campaign.counts();
        let total = counts.total();
        let percent_complete = if total == 0 {
            0
        } else {
            (100 * counts.finished() / total) as u8
        };

        Self {
            campaign_id: Some(campaign.id),
            percent_complete,
            current_number: campaign
                .current_number()
                .map(|n| n.to_string())
                .unwrap_or_default(),
            connected_count: counts.connected,
            failed_count: counts.failed,
            queued_count: counts.queued,
            dialing_count: counts.dialing,
            total_attempts: total,
            running: campaign.is_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhoneNumber;
    use chrono::Utc;

    fn campaign(n: usize) -> Campaign {
        let numbers = (0..n)
            .map(|i| PhoneNumber::parse(&format!("1800555{:04}", i), None).unwrap())
            .collect();
        Campaign::new(numbers, true)
    }

    #[test]
    fn test_idle_snapshot() {
        let s = ProgressSnapshot::idle();
        assert_eq!(s.percent_complete, 0);
        assert!(!s.running);
        assert!(s.current_number.is_empty());
        assert!(s.campaign_id.is_none());
    }

    #[test]
    fn test_percent_rounds_down() {
        let mut c = campaign(3);
        let now = Utc::now();
        c.attempts[0].begin_dialing(now).unwrap();
        c.attempts[0].mark_connected(None, now).unwrap();
        c.attempts[1].begin_dialing(now).unwrap();

        let s = ProgressSnapshot::from_campaign(&c);
        assert_eq!(s.percent_complete, 33);
        assert_eq!(s.current_number, "18005550001");
        assert_eq!(s.connected_count, 1);
        assert_eq!(s.dialing_count, 1);
        assert_eq!(s.queued_count, 1);
        assert_eq!(s.total_attempts, 3);
        assert!(s.running);
    }

    #[test]
    fn test_drained_campaign_is_100_percent() {
        let mut c = campaign(2);
        let now = Utc::now();
        for a in c.attempts.iter_mut() {
            a.begin_dialing(now).unwrap();
            a.mark_failed(crate::models::FailureReason::Transport("no answer".into()), now)
                .unwrap();
        }
        c.complete(now);

        let s = ProgressSnapshot::from_campaign(&c);
        assert_eq!(s.percent_complete, 100);
        assert_eq!(s.failed_count, 2);
        assert!(!s.running);
        assert!(s.current_number.is_empty());
    }

    #[test]
    fn test_repeated_reads_identical() {
        let c = campaign(4);
        let a = serde_json::to_vec(&ProgressSnapshot::from_campaign(&c)).unwrap();
        let b = serde_json::to_vec(&ProgressSnapshot::from_campaign(&c)).unwrap();
        assert_eq!(a, b);
    }
}
