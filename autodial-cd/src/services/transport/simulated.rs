//! Simulated transport for demos and local runs
//!
//! Waits a random delay, then reports a random connected or failed outcome.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

use autodial_common::config::SimulatedTransportSettings;

use super::{CallOutcome, CallTransport};
use crate::models::PhoneNumber;

const CONNECTED_DETAILS: &[&str] = &["call answered", "voicemail"];
const FAILED_REASONS: &[&str] = &["busy signal", "number not in service", "no answer"];

pub struct SimulatedTransport {
    settings: SimulatedTransportSettings,
    rng: Mutex<StdRng>,
}

impl SimulatedTransport {
    pub fn new(settings: SimulatedTransportSettings) -> Self {
        Self {
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic outcomes for a given seed
    pub fn with_seed(settings: SimulatedTransportSettings, seed: u64) -> Self {
        Self {
            settings,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw the delay and outcome for one call
    fn draw(&self, voice_preference: bool) -> (Duration, CallOutcome) {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let (min, max) = (self.settings.min_delay_ms, self.settings.max_delay_ms);
        let delay_ms = if max > min { rng.gen_range(min..=max) } else { min };

        let outcome = if rng.gen_bool(self.settings.connect_ratio.clamp(0.0, 1.0)) {
            let detail = CONNECTED_DETAILS.choose(&mut *rng).copied().unwrap_or("call answered");
            if voice_preference {
                CallOutcome::connected(format!("{} with AI voice", detail))
            } else {
                CallOutcome::connected(detail)
            }
        } else {
            CallOutcome::failed(FAILED_REASONS.choose(&mut *rng).copied().unwrap_or("no answer"))
        };

        (Duration::from_millis(delay_ms), outcome)
    }
}

#[async_trait]
impl CallTransport for SimulatedTransport {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn place(&self, number: &PhoneNumber, voice_preference: bool) -> CallOutcome {
        let (delay, outcome) = self.draw(voice_preference);
        tracing::debug!(number = %number, delay_ms = delay.as_millis() as u64, "Simulating call");
        tokio::time::sleep(delay).await;
        outcome
    }
}
