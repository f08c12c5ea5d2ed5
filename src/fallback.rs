use std::thread;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::emotion::{EmotionLabel, EmotionResult, ResultSet, CONFIDENCE_THRESHOLD};
use crate::interpret::sort_descending;

/// Synthesizes plausible results when no model output is available.
///
/// The output is not calibrated; callers tag it as fallback.
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    min_delay: Duration,
    max_delay: Duration,
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(2))
    }
}

impl FallbackGenerator {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay: min_delay.min(max_delay),
            max_delay: max_delay.max(min_delay),
        }
    }

    pub const fn without_delay() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Sleep for a random emulated inference latency, then generate.
    pub fn generate(&self) -> ResultSet {
        let mut rng = rand::thread_rng();
        let delay = self.delay(&mut rng);
        if !delay.is_zero() {
            debug!(?delay, "emulating inference latency");
            thread::sleep(delay);
        }
        Self::generate_with(&mut rng)
    }

    pub fn delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_delay == self.max_delay {
            return self.min_delay;
        }
        rng.gen_range(self.min_delay..=self.max_delay)
    }

    /// One primary label in `[0.65, 0.95]` plus two or three secondaries carved
    /// from the remaining mass. Secondaries at or below the threshold are dropped.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> ResultSet {
        let mut labels = EmotionLabel::ALL;
        labels.shuffle(rng);

        let primary_confidence = 0.65 + rng.gen::<f32>() * 0.3;
        let mut results = vec![EmotionResult::new(labels[0], primary_confidence)];

        let num_secondary = rng.gen_range(2..=3);
        let mut remaining = 1.0 - primary_confidence;
        for &label in &labels[1..=num_secondary] {
            let confidence = rng.gen::<f32>() * (remaining * 0.8);
            remaining -= confidence;
            if confidence > CONFIDENCE_THRESHOLD {
                results.push(EmotionResult::new(label, confidence));
            }
        }

        sort_descending(&mut results);
        results
    }
}
