// Simulated per-edge traffic multipliers driven by time of day
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Morning 08-10 and evening 17-19, inclusive
pub fn is_peak_hour(hour: u32) -> bool {
    (8..=10).contains(&hour) || (17..=19).contains(&hour)
}

fn target_multiplier(rng: &mut StdRng, peak: bool) -> f64 {
    if peak {
        rng.gen_range(1.2..1.8)
    } else {
        rng.gen_range(0.8..1.2)
    }
}

#[derive(Debug)]
pub struct TrafficConditions {
    multipliers: HashMap<(usize, usize), f64>,
    last_update: Instant,
    interval: Duration,
    rng: StdRng,
}

impl TrafficConditions {
    pub fn new(edges: impl IntoIterator<Item = (usize, usize)>, hour: u32, interval: Duration, mut rng: StdRng) -> Self {
        let peak = is_peak_hour(hour);
        let multipliers = edges
            .into_iter()
            .map(|edge| {
                let value = target_multiplier(&mut rng, peak) * rng.gen_range(0.9..1.1);
                (edge, value)
            })
            .collect();

        Self {
            multipliers,
            last_update: Instant::now(),
            interval,
            rng,
        }
    }

    /// Drift every multiplier toward a fresh target, at most once per interval.
    /// Returns whether anything changed.
    pub fn refresh(&mut self, now: Instant, hour: u32) -> bool {
        if now.saturating_duration_since(self.last_update) < self.interval {
            return false;
        }
        self.last_update = now;

        let peak = is_peak_hour(hour);
        for value in self.multipliers.values_mut() {
            let target = target_multiplier(&mut self.rng, peak);
            *value = (*value * 0.7 + target * 0.3) * self.rng.gen_range(0.95..1.05);
        }

        tracing::debug!(
            "Refreshed {} traffic multipliers (peak: {})",
            self.multipliers.len(),
            peak
        );
        true
    }

    /// Edges without a recorded multiplier travel at the base time
    pub fn multiplier(&self, from: usize, to: usize) -> f64 {
        self.multipliers.get(&(from, to)).copied().unwrap_or(1.0)
    }
}
