//! Turnstile rider-arrival model.
//!
//! Each station owns one model. The expected number of entries over an
//! interval is `weight × profile(hour) × interval_secs`; the actual count
//! is a Poisson draw from the model's own seeded RNG stream, so repeated
//! runs with the same seed reproduce the same counts per station.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Hourly rate multipliers (hour 0-23). All 1.0 means a flat profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyProfile {
    pub multipliers: [f64; 24],
}

impl Default for HourlyProfile {
    fn default() -> Self {
        Self::flat()
    }
}

impl HourlyProfile {
    pub fn flat() -> Self {
        Self {
            multipliers: [1.0; 24],
        }
    }

    /// Weekday commuter curve: morning and evening peaks, quiet overnight.
    pub fn commuter() -> Self {
        let mut multipliers = [1.0; 24];
        for (hour, m) in multipliers.iter_mut().enumerate() {
            *m = match hour {
                0..=4 => 0.1,
                5 => 0.4,
                6 => 1.0,
                7..=8 => 2.5,
                9 => 1.5,
                10..=15 => 0.8,
                16..=18 => 2.2,
                19 => 1.2,
                20..=21 => 0.7,
                _ => 0.3,
            };
        }
        Self { multipliers }
    }

    pub fn multiplier(&self, hour: usize) -> f64 {
        self.multipliers[hour % 24]
    }

    pub(crate) fn validate(&self) -> Result<(), SimError> {
        for (hour, m) in self.multipliers.iter().enumerate() {
            if !m.is_finite() || *m < 0.0 {
                return Err(SimError::InvalidConfiguration(format!(
                    "profile multiplier for hour {hour} must be finite and >= 0, got {m}"
                )));
            }
        }
        Ok(())
    }
}

/// Stochastic rider-entry generator for one station.
#[derive(Debug)]
pub struct TurnstileModel {
    /// Expected entries per simulated second at profile multiplier 1.0.
    weight: f64,
    profile: HourlyProfile,
    rng: StdRng,
}

impl TurnstileModel {
    pub fn new(weight: f64, profile: HourlyProfile, seed: u64) -> Result<Self, SimError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SimError::InvalidConfiguration(format!(
                "turnstile weight must be finite and >= 0, got {weight}"
            )));
        }
        profile.validate()?;
        Ok(Self {
            weight,
            profile,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Number of riders entering during an interval ending at `hour`.
    /// Zero is a common outcome; there is no failure mode once constructed.
    pub fn riders_entering(&mut self, hour: usize, interval_secs: f64) -> u32 {
        let mean = self.weight * self.profile.multiplier(hour) * interval_secs;
        if mean <= 0.0 {
            return 0;
        }
        poisson(&mut self.rng, mean)
    }
}

/// Poisson draw: Knuth's product-of-uniforms for small means, a rounded
/// normal approximation above (exp(-mean) underflows long before that
/// matters statistically).
fn poisson<R: Rng>(rng: &mut R, mean: f64) -> u32 {
    if mean < 30.0 {
        let limit = (-mean).exp();
        let mut count = 0u32;
        let mut product = 1.0;
        loop {
            product *= rng.gen::<f64>();
            if product <= limit {
                return count;
            }
            count += 1;
        }
    }

    // Box-Muller from two uniforms, N(mean, mean), clamped at zero.
    let u1 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    (mean + mean.sqrt() * z).round().max(0.0) as u32
}
