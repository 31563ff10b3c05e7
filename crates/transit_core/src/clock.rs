//! Fixed-step simulation clock.
//!
//! The driver advances simulated time in uniform steps; one step is one
//! tick. The clock also carries an epoch so simulated time maps to an hour
//! of day for the turnstile traffic profile.

use bevy_ecs::prelude::Resource;

pub const ONE_SEC_MS: u64 = 1000;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
const MS_PER_HOUR: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationClock {
    tick: u64,
    step_ms: u64,
    /// Real-world time (unix ms) corresponding to simulation time 0.
    epoch_ms: i64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(ONE_SEC_MS, 0)
    }
}

impl SimulationClock {
    pub fn new(step_ms: u64, epoch_ms: i64) -> Self {
        Self {
            tick: 0,
            step_ms: step_ms.max(1),
            epoch_ms,
        }
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }

    /// Step length in simulated seconds.
    pub fn step_secs(&self) -> f64 {
        self.step_ms as f64 / ONE_SEC_MS as f64
    }

    /// Simulated time elapsed since the epoch, in ms.
    pub fn elapsed_ms(&self) -> u64 {
        self.tick * self.step_ms
    }

    /// Wall-clock style timestamp (unix ms) for events emitted this tick.
    pub fn timestamp_ms(&self) -> i64 {
        self.epoch_ms + self.elapsed_ms() as i64
    }

    /// Hour of day (0-23) at the current simulated time.
    pub fn hour_of_day(&self) -> usize {
        let ms_in_day = self.timestamp_ms().rem_euclid(MS_PER_DAY);
        (ms_in_day / MS_PER_HOUR) as usize
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_elapsed_time() {
        let mut clock = SimulationClock::new(500, 0);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.elapsed_ms(), 0);

        clock.advance();
        clock.advance();
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.elapsed_ms(), 1000);
        assert_eq!(clock.timestamp_ms(), 1000);
    }

    #[test]
    fn hour_of_day_follows_epoch() {
        // Epoch at 07:00 UTC; after two hours of ticks the hour is 9.
        let epoch = 7 * MS_PER_HOUR;
        let mut clock = SimulationClock::new(ONE_SEC_MS, epoch);
        assert_eq!(clock.hour_of_day(), 7);

        for _ in 0..(2 * 60 * 60) {
            clock.advance();
        }
        assert_eq!(clock.hour_of_day(), 9);
    }

    #[test]
    fn hour_of_day_wraps_at_midnight() {
        let epoch = 23 * MS_PER_HOUR;
        let mut clock = SimulationClock::new(ONE_SEC_MS, epoch);
        for _ in 0..(2 * 60 * 60) {
            clock.advance();
        }
        assert_eq!(clock.hour_of_day(), 1);
    }

    #[test]
    fn step_length_is_never_zero() {
        let clock = SimulationClock::new(0, 0);
        assert_eq!(clock.step_ms(), 1);
    }
}
