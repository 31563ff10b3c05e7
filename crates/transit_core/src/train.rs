//! Train state machine and per-tick transition policy.
//!
//! `OUT_OF_SERVICE` is terminal: a retired train is despawned and emits
//! nothing further. The transition probabilities are configuration, not a
//! fixed contract.

use bevy_ecs::prelude::{Component, Resource};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::network::{Direction, StationId};

pub type TrainId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainStatus {
    OnTime,
    Delayed,
    OutOfService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Train {
    pub id: TrainId,
    pub status: TrainStatus,
    pub station: StationId,
    pub direction: Direction,
    /// Consecutive ticks spent `Delayed`; reset on advancement.
    pub delayed_ticks: u32,
}

impl Train {
    pub fn new(id: TrainId, station: StationId, direction: Direction) -> Self {
        Self {
            id,
            status: TrainStatus::OnTime,
            station,
            direction,
            delayed_ticks: 0,
        }
    }
}

/// What a train does on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Move one station along the current direction.
    Advance,
    /// Enter or stay `Delayed`; no movement, no event.
    Delay,
    /// Leave service permanently.
    Retire,
}

/// Tunable per-tick transition probabilities.
#[derive(Debug, Clone, Copy, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainPolicy {
    /// Chance per tick that an on-time train is delayed instead of moving.
    pub delay_probability: f64,
    /// Chance per tick that an on-time train leaves service.
    pub out_of_service_probability: f64,
    /// A delayed train stays put at least this many ticks.
    pub min_delay_ticks: u32,
    /// Chance per tick (past `min_delay_ticks`) that a delayed train
    /// returns to service; it advances on its recovery tick.
    pub recovery_probability: f64,
}

impl Default for TrainPolicy {
    fn default() -> Self {
        Self {
            delay_probability: 0.05,
            out_of_service_probability: 0.002,
            min_delay_ticks: 2,
            recovery_probability: 0.3,
        }
    }
}

impl TrainPolicy {
    /// A policy with no random transitions: every train advances every tick.
    pub fn reliable() -> Self {
        Self {
            delay_probability: 0.0,
            out_of_service_probability: 0.0,
            min_delay_ticks: 0,
            recovery_probability: 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        for (name, p) in [
            ("delay_probability", self.delay_probability),
            ("out_of_service_probability", self.out_of_service_probability),
            ("recovery_probability", self.recovery_probability),
        ] {
            if !(0.0..=1.0).contains(&p) || !p.is_finite() {
                return Err(SimError::InvalidConfiguration(format!(
                    "{name} must be in [0, 1], got {p}"
                )));
            }
        }
        Ok(())
    }

    /// Rolls this tick's transition for a live train.
    pub fn decide<R: Rng>(&self, train: &Train, rng: &mut R) -> TickDecision {
        match train.status {
            TrainStatus::OutOfService => TickDecision::Retire,
            TrainStatus::Delayed => {
                if train.delayed_ticks >= self.min_delay_ticks
                    && rng.gen_bool(self.recovery_probability)
                {
                    TickDecision::Advance
                } else {
                    TickDecision::Delay
                }
            }
            TrainStatus::OnTime => {
                if rng.gen_bool(self.out_of_service_probability) {
                    TickDecision::Retire
                } else if rng.gen_bool(self.delay_probability) {
                    TickDecision::Delay
                } else {
                    TickDecision::Advance
                }
            }
        }
    }
}

/// Shared RNG stream for train status rolls, seeded by the scenario.
#[derive(Resource)]
pub struct FleetRng(pub StdRng);
