//! Scenario parameters and world construction.
//!
//! A scenario is a static description: lines with their ordered station
//! loops, turnstile weights, train counts, the transition policy, and a
//! seed. `build_scenario` validates everything up front (`InvalidConfiguration`
//! before any tick runs) and populates the world.

use bevy_ecs::prelude::World;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::clock::{SimulationClock, ONE_SEC_MS};
use crate::error::SimError;
use crate::events::TickEvents;
use crate::network::{Direction, Line, Network, Station, StationId};
use crate::sink::DeliveryPolicy;
use crate::train::{FleetRng, Train, TrainId, TrainPolicy};
use crate::turnstile::{HourlyProfile, TurnstileModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    pub id: StationId,
    pub name: String,
    /// Expected rider entries per simulated second at profile multiplier 1.0.
    #[serde(default)]
    pub turnstile_weight: f64,
}

impl StationConfig {
    pub fn new(id: StationId, name: impl Into<String>, turnstile_weight: f64) -> Self {
        Self {
            id,
            name: name.into(),
            turnstile_weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    pub line: Line,
    /// Stations in loop order: direction A follows this order (wrapping),
    /// direction B reverses it.
    pub stations: Vec<StationConfig>,
    /// Trains injected on this line, spread along the loop and split
    /// between the two directions.
    #[serde(default)]
    pub trains: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub lines: Vec<LineConfig>,
    /// Seed for all RNG streams; random when absent (a seeded run is fully
    /// reproducible).
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    /// Real-world unix ms for simulation time 0 (drives the hourly profile).
    #[serde(default)]
    pub epoch_ms: i64,
    #[serde(default)]
    pub policy: TrainPolicy,
    #[serde(default)]
    pub profile: HourlyProfile,
    #[serde(default)]
    pub delivery: DeliveryPolicy,
}

fn default_step_ms() -> u64 {
    ONE_SEC_MS
}

impl ScenarioParams {
    pub fn new(lines: Vec<LineConfig>) -> Self {
        Self {
            lines,
            seed: None,
            step_ms: default_step_ms(),
            epoch_ms: 0,
            policy: TrainPolicy::default(),
            profile: HourlyProfile::default(),
            delivery: DeliveryPolicy::default(),
        }
    }

    /// A small three-line network in the shape of the Chicago "L" data the
    /// simulation is modelled on.
    pub fn demo() -> Self {
        let blue = LineConfig {
            line: Line::Blue,
            stations: vec![
                StationConfig::new(100, "O'Hare", 2.0),
                StationConfig::new(101, "Rosemont", 0.8),
                StationConfig::new(102, "Jefferson Park", 1.1),
                StationConfig::new(103, "Logan Square", 1.4),
                StationConfig::new(104, "Clark/Lake", 3.2),
                StationConfig::new(105, "UIC-Halsted", 1.0),
            ],
            trains: 4,
        };
        let green = LineConfig {
            line: Line::Green,
            stations: vec![
                StationConfig::new(200, "Harlem/Lake", 0.9),
                StationConfig::new(201, "Oak Park", 0.6),
                StationConfig::new(202, "Ashland", 1.2),
                StationConfig::new(203, "Clark/Lake", 3.2),
                StationConfig::new(204, "Roosevelt", 1.8),
            ],
            trains: 2,
        };
        let red = LineConfig {
            line: Line::Red,
            stations: vec![
                StationConfig::new(300, "Howard", 1.5),
                StationConfig::new(301, "Addison", 2.4),
                StationConfig::new(302, "Fullerton", 1.9),
                StationConfig::new(303, "Lake", 3.0),
                StationConfig::new(304, "Roosevelt", 1.8),
                StationConfig::new(305, "95th/Dan Ryan", 1.6),
            ],
            trains: 4,
        };
        let mut params = Self::new(vec![blue, green, red]);
        params.profile = HourlyProfile::commuter();
        params
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_step_ms(mut self, step_ms: u64) -> Self {
        self.step_ms = step_ms;
        self
    }

    pub fn with_epoch_ms(mut self, epoch_ms: i64) -> Self {
        self.epoch_ms = epoch_ms;
        self
    }

    pub fn with_policy(mut self, policy: TrainPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_profile(mut self, profile: HourlyProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the train count on every line.
    pub fn with_trains(mut self, trains: u32) -> Self {
        for line in &mut self.lines {
            line.trains = trains;
        }
        self
    }

    /// Sets the turnstile weight on every station.
    pub fn with_turnstile_weight(mut self, weight: f64) -> Self {
        for line in &mut self.lines {
            for station in &mut line.stations {
                station.turnstile_weight = weight;
            }
        }
        self
    }
}

/// Derives a station's private RNG seed from the run seed.
fn turnstile_seed(run_seed: u64, station: StationId) -> u64 {
    run_seed ^ (station as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Validates the scenario and populates `world`: wires the network, injects
/// trains into their occupant slots, and inserts the clock, policy, RNG,
/// delivery policy, and tick buffer resources.
pub fn build_scenario(world: &mut World, params: ScenarioParams) -> Result<(), SimError> {
    if params.lines.is_empty() {
        return Err(SimError::InvalidConfiguration("scenario has no lines".into()));
    }
    params.policy.validate()?;
    params.delivery.validate()?;

    let run_seed = params
        .seed
        .unwrap_or_else(|| StdRng::from_entropy().gen());

    let mut loops = Vec::with_capacity(params.lines.len());
    for line_cfg in &params.lines {
        let mut stations = Vec::with_capacity(line_cfg.stations.len());
        for cfg in &line_cfg.stations {
            let turnstile = TurnstileModel::new(
                cfg.turnstile_weight,
                params.profile,
                turnstile_seed(run_seed, cfg.id),
            )?;
            stations.push(Station::new(cfg.id, cfg.name.clone(), line_cfg.line, turnstile));
        }
        loops.push(stations);
    }
    let mut network = Network::from_loops(loops)?;

    // Inject trains spread along each loop, alternating directions. A
    // placement collision means more trains than slots on the loop.
    let mut next_train_id: TrainId = 0;
    let mut trains = Vec::new();
    for line_cfg in &params.lines {
        let len = line_cfg.stations.len();
        for t in 0..line_cfg.trains {
            let position = (t as usize * len) / line_cfg.trains as usize;
            let station = line_cfg.stations[position % len].id;
            let direction = if t % 2 == 0 { Direction::A } else { Direction::B };
            network.place(next_train_id, station, direction).map_err(|_| {
                SimError::InvalidConfiguration(format!(
                    "line {} cannot hold {} trains across {} stations",
                    line_cfg.line, line_cfg.trains, len
                ))
            })?;
            trains.push(Train::new(next_train_id, station, direction));
            next_train_id += 1;
        }
    }

    for train in trains {
        world.spawn(train);
    }
    world.insert_resource(network);
    world.insert_resource(SimulationClock::new(params.step_ms, params.epoch_ms));
    world.insert_resource(TickEvents::default());
    world.insert_resource(params.policy);
    world.insert_resource(params.delivery);
    world.insert_resource(FleetRng(StdRng::seed_from_u64(run_seed ^ 0x5eed_cafe)));
    Ok(())
}
