//! Test fixtures shared across the crate's test modules.

use bevy_ecs::prelude::World;

use crate::network::{Line, StationId};
use crate::scenario::{build_scenario, LineConfig, ScenarioParams, StationConfig};
use crate::train::TrainPolicy;

/// A single green loop of `stations` stations with ids counting up from
/// `start_id`, zero turnstile weight, no trains, and a policy with no
/// random transitions. Callers layer their own knobs on top.
pub fn loop_params(stations: u32, start_id: StationId) -> ScenarioParams {
    let stations = (0..stations)
        .map(|i| {
            let id = start_id + i;
            StationConfig::new(id, format!("Stop {id}"), 0.0)
        })
        .collect();
    ScenarioParams::new(vec![LineConfig {
        line: Line::Green,
        stations,
        trains: 0,
    }])
    .with_policy(TrainPolicy::reliable())
    .with_seed(7)
}

/// The canonical 3-station loop (ids 1, 2, 3) with one train at station 1
/// heading in direction A.
pub fn three_station_loop() -> World {
    let mut world = World::new();
    build_scenario(&mut world, loop_params(3, 1).with_trains(1))
        .expect("valid test scenario");
    world
}
