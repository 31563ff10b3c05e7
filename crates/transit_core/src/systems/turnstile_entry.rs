//! Per-tick rider generation: every station's turnstile model draws its
//! count for the elapsed interval and emits one `RiderEntry` per rider.

use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::SimulationClock;
use crate::events::{Event, TickEvents};
use crate::network::Network;

pub fn turnstile_entry_system(
    clock: Res<SimulationClock>,
    mut network: ResMut<Network>,
    mut buffer: ResMut<TickEvents>,
) {
    let hour = clock.hour_of_day();
    let interval_secs = clock.step_secs();
    let timestamp = clock.timestamp_ms();

    for station in network.stations_mut() {
        let count = station.turnstile.riders_entering(hour, interval_secs);
        for _ in 0..count {
            buffer.push(Event::RiderEntry {
                station_id: station.id,
                station_name: station.normalized_name(),
                line: station.line,
                timestamp,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::network::{Line, Station, StationId};
    use crate::turnstile::{HourlyProfile, TurnstileModel};

    fn world_with_weights(weights: &[(StationId, f64)]) -> (World, Schedule) {
        let stations = weights
            .iter()
            .map(|(id, weight)| {
                let turnstile =
                    TurnstileModel::new(*weight, HourlyProfile::flat(), *id as u64).expect("model");
                Station::new(*id, format!("Stop {id}"), Line::Blue, turnstile)
            })
            .collect();
        let network = Network::from_loops(vec![stations]).expect("network");

        let mut world = World::new();
        world.insert_resource(network);
        world.insert_resource(SimulationClock::default());
        world.insert_resource(TickEvents::default());
        let mut schedule = Schedule::default();
        schedule.add_systems(turnstile_entry_system);
        (world, schedule)
    }

    #[test]
    fn zero_weight_stations_stay_silent() {
        let (mut world, mut schedule) = world_with_weights(&[(1, 0.0), (2, 0.0)]);
        for _ in 0..50 {
            schedule.run(&mut world);
        }
        let events = world.resource_mut::<TickEvents>().drain().expect("events");
        assert!(events.is_empty());
    }

    #[test]
    fn one_event_per_rider_with_record_fields() {
        let (mut world, mut schedule) = world_with_weights(&[(1, 0.0), (2, 20.0)]);
        schedule.run(&mut world);

        let events = world.resource_mut::<TickEvents>().drain().expect("events");
        assert!(!events.is_empty(), "mean 20/tick should produce riders");
        for event in &events {
            match event {
                Event::RiderEntry {
                    station_id,
                    station_name,
                    line,
                    ..
                } => {
                    assert_eq!(*station_id, 2);
                    assert_eq!(station_name, "stop_2");
                    assert_eq!(*line, Line::Blue);
                }
                other => panic!("expected rider entry, got {other:?}"),
            }
        }
    }
}
