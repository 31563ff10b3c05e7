//! Per-tick train movement: rolls the transition policy for every live
//! train, moves occupant slots through the network, and emits one
//! `TrainArrival` per successful hop.
//!
//! Trains are processed in ascending id order so a run is deterministic
//! regardless of entity iteration order. A train whose destination slot is
//! held (a delayed train ahead) holds this tick, preserving single
//! occupancy; it emits nothing and is not marked delayed.

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::error::SimError;
use crate::events::{Event, TickEvents};
use crate::network::Network;
use crate::train::{FleetRng, TickDecision, Train, TrainPolicy, TrainStatus};

pub fn train_advance_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    policy: Res<TrainPolicy>,
    mut rng: ResMut<FleetRng>,
    mut network: ResMut<Network>,
    mut buffer: ResMut<TickEvents>,
    mut trains: Query<(Entity, &mut Train)>,
) {
    let mut ordered: Vec<_> = trains.iter_mut().collect();
    ordered.sort_by_key(|(_, train)| train.id);

    for (entity, mut train) in ordered {
        if train.status == TrainStatus::OutOfService {
            // Despawn is deferred; skip anything retired earlier this run.
            continue;
        }
        let decision = policy.decide(&train, &mut rng.0);
        if let Err(err) = apply(decision, entity, &mut train, &mut commands, &clock, &mut network, &mut buffer) {
            buffer.fail(err);
            return;
        }
    }
}

fn apply(
    decision: TickDecision,
    entity: Entity,
    train: &mut Train,
    commands: &mut Commands,
    clock: &SimulationClock,
    network: &mut Network,
    buffer: &mut TickEvents,
) -> Result<(), SimError> {
    match decision {
        TickDecision::Retire => {
            network.clear_occupant(train.station, train.direction)?;
            train.status = TrainStatus::OutOfService;
            commands.entity(entity).despawn();
        }
        TickDecision::Delay => {
            train.status = TrainStatus::Delayed;
            train.delayed_ticks += 1;
        }
        TickDecision::Advance => {
            let dest = network.neighbor_of(train.station, train.direction)?;
            if network.station_by_id(dest)?.occupant(train.direction).is_some() {
                // Blocked by the train ahead; hold without a status change.
                return Ok(());
            }
            let hop = network.advance(train.id, train.station, train.direction)?;
            train.status = TrainStatus::OnTime;
            train.delayed_ticks = 0;
            train.station = hop.station;
            let line = network.station_by_id(hop.station)?.line;
            buffer.push(Event::TrainArrival {
                station_id: hop.station,
                train_id: train.id,
                status: train.status,
                direction: train.direction,
                line,
                prev_station_id: hop.prev_station,
                prev_direction: hop.prev_direction,
                timestamp: clock.timestamp_ms(),
            });
        }
    }
    Ok(())
}
