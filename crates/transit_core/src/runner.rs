//! Simulation driver: advances the clock in fixed steps and delivers each
//! tick's ordered batch to the sink.
//!
//! Clock progression and batch assembly happen here, outside the systems.
//! The sink call is the only blocking point: tick k+1 does not mutate any
//! station state until tick k's batch has been accepted. A stop request is
//! honored between ticks, never mid-tick, so no partial batch is ever
//! delivered.

use std::sync::atomic::{AtomicBool, Ordering};

use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;
use tracing::debug;

use crate::clock::SimulationClock;
use crate::error::SimError;
use crate::events::{TickBatch, TickEvents};
use crate::sink::{deliver, DeliveryPolicy, EventSink};
use crate::systems::train_advance::train_advance_system;
use crate::systems::turnstile_entry::turnstile_entry_system;

/// Builds the per-tick schedule. Train advancement runs before turnstile
/// generation; the batch is re-sorted into the canonical order afterwards
/// either way.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((train_advance_system, turnstile_entry_system).chain());
    schedule
}

/// Runs exactly one tick and returns its ordered batch. The batch is not
/// delivered; callers that want sink delivery use [run].
pub fn run_tick(world: &mut World, schedule: &mut Schedule) -> Result<TickBatch, SimError> {
    world.resource_mut::<SimulationClock>().advance();
    schedule.run(world);
    let tick = world.resource::<SimulationClock>().tick();
    let events = world.resource_mut::<TickEvents>().drain()?;
    Ok(TickBatch::new(tick, events))
}

/// Runs up to `max_ticks` ticks, delivering every batch through the sink
/// under the world's [DeliveryPolicy]. Returns the number of delivered
/// ticks; stops early when `stop` is set (checked between ticks only).
pub fn run(
    world: &mut World,
    schedule: &mut Schedule,
    sink: &mut dyn EventSink,
    max_ticks: u64,
    stop: &AtomicBool,
) -> Result<u64, SimError> {
    let policy = *world.resource::<DeliveryPolicy>();
    let mut delivered = 0;
    for _ in 0..max_ticks {
        if stop.load(Ordering::Relaxed) {
            debug!(
                tick = world.resource::<SimulationClock>().tick(),
                "stop requested, halting between ticks"
            );
            break;
        }
        let batch = run_tick(world, schedule)?;
        deliver(sink, &batch, &policy)?;
        debug!(tick = batch.tick, events = batch.len(), "delivered batch");
        delivered += 1;
    }
    Ok(delivered)
}
