//! Domain events and the per-tick batch contract.
//!
//! Events are immutable once created; ownership moves to the sink. The
//! variants serialize to flat records (the downstream compatibility
//! surface), and every batch carries the canonical intra-tick order:
//! arrivals before rider entries, station id ascending, train id as the
//! tiebreak. Rider entries keep their per-station generation order.

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::error::SimError;
use crate::network::{Direction, Line, StationId};
use crate::train::{TrainId, TrainStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum Event {
    TrainArrival {
        station_id: StationId,
        train_id: TrainId,
        status: TrainStatus,
        direction: Direction,
        line: Line,
        prev_station_id: StationId,
        prev_direction: Direction,
        timestamp: i64,
    },
    RiderEntry {
        station_id: StationId,
        station_name: String,
        line: Line,
        timestamp: i64,
    },
}

impl Event {
    pub fn station_id(&self) -> StationId {
        match self {
            Event::TrainArrival { station_id, .. } => *station_id,
            Event::RiderEntry { station_id, .. } => *station_id,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Event::TrainArrival { timestamp, .. } => *timestamp,
            Event::RiderEntry { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_train_arrival(&self) -> bool {
        matches!(self, Event::TrainArrival { .. })
    }

    fn group(&self) -> u8 {
        match self {
            Event::TrainArrival { .. } => 0,
            Event::RiderEntry { .. } => 1,
        }
    }

    fn tiebreak(&self) -> TrainId {
        match self {
            Event::TrainArrival { train_id, .. } => *train_id,
            Event::RiderEntry { .. } => 0,
        }
    }
}

/// Sorts events into the canonical intra-tick order. The sort is stable,
/// so rider entries at the same station keep their generation order.
pub fn order_events(events: &mut [Event]) {
    events.sort_by_key(|e| (e.group(), e.station_id(), e.tiebreak()));
}

/// Everything one tick produced, delivered atomically to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickBatch {
    pub tick: u64,
    pub events: Vec<Event>,
}

impl TickBatch {
    pub fn new(tick: u64, mut events: Vec<Event>) -> Self {
        order_events(&mut events);
        Self { tick, events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Per-tick event buffer the systems write into. A system that hits an
/// invariant violation records it here instead of panicking; the runner
/// halts the run before delivering anything from that tick.
#[derive(Debug, Default, Resource)]
pub struct TickEvents {
    events: Vec<Event>,
    failure: Option<SimError>,
}

impl TickEvents {
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn fail(&mut self, error: SimError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }

    /// Takes this tick's events, or the first recorded failure.
    pub fn drain(&mut self) -> Result<Vec<Event>, SimError> {
        if let Some(error) = self.failure.take() {
            self.events.clear();
            return Err(error);
        }
        Ok(std::mem::take(&mut self.events))
    }
}
