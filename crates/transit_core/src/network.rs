//! Station topology: directional loops of stations with occupant slots.
//!
//! Stations reference their neighbors by id through the owning [Network]
//! rather than by pointer, so there are no ownership cycles. The topology
//! is wired once at construction and immutable afterwards; every station
//! has both neighbors from then on.

use std::collections::HashMap;
use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::train::TrainId;
use crate::turnstile::TurnstileModel;

pub type StationId = u32;

/// The lines of the network. A physical stop served by two lines appears
/// as one station per line, each with its own id, so every station lies on
/// exactly one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Line {
    Red,
    Blue,
    Green,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Red => write!(f, "red"),
            Line::Blue => write!(f, "blue"),
            Line::Green => write!(f, "green"),
        }
    }
}

/// The two rotational senses around a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    A,
    B,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::A => write!(f, "a"),
            Direction::B => write!(f, "b"),
        }
    }
}

/// A single station: local topology, per-direction occupant slots, and the
/// turnstile model it owns.
#[derive(Debug)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub line: Line,
    neighbor_a: Option<StationId>,
    neighbor_b: Option<StationId>,
    occupant_a: Option<TrainId>,
    occupant_b: Option<TrainId>,
    pub turnstile: TurnstileModel,
}

impl Station {
    pub fn new(id: StationId, name: impl Into<String>, line: Line, turnstile: TurnstileModel) -> Self {
        Self {
            id,
            name: name.into(),
            line,
            neighbor_a: None,
            neighbor_b: None,
            occupant_a: None,
            occupant_b: None,
            turnstile,
        }
    }

    pub fn neighbor(&self, direction: Direction) -> Option<StationId> {
        match direction {
            Direction::A => self.neighbor_a,
            Direction::B => self.neighbor_b,
        }
    }

    pub fn occupant(&self, direction: Direction) -> Option<TrainId> {
        match direction {
            Direction::A => self.occupant_a,
            Direction::B => self.occupant_b,
        }
    }

    fn set_occupant(&mut self, direction: Direction, train: Option<TrainId>) {
        match direction {
            Direction::A => self.occupant_a = train,
            Direction::B => self.occupant_b = train,
        }
    }

    /// Station name folded into a flat record-friendly form
    /// ("Clark/Lake" -> "clark_and_lake").
    pub fn normalized_name(&self) -> String {
        self.name
            .to_lowercase()
            .replace('/', "_and_")
            .replace([' ', '-', '.'], "_")
            .replace('\'', "")
    }
}

/// Result of moving a train one hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub station: StationId,
    pub prev_station: StationId,
    pub prev_direction: Direction,
}

/// All stations wired into closed directional loops, indexed by id.
#[derive(Debug, Resource)]
pub struct Network {
    stations: Vec<Station>,
    index: HashMap<StationId, usize>,
}

impl Network {
    /// Wires each inner list into one closed loop: direction A follows list
    /// order (wrapping), direction B reverses it. Fails fast on duplicate
    /// ids or loops shorter than two stations.
    pub fn from_loops(loops: Vec<Vec<Station>>) -> Result<Self, SimError> {
        let mut stations: Vec<Station> = Vec::new();
        let mut index = HashMap::new();

        for mut loop_stations in loops {
            if loop_stations.len() < 2 {
                return Err(SimError::InvalidConfiguration(format!(
                    "a loop needs at least 2 stations, got {}",
                    loop_stations.len()
                )));
            }

            let ids: Vec<StationId> = loop_stations.iter().map(|s| s.id).collect();
            for (pos, station) in loop_stations.iter_mut().enumerate() {
                let next = ids[(pos + 1) % ids.len()];
                let prev = ids[(pos + ids.len() - 1) % ids.len()];
                station.neighbor_a = Some(next);
                station.neighbor_b = Some(prev);
            }

            for station in loop_stations {
                if index.insert(station.id, stations.len()).is_some() {
                    return Err(SimError::InvalidConfiguration(format!(
                        "duplicate station id {}",
                        station.id
                    )));
                }
                stations.push(station);
            }
        }

        Ok(Self { stations, index })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    pub(crate) fn stations_mut(&mut self) -> impl Iterator<Item = &mut Station> {
        self.stations.iter_mut()
    }

    pub fn station_by_id(&self, id: StationId) -> Result<&Station, SimError> {
        self.index
            .get(&id)
            .map(|i| &self.stations[*i])
            .ok_or(SimError::NotFound(id))
    }

    fn station_by_id_mut(&mut self, id: StationId) -> Result<&mut Station, SimError> {
        let i = *self.index.get(&id).ok_or(SimError::NotFound(id))?;
        Ok(&mut self.stations[i])
    }

    /// The neighbor a train at `from` would advance to. `InvalidTopology`
    /// here means a station escaped loop wiring; that cannot happen after a
    /// successful construction and terminates the run.
    pub fn neighbor_of(&self, from: StationId, direction: Direction) -> Result<StationId, SimError> {
        self.station_by_id(from)?
            .neighbor(direction)
            .ok_or(SimError::InvalidTopology {
                station: from,
                direction,
            })
    }

    /// Moves a train one hop: empties the vacated occupant slot and fills
    /// the destination slot. Callers check destination occupancy first; a
    /// hop onto an occupied slot is a logic error upstream.
    pub fn advance(
        &mut self,
        train: TrainId,
        from: StationId,
        direction: Direction,
    ) -> Result<Hop, SimError> {
        let dest = self.neighbor_of(from, direction)?;
        self.station_by_id_mut(from)?.set_occupant(direction, None);
        self.station_by_id_mut(dest)?.set_occupant(direction, Some(train));
        Ok(Hop {
            station: dest,
            prev_station: from,
            prev_direction: direction,
        })
    }

    /// Injects a train into a station's occupant slot (initial placement).
    pub fn place(
        &mut self,
        train: TrainId,
        station: StationId,
        direction: Direction,
    ) -> Result<(), SimError> {
        let slot = self.station_by_id_mut(station)?;
        if slot.occupant(direction).is_some() {
            return Err(SimError::InvalidConfiguration(format!(
                "station {station} direction {direction} already holds a train"
            )));
        }
        slot.set_occupant(direction, Some(train));
        Ok(())
    }

    /// Empties a station's occupant slot (train taken out of service).
    pub fn clear_occupant(&mut self, station: StationId, direction: Direction) -> Result<(), SimError> {
        self.station_by_id_mut(station)?.set_occupant(direction, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turnstile::HourlyProfile;

    fn station(id: StationId, name: &str) -> Station {
        let turnstile = TurnstileModel::new(0.0, HourlyProfile::flat(), id as u64).expect("model");
        Station::new(id, name, Line::Green, turnstile)
    }

    fn three_loop() -> Network {
        Network::from_loops(vec![vec![
            station(1, "Alpha"),
            station(2, "Beta"),
            station(3, "Gamma"),
        ]])
        .expect("network")
    }

    #[test]
    fn loops_close_in_both_directions() {
        let network = three_loop();
        for direction in [Direction::A, Direction::B] {
            for start in [1, 2, 3] {
                let mut seen = vec![start];
                let mut at = start;
                for _ in 0..3 {
                    at = network.neighbor_of(at, direction).expect("wired");
                    seen.push(at);
                }
                assert_eq!(at, start, "direction {direction} returns to the start");
                seen.pop();
                seen.sort_unstable();
                assert_eq!(seen, vec![1, 2, 3], "every station visited once");
            }
        }
    }

    #[test]
    fn direction_b_reverses_direction_a() {
        let network = three_loop();
        let next = network.neighbor_of(1, Direction::A).expect("next");
        assert_eq!(network.neighbor_of(next, Direction::B).expect("back"), 1);
    }

    #[test]
    fn advance_moves_the_occupant_slot() {
        let mut network = three_loop();
        network.place(9, 1, Direction::A).expect("place");

        let hop = network.advance(9, 1, Direction::A).expect("advance");
        assert_eq!(hop.station, 2);
        assert_eq!(hop.prev_station, 1);
        assert_eq!(hop.prev_direction, Direction::A);

        assert_eq!(network.station_by_id(1).unwrap().occupant(Direction::A), None);
        assert_eq!(network.station_by_id(2).unwrap().occupant(Direction::A), Some(9));
    }

    #[test]
    fn occupant_slots_are_per_direction() {
        let mut network = three_loop();
        network.place(1, 2, Direction::A).expect("place a");
        network.place(2, 2, Direction::B).expect("place b");

        let station = network.station_by_id(2).unwrap();
        assert_eq!(station.occupant(Direction::A), Some(1));
        assert_eq!(station.occupant(Direction::B), Some(2));
    }

    #[test]
    fn placing_into_a_held_slot_is_rejected() {
        let mut network = three_loop();
        network.place(1, 1, Direction::A).expect("place");
        let err = network.place(2, 1, Direction::A).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));
    }

    #[test]
    fn unknown_station_lookup_is_not_found() {
        let network = three_loop();
        assert!(matches!(network.station_by_id(99), Err(SimError::NotFound(99))));
    }

    #[test]
    fn duplicate_ids_fail_construction() {
        let err = Network::from_loops(vec![
            vec![station(1, "Alpha"), station(2, "Beta")],
            vec![station(2, "Beta Prime"), station(3, "Gamma")],
        ])
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));
    }

    #[test]
    fn single_station_loop_fails_construction() {
        let err = Network::from_loops(vec![vec![station(1, "Lonely")]]).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));
    }

    #[test]
    fn station_names_are_normalized_for_records() {
        let s = station(1, "Clark/Lake");
        assert_eq!(s.normalized_name(), "clark_and_lake");
        let s = station(2, "O'Hare");
        assert_eq!(s.normalized_name(), "ohare");
        let s = station(3, "Addison-North Main");
        assert_eq!(s.normalized_name(), "addison_north_main");
    }
}
