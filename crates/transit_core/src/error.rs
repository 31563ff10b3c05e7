//! Error taxonomy for the simulation core.
//!
//! Configuration problems are caught before the first tick; topology
//! violations after construction are programming faults and terminate the
//! run. Randomness never produces an error.

use thiserror::Error;

use crate::network::{Direction, StationId};
use crate::sink::SinkError;

#[derive(Debug, Error)]
pub enum SimError {
    /// Bad scenario input (duplicate id, broken loop, invalid weight).
    /// Detected at construction; the simulation never starts.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A post-construction topology invariant was violated. Not recoverable.
    #[error("invalid topology: station {station} has no neighbor in direction {direction}")]
    InvalidTopology {
        station: StationId,
        direction: Direction,
    },

    /// Lookup of an unknown station id.
    #[error("station {0} not found")]
    NotFound(StationId),

    /// Batch delivery failed permanently (after bounded retries).
    #[error(transparent)]
    Sink(#[from] SinkError),
}
