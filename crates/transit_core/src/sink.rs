//! The event sink boundary.
//!
//! The core never talks to a broker; it hands ordered batches to whatever
//! implements [EventSink]. Delivery retries the same batch on transient
//! failures (idempotent retry is assumed tolerable downstream) and treats
//! exhaustion or a permanent failure as fatal for the run.

use std::thread;
use std::time::Duration;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::events::TickBatch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Worth retrying with the same batch.
    #[error("transient sink failure: {0}")]
    Transient(String),
    /// Retrying cannot help; the run halts.
    #[error("permanent sink failure: {0}")]
    Permanent(String),
}

impl SinkError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Transient(_))
    }
}

/// Accepts one tick's ordered batch. Implementations may block; the driver
/// does not start the next tick until `accept` returns.
pub trait EventSink {
    fn accept(&mut self, batch: &TickBatch) -> Result<(), SinkError>;
}

/// Bounded retry with exponential backoff for transient sink failures.
#[derive(Debug, Clone, Copy, PartialEq, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryPolicy {
    /// Total attempts per batch, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles per retry.
    pub base_backoff_ms: u64,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_ms: 100,
        }
    }
}

impl DeliveryPolicy {
    pub fn validate(&self) -> Result<(), crate::error::SimError> {
        if self.max_attempts == 0 {
            return Err(crate::error::SimError::InvalidConfiguration(
                "delivery max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn backoff_after(&self, attempt: u32) -> Duration {
        // attempt is 1-based; cap the shift so the doubling cannot overflow.
        Duration::from_millis(self.base_backoff_ms << (attempt - 1).min(6))
    }
}

/// Delivers one batch through the sink under the retry policy.
pub fn deliver(
    sink: &mut dyn EventSink,
    batch: &TickBatch,
    policy: &DeliveryPolicy,
) -> Result<(), SinkError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match sink.accept(batch) {
            Ok(()) => return Ok(()),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                warn!(tick = batch.tick, attempt, error = %err, "sink rejected batch, retrying");
                let backoff = policy.backoff_after(attempt);
                if !backoff.is_zero() {
                    thread::sleep(backoff);
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Sink that keeps every delivered batch; the workhorse of the test suite.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub batches: Vec<TickBatch>,
}

impl CollectingSink {
    pub fn events(&self) -> impl Iterator<Item = &crate::events::Event> {
        self.batches.iter().flat_map(|b| b.events.iter())
    }
}

impl EventSink for CollectingSink {
    fn accept(&mut self, batch: &TickBatch) -> Result<(), SinkError> {
        self.batches.push(batch.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails the first `failures` accepts, then succeeds.
    struct FlakySink {
        failures: u32,
        permanent: bool,
        accepted: Vec<u64>,
        attempts: u32,
    }

    impl FlakySink {
        fn transient(failures: u32) -> Self {
            Self {
                failures,
                permanent: false,
                accepted: Vec::new(),
                attempts: 0,
            }
        }
    }

    impl EventSink for FlakySink {
        fn accept(&mut self, batch: &TickBatch) -> Result<(), SinkError> {
            self.attempts += 1;
            if self.attempts <= self.failures {
                return if self.permanent {
                    Err(SinkError::Permanent("broker gone".into()))
                } else {
                    Err(SinkError::Transient("broker busy".into()))
                };
            }
            self.accepted.push(batch.tick);
            Ok(())
        }
    }

    fn no_backoff(max_attempts: u32) -> DeliveryPolicy {
        DeliveryPolicy {
            max_attempts,
            base_backoff_ms: 0,
        }
    }

    #[test]
    fn transient_failures_are_retried_with_the_same_batch() {
        let mut sink = FlakySink::transient(2);
        let batch = TickBatch::new(7, Vec::new());
        deliver(&mut sink, &batch, &no_backoff(5)).expect("delivered");
        assert_eq!(sink.attempts, 3);
        assert_eq!(sink.accepted, vec![7]);
    }

    #[test]
    fn retries_are_bounded() {
        let mut sink = FlakySink::transient(10);
        let batch = TickBatch::new(1, Vec::new());
        let err = deliver(&mut sink, &batch, &no_backoff(3)).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(sink.attempts, 3, "stops at max_attempts");
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let mut sink = FlakySink {
            failures: 10,
            permanent: true,
            accepted: Vec::new(),
            attempts: 0,
        };
        let batch = TickBatch::new(1, Vec::new());
        let err = deliver(&mut sink, &batch, &no_backoff(5)).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(sink.attempts, 1);
    }

    #[test]
    fn zero_attempts_policy_is_rejected() {
        let policy = DeliveryPolicy {
            max_attempts: 0,
            base_backoff_ms: 0,
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let policy = DeliveryPolicy {
            max_attempts: 20,
            base_backoff_ms: 10,
        };
        assert_eq!(policy.backoff_after(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(20));
        assert_eq!(policy.backoff_after(4), Duration::from_millis(80));
        assert_eq!(policy.backoff_after(19), Duration::from_millis(640));
    }
}
