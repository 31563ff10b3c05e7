pub mod clock;
pub mod error;
pub mod events;
pub mod network;
pub mod runner;
pub mod scenario;
pub mod sink;
pub mod systems;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
pub mod train;
pub mod turnstile;
