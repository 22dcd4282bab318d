//! Synthetic fleet that drives the dashboard.
//!
//! Each tick the fleet moves, positions are pushed to the API over HTTP,
//! and accidents, violations and signal changes are written straight into
//! the store on a fixed tick schedule.

pub mod events;
pub mod fleet;
pub mod network;
pub mod publisher;
pub mod runner;
pub mod signals;

pub use events::{EventInjector, EventParams};
pub use fleet::{Fleet, MotionParams};
pub use publisher::{PositionPublisher, RetryPolicy};
pub use runner::{run, Simulation};
