//! Persistence seam shared by the API server and the simulator.
//!
//! `PgStore` is the production backend; `MemoryStore` backs tests and
//! self-contained runs.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future::Future;

use crate::models::accident::{Accident, DispatchOutcome, NewAccident};
use crate::models::operator::{NewOperator, Operator};
use crate::models::signal::{SignalState, TrafficSignal};
use crate::models::stats::StatsSnapshot;
use crate::models::vehicle::{Vehicle, VehicleUpdate};
use crate::models::violation::{NewViolation, Violation};
use crate::models::GeoPoint;

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

pub trait TrafficStore: Send + Sync + 'static {
    fn stats(&self) -> impl Future<Output = Result<StatsSnapshot>> + Send;

    fn vehicles(&self) -> impl Future<Output = Result<Vec<Vehicle>>> + Send;

    /// Vehicles strictly slower than `below_kmh`.
    fn slow_vehicles(&self, below_kmh: f64) -> impl Future<Output = Result<Vec<Vehicle>>> + Send;

    /// Creates the vehicle on first sighting, then applies the present fields.
    fn upsert_vehicle(
        &self,
        vehicle_id: &str,
        update: &VehicleUpdate,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vehicle>> + Send;

    /// Newest first.
    fn accidents(&self) -> impl Future<Output = Result<Vec<Accident>>> + Send;

    fn insert_accident(
        &self,
        accident: NewAccident,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Accident>> + Send;

    fn count_pending_accidents(&self) -> impl Future<Output = Result<i64>> + Send;

    /// Atomically adds `unit` to the accident's dispatch list.
    /// `None` when the accident does not exist.
    fn dispatch_accident(
        &self,
        id: i64,
        unit: &str,
    ) -> impl Future<Output = Result<Option<(Accident, DispatchOutcome)>>> + Send;

    /// `None` when the accident does not exist.
    fn resolve_accident(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Accident>>> + Send;

    /// Newest first.
    fn violations(&self) -> impl Future<Output = Result<Vec<Violation>>> + Send;

    fn insert_violation(
        &self,
        violation: NewViolation,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Violation>> + Send;

    fn count_violations(&self) -> impl Future<Output = Result<i64>> + Send;

    fn signals(&self) -> impl Future<Output = Result<Vec<TrafficSignal>>> + Send;

    /// Inserts a Green signal unless one with `name` already exists.
    fn ensure_signal(
        &self,
        name: &str,
        position: GeoPoint,
        cycle_time: i32,
    ) -> impl Future<Output = Result<TrafficSignal>> + Send;

    fn set_signal_state(&self, id: i64, state: SignalState) -> impl Future<Output = Result<()>> + Send;

    /// Fails if `operator_id` is taken.
    fn create_operator(&self, operator: NewOperator, now: DateTime<Utc>) -> impl Future<Output = Result<Operator>> + Send;

    fn operator(&self, operator_id: &str) -> impl Future<Output = Result<Option<Operator>>> + Send;

    fn record_login(&self, operator_id: &str, at: DateTime<Utc>) -> impl Future<Output = Result<()>> + Send;
}
