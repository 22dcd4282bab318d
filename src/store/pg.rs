use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::TrafficStore;
use crate::auth::RegistrationError;
use crate::db::{queries, DbPool};
use crate::models::accident::{Accident, AccidentRow, AccidentStatus, DispatchOutcome, NewAccident};
use crate::models::operator::{NewOperator, Operator};
use crate::models::signal::{SignalState, TrafficSignal, TrafficSignalRow};
use crate::models::stats::{StatsSnapshot, OVERSPEED_THRESHOLD};
use crate::models::vehicle::{Vehicle, VehicleUpdate};
use crate::models::violation::{NewViolation, Violation, ViolationRow};
use crate::models::GeoPoint;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Reads, mutates and writes back one accident status under a row lock.
    async fn update_status<T>(
        &self,
        id: i64,
        mutate: impl FnOnce(&mut AccidentStatus) -> T + Send,
    ) -> Result<Option<(Accident, T)>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<AccidentRow> = sqlx::query_as(queries::SELECT_ACCIDENT_FOR_UPDATE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut accident = Accident::try_from(row)?;
        let outcome = mutate(&mut accident.status);

        sqlx::query(queries::UPDATE_ACCIDENT_STATUS)
            .bind(id)
            .bind(accident.status.kind())
            .bind(accident.status.units().to_vec())
            .bind(accident.status.resolved_at())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("Accident {} is now '{}'", id, accident.status);

        Ok(Some((accident, outcome)))
    }
}

impl TrafficStore for PgStore {
    async fn stats(&self) -> Result<StatsSnapshot> {
        let snapshot = sqlx::query_as(queries::SELECT_STATS)
            .bind(OVERSPEED_THRESHOLD)
            .fetch_one(&self.pool)
            .await?;
        Ok(snapshot)
    }

    async fn vehicles(&self) -> Result<Vec<Vehicle>> {
        let vehicles = sqlx::query_as(queries::SELECT_VEHICLES)
            .fetch_all(&self.pool)
            .await?;
        Ok(vehicles)
    }

    async fn slow_vehicles(&self, below_kmh: f64) -> Result<Vec<Vehicle>> {
        let vehicles = sqlx::query_as(queries::SELECT_SLOW_VEHICLES)
            .bind(below_kmh)
            .fetch_all(&self.pool)
            .await?;
        Ok(vehicles)
    }

    async fn upsert_vehicle(
        &self,
        vehicle_id: &str,
        update: &VehicleUpdate,
        now: DateTime<Utc>,
    ) -> Result<Vehicle> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Vehicle> = sqlx::query_as(queries::SELECT_VEHICLE_FOR_UPDATE)
            .bind(vehicle_id)
            .fetch_optional(&mut *tx)
            .await?;

        let mut vehicle = existing.unwrap_or_else(|| Vehicle::fresh(vehicle_id, now));
        vehicle.apply(update, now);

        sqlx::query(queries::UPSERT_VEHICLE)
            .bind(&vehicle.vehicle_id)
            .bind(vehicle.lat)
            .bind(vehicle.lng)
            .bind(vehicle.speed)
            .bind(vehicle.heading)
            .bind(vehicle.last_updated)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(vehicle)
    }

    async fn accidents(&self) -> Result<Vec<Accident>> {
        let rows: Vec<AccidentRow> = sqlx::query_as(queries::SELECT_ACCIDENTS)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| Accident::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn insert_accident(&self, accident: NewAccident, now: DateTime<Utc>) -> Result<Accident> {
        let row: AccidentRow = sqlx::query_as(queries::INSERT_ACCIDENT)
            .bind(&accident.vehicle)
            .bind(accident.position.lat)
            .bind(accident.position.lng)
            .bind(&accident.road_name)
            .bind(accident.severity.as_str())
            .bind(&accident.description)
            .bind(accident.injuries)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(Accident::try_from(row)?)
    }

    async fn count_pending_accidents(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(queries::COUNT_PENDING_ACCIDENTS)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn dispatch_accident(
        &self,
        id: i64,
        unit: &str,
    ) -> Result<Option<(Accident, DispatchOutcome)>> {
        self.update_status(id, |status| status.dispatch(unit)).await
    }

    async fn resolve_accident(&self, id: i64, at: DateTime<Utc>) -> Result<Option<Accident>> {
        let resolved = self.update_status(id, |status| status.resolve(at)).await?;
        Ok(resolved.map(|(accident, ())| accident))
    }

    async fn violations(&self) -> Result<Vec<Violation>> {
        let rows: Vec<ViolationRow> = sqlx::query_as(queries::SELECT_VIOLATIONS)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| Violation::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn insert_violation(&self, violation: NewViolation, now: DateTime<Utc>) -> Result<Violation> {
        let row: ViolationRow = sqlx::query_as(queries::INSERT_VIOLATION)
            .bind(&violation.vehicle)
            .bind(violation.position.lat)
            .bind(violation.position.lng)
            .bind(violation.speed)
            .bind(&violation.lane)
            .bind(violation.violation_type.as_str())
            .bind(violation.violation_type.video_clip())
            .bind(violation.violation_type.fine())
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(Violation::try_from(row)?)
    }

    async fn count_violations(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(queries::COUNT_VIOLATIONS)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn signals(&self) -> Result<Vec<TrafficSignal>> {
        let rows: Vec<TrafficSignalRow> = sqlx::query_as(queries::SELECT_SIGNALS)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| TrafficSignal::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn ensure_signal(&self, name: &str, position: GeoPoint, cycle_time: i32) -> Result<TrafficSignal> {
        let row: TrafficSignalRow = sqlx::query_as(queries::UPSERT_SIGNAL)
            .bind(name)
            .bind(position.lat)
            .bind(position.lng)
            .bind(cycle_time)
            .fetch_one(&self.pool)
            .await?;
        Ok(TrafficSignal::try_from(row)?)
    }

    async fn set_signal_state(&self, id: i64, state: SignalState) -> Result<()> {
        let done = sqlx::query(queries::UPDATE_SIGNAL_STATE)
            .bind(id)
            .bind(state.as_str())
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            bail!("no traffic signal with id {}", id);
        }
        Ok(())
    }

    async fn create_operator(&self, operator: NewOperator, now: DateTime<Utc>) -> Result<Operator> {
        let created = sqlx::query_as(queries::INSERT_OPERATOR)
            .bind(&operator.operator_id)
            .bind(&operator.name)
            .bind(&operator.password_hash)
            .bind(&operator.role)
            .bind(now)
            .fetch_one(&self.pool)
            .await;

        match created {
            Ok(created) => Ok(created),
            Err(e) if is_unique_violation(&e) => Err(RegistrationError::DuplicateOperator.into()),
            Err(e) => Err(e).with_context(|| format!("failed to create operator {}", operator.operator_id)),
        }
    }

    async fn operator(&self, operator_id: &str) -> Result<Option<Operator>> {
        let operator = sqlx::query_as(queries::SELECT_OPERATOR)
            .bind(operator_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(operator)
    }

    async fn record_login(&self, operator_id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(queries::UPDATE_OPERATOR_LAST_LOGIN)
            .bind(operator_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// SQLSTATE 23505, raised when a concurrent insert won the primary key.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.code().as_deref() == Some("23505"))
}
