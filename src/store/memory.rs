use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::TrafficStore;
use crate::auth::RegistrationError;
use crate::models::accident::{Accident, DispatchOutcome, NewAccident};
use crate::models::operator::{NewOperator, Operator};
use crate::models::signal::{SignalState, TrafficSignal};
use crate::models::stats::{StatsSnapshot, OVERSPEED_THRESHOLD};
use crate::models::vehicle::{Vehicle, VehicleUpdate};
use crate::models::violation::{NewViolation, Violation};
use crate::models::GeoPoint;

#[derive(Debug, Default)]
struct Tables {
    vehicles: BTreeMap<String, Vehicle>,
    accidents: Vec<Accident>,
    violations: Vec<Violation>,
    signals: Vec<TrafficSignal>,
    operators: BTreeMap<String, Operator>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store. One lock guards every table, so each call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(rows: &[T]) -> Vec<T> {
    rows.iter().rev().cloned().collect()
}

impl TrafficStore for MemoryStore {
    async fn stats(&self) -> Result<StatsSnapshot> {
        let t = self.tables.read().await;
        let pending = t.accidents.iter().filter(|a| a.status.is_pending());

        Ok(StatsSnapshot {
            total_vehicles: t.vehicles.len() as i64,
            speed_sum: t.vehicles.values().map(|v| v.speed).sum(),
            overspeeding: t
                .vehicles
                .values()
                .filter(|v| v.speed > OVERSPEED_THRESHOLD)
                .count() as i64,
            active_accidents: pending.clone().count() as i64,
            total_accidents: t.accidents.len() as i64,
            severe_accidents: pending.filter(|a| a.severity.is_severe()).count() as i64,
            total_violations: t.violations.len() as i64,
        })
    }

    async fn vehicles(&self) -> Result<Vec<Vehicle>> {
        Ok(self.tables.read().await.vehicles.values().cloned().collect())
    }

    async fn slow_vehicles(&self, below_kmh: f64) -> Result<Vec<Vehicle>> {
        let t = self.tables.read().await;
        Ok(t.vehicles
            .values()
            .filter(|v| v.speed < below_kmh)
            .cloned()
            .collect())
    }

    async fn upsert_vehicle(
        &self,
        vehicle_id: &str,
        update: &VehicleUpdate,
        now: DateTime<Utc>,
    ) -> Result<Vehicle> {
        let mut t = self.tables.write().await;
        let vehicle = t
            .vehicles
            .entry(vehicle_id.to_string())
            .or_insert_with(|| Vehicle::fresh(vehicle_id, now));
        vehicle.apply(update, now);
        Ok(vehicle.clone())
    }

    async fn accidents(&self) -> Result<Vec<Accident>> {
        Ok(newest_first(&self.tables.read().await.accidents))
    }

    async fn insert_accident(&self, accident: NewAccident, now: DateTime<Utc>) -> Result<Accident> {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        let accident = accident.into_accident(id, now);
        t.accidents.push(accident.clone());
        Ok(accident)
    }

    async fn count_pending_accidents(&self) -> Result<i64> {
        let t = self.tables.read().await;
        Ok(t.accidents.iter().filter(|a| a.status.is_pending()).count() as i64)
    }

    async fn dispatch_accident(
        &self,
        id: i64,
        unit: &str,
    ) -> Result<Option<(Accident, DispatchOutcome)>> {
        let mut t = self.tables.write().await;
        Ok(t.accidents.iter_mut().find(|a| a.id == id).map(|accident| {
            let outcome = accident.status.dispatch(unit);
            (accident.clone(), outcome)
        }))
    }

    async fn resolve_accident(&self, id: i64, at: DateTime<Utc>) -> Result<Option<Accident>> {
        let mut t = self.tables.write().await;
        Ok(t.accidents.iter_mut().find(|a| a.id == id).map(|accident| {
            accident.status.resolve(at);
            accident.clone()
        }))
    }

    async fn violations(&self) -> Result<Vec<Violation>> {
        Ok(newest_first(&self.tables.read().await.violations))
    }

    async fn insert_violation(&self, violation: NewViolation, now: DateTime<Utc>) -> Result<Violation> {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        let violation = violation.into_violation(id, now);
        t.violations.push(violation.clone());
        Ok(violation)
    }

    async fn count_violations(&self) -> Result<i64> {
        Ok(self.tables.read().await.violations.len() as i64)
    }

    async fn signals(&self) -> Result<Vec<TrafficSignal>> {
        Ok(self.tables.read().await.signals.clone())
    }

    async fn ensure_signal(&self, name: &str, position: GeoPoint, cycle_time: i32) -> Result<TrafficSignal> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t.signals.iter().find(|s| s.name == name) {
            return Ok(existing.clone());
        }
        let signal = TrafficSignal {
            id: t.next_id(),
            name: name.to_string(),
            position,
            state: SignalState::Green,
            cycle_time,
        };
        t.signals.push(signal.clone());
        Ok(signal)
    }

    async fn set_signal_state(&self, id: i64, state: SignalState) -> Result<()> {
        let mut t = self.tables.write().await;
        match t.signals.iter_mut().find(|s| s.id == id) {
            Some(signal) => {
                signal.state = state;
                Ok(())
            }
            None => bail!("no traffic signal with id {}", id),
        }
    }

    async fn create_operator(&self, operator: NewOperator, now: DateTime<Utc>) -> Result<Operator> {
        let mut t = self.tables.write().await;
        if t.operators.contains_key(&operator.operator_id) {
            return Err(RegistrationError::DuplicateOperator.into());
        }
        let operator = operator.into_operator(now);
        t.operators
            .insert(operator.operator_id.clone(), operator.clone());
        Ok(operator)
    }

    async fn operator(&self, operator_id: &str) -> Result<Option<Operator>> {
        Ok(self.tables.read().await.operators.get(operator_id).cloned())
    }

    async fn record_login(&self, operator_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut t = self.tables.write().await;
        if let Some(op) = t.operators.get_mut(operator_id) {
            op.last_login = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::models::accident::Severity;

    fn crash(vehicle: &str, severity: Severity) -> NewAccident {
        NewAccident {
            vehicle: vehicle.to_string(),
            position: GeoPoint::new(27.71, 85.32),
            road_name: "Kantipath".to_string(),
            severity,
            description: "test".to_string(),
            injuries: 0,
        }
    }

    async fn set_speed(store: &MemoryStore, id: &str, speed: f64) {
        let update = VehicleUpdate {
            speed: Some(speed),
            ..Default::default()
        };
        store.upsert_vehicle(id, &update, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn severe_count_ignores_resolved_accidents() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let fatal = store.insert_accident(crash("A", Severity::Fatal), now).await.unwrap();
        store.insert_accident(crash("B", Severity::Severe), now).await.unwrap();
        store.insert_accident(crash("C", Severity::Minor), now).await.unwrap();

        store.resolve_accident(fatal.id, now).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_accidents, 3);
        assert_eq!(stats.active_accidents, 2);
        assert_eq!(stats.severe_accidents, 1);
    }

    #[tokio::test]
    async fn overspeeding_is_strictly_above_threshold() {
        let store = MemoryStore::new();
        set_speed(&store, "A", 80.0).await;
        set_speed(&store, "B", 80.1).await;
        set_speed(&store, "C", 19.9).await;

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.overspeeding, 1);
        assert_eq!(store.slow_vehicles(20.0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listings_are_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_accident(crash("first", Severity::Minor), now).await.unwrap();
        store.insert_accident(crash("second", Severity::Minor), now).await.unwrap();

        let listed = store.accidents().await.unwrap();
        assert_eq!(listed[0].vehicle, "second");
        assert_eq!(listed[1].vehicle, "first");
    }

    #[tokio::test]
    async fn ensure_signal_keeps_existing_state() {
        let store = MemoryStore::new();
        let pos = GeoPoint::new(27.69, 85.28);
        let sig = store.ensure_signal("Kalanki Chowk", pos, 60).await.unwrap();
        store.set_signal_state(sig.id, SignalState::Red).await.unwrap();

        let again = store.ensure_signal("Kalanki Chowk", pos, 60).await.unwrap();
        assert_eq!(again.id, sig.id);
        assert_eq!(again.state, SignalState::Red);
        assert_eq!(store.signals().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_operator_is_rejected() {
        let store = MemoryStore::new();
        let op = NewOperator {
            operator_id: "op1".into(),
            name: "Op".into(),
            password_hash: "x".into(),
            role: "Operator".into(),
        };
        store.create_operator(op.clone(), Utc::now()).await.unwrap();
        let err = store.create_operator(op, Utc::now()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<RegistrationError>(),
            Some(&RegistrationError::DuplicateOperator)
        );
    }

    #[tokio::test]
    async fn unknown_signal_state_change_fails() {
        let store = MemoryStore::new();
        assert!(store.set_signal_state(99, SignalState::Red).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatches_keep_every_unit() {
        let store = Arc::new(MemoryStore::new());
        let accident = store
            .insert_accident(crash("A", Severity::Severe), Utc::now())
            .await
            .unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .dispatch_accident(accident.id, &format!("Unit-{}", i))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_some());
        }

        let stored = store.accidents().await.unwrap().remove(0);
        let units = stored.status.units();
        assert_eq!(units.len(), 50);
        for i in 0..50 {
            assert!(units.contains(&format!("Unit-{}", i)));
        }
    }
}
