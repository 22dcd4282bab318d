use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::events::EventInjector;
use super::fleet::{Fleet, FleetSummary};
use super::publisher::{PositionPublisher, PushCounts};
use super::signals::cycle_signals;
use crate::models::accident::Accident;
use crate::models::stats::{CONGESTION_THRESHOLD, OVERSPEED_THRESHOLD};
use crate::models::violation::Violation;
use crate::store::TrafficStore;

#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub push: PushCounts,
    pub accident: Option<Accident>,
    pub violation: Option<Violation>,
    pub signals_cycled: bool,
    pub summary: FleetSummary,
}

/// Owns the fleet and everything a tick needs besides the network push.
pub struct Simulation<S> {
    store: Arc<S>,
    fleet: Fleet,
    injector: EventInjector,
    rng: StdRng,
    tick: u64,
}

impl<S: TrafficStore> Simulation<S> {
    pub fn new(store: Arc<S>, fleet: Fleet, injector: EventInjector, rng: StdRng) -> Self {
        Self {
            store,
            fleet,
            injector,
            rng,
            tick: 0,
        }
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Rolls for an accident and persists it if the backlog allows.
    pub async fn maybe_inject_accident(&mut self) -> Result<Option<Accident>> {
        if !self.injector.roll_accident(&mut self.rng) {
            return Ok(None);
        }
        let pending = self.store.count_pending_accidents().await?;
        let Some(accident) = self.injector.accident(&self.fleet, pending, &mut self.rng) else {
            return Ok(None);
        };

        let stored = self.store.insert_accident(accident, Utc::now()).await?;
        info!(
            "[ACCIDENT] {} - {} on {} ({} injuries)",
            stored.severity.as_str().to_uppercase(),
            stored.vehicle,
            stored.road_name,
            stored.injuries
        );
        Ok(Some(stored))
    }

    /// Rolls for a violation and persists it unless the lifetime cap is reached.
    pub async fn maybe_inject_violation(&mut self) -> Result<Option<Violation>> {
        if !self.injector.roll_violation(&mut self.rng) {
            return Ok(None);
        }
        let total = self.store.count_violations().await?;
        let Some(violation) = self.injector.violation(&mut self.fleet, total, &mut self.rng) else {
            return Ok(None);
        };

        let stored = self.store.insert_violation(violation, Utc::now()).await?;
        info!(
            "[VIOLATION] {} - {} ({:.0} km/h) Fine: Rs.{}",
            stored.violation_type, stored.vehicle, stored.speed, stored.fine_amount
        );
        Ok(Some(stored))
    }

    /// Move, push, inject, cycle. The tick counter only advances on success.
    pub async fn tick(&mut self, publisher: &PositionPublisher) -> Result<TickReport> {
        self.fleet.step(&mut self.rng);
        let push = publisher.publish_fleet(&self.fleet).await;

        let params = *self.injector.params();
        let accident = if params.accident_due(self.tick) {
            self.maybe_inject_accident().await?
        } else {
            None
        };
        let violation = if params.violation_due(self.tick) {
            self.maybe_inject_violation().await?
        } else {
            None
        };
        let signals_cycled = params.signals_due(self.tick);
        if signals_cycled {
            cycle_signals(self.store.as_ref(), &mut self.rng).await?;
        }

        self.tick += 1;
        Ok(TickReport {
            tick: self.tick,
            push,
            accident,
            violation,
            signals_cycled,
            summary: self.fleet.summary(OVERSPEED_THRESHOLD, CONGESTION_THRESHOLD),
        })
    }
}

/// Runs ticks until Ctrl-C. Errors are logged and retried after `backoff`.
pub async fn run<S: TrafficStore>(
    mut sim: Simulation<S>,
    publisher: PositionPublisher,
    interval: Duration,
    backoff: Duration,
) -> Result<()> {
    info!("Vehicles: {} initialized", sim.fleet().len());
    info!("Press Ctrl+C to stop");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let pause = tokio::select! {
            _ = &mut shutdown => break,
            outcome = sim.tick(&publisher) => match outcome {
                Ok(report) => {
                    info!(
                        "[Tick {:04}] Vehicles: {} | Avg: {:.0} km/h | Fast: {} | Slow: {} | Pushed: {} | Dropped: {}",
                        report.tick,
                        report.summary.vehicles,
                        report.summary.avg_speed,
                        report.summary.fast,
                        report.summary.slow,
                        report.push.delivered,
                        report.push.dropped,
                    );
                    interval
                }
                Err(e) => {
                    error!("Tick {} failed: {:#}", sim.tick_count(), e);
                    backoff
                }
            },
        };

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    let totals = publisher.metrics().snapshot();
    info!(
        "Simulator stopped after {} ticks (delivered {}, retried {}, dropped {})",
        sim.tick_count(),
        totals.delivered,
        totals.retried,
        totals.dropped
    );
    Ok(())
}
