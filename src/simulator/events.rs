//! Random accident and violation generation.

use anyhow::Result;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use super::fleet::Fleet;
use crate::models::accident::{NewAccident, Severity};
use crate::models::stats::OVERSPEED_THRESHOLD;
use crate::models::violation::{NewViolation, ViolationType};
use crate::models::{round_to, GeoPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventParams {
    pub accident_probability: f64,
    /// No new accidents while this many are Pending.
    pub pending_accident_cap: i64,
    pub accident_every: u64,
    pub violation_probability: f64,
    /// Lifetime ceiling on persisted violations.
    pub violation_cap: i64,
    pub violation_every: u64,
    pub signal_every: u64,
    pub inflated_speed: (f64, f64),
}

impl Default for EventParams {
    fn default() -> Self {
        Self {
            accident_probability: 0.05,
            pending_accident_cap: 5,
            accident_every: 3,
            violation_probability: 0.08,
            violation_cap: 30,
            violation_every: 2,
            signal_every: 5,
            inflated_speed: (85.0, 120.0),
        }
    }
}

impl EventParams {
    pub fn accident_due(&self, tick: u64) -> bool {
        self.accident_every > 0 && tick % self.accident_every == 0
    }

    pub fn violation_due(&self, tick: u64) -> bool {
        self.violation_every > 0 && tick % self.violation_every == 0
    }

    pub fn signals_due(&self, tick: u64) -> bool {
        self.signal_every > 0 && tick % self.signal_every == 0
    }
}

const SEVERITY_WEIGHTS: [f64; 4] = [0.45, 0.30, 0.18, 0.07];

fn descriptions(severity: Severity) -> &'static [&'static str] {
    match severity {
        Severity::Minor => &[
            "Minor fender bender, no injuries",
            "Low-speed rear-end collision",
            "Side mirror clipped, minor scratch",
            "Vehicle bumped at traffic signal",
            "Slow-speed sideswipe near intersection",
        ],
        Severity::Moderate => &[
            "Two-vehicle collision, minor injuries reported",
            "Vehicle hit road divider at moderate speed",
            "Sideswipe collision, driver injured",
            "Motorcycle slipped on wet road",
            "Auto-rickshaw overturned, passengers shaken",
        ],
        Severity::Severe => &[
            "Head-on collision, multiple injuries",
            "Vehicle rolled over, passengers trapped",
            "High-speed crash into barrier",
            "Multi-vehicle pileup, road blocked",
            "Bus brakes failed, crashed into divider",
        ],
        Severity::Fatal => &[
            "Fatal head-on collision",
            "Pedestrian struck at high speed",
            "Bus overturned, critical casualties",
            "Truck collision, fatalities reported",
        ],
    }
}

/// Inclusive injury count range per severity.
pub fn injury_range(severity: Severity) -> (i32, i32) {
    match severity {
        Severity::Minor => (0, 0),
        Severity::Moderate => (0, 2),
        Severity::Severe => (1, 5),
        Severity::Fatal => (1, 8),
    }
}

/// Decides which events fire and what they contain. Persisting them is the
/// caller's job, so everything here is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct EventInjector {
    params: EventParams,
    severity: WeightedIndex<f64>,
}

impl EventInjector {
    pub fn new(params: EventParams) -> Result<Self> {
        Ok(Self {
            params,
            severity: WeightedIndex::new(SEVERITY_WEIGHTS)?,
        })
    }

    pub fn params(&self) -> &EventParams {
        &self.params
    }

    pub fn roll_accident<R: Rng>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.params.accident_probability)
    }

    pub fn roll_violation<R: Rng>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.params.violation_probability)
    }

    pub fn sample_severity<R: Rng>(&self, rng: &mut R) -> Severity {
        Severity::ALL[self.severity.sample(rng)]
    }

    /// Builds an accident for a random vehicle unless the Pending backlog is full.
    pub fn accident<R: Rng>(&self, fleet: &Fleet, pending: i64, rng: &mut R) -> Option<NewAccident> {
        if pending >= self.params.pending_accident_cap {
            return None;
        }
        let vehicle = fleet.vehicles().choose(rng)?;

        let severity = self.sample_severity(rng);
        let description = descriptions(severity).choose(rng).copied().unwrap_or_default();
        let (lo, hi) = injury_range(severity);

        Some(NewAccident {
            vehicle: vehicle.id.clone(),
            position: rounded(vehicle.position),
            road_name: fleet.road_of(vehicle).name.clone(),
            severity,
            description: description.to_string(),
            injuries: rng.gen_range(lo..=hi),
        })
    }

    /// Builds a violation for a random vehicle unless the lifetime cap is hit.
    ///
    /// A random Overspeeding pick bumps the vehicle's speed so the record is
    /// believable; that new speed stays with the vehicle.
    pub fn violation<R: Rng>(&self, fleet: &mut Fleet, total: i64, rng: &mut R) -> Option<NewViolation> {
        if total >= self.params.violation_cap {
            return None;
        }
        let vehicle = fleet.vehicles_mut().choose_mut(rng)?;

        let violation_type = if vehicle.speed > OVERSPEED_THRESHOLD {
            ViolationType::Overspeeding
        } else {
            let picked = *ViolationType::ALL.choose(rng)?;
            if picked == ViolationType::Overspeeding {
                let (lo, hi) = self.params.inflated_speed;
                vehicle.speed = rng.gen_range(lo..=hi);
            }
            picked
        };

        Some(NewViolation {
            vehicle: vehicle.id.clone(),
            position: rounded(vehicle.position),
            speed: round_to(vehicle.speed, 1),
            lane: vehicle.lane.as_str().to_string(),
            violation_type,
        })
    }
}

fn rounded(p: GeoPoint) -> GeoPoint {
    GeoPoint::new(round_to(p.lat, 6), round_to(p.lng, 6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::fleet::MotionParams;
    use crate::simulator::network::default_roads;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn fleet(rng: &mut StdRng, n: usize) -> Fleet {
        Fleet::spawn(default_roads(), n, MotionParams::default(), rng).unwrap()
    }

    #[test]
    fn accident_backlog_cap_blocks_generation() {
        let mut rng = StdRng::seed_from_u64(1);
        let fleet = fleet(&mut rng, 10);
        let injector = EventInjector::new(EventParams::default()).unwrap();

        assert!(injector.accident(&fleet, 5, &mut rng).is_none());
        assert!(injector.accident(&fleet, 12, &mut rng).is_none());
        assert!(injector.accident(&fleet, 4, &mut rng).is_some());
    }

    #[test]
    fn accident_fields_follow_severity_tables() {
        let mut rng = StdRng::seed_from_u64(2);
        let fleet = fleet(&mut rng, 10);
        let injector = EventInjector::new(EventParams::default()).unwrap();

        for _ in 0..500 {
            let accident = injector.accident(&fleet, 0, &mut rng).unwrap();
            let (lo, hi) = injury_range(accident.severity);
            assert!((lo..=hi).contains(&accident.injuries));
            assert!(descriptions(accident.severity).contains(&accident.description.as_str()));
            assert!(fleet.vehicles().iter().any(|v| v.id == accident.vehicle));
        }
    }

    #[test]
    fn severity_weights_favour_minor() {
        let mut rng = StdRng::seed_from_u64(3);
        let injector = EventInjector::new(EventParams::default()).unwrap();
        let mut counts: HashMap<Severity, usize> = HashMap::new();
        for _ in 0..10_000 {
            *counts.entry(injector.sample_severity(&mut rng)).or_default() += 1;
        }
        let minor = counts[&Severity::Minor];
        let fatal = counts[&Severity::Fatal];
        assert!((4000..5000).contains(&minor), "minor drawn {} times", minor);
        assert!((400..1000).contains(&fatal), "fatal drawn {} times", fatal);
    }

    #[test]
    fn violation_cap_is_final() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut fleet = fleet(&mut rng, 10);
        let injector = EventInjector::new(EventParams::default()).unwrap();

        assert!(injector.violation(&mut fleet, 29, &mut rng).is_some());
        for total in [30, 31, 1000] {
            assert!(injector.violation(&mut fleet, total, &mut rng).is_none());
        }
    }

    #[test]
    fn fast_vehicle_is_always_overspeeding() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut fleet = fleet(&mut rng, 5);
        for v in fleet.vehicles_mut() {
            v.speed = 95.0;
        }
        let injector = EventInjector::new(EventParams::default()).unwrap();

        for _ in 0..50 {
            let violation = injector.violation(&mut fleet, 0, &mut rng).unwrap();
            assert_eq!(violation.violation_type, ViolationType::Overspeeding);
        }
    }

    #[test]
    fn random_overspeeding_inflates_vehicle_speed() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut fleet = fleet(&mut rng, 1);
        let injector = EventInjector::new(EventParams::default()).unwrap();

        let mut seen_inflation = false;
        for _ in 0..200 {
            fleet.vehicles_mut()[0].speed = 30.0;
            let violation = injector.violation(&mut fleet, 0, &mut rng).unwrap();
            if violation.violation_type == ViolationType::Overspeeding {
                seen_inflation = true;
                assert!((85.0..=120.0).contains(&violation.speed));
                assert!(fleet.vehicles()[0].speed >= 85.0);
            } else {
                assert_eq!(violation.speed, 30.0);
            }
        }
        assert!(seen_inflation);
    }

    #[test]
    fn schedule_moduli() {
        let params = EventParams::default();
        let due: Vec<u64> = (0..10).filter(|t| params.accident_due(*t)).collect();
        assert_eq!(due, [0, 3, 6, 9]);
        assert!(params.violation_due(4) && !params.violation_due(5));
        assert!(params.signals_due(10) && !params.signals_due(11));
    }
}
