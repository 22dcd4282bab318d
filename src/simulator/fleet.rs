use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use super::network::Road;
use crate::models::vehicle::VehicleUpdate;
use crate::models::{round_to, GeoPoint};

/// Number of distinct ids the `BA-<n>-PA-<nnnn>` plate pattern can produce.
const PLATE_SPACE: usize = 9 * 9000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Left,
    Right,
    Center,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Right, Lane::Center];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Left => "Left",
            Lane::Right => "Right",
            Lane::Center => "Center",
        }
    }
}

/// Tunables of the motion model. Speeds are km/h, jitter is degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub speed_jitter: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub congestion_probability: f64,
    pub congestion_speed: (f64, f64),
    pub burst_probability: f64,
    pub burst_speed: (f64, f64),
    /// Progress gained per km/h per tick.
    pub step_scale: f64,
    pub reroute_probability: f64,
    pub gps_jitter: f64,
    pub initial_speed: (f64, f64),
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            speed_jitter: 5.0,
            min_speed: 5.0,
            max_speed: 120.0,
            congestion_probability: 0.08,
            congestion_speed: (5.0, 15.0),
            burst_probability: 0.03,
            burst_speed: (80.0, 110.0),
            step_scale: 1e-5,
            reroute_probability: 0.3,
            gps_jitter: 0.0003,
            initial_speed: (20.0, 70.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimVehicle {
    pub id: String,
    /// Index into the fleet's road list.
    pub road: usize,
    pub progress: f64,
    pub direction: Direction,
    pub speed: f64,
    pub heading: f64,
    pub lane: Lane,
    pub position: GeoPoint,
}

impl SimVehicle {
    /// The update pushed to the API, rounded the way the dashboard shows it.
    pub fn position_update(&self) -> VehicleUpdate {
        VehicleUpdate {
            vehicle_id: Some(self.id.clone()),
            lat: Some(round_to(self.position.lat, 6)),
            lng: Some(round_to(self.position.lng, 6)),
            speed: Some(round_to(self.speed, 1)),
            heading: Some(round_to(self.heading, 1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleetSummary {
    pub vehicles: usize,
    pub avg_speed: f64,
    pub fast: usize,
    pub slow: usize,
}

/// Every simulated vehicle plus the road network they drive on.
#[derive(Debug, Clone)]
pub struct Fleet {
    roads: Vec<Road>,
    vehicles: Vec<SimVehicle>,
    params: MotionParams,
}

impl Fleet {
    /// Spawns `count` vehicles at random points of random roads.
    pub fn spawn<R: Rng>(
        roads: Vec<Road>,
        count: usize,
        params: MotionParams,
        rng: &mut R,
    ) -> Result<Self> {
        if roads.is_empty() {
            bail!("cannot build a fleet without roads");
        }
        if count > PLATE_SPACE {
            bail!("at most {} vehicles fit the plate pattern, asked for {}", PLATE_SPACE, count);
        }

        let mut seen = HashSet::with_capacity(count);
        let mut vehicles = Vec::with_capacity(count);
        while vehicles.len() < count {
            let id = format!("BA-{}-PA-{}", rng.gen_range(1..=9), rng.gen_range(1000..=9999));
            if !seen.insert(id.clone()) {
                continue;
            }

            let road = rng.gen_range(0..roads.len());
            let progress: f64 = rng.gen();
            let direction = if rng.gen_bool(0.5) {
                Direction::Forward
            } else {
                Direction::Backward
            };
            let lane = *Lane::ALL.choose(rng).unwrap_or(&Lane::Left);

            vehicles.push(SimVehicle {
                id,
                road,
                progress,
                direction,
                speed: rng.gen_range(params.initial_speed.0..=params.initial_speed.1),
                heading: roads[road].heading(),
                lane,
                position: roads[road].point_at(progress),
            });
        }

        Self::from_parts(roads, vehicles, params)
    }

    /// Assembles a fleet from existing vehicles. Every vehicle must sit on
    /// one of `roads`.
    pub fn from_parts(roads: Vec<Road>, vehicles: Vec<SimVehicle>, params: MotionParams) -> Result<Self> {
        if roads.is_empty() {
            bail!("cannot build a fleet without roads");
        }
        if let Some(stray) = vehicles.iter().find(|v| v.road >= roads.len()) {
            bail!("vehicle {} is on road {} of {}", stray.id, stray.road, roads.len());
        }
        Ok(Self {
            roads,
            vehicles,
            params,
        })
    }

    /// Advances every vehicle by one tick. Vehicles do not interact.
    pub fn step<R: Rng>(&mut self, rng: &mut R) {
        for vehicle in &mut self.vehicles {
            advance(vehicle, &self.roads, &self.params, rng);
        }
    }

    pub fn vehicles(&self) -> &[SimVehicle] {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> &mut [SimVehicle] {
        &mut self.vehicles
    }

    pub fn road_of(&self, vehicle: &SimVehicle) -> &Road {
        &self.roads[vehicle.road]
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn summary(&self, fast_above: f64, slow_below: f64) -> FleetSummary {
        let n = self.vehicles.len();
        let total: f64 = self.vehicles.iter().map(|v| v.speed).sum();
        FleetSummary {
            vehicles: n,
            avg_speed: if n > 0 { total / n as f64 } else { 0.0 },
            fast: self.vehicles.iter().filter(|v| v.speed > fast_above).count(),
            slow: self.vehicles.iter().filter(|v| v.speed < slow_below).count(),
        }
    }
}

/// One tick of the random-walk motion model for a single vehicle.
pub fn advance<R: Rng>(
    vehicle: &mut SimVehicle,
    roads: &[Road],
    params: &MotionParams,
    rng: &mut R,
) {
    vehicle.speed += rng.gen_range(-params.speed_jitter..=params.speed_jitter);
    vehicle.speed = vehicle.speed.clamp(params.min_speed, params.max_speed);

    if rng.gen_bool(params.congestion_probability) {
        vehicle.speed = rng.gen_range(params.congestion_speed.0..=params.congestion_speed.1);
    }
    // Rolled independently; a burst overrides a congestion slowdown.
    if rng.gen_bool(params.burst_probability) {
        vehicle.speed = rng.gen_range(params.burst_speed.0..=params.burst_speed.1);
    }

    vehicle.progress += vehicle.speed * params.step_scale * vehicle.direction.sign();

    if !(0.0..=1.0).contains(&vehicle.progress) {
        vehicle.direction = vehicle.direction.flipped();
        vehicle.progress = vehicle.progress.clamp(0.0, 1.0);

        if rng.gen_bool(params.reroute_probability) {
            vehicle.road = rng.gen_range(0..roads.len());
            vehicle.progress = rng.gen();
            vehicle.heading = roads[vehicle.road].heading();
        }
    }

    let on_road = roads[vehicle.road].point_at(vehicle.progress);
    let jitter = params.gps_jitter;
    vehicle.position = GeoPoint::new(
        on_road.lat + rng.gen_range(-jitter..=jitter),
        on_road.lng + rng.gen_range(-jitter..=jitter),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::network::default_roads;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn vehicle_at(progress: f64, direction: Direction, speed: f64) -> SimVehicle {
        let roads = default_roads();
        SimVehicle {
            id: "BA-1-PA-1000".into(),
            road: 0,
            progress,
            direction,
            speed,
            heading: roads[0].heading(),
            lane: Lane::Center,
            position: roads[0].point_at(progress),
        }
    }

    fn quiet() -> MotionParams {
        MotionParams {
            congestion_probability: 0.0,
            burst_probability: 0.0,
            ..MotionParams::default()
        }
    }

    #[test]
    fn overflowing_progress_flips_direction_and_clamps() {
        let roads = default_roads();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut v = vehicle_at(0.95, Direction::Forward, 60.0);
            let params = MotionParams {
                step_scale: 1e-3,
                ..quiet()
            };
            advance(&mut v, &roads, &params, &mut rng);

            assert_eq!(v.direction, Direction::Backward);
            assert!((0.0..=1.0).contains(&v.progress));
        }
    }

    #[test]
    fn overflow_without_reroute_pins_to_endpoint() {
        let roads = default_roads();
        let mut rng = StdRng::seed_from_u64(11);
        let params = MotionParams {
            reroute_probability: 0.0,
            ..quiet()
        };

        let mut forward = vehicle_at(0.99999, Direction::Forward, 50.0);
        advance(&mut forward, &roads, &params, &mut rng);
        assert_eq!(forward.progress, 1.0);
        assert_eq!(forward.road, 0);

        let mut backward = vehicle_at(0.00001, Direction::Backward, 50.0);
        advance(&mut backward, &roads, &params, &mut rng);
        assert_eq!(backward.progress, 0.0);
        assert_eq!(backward.direction, Direction::Forward);
    }

    #[test]
    fn reroute_takes_heading_of_new_road() {
        let roads = default_roads();
        let mut rng = StdRng::seed_from_u64(3);
        let params = MotionParams {
            reroute_probability: 1.0,
            ..quiet()
        };
        for _ in 0..50 {
            let mut v = vehicle_at(0.99999, Direction::Forward, 50.0);
            advance(&mut v, &roads, &params, &mut rng);
            assert_eq!(v.heading, roads[v.road].heading());
            assert!((0.0..=1.0).contains(&v.progress));
        }
    }

    #[test]
    fn speed_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut fleet = Fleet::spawn(default_roads(), 50, MotionParams::default(), &mut rng).unwrap();
        for _ in 0..500 {
            fleet.step(&mut rng);
            for v in fleet.vehicles() {
                assert!((5.0..=120.0).contains(&v.speed), "speed {} out of range", v.speed);
                assert!((0.0..=1.0).contains(&v.progress));
            }
        }
    }

    #[test]
    fn congestion_forces_crawl_speed() {
        let roads = default_roads();
        let mut rng = StdRng::seed_from_u64(5);
        let params = MotionParams {
            congestion_probability: 1.0,
            burst_probability: 0.0,
            ..MotionParams::default()
        };
        let mut v = vehicle_at(0.5, Direction::Forward, 100.0);
        advance(&mut v, &roads, &params, &mut rng);
        assert!((5.0..=15.0).contains(&v.speed));
    }

    #[test]
    fn position_stays_near_the_road() {
        let roads = default_roads();
        let mut rng = StdRng::seed_from_u64(9);
        let mut v = vehicle_at(0.5, Direction::Forward, 40.0);
        advance(&mut v, &roads, &quiet(), &mut rng);

        let exact = roads[v.road].point_at(v.progress);
        assert!((v.position.lat - exact.lat).abs() <= 0.0003);
        assert!((v.position.lng - exact.lng).abs() <= 0.0003);
    }

    #[test]
    fn spawn_produces_unique_plates() {
        let mut rng = StdRng::seed_from_u64(1);
        let fleet = Fleet::spawn(default_roads(), 100, MotionParams::default(), &mut rng).unwrap();
        let ids: HashSet<_> = fleet.vehicles().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids.len(), 100);
        assert!(fleet.vehicles().iter().all(|v| v.id.starts_with("BA-") && v.id.len() == 12));
    }

    #[test]
    fn spawn_requires_roads() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Fleet::spawn(Vec::new(), 1, MotionParams::default(), &mut rng).is_err());
    }

    #[test]
    fn position_update_is_rounded() {
        let mut v = vehicle_at(0.5, Direction::Forward, 47.26);
        v.position = GeoPoint::new(27.712345678, 85.315432198);
        v.heading = 33.69;
        let update = v.position_update();
        assert_eq!(update.lat, Some(27.712346));
        assert_eq!(update.lng, Some(85.315432));
        assert_eq!(update.speed, Some(47.3));
        assert_eq!(update.heading, Some(33.7));
    }

    #[test]
    fn from_parts_rejects_missing_roads() {
        let vehicle = vehicle_at(0.5, Direction::Forward, 30.0);
        assert!(Fleet::from_parts(Vec::new(), vec![vehicle.clone()], MotionParams::default()).is_err());

        let mut stray = vehicle.clone();
        stray.road = default_roads().len();
        assert!(Fleet::from_parts(default_roads(), vec![stray], MotionParams::default()).is_err());

        let fleet = Fleet::from_parts(default_roads(), vec![vehicle], MotionParams::default()).unwrap();
        assert_eq!(fleet.len(), 1);
    }
}
