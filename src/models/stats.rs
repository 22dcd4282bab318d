use serde::Serialize;
use sqlx::FromRow;

use super::round_to;

/// Raw aggregates as the store computes them.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct StatsSnapshot {
    pub total_vehicles: i64,
    pub speed_sum: f64,
    pub overspeeding: i64,
    pub active_accidents: i64,
    pub total_accidents: i64,
    pub severe_accidents: i64,
    pub total_violations: i64,
}

pub const OVERSPEED_THRESHOLD: f64 = 80.0;
pub const CONGESTION_THRESHOLD: f64 = 20.0;

/// Body of `GET /api/stats/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_vehicles: i64,
    pub active_accidents: i64,
    pub total_accidents: i64,
    pub total_violations: i64,
    pub avg_speed: f64,
    pub overspeeding: i64,
    pub severe_accidents: i64,
}

impl From<StatsSnapshot> for DashboardStats {
    fn from(s: StatsSnapshot) -> Self {
        let avg_speed = if s.total_vehicles > 0 {
            round_to(s.speed_sum / s.total_vehicles as f64, 1)
        } else {
            0.0
        };
        Self {
            total_vehicles: s.total_vehicles,
            active_accidents: s.active_accidents,
            total_accidents: s.total_accidents,
            total_violations: s.total_violations,
            avg_speed,
            overspeeding: s.overspeeding,
            severe_accidents: s.severe_accidents,
        }
    }
}
