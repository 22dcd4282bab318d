//! JSON shapes served to the dashboard.

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::accident::Accident;
use crate::models::signal::TrafficSignal;
use crate::models::vehicle::Vehicle;
use crate::models::violation::Violation;

#[derive(Debug, Serialize)]
pub struct VehicleView {
    pub lat: f64,
    pub lng: f64,
    pub speed: f64,
    pub heading: f64,
}

impl From<&Vehicle> for VehicleView {
    fn from(v: &Vehicle) -> Self {
        Self {
            lat: v.lat,
            lng: v.lng,
            speed: v.speed,
            heading: v.heading,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccidentView {
    pub id: i64,
    pub vehicle: String,
    pub lat: f64,
    pub lng: f64,
    pub road_name: String,
    pub severity: &'static str,
    pub description: String,
    pub injuries: i32,
    pub time: String,
    pub date: String,
    pub status: String,
}

impl From<Accident> for AccidentView {
    fn from(a: Accident) -> Self {
        Self {
            id: a.id,
            time: a.created_at.format("%H:%M:%S").to_string(),
            date: a.created_at.format("%Y-%m-%d").to_string(),
            status: a.status.to_string(),
            vehicle: a.vehicle,
            lat: a.position.lat,
            lng: a.position.lng,
            road_name: a.road_name,
            severity: a.severity.as_str(),
            description: a.description,
            injuries: a.injuries,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ViolationView {
    pub vehicle: String,
    pub lat: f64,
    pub lng: f64,
    pub speed: f64,
    pub lane: String,
    pub violation_type: &'static str,
    pub video: String,
    pub fine: i32,
    pub time: String,
}

impl From<Violation> for ViolationView {
    fn from(v: Violation) -> Self {
        Self {
            time: v.created_at.format("%H:%M:%S").to_string(),
            vehicle: v.vehicle,
            lat: v.position.lat,
            lng: v.position.lng,
            speed: v.speed,
            lane: v.lane,
            violation_type: v.violation_type.as_str(),
            video: v.video_clip,
            fine: v.fine_amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignalView {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub state: &'static str,
    pub cycle_time: i32,
}

impl From<TrafficSignal> for SignalView {
    fn from(s: TrafficSignal) -> Self {
        Self {
            id: s.id,
            name: s.name,
            lat: s.position.lat,
            lng: s.position.lng,
            state: s.state.as_str(),
            cycle_time: s.cycle_time,
        }
    }
}

/// One heatmap point: `[lat, lng, weight]`.
pub type HeatPoint = (f64, f64, u8);

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    #[serde(default, deserialize_with = "parse_id_option")]
    pub accident_id: Option<i64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default, deserialize_with = "parse_id_option")]
    pub accident_id: Option<i64>,
}

// Dashboard forms post ids either as numbers or as strings.
fn parse_id_option<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(i64),
    }

    let v: Option<StringOrInt> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrInt::Int(i)) => Ok(Some(i)),
        // Blank or non-numeric ids match no accident.
        Some(StringOrInt::String(s)) => Ok(s.trim().parse::<i64>().ok()),
        None => Ok(None),
    }
}
