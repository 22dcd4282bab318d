use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::{GeoPoint, ModelError};

pub const DEFAULT_CYCLE_TIME: i32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalState {
    Red,
    Yellow,
    Green,
}

impl SignalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalState::Red => "Red",
            SignalState::Yellow => "Yellow",
            SignalState::Green => "Green",
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Red" => Ok(SignalState::Red),
            "Yellow" => Ok(SignalState::Yellow),
            "Green" => Ok(SignalState::Green),
            other => Err(ModelError::unknown("signal state", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSignal {
    pub id: i64,
    pub name: String,
    pub position: GeoPoint,
    pub state: SignalState,
    pub cycle_time: i32,
}

#[derive(Debug, FromRow)]
pub struct TrafficSignalRow {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub state: String,
    pub cycle_time: i32,
}

impl TryFrom<TrafficSignalRow> for TrafficSignal {
    type Error = ModelError;

    fn try_from(row: TrafficSignalRow) -> Result<Self, Self::Error> {
        Ok(TrafficSignal {
            id: row.id,
            name: row.name,
            position: GeoPoint::new(row.lat, row.lng),
            state: row.state.parse()?,
            cycle_time: row.cycle_time,
        })
    }
}
