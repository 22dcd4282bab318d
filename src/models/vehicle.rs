use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::GeoPoint;

pub const DEFAULT_POSITION: GeoPoint = GeoPoint::new(27.7172, 85.3240);

#[derive(Debug, Clone, FromRow)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub lat: f64,
    pub lng: f64,
    pub speed: f64,
    pub heading: f64,
    pub last_updated: DateTime<Utc>,
}

impl Vehicle {
    /// A row as it looks the first time an id is seen.
    pub fn fresh(vehicle_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            lat: DEFAULT_POSITION.lat,
            lng: DEFAULT_POSITION.lng,
            speed: 0.0,
            heading: 0.0,
            last_updated: now,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    /// Overwrites only the fields present in `update`.
    pub fn apply(&mut self, update: &VehicleUpdate, now: DateTime<Utc>) {
        if let Some(lat) = update.lat {
            self.lat = lat;
        }
        if let Some(lng) = update.lng {
            self.lng = lng;
        }
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
        if let Some(heading) = update.heading {
            self.heading = heading;
        }
        self.last_updated = now;
    }
}

/// Body of `POST /api/update/`; absent fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleUpdate {
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}
