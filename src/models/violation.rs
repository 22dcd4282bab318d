use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::{GeoPoint, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    Overspeeding,
    WrongLane,
    RedLight,
    NoHelmet,
}

impl ViolationType {
    pub const ALL: [ViolationType; 4] = [
        ViolationType::Overspeeding,
        ViolationType::WrongLane,
        ViolationType::RedLight,
        ViolationType::NoHelmet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::Overspeeding => "Overspeeding",
            ViolationType::WrongLane => "Wrong Lane",
            ViolationType::RedLight => "Red Light",
            ViolationType::NoHelmet => "No Helmet",
        }
    }

    /// Fine in rupees.
    pub fn fine(&self) -> i32 {
        match self {
            ViolationType::Overspeeding => 1500,
            ViolationType::WrongLane => 1000,
            ViolationType::RedLight => 2000,
            ViolationType::NoHelmet => 500,
        }
    }

    // Only two placeholder clips exist.
    pub fn video_clip(&self) -> &'static str {
        match self {
            ViolationType::Overspeeding | ViolationType::RedLight => "overspeed_clip.mp4",
            ViolationType::WrongLane | ViolationType::NoHelmet => "wronglane_clip.mp4",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViolationType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViolationType::ALL
            .into_iter()
            .find(|vt| vt.as_str() == s)
            .ok_or_else(|| ModelError::unknown("violation type", s))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub id: i64,
    pub vehicle: String,
    pub position: GeoPoint,
    pub speed: f64,
    pub lane: String,
    pub violation_type: ViolationType,
    pub video_clip: String,
    pub fine_amount: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewViolation {
    pub vehicle: String,
    pub position: GeoPoint,
    pub speed: f64,
    pub lane: String,
    pub violation_type: ViolationType,
}

impl NewViolation {
    pub fn into_violation(self, id: i64, created_at: DateTime<Utc>) -> Violation {
        Violation {
            id,
            vehicle: self.vehicle,
            position: self.position,
            speed: self.speed,
            lane: self.lane,
            video_clip: self.violation_type.video_clip().to_string(),
            fine_amount: self.violation_type.fine(),
            violation_type: self.violation_type,
            created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ViolationRow {
    pub id: i64,
    pub vehicle: String,
    pub lat: f64,
    pub lng: f64,
    pub speed: f64,
    pub lane: String,
    pub violation_type: String,
    pub video_clip: String,
    pub fine_amount: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ViolationRow> for Violation {
    type Error = ModelError;

    fn try_from(row: ViolationRow) -> Result<Self, Self::Error> {
        Ok(Violation {
            id: row.id,
            vehicle: row.vehicle,
            position: GeoPoint::new(row.lat, row.lng),
            speed: row.speed,
            lane: row.lane,
            violation_type: row.violation_type.parse()?,
            video_clip: row.video_clip,
            fine_amount: row.fine_amount,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fines_and_clips_follow_type() {
        let v = NewViolation {
            vehicle: "BA-2-PA-2222".into(),
            position: GeoPoint::new(27.7, 85.3),
            speed: 30.0,
            lane: "Left".into(),
            violation_type: ViolationType::RedLight,
        }
        .into_violation(1, Utc::now());

        assert_eq!(v.fine_amount, 2000);
        assert_eq!(v.video_clip, "overspeed_clip.mp4");
        assert_eq!(ViolationType::NoHelmet.fine(), 500);
        assert_eq!(ViolationType::WrongLane.video_clip(), "wronglane_clip.mp4");
    }

    #[test]
    fn labels_use_spaced_names() {
        assert_eq!(ViolationType::WrongLane.to_string(), "Wrong Lane");
        assert_eq!("Red Light".parse::<ViolationType>().unwrap(), ViolationType::RedLight);
        assert!("RedLight".parse::<ViolationType>().is_err());
    }
}
