pub mod accident;
pub mod operator;
pub mod signal;
pub mod stats;
pub mod vehicle;
pub mod violation;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Raised when a stored value does not map onto a domain type.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("accident {0} is resolved but has no resolution timestamp")]
    MissingResolvedAt(i64),
}

impl ModelError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        ModelError::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

/// Rounds to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_keeps_requested_precision() {
        assert_eq!(round_to(27.71234567, 6), 27.712346);
        assert_eq!(round_to(44.44, 1), 44.4);
        assert_eq!(round_to(0.0, 1), 0.0);
    }
}
