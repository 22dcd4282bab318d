use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::{GeoPoint, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Minor,
        Severity::Moderate,
        Severity::Severe,
        Severity::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "Minor",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
            Severity::Fatal => "Fatal",
        }
    }

    /// Severe and Fatal accidents are surfaced separately on the dashboard.
    pub fn is_severe(&self) -> bool {
        matches!(self, Severity::Severe | Severity::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| ModelError::unknown("severity", s))
    }
}

/// Lifecycle of an accident.
///
/// Persisted as a kind column plus the unit list and resolution time; the
/// legacy display string is produced by `Display` at the JSON boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AccidentStatus {
    Pending,
    Dispatched { units: Vec<String> },
    Resolved { at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// First unit on a pending accident.
    Opened,
    /// Unit appended to an existing dispatch.
    Added,
    /// Unit was already on the list; nothing changed.
    AlreadyDispatched,
    /// A resolved accident went back to dispatched.
    Reopened,
}

impl AccidentStatus {
    pub const PENDING: &'static str = "Pending";
    pub const DISPATCHED: &'static str = "Dispatched";
    pub const RESOLVED: &'static str = "Resolved";

    pub fn kind(&self) -> &'static str {
        match self {
            AccidentStatus::Pending => Self::PENDING,
            AccidentStatus::Dispatched { .. } => Self::DISPATCHED,
            AccidentStatus::Resolved { .. } => Self::RESOLVED,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AccidentStatus::Pending)
    }

    pub fn units(&self) -> &[String] {
        match self {
            AccidentStatus::Dispatched { units } => units,
            _ => &[],
        }
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AccidentStatus::Resolved { at } => Some(*at),
            _ => None,
        }
    }

    /// Adds `unit` to the dispatch list, keeping first-seen order.
    ///
    /// There is no guard against dispatching a resolved accident: it goes
    /// back to `Dispatched` with `unit` as the only responder.
    pub fn dispatch(&mut self, unit: &str) -> DispatchOutcome {
        match self {
            AccidentStatus::Dispatched { units } => {
                if units.iter().any(|u| u == unit) {
                    DispatchOutcome::AlreadyDispatched
                } else {
                    units.push(unit.to_string());
                    DispatchOutcome::Added
                }
            }
            AccidentStatus::Pending => {
                *self = AccidentStatus::Dispatched {
                    units: vec![unit.to_string()],
                };
                DispatchOutcome::Opened
            }
            AccidentStatus::Resolved { .. } => {
                *self = AccidentStatus::Dispatched {
                    units: vec![unit.to_string()],
                };
                DispatchOutcome::Reopened
            }
        }
    }

    pub fn resolve(&mut self, at: DateTime<Utc>) {
        *self = AccidentStatus::Resolved { at };
    }

    /// Rebuilds the status from its stored columns.
    pub fn from_parts(
        id: i64,
        kind: &str,
        units: Vec<String>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ModelError> {
        match kind {
            Self::PENDING => Ok(AccidentStatus::Pending),
            Self::DISPATCHED => Ok(AccidentStatus::Dispatched { units }),
            Self::RESOLVED => resolved_at
                .map(|at| AccidentStatus::Resolved { at })
                .ok_or(ModelError::MissingResolvedAt(id)),
            other => Err(ModelError::unknown("accident status", other)),
        }
    }
}

impl fmt::Display for AccidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccidentStatus::Pending => f.write_str(Self::PENDING),
            AccidentStatus::Dispatched { units } => {
                write!(f, "{} ({})", Self::DISPATCHED, units.join(", "))
            }
            AccidentStatus::Resolved { .. } => f.write_str(Self::RESOLVED),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accident {
    pub id: i64,
    pub vehicle: String,
    pub position: GeoPoint,
    pub road_name: String,
    pub severity: Severity,
    pub description: String,
    pub injuries: i32,
    pub created_at: DateTime<Utc>,
    pub status: AccidentStatus,
}

/// An accident about to be persisted; always starts out Pending.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccident {
    pub vehicle: String,
    pub position: GeoPoint,
    pub road_name: String,
    pub severity: Severity,
    pub description: String,
    pub injuries: i32,
}

impl NewAccident {
    pub fn into_accident(self, id: i64, created_at: DateTime<Utc>) -> Accident {
        Accident {
            id,
            vehicle: self.vehicle,
            position: self.position,
            road_name: self.road_name,
            severity: self.severity,
            description: self.description,
            injuries: self.injuries,
            created_at,
            status: AccidentStatus::Pending,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct AccidentRow {
    pub id: i64,
    pub vehicle: String,
    pub lat: f64,
    pub lng: f64,
    pub road_name: String,
    pub severity: String,
    pub description: String,
    pub injuries: i32,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub dispatched_units: Vec<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<AccidentRow> for Accident {
    type Error = ModelError;

    fn try_from(row: AccidentRow) -> Result<Self, Self::Error> {
        let status =
            AccidentStatus::from_parts(row.id, &row.status, row.dispatched_units, row.resolved_at)?;
        Ok(Accident {
            id: row.id,
            vehicle: row.vehicle,
            position: GeoPoint::new(row.lat, row.lng),
            road_name: row.road_name,
            severity: row.severity.parse()?,
            description: row.description,
            injuries: row.injuries,
            created_at: row.created_at,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch_all(units: &[&str]) -> AccidentStatus {
        let mut status = AccidentStatus::Pending;
        for unit in units {
            status.dispatch(unit);
        }
        status
    }

    #[test]
    fn redispatching_same_unit_is_idempotent() {
        let mut status = AccidentStatus::Pending;
        assert_eq!(status.dispatch("A"), DispatchOutcome::Opened);
        assert_eq!(status.dispatch("A"), DispatchOutcome::AlreadyDispatched);
        assert_eq!(status.to_string(), "Dispatched (A)");
    }

    #[test]
    fn units_keep_first_seen_order() {
        assert_eq!(dispatch_all(&["A", "B"]).to_string(), "Dispatched (A, B)");
        assert_eq!(dispatch_all(&["B", "A"]).to_string(), "Dispatched (B, A)");
        assert_eq!(
            dispatch_all(&["Police", "Ambulance", "Police", "Fire"]).to_string(),
            "Dispatched (Police, Ambulance, Fire)"
        );
    }

    #[test]
    fn unit_matching_is_case_sensitive() {
        assert_eq!(dispatch_all(&["police", "Police"]).units(), ["police", "Police"]);
    }

    #[test]
    fn resolve_overrides_any_state() {
        let now = Utc::now();
        for mut status in [AccidentStatus::Pending, dispatch_all(&["A", "B"])] {
            status.resolve(now);
            assert_eq!(status.to_string(), "Resolved");
            assert_eq!(status.resolved_at(), Some(now));
        }
    }

    #[test]
    fn dispatching_resolved_accident_reopens_it() {
        let mut status = AccidentStatus::Resolved { at: Utc::now() };
        assert_eq!(status.dispatch("Fire"), DispatchOutcome::Reopened);
        assert_eq!(status.to_string(), "Dispatched (Fire)");
        assert!(status.resolved_at().is_none());
    }

    #[test]
    fn resolved_row_without_timestamp_is_rejected() {
        let err = AccidentStatus::from_parts(9, "Resolved", vec![], None).unwrap_err();
        assert!(matches!(err, ModelError::MissingResolvedAt(9)));
        assert!(AccidentStatus::from_parts(9, "Closed", vec![], None).is_err());
    }

    #[test]
    fn severity_round_trips_through_its_label() {
        for sev in Severity::ALL {
            assert_eq!(sev.as_str().parse::<Severity>().unwrap(), sev);
        }
        assert!("Catastrophic".parse::<Severity>().is_err());
    }
}
