use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

pub const DEFAULT_ROLE: &str = "Operator";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Operator {
    pub operator_id: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOperator {
    pub operator_id: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
}

impl NewOperator {
    pub fn into_operator(self, created_at: DateTime<Utc>) -> Operator {
        Operator {
            operator_id: self.operator_id,
            name: self.name,
            password_hash: self.password_hash,
            role: self.role,
            is_active: true,
            last_login: None,
            created_at,
        }
    }
}

/// What the session exposes about an operator; never carries the hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorProfile {
    pub operator_id: String,
    pub name: String,
    pub role: String,
}

impl From<&Operator> for OperatorProfile {
    fn from(op: &Operator) -> Self {
        Self {
            operator_id: op.operator_id.clone(),
            name: op.name.clone(),
            role: op.role.clone(),
        }
    }
}
