pub mod password;

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::operator::{NewOperator, OperatorProfile, DEFAULT_ROLE};

pub const SESSION_COOKIE: &str = "session_id";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub operator_id: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub operator_id: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("All fields are required.")]
    MissingFields,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
    #[error("Operator ID already exists.")]
    DuplicateOperator,
    #[error("Could not secure password.")]
    Hashing(#[from] argon2::password_hash::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Operator ID not found.")]
    UnknownOperator,
    #[error("Invalid password. Please try again.")]
    InvalidPassword,
}

impl RegisterRequest {
    /// Checks the form and hashes the password. Uniqueness is the caller's job.
    pub fn validate(&self) -> Result<NewOperator, RegistrationError> {
        let name = self.name.trim();
        let operator_id = self.operator_id.trim();
        let password = self.password.trim();

        if name.is_empty() || operator_id.is_empty() || password.is_empty() {
            return Err(RegistrationError::MissingFields);
        }
        if password != self.confirm_password.trim() {
            return Err(RegistrationError::PasswordMismatch);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RegistrationError::PasswordTooShort);
        }

        let role = self
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE);

        Ok(NewOperator {
            operator_id: operator_id.to_string(),
            name: name.to_string(),
            password_hash: password::hash_password(password)?,
            role: role.to_string(),
        })
    }
}

/// How long a login stays valid without logging out.
pub const SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct Session {
    profile: OperatorProfile,
    expires_at: Instant,
}

/// Logged-in operators keyed by session id. Lives only as long as the server.
///
/// Expired entries are invisible to `get` and are swept whenever a new
/// session opens.
#[derive(Debug, Clone)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl Sessions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn open(&self, profile: OperatorProfile) -> Uuid {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.inner.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            id,
            Session {
                profile,
                expires_at: now + self.ttl,
            },
        );
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<OperatorProfile> {
        self.inner
            .read()
            .await
            .get(id)
            .filter(|s| s.expires_at > Instant::now())
            .map(|s| s.profile.clone())
    }

    pub async fn close(&self, id: &Uuid) -> bool {
        self.inner.write().await.remove(id).is_some()
    }
}

/// Pulls the session id out of a raw `Cookie` header value.
pub fn session_from_cookie(header: &str) -> Option<Uuid> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(id: &Uuid, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        id,
        max_age.as_secs()
    )
}

pub fn expired_session_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; Max-Age=0", SESSION_COOKIE)
}
