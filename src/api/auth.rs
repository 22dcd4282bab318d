use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::auth::password::verify_password;
use crate::auth::{
    expired_session_cookie, session_cookie, session_from_cookie, LoginError, LoginRequest,
    RegisterRequest, RegistrationError,
};
use crate::models::operator::OperatorProfile;
use crate::store::TrafficStore;

pub async fn register<S: TrafficStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(form) = payload?;
    let operator = form.validate()?;

    if state.store.operator(&operator.operator_id).await?.is_some() {
        return Err(RegistrationError::DuplicateOperator.into());
    }

    // A concurrent registration can still win between the check and the insert.
    let created = state
        .store
        .create_operator(operator, Utc::now())
        .await
        .map_err(|e| match e.downcast::<RegistrationError>() {
            Ok(rejected) => ApiError::from(rejected),
            Err(e) => ApiError::Internal(e),
        })?;
    info!("Registered operator {} ({})", created.operator_id, created.role);

    Ok(Json(json!({ "success": true })))
}

pub async fn login<S: TrafficStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(form) = payload?;
    let operator_id = form.operator_id.trim();

    let operator = state
        .store
        .operator(operator_id)
        .await?
        .filter(|op| op.is_active)
        .ok_or(LoginError::UnknownOperator)?;

    if !verify_password(form.password.trim(), &operator.password_hash) {
        return Err(LoginError::InvalidPassword.into());
    }

    state.store.record_login(&operator.operator_id, Utc::now()).await?;
    let profile = OperatorProfile::from(&operator);
    let session = state.sessions.open(profile.clone()).await;
    info!("Operator {} logged in", profile.operator_id);

    Ok((
        [(SET_COOKIE, session_cookie(&session, state.sessions.ttl()))],
        Json(json!({ "success": true, "operator": profile })),
    ))
}

pub async fn logout<S: TrafficStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(session) = current_session(&headers) {
        state.sessions.close(&session).await;
    }
    (
        [(SET_COOKIE, expired_session_cookie())],
        Json(json!({ "success": true })),
    )
}

pub async fn me<S: TrafficStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let session = current_session(&headers).ok_or(ApiError::NotLoggedIn)?;
    let profile = state
        .sessions
        .get(&session)
        .await
        .ok_or(ApiError::NotLoggedIn)?;
    Ok(Json(json!({ "success": true, "operator": profile })))
}

fn current_session(headers: &HeaderMap) -> Option<uuid::Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(session_from_cookie)
}
