use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiResult};
use super::views::{
    AccidentView, DispatchRequest, HeatPoint, ResolveRequest, SignalView, VehicleView,
    ViolationView,
};
use super::AppState;
use crate::models::accident::DispatchOutcome;
use crate::models::stats::{DashboardStats, CONGESTION_THRESHOLD};
use crate::models::vehicle::VehicleUpdate;
use crate::store::TrafficStore;

pub async fn stats<S: TrafficStore>(State(state): State<AppState<S>>) -> ApiResult<Json<DashboardStats>> {
    let snapshot = state.store.stats().await?;
    Ok(Json(snapshot.into()))
}

pub async fn vehicles<S: TrafficStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<BTreeMap<String, VehicleView>>> {
    let vehicles = state.store.vehicles().await?;
    Ok(Json(
        vehicles
            .iter()
            .map(|v| (v.vehicle_id.clone(), VehicleView::from(v)))
            .collect(),
    ))
}

pub async fn update_vehicle<S: TrafficStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<VehicleUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(update) = payload?;
    let vehicle_id = update
        .vehicle_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("vehicle_id required".to_string()))?;

    let vehicle = state.store.upsert_vehicle(vehicle_id, &update, Utc::now()).await?;
    debug!(
        "Vehicle {} at ({:.6}, {:.6}) {:.1} km/h",
        vehicle.vehicle_id, vehicle.lat, vehicle.lng, vehicle.speed
    );

    Ok(Json(json!({ "success": true })))
}

pub async fn accidents<S: TrafficStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<Vec<AccidentView>>> {
    let accidents = state.store.accidents().await?;
    Ok(Json(accidents.into_iter().map(AccidentView::from).collect()))
}

pub async fn violations<S: TrafficStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<Vec<ViolationView>>> {
    let violations = state.store.violations().await?;
    Ok(Json(violations.into_iter().map(ViolationView::from).collect()))
}

pub async fn congestion<S: TrafficStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<Vec<HeatPoint>>> {
    let slow = state.store.slow_vehicles(CONGESTION_THRESHOLD).await?;
    Ok(Json(slow.iter().map(|v| (v.lat, v.lng, 1)).collect()))
}

pub async fn signals<S: TrafficStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<Vec<SignalView>>> {
    let signals = state.store.signals().await?;
    Ok(Json(signals.into_iter().map(SignalView::from).collect()))
}

pub async fn dispatch<S: TrafficStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<DispatchRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let accident_id = request.accident_id.ok_or(ApiError::AccidentNotFound)?;
    let unit = request
        .unit
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("unit required".to_string()))?;

    let (accident, outcome) = state
        .store
        .dispatch_accident(accident_id, unit)
        .await?
        .ok_or(ApiError::AccidentNotFound)?;

    match outcome {
        DispatchOutcome::Reopened => warn!(
            "Accident {} was resolved and has been reopened by dispatching {}",
            accident_id, unit
        ),
        DispatchOutcome::AlreadyDispatched => {
            debug!("Unit {} already dispatched to accident {}", unit, accident_id)
        }
        DispatchOutcome::Opened | DispatchOutcome::Added => {
            info!("Dispatched {} to accident {}", unit, accident_id)
        }
    }

    Ok(Json(json!({
        "success": true,
        "status": accident.status.to_string(),
    })))
}

pub async fn resolve<S: TrafficStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let accident_id = request.accident_id.ok_or(ApiError::AccidentNotFound)?;

    state
        .store
        .resolve_accident(accident_id, Utc::now())
        .await?
        .ok_or(ApiError::AccidentNotFound)?;
    info!("Accident {} resolved", accident_id);

    Ok(Json(json!({ "success": true })))
}

/// Fallback for write endpoints hit with anything but POST.
pub async fn post_required() -> ApiError {
    ApiError::PostRequired
}
