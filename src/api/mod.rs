use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Sessions;
use crate::store::TrafficStore;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod views;

pub struct AppState<S> {
    pub store: Arc<S>,
    pub sessions: Sessions,
}

impl<S> AppState<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            sessions: Sessions::default(),
        }
    }
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sessions: self.sessions.clone(),
        }
    }
}

pub fn router<S: TrafficStore>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/stats/", get(handlers::stats::<S>))
        .route("/vehicles/", get(handlers::vehicles::<S>))
        .route(
            "/update/",
            post(handlers::update_vehicle::<S>).fallback(handlers::post_required),
        )
        .route("/accidents/", get(handlers::accidents::<S>))
        .route("/violations/", get(handlers::violations::<S>))
        .route("/congestion/", get(handlers::congestion::<S>))
        .route("/signals/", get(handlers::signals::<S>))
        .route(
            "/dispatch/",
            post(handlers::dispatch::<S>).fallback(handlers::post_required),
        )
        .route(
            "/resolve/",
            post(handlers::resolve::<S>).fallback(handlers::post_required),
        );

    let operators = Router::new()
        .route("/register", post(auth::register::<S>))
        .route("/login", post(auth::login::<S>))
        .route("/logout", post(auth::logout::<S>))
        .route("/me", get(auth::me::<S>));

    Router::new()
        .nest("/api", api)
        .nest("/auth", operators)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::accident::{NewAccident, Severity};
    use crate::models::GeoPoint;
    use crate::store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (router(AppState::new(Arc::clone(&store))), store)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn seed_accident(store: &MemoryStore, severity: Severity) -> i64 {
        let accident = NewAccident {
            vehicle: "BA-4-PA-4444".into(),
            position: GeoPoint::new(27.69, 85.33),
            road_name: "New Baneshwor".into(),
            severity,
            description: "Head-on collision, multiple injuries".into(),
            injuries: 3,
        };
        store.insert_accident(accident, Utc::now()).await.unwrap().id
    }

    #[tokio::test]
    async fn update_creates_then_partially_updates_vehicle() {
        let (app, _) = app();
        let (_, body) = send(
            &app,
            Method::POST,
            "/api/update/",
            Some(json!({"vehicle_id": "BA-1-PA-1234", "lat": 27.73, "lng": 85.31, "speed": 42.0, "heading": 90.0})),
        )
        .await;
        assert_eq!(body, json!({"success": true}));

        send(
            &app,
            Method::POST,
            "/api/update/",
            Some(json!({"vehicle_id": "BA-1-PA-1234", "speed": 12.5})),
        )
        .await;

        let (_, vehicles) = send(&app, Method::GET, "/api/vehicles/", None).await;
        assert_eq!(
            vehicles["BA-1-PA-1234"],
            json!({"lat": 27.73, "lng": 85.31, "speed": 12.5, "heading": 90.0})
        );

        let (_, heat) = send(&app, Method::GET, "/api/congestion/", None).await;
        assert_eq!(heat, json!([[27.73, 85.31, 1]]));
    }

    #[tokio::test]
    async fn write_endpoints_require_post() {
        let (app, _) = app();
        for uri in ["/api/update/", "/api/dispatch/", "/api/resolve/"] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"success": false, "message": "POST required"}));
        }
    }

    #[tokio::test]
    async fn dispatch_accumulates_units_in_order() {
        let (app, store) = app();
        let id = seed_accident(&store, Severity::Severe).await;

        for (unit, expected) in [
            ("Police", "Dispatched (Police)"),
            ("Ambulance", "Dispatched (Police, Ambulance)"),
            ("Police", "Dispatched (Police, Ambulance)"),
        ] {
            let (_, body) = send(
                &app,
                Method::POST,
                "/api/dispatch/",
                Some(json!({"accident_id": id, "unit": unit})),
            )
            .await;
            assert_eq!(body, json!({"success": true, "status": expected}));
        }

        let (_, accidents) = send(&app, Method::GET, "/api/accidents/", None).await;
        assert_eq!(accidents[0]["status"], "Dispatched (Police, Ambulance)");
    }

    #[tokio::test]
    async fn unknown_accident_is_reported_in_body() {
        let (app, _) = app();
        let expected = json!({"success": false, "message": "Accident not found"});

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/dispatch/",
            Some(json!({"accident_id": 999, "unit": "Fire"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);

        let (_, body) = send(&app, Method::POST, "/api/resolve/", Some(json!({"accident_id": 999}))).await;
        assert_eq!(body, expected);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/resolve/",
            Some(json!({"accident_id": "four"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn resolve_clears_severe_count() {
        let (app, store) = app();
        let id = seed_accident(&store, Severity::Fatal).await;

        let (_, stats) = send(&app, Method::GET, "/api/stats/", None).await;
        assert_eq!(stats["severe_accidents"], 1);
        assert_eq!(stats["active_accidents"], 1);

        let (_, body) = send(&app, Method::POST, "/api/resolve/", Some(json!({"accident_id": id}))).await;
        assert_eq!(body, json!({"success": true}));

        let (_, stats) = send(&app, Method::GET, "/api/stats/", None).await;
        assert_eq!(stats["severe_accidents"], 0);
        assert_eq!(stats["active_accidents"], 0);
        assert_eq!(stats["total_accidents"], 1);

        let (_, accidents) = send(&app, Method::GET, "/api/accidents/", None).await;
        assert_eq!(accidents[0]["status"], "Resolved");
    }

    #[tokio::test]
    async fn stats_average_speed_over_fleet() {
        let (app, _) = app();
        let (_, empty) = send(&app, Method::GET, "/api/stats/", None).await;
        assert_eq!(empty["avg_speed"], 0.0);

        for (id, speed) in [("A", 10.0), ("B", 20.0), ("C", 95.0)] {
            send(
                &app,
                Method::POST,
                "/api/update/",
                Some(json!({"vehicle_id": id, "speed": speed})),
            )
            .await;
        }

        let (_, stats) = send(&app, Method::GET, "/api/stats/", None).await;
        assert_eq!(stats["total_vehicles"], 3);
        assert_eq!(stats["avg_speed"], 41.7);
        assert_eq!(stats["overspeeding"], 1);
    }

    #[tokio::test]
    async fn malformed_bodies_are_rejected() {
        let (app, _) = app();
        let (status, body) = send(&app, Method::POST, "/api/update/", Some(json!({"speed": 4}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "vehicle_id required");

        let (status, body) = send(&app, Method::POST, "/api/dispatch/", Some(json!({"accident_id": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn operator_can_register_login_and_logout() {
        let (app, _) = app();
        let form = json!({
            "name": "Hari",
            "operator_id": "OP-42",
            "password": "traffic1",
            "confirm_password": "traffic1",
            "role": "Supervisor"
        });
        let (_, body) = send(&app, Method::POST, "/auth/register", Some(form.clone())).await;
        assert_eq!(body, json!({"success": true}));

        let (_, dup) = send(&app, Method::POST, "/auth/register", Some(form)).await;
        assert_eq!(dup["message"], "Operator ID already exists.");

        let (status, bad) = send(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({"operator_id": "OP-42", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(bad["message"], "Invalid password. Please try again.");

        let login = Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"operator_id": "OP-42", "password": "traffic1"}).to_string()))
            .unwrap();
        let response = app.clone().oneshot(login).await.unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string();

        let me = Request::builder()
            .uri("/auth/me")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(me).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["operator"]["role"], "Supervisor");

        let logout = Request::builder()
            .method(Method::POST)
            .uri("/auth/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(logout).await.unwrap();

        let (status, _) = send(&app, Method::GET, "/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_registrations_create_one_operator() {
        let (app, store) = app();
        let form = json!({
            "name": "Gita",
            "operator_id": "OP-9",
            "password": "traffic9",
            "confirm_password": "traffic9"
        });

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let app = app.clone();
                let form = form.clone();
                tokio::spawn(async move { send(&app, Method::POST, "/auth/register", Some(form)).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            let (status, body) = task.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            if body["success"] == true {
                created += 1;
            } else {
                assert_eq!(body["message"], "Operator ID already exists.");
            }
        }
        assert_eq!(created, 1);
        assert!(store.operator("OP-9").await.unwrap().is_some());
    }
}
