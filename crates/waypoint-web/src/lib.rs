//! HTTP surface for waypoint.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/geocoding` | `{ "address", "companyName"? }` |
//! | `POST` | `/distance` | `{ "originLat", "originLng", "destLat", "destLng" }` |
//! | `GET` | `/providers` | provider chain with live quota |
//! | `GET` | `/health` | liveness |

pub mod error;
pub mod handlers;
pub mod state;

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;
use uuid::Uuid;

pub use error::ApiError;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/geocoding", post(handlers::geocoding))
        .route("/distance", post(handlers::distance))
        .route("/providers", get(handlers::providers))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %Uuid::new_v4(),
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use waypoint_core::{
        CapabilitySet, DistanceRequest, FallbackOrchestrator, GeocodeRequest, LocationSource,
        ProviderId, ProviderPolicy, RawCandidate, RawDistance, SourceError, SourceFuture,
    };

    use super::*;

    /// Primary stand-in that counts calls and always fails.
    struct Unreachable {
        calls: AtomicUsize,
    }

    impl LocationSource for Unreachable {
        fn id(&self) -> ProviderId {
            ProviderId::Primary
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::full()
        }

        fn geocode<'a>(&'a self, _req: GeocodeRequest) -> SourceFuture<'a, Vec<RawCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(SourceError::transient("connection refused")) })
        }

        fn distance<'a>(&'a self, _req: DistanceRequest) -> SourceFuture<'a, RawDistance> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(SourceError::transient("connection refused")) })
        }
    }

    fn app() -> (Router, Arc<Unreachable>) {
        let primary = Arc::new(Unreachable {
            calls: AtomicUsize::new(0),
        });
        let orchestrator = FallbackOrchestrator::builder()
            .with_source(primary.clone(), ProviderPolicy::google_maps_default())
            .build();
        (router(AppState::new(orchestrator)), primary)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |value| Body::from(value.to_string())))
            .expect("request builds");

        let response = app.oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    #[tokio::test]
    async fn empty_address_is_rejected_before_any_provider() {
        let (app, primary) = app();

        let (status, body) = send(app, "POST", "/geocoding", Some(json!({"address": "  "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": "address cannot be empty"}));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn geocoding_falls_back_with_metadata() {
        let (app, primary) = app();

        let (status, body) = send(
            app,
            "POST",
            "/geocoding",
            Some(json!({"address": "Khlong Luang, Pathum Thani", "companyName": ""})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["meta"]["source"], "mathematical");
        assert_eq!(body["meta"]["is_google_maps"], false);
        assert_eq!(
            body["meta"]["quota_message"],
            "using straight-line estimate: Google Maps is unavailable"
        );
        assert_eq!(body["data"][0]["address_components"]["state"], "Pathum Thani");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distance_accepts_string_coordinates() {
        let (app, _) = app();

        let (status, body) = send(
            app,
            "POST",
            "/distance",
            Some(json!({
                "originLat": "13.7563",
                "originLng": 100.5018,
                "destLat": "14.0208",
                "destLng": "100.5250"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["source"], "mathematical");
        assert!(body["data"].get("duration").is_none());
        assert!(body["data"]["warning"].is_string());
        assert_eq!(body["meta"]["coordinates"]["destination"]["lng"], 100.525);
        assert!(body["meta"]["quota_message"].is_string());
    }

    #[tokio::test]
    async fn out_of_range_coordinate_names_the_field() {
        let (app, primary) = app();

        let (status, body) = send(
            app,
            "POST",
            "/distance",
            Some(json!({"originLat": 13.0, "originLng": 100.0, "destLat": 95.0, "destLng": 100.0})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().is_some_and(|e| e.starts_with("destLat")));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_coordinate_is_bad_request() {
        let (app, _) = app();

        let (status, body) = send(app, "POST", "/distance", Some(json!({"originLat": 13.0}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "originLng is required");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (app, _) = app();

        let request = Request::builder()
            .method("POST")
            .uri("/geocoding")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .expect("request builds");
        let response = app.oneshot(request).await.expect("router is infallible");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn providers_lists_chain_with_quota() {
        let (app, _) = app();

        let (status, body) = send(app, "GET", "/providers", None).await;

        assert_eq!(status, StatusCode::OK);
        let providers = body["providers"].as_array().expect("array");
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0]["id"], "primary");
        assert_eq!(providers[0]["quota"]["calls_limit"], 1000);
        assert!(providers[0]["quota"]["window_resets_at"].is_string());
        assert_eq!(providers[1]["id"], "mathematical");
        assert_eq!(providers[1]["timeout_ms"], Value::Null);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app();
        let (status, body) = send(app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }
}
