use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use waypoint_core::{
    DistanceRequest, DistanceResponse, GeocodeRequest, GeocodeResponse, ProviderSnapshot,
    RouteSuccess,
};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeBody {
    pub address: Option<String>,
    pub company_name: Option<String>,
}

/// Coordinate as posted: a JSON number, or a numeric string from form posts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Degrees {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceBody {
    pub origin_lat: Option<Degrees>,
    pub origin_lng: Option<Degrees>,
    pub dest_lat: Option<Degrees>,
    pub dest_lng: Option<Degrees>,
}

pub async fn geocoding(
    State(state): State<AppState>,
    payload: Result<Json<GeocodeBody>, JsonRejection>,
) -> Result<Json<GeocodeResponse>, ApiError> {
    let Json(body) = payload?;
    let address = body
        .address
        .ok_or_else(|| ApiError::bad_request("address is required"))?;
    let request = GeocodeRequest::new(&address, body.company_name.as_deref())?;

    let routed = state.orchestrator.route_geocode(&request).await?;
    log_route("geocode", &routed);
    Ok(Json(state.assembler.geocode(routed)))
}

pub async fn distance(
    State(state): State<AppState>,
    payload: Result<Json<DistanceBody>, JsonRejection>,
) -> Result<Json<DistanceResponse>, ApiError> {
    let Json(body) = payload?;
    let request = DistanceRequest::from_degrees(
        degrees("originLat", body.origin_lat)?,
        degrees("originLng", body.origin_lng)?,
        degrees("destLat", body.dest_lat)?,
        degrees("destLng", body.dest_lng)?,
    )?;

    let routed = state.orchestrator.route_distance(&request).await?;
    log_route("distance", &routed);
    Ok(Json(state.assembler.distance(&request, routed)))
}

#[derive(Debug, Serialize)]
struct ProviderView {
    id: &'static str,
    name: &'static str,
    endpoints: Vec<&'static str>,
    timeout_ms: Option<u64>,
    status: &'static str,
    quota: QuotaView,
}

#[derive(Debug, Serialize)]
struct QuotaView {
    calls_used: u32,
    calls_limit: Option<u32>,
    remaining: Option<u32>,
    window_resets_at: Option<String>,
}

impl From<ProviderSnapshot> for ProviderView {
    fn from(snapshot: ProviderSnapshot) -> Self {
        let quota = snapshot.quota;
        Self {
            id: snapshot.id.as_str(),
            name: snapshot.id.display_name(),
            endpoints: snapshot.capabilities.supported_endpoints(),
            timeout_ms: snapshot
                .timeout
                .map(|timeout| timeout.as_millis().min(u128::from(u64::MAX)) as u64),
            status: snapshot.status_label(),
            quota: QuotaView {
                calls_used: quota.calls_used,
                calls_limit: quota.calls_limit,
                remaining: quota.remaining(),
                window_resets_at: quota
                    .resets_at()
                    .and_then(|instant| instant.format(&Rfc3339).ok()),
            },
        }
    }
}

/// Configured chain in priority order with live quota state.
pub async fn providers(State(state): State<AppState>) -> Json<Value> {
    let providers = state
        .orchestrator
        .providers()
        .into_iter()
        .map(ProviderView::from)
        .collect::<Vec<_>>();
    Json(json!({ "providers": providers }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn degrees(field: &'static str, value: Option<Degrees>) -> Result<f64, ApiError> {
    match value {
        None => Err(ApiError::bad_request(format!("{field} is required"))),
        Some(Degrees::Number(value)) => Ok(value),
        Some(Degrees::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ApiError::bad_request(format!("{field} must be a number, got '{text}'"))),
    }
}

fn log_route<T>(endpoint: &'static str, routed: &RouteSuccess<T>) {
    let attempts = routed
        .attempts
        .iter()
        .map(|attempt| {
            format!(
                "{}:{}:{}ms",
                attempt.provider,
                attempt.outcome.as_str(),
                attempt.elapsed_ms
            )
        })
        .collect::<Vec<_>>()
        .join(",");

    tracing::info!(
        endpoint,
        source = %routed.selected_source,
        latency_ms = routed.latency_ms,
        attempts = %attempts,
        "resolved"
    );
    for warning in &routed.warnings {
        tracing::debug!(endpoint, warning = %warning, "route warning");
    }
}
