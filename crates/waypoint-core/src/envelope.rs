//! Caller-facing response shapes and the metadata attached to them.
//!
//! Every body carries `success`; successful bodies wrap the result in `data`
//! and describe how it was obtained in `meta`.

use serde::{Deserialize, Serialize};

use crate::data_source::DistanceRequest;
use crate::quota::QuotaSnapshot;
use crate::routing::{AttemptOutcome, RouteSuccess};
use crate::{Coordinates, DistanceResult, GeocodeCandidate, ProviderId, SourceErrorKind};

pub const STRAIGHT_LINE_WARNING: &str = "Straight-line estimate: no routing provider was available. \
Road distance is typically 10% or more longer than this figure.";

/// Primary usage share at which responses start announcing the remaining budget.
pub const QUOTA_NOTICE_RATIO: f64 = 0.9;

/// Reduced-accuracy warning for distances from `source`, if any.
pub fn distance_warning(source: ProviderId) -> Option<&'static str> {
    (source == ProviderId::Mathematical).then_some(STRAIGHT_LINE_WARNING)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T, M> {
    pub success: bool,
    pub data: T,
    pub meta: M,
}

impl<T, M> Envelope<T, M> {
    pub fn success(data: T, meta: M) -> Self {
        Self {
            success: true,
            data,
            meta,
        }
    }
}

pub type GeocodeResponse = Envelope<Vec<GeocodeCandidate>, GeocodeMeta>;
pub type DistanceResponse = Envelope<DistanceData, DistanceMeta>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeMeta {
    pub source: ProviderId,
    pub is_google_maps: bool,
    pub quota_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceData {
    /// Kilometres, two decimal places.
    pub distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub source: ProviderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePair {
    pub origin: Coordinates,
    pub destination: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMeta {
    pub coordinates: CoordinatePair,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_message: Option<String>,
}

/// Body of every non-success response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Wraps routed results with source and quota metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseAssembler;

impl ResponseAssembler {
    pub fn geocode(&self, routed: RouteSuccess<Vec<GeocodeCandidate>>) -> GeocodeResponse {
        let meta = GeocodeMeta {
            source: routed.selected_source,
            is_google_maps: routed.selected_source == ProviderId::Primary,
            quota_message: quota_message(&routed),
        };
        Envelope::success(routed.data, meta)
    }

    pub fn distance(&self, req: &DistanceRequest, routed: RouteSuccess<DistanceResult>) -> DistanceResponse {
        let announce = routed.fell_back() || routed.primary_quota.is_some_and(nearly_spent);
        let meta = DistanceMeta {
            coordinates: CoordinatePair {
                origin: req.origin,
                destination: req.destination,
            },
            quota_message: announce.then(|| quota_message(&routed)),
        };

        let result = routed.data;
        let data = DistanceData {
            distance: round2(result.distance_km),
            duration: result.duration_seconds,
            source: result.source,
            warning: result.warning,
        };
        Envelope::success(data, meta)
    }
}

/// Human-readable account of which provider answered and why earlier ones did not.
pub fn quota_message<T>(routed: &RouteSuccess<T>) -> String {
    let selected = routed.selected_source;

    let mut reasons = Vec::new();
    if routed.primary_quota.is_none() && selected != ProviderId::Primary {
        reasons.push(format!("{} is not configured", ProviderId::Primary.display_name()));
    }
    reasons.extend(routed.attempts.iter().filter_map(|attempt| {
        skip_reason(attempt.outcome)
            .map(|reason| format!("{} {reason}", attempt.provider.display_name()))
    }));

    let mut message = format!("using {}", selected.display_name());
    if !reasons.is_empty() {
        message.push_str(": ");
        message.push_str(&reasons.join(", "));
    }

    if let Some(snapshot) = routed.primary_quota.filter(|snapshot| nearly_spent(*snapshot)) {
        if !snapshot.is_exhausted() {
            if let (Some(remaining), Some(limit)) = (snapshot.remaining(), snapshot.calls_limit) {
                message.push_str(&format!(
                    "; {remaining} of {limit} {} calls left in this quota window",
                    ProviderId::Primary.display_name()
                ));
            }
        }
    }

    message
}

fn skip_reason(outcome: AttemptOutcome) -> Option<&'static str> {
    match outcome {
        AttemptOutcome::Succeeded => None,
        AttemptOutcome::SkippedQuota | AttemptOutcome::Failed(SourceErrorKind::QuotaExceeded) => {
            Some("quota exhausted for this window")
        }
        AttemptOutcome::SkippedRateLimited | AttemptOutcome::RateLimited => Some("is rate limited"),
        AttemptOutcome::SkippedUnsupported
        | AttemptOutcome::Failed(SourceErrorKind::UnsupportedEndpoint) => {
            Some("does not support this request")
        }
        AttemptOutcome::Failed(SourceErrorKind::Timeout) => Some("timed out"),
        AttemptOutcome::Failed(SourceErrorKind::NotFound) => Some("found no match"),
        AttemptOutcome::Failed(SourceErrorKind::InvalidInput) => Some("rejected the request"),
        AttemptOutcome::Failed(SourceErrorKind::TransientError) => Some("is unavailable"),
    }
}

fn nearly_spent(snapshot: QuotaSnapshot) -> bool {
    snapshot.calls_limit.is_some() && snapshot.usage_ratio() >= QUOTA_NOTICE_RATIO
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::routing::Attempt;
    use crate::MatchLevel;

    fn routed<T>(data: T, selected: ProviderId, attempts: Vec<Attempt>, used: u32) -> RouteSuccess<T> {
        RouteSuccess {
            data,
            selected_source: selected,
            attempts,
            warnings: Vec::new(),
            primary_quota: Some(QuotaSnapshot {
                provider: ProviderId::Primary,
                calls_used: used,
                calls_limit: Some(1_000),
                window_duration: Duration::from_secs(86_400),
                resets_in: Some(Duration::from_secs(3_600)),
            }),
            latency_ms: 12,
        }
    }

    fn attempt(provider: ProviderId, outcome: AttemptOutcome) -> Attempt {
        Attempt {
            provider,
            outcome,
            elapsed_ms: 5,
        }
    }

    fn distance(source: ProviderId, km: f64) -> DistanceResult {
        DistanceResult {
            distance_km: km,
            duration_seconds: (source != ProviderId::Mathematical).then_some(1_800),
            source,
            warning: distance_warning(source).map(str::to_owned),
        }
    }

    fn request() -> DistanceRequest {
        DistanceRequest::from_degrees(13.7563, 100.5018, 14.0208, 100.5250).expect("valid")
    }

    #[test]
    fn geocode_meta_flags_google_maps() {
        let candidate = GeocodeCandidate {
            lat: 14.07,
            lng: 100.61,
            formatted_address: String::from("Khlong Nueng"),
            address_components: Default::default(),
            match_level: MatchLevel::FullAddress,
            confidence: 0.8,
            final_score: 0.68,
            source: ProviderId::Primary,
        };
        let response = ResponseAssembler.geocode(routed(
            vec![candidate],
            ProviderId::Primary,
            vec![attempt(ProviderId::Primary, AttemptOutcome::Succeeded)],
            10,
        ));

        assert!(response.success);
        assert!(response.meta.is_google_maps);
        assert_eq!(response.meta.quota_message, "using Google Maps");

        let json = serde_json::to_value(&response).expect("serializes");
        assert_eq!(json["meta"]["source"], "primary");
        assert_eq!(json["data"][0]["match_level"], "full_address");
    }

    #[test]
    fn fallback_message_names_each_skipped_provider() {
        let response = ResponseAssembler.distance(
            &request(),
            routed(
                distance(ProviderId::Mathematical, 29.516),
                ProviderId::Mathematical,
                vec![
                    attempt(ProviderId::Primary, AttemptOutcome::SkippedQuota),
                    attempt(ProviderId::Secondary, AttemptOutcome::Failed(SourceErrorKind::Timeout)),
                    attempt(ProviderId::Mathematical, AttemptOutcome::Succeeded),
                ],
                1_000,
            ),
        );

        assert_eq!(response.data.distance, 29.52);
        assert_eq!(response.data.duration, None);
        assert_eq!(response.data.warning.as_deref(), Some(STRAIGHT_LINE_WARNING));
        assert_eq!(
            response.meta.quota_message.as_deref(),
            Some(
                "using straight-line estimate: Google Maps quota exhausted for this window, \
                 OpenStreetMap timed out"
            )
        );

        let json = serde_json::to_value(&response).expect("serializes");
        assert!(json["data"].get("duration").is_none());
        assert_eq!(json["meta"]["coordinates"]["origin"]["lat"], 13.7563);
    }

    #[test]
    fn rate_limit_is_reported_apart_from_a_spent_window() {
        let response = ResponseAssembler.distance(
            &request(),
            routed(
                distance(ProviderId::Mathematical, 29.516),
                ProviderId::Mathematical,
                vec![
                    attempt(ProviderId::Primary, AttemptOutcome::SkippedRateLimited),
                    attempt(ProviderId::Secondary, AttemptOutcome::RateLimited),
                    attempt(ProviderId::Mathematical, AttemptOutcome::Succeeded),
                ],
                10,
            ),
        );

        assert_eq!(
            response.meta.quota_message.as_deref(),
            Some(
                "using straight-line estimate: Google Maps is rate limited, \
                 OpenStreetMap is rate limited"
            )
        );
    }

    #[test]
    fn direct_primary_distance_omits_quota_message() {
        let response = ResponseAssembler.distance(
            &request(),
            routed(
                distance(ProviderId::Primary, 31.0),
                ProviderId::Primary,
                vec![attempt(ProviderId::Primary, AttemptOutcome::Succeeded)],
                10,
            ),
        );

        assert_eq!(response.meta.quota_message, None);
        assert_eq!(response.data.duration, Some(1_800));
        assert_eq!(response.data.warning, None);
    }

    #[test]
    fn nearly_spent_primary_quota_is_announced() {
        let response = ResponseAssembler.distance(
            &request(),
            routed(
                distance(ProviderId::Primary, 31.0),
                ProviderId::Primary,
                vec![attempt(ProviderId::Primary, AttemptOutcome::Succeeded)],
                950,
            ),
        );

        assert_eq!(
            response.meta.quota_message.as_deref(),
            Some("using Google Maps; 50 of 1000 Google Maps calls left in this quota window")
        );
    }

    #[test]
    fn missing_primary_is_reported_as_not_configured() {
        let mut result = routed(
            Vec::<GeocodeCandidate>::new(),
            ProviderId::Secondary,
            vec![attempt(ProviderId::Secondary, AttemptOutcome::Succeeded)],
            0,
        );
        result.primary_quota = None;

        assert_eq!(
            quota_message(&result),
            "using OpenStreetMap: Google Maps is not configured"
        );
    }

    #[test]
    fn error_body_has_success_false() {
        let json = serde_json::to_value(ErrorResponse::new("address cannot be empty")).expect("serializes");
        assert_eq!(json, serde_json::json!({"success": false, "error": "address cannot be empty"}));
    }
}
