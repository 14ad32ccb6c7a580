use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::data_source::{
    CapabilitySet, DistanceRequest, GeocodeRequest, LocationSource, RawCandidate, RawDistance,
    SourceError, SourceFuture,
};
use crate::http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::{AddressComponents, Coordinates, ProviderId};

pub const GOOGLE_MAPS_BASE_URL: &str = "https://maps.googleapis.com";

/// Google Maps Platform adapter (Geocoding API + Distance Matrix API).
#[derive(Clone)]
pub struct GoogleMapsAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    base_url: String,
    region: String,
    request_timeout: Duration,
}

impl GoogleMapsAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            auth: HttpAuth::QueryParam {
                name: String::from("key"),
                value: api_key.into(),
            },
            base_url: String::from(GOOGLE_MAPS_BASE_URL),
            region: String::from("th"),
            request_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn send(&self, url: String) -> Result<HttpResponse, SourceError> {
        let request = HttpRequest::get(url)
            .with_auth(&self.auth)
            .with_timeout(self.request_timeout);
        tracing::debug!(url = %request.redacted_url(), "google maps request");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(transport_error)?;

        match response.status {
            429 => Err(SourceError::rate_limited(
                "google maps returned HTTP 429 (too many requests)",
            )),
            status if !response.is_success() => Err(SourceError::transient(format!(
                "google maps returned HTTP {status}"
            ))),
            _ => Ok(response),
        }
    }

    async fn fetch_geocode(&self, req: &GeocodeRequest) -> Result<Vec<RawCandidate>, SourceError> {
        let url = format!(
            "{}/maps/api/geocode/json?address={}&region={}&language={}",
            self.base_url,
            urlencoding::encode(req.address()),
            urlencoding::encode(&self.region),
            req.language_hint(),
        );
        let response = self.send(url).await?;

        let payload: GeocodeResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::transient(format!("failed to parse google geocode response: {e}"))
        })?;
        check_status(&payload.status, payload.error_message.as_deref())?;

        let alternatives = payload.results.len().saturating_sub(1);
        let candidates = payload
            .results
            .into_iter()
            .filter_map(|result| to_candidate(result, alternatives))
            .collect::<Vec<_>>();

        if candidates.is_empty() {
            return Err(SourceError::not_found("google maps returned no usable results"));
        }
        Ok(candidates)
    }

    async fn fetch_distance(&self, req: &DistanceRequest) -> Result<RawDistance, SourceError> {
        let url = format!(
            "{}/maps/api/distancematrix/json?origins={}&destinations={}&mode=driving&units=metric",
            self.base_url,
            urlencoding::encode(&req.origin.to_query_pair()),
            urlencoding::encode(&req.destination.to_query_pair()),
        );
        let response = self.send(url).await?;

        let payload: DistanceMatrixResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::transient(format!("failed to parse google distance response: {e}"))
        })?;
        check_status(&payload.status, payload.error_message.as_deref())?;

        let element = payload
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| SourceError::transient("google distance response has no elements"))?;
        check_status(&element.status, None)?;

        let distance = element
            .distance
            .ok_or_else(|| SourceError::transient("google distance element has no distance"))?;

        Ok(RawDistance {
            distance_km: distance.value / 1_000.0,
            duration_seconds: element.duration.map(|d| d.value.max(0.0).round() as u64),
            source: ProviderId::Primary,
        })
    }
}

impl LocationSource for GoogleMapsAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Primary
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn geocode<'a>(&'a self, req: GeocodeRequest) -> SourceFuture<'a, Vec<RawCandidate>> {
        Box::pin(async move { self.fetch_geocode(&req).await })
    }

    fn distance<'a>(&'a self, req: DistanceRequest) -> SourceFuture<'a, RawDistance> {
        Box::pin(async move { self.fetch_distance(&req).await })
    }
}

fn transport_error(error: HttpError) -> SourceError {
    if error.is_timeout() {
        SourceError::timeout(format!("google maps transport timeout: {}", error.message()))
    } else {
        SourceError::transient(format!("google maps transport error: {}", error.message()))
    }
}

/// Maps Google's top-level and element status codes onto the source taxonomy.
///
/// `OVER_QUERY_LIMIT` covers both the per-second rate limit and a spent daily
/// quota; only the latter, told apart by its message, spends the window.
fn check_status(status: &str, detail: Option<&str>) -> Result<(), SourceError> {
    let daily = detail.is_some_and(|d| d.to_ascii_lowercase().contains("daily"));
    let detail = detail.map(|d| format!(": {d}")).unwrap_or_default();
    match status {
        "OK" => Ok(()),
        "ZERO_RESULTS" | "NOT_FOUND" | "MAX_ROUTE_LENGTH_EXCEEDED" => Err(
            SourceError::not_found(format!("google maps found no match ({status})")),
        ),
        "OVER_QUERY_LIMIT" if !daily => Err(SourceError::rate_limited(format!(
            "google maps rate limit hit ({status}){detail}"
        ))),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Err(SourceError::quota_exceeded(format!(
            "google maps quota exhausted ({status}){detail}"
        ))),
        "INVALID_REQUEST" | "MAX_ELEMENTS_EXCEEDED" | "MAX_DIMENSIONS_EXCEEDED" => Err(
            SourceError::invalid_input(format!("google maps rejected the request ({status}){detail}")),
        ),
        other => Err(SourceError::transient(format!(
            "google maps status {other}{detail}"
        ))),
    }
}

fn to_candidate(result: GeocodeResult, alternatives: usize) -> Option<RawCandidate> {
    let coordinates =
        Coordinates::new(result.geometry.location.lat, result.geometry.location.lng).ok()?;

    let mut confidence = match result.geometry.location_type.as_deref() {
        Some("ROOFTOP") => 1.0,
        Some("RANGE_INTERPOLATED") => 0.8,
        Some("GEOMETRIC_CENTER") => 0.6,
        _ => 0.4,
    };
    if result.partial_match {
        confidence *= 0.8;
    }

    let mut components = AddressComponents::default();
    let mut place_name = None;
    for component in result.address_components {
        let value = component.long_name;
        for kind in &component.types {
            let slot = match kind.as_str() {
                "street_number" => &mut components.house_number,
                "route" => &mut components.road,
                "sublocality_level_2" | "administrative_area_level_3" => {
                    &mut components.subdistrict
                }
                "sublocality_level_1" | "administrative_area_level_2" => &mut components.district,
                "locality" => &mut components.city,
                "administrative_area_level_1" => &mut components.state,
                "postal_code" => &mut components.postcode,
                "country" => &mut components.country,
                "establishment" | "point_of_interest" | "premise" => &mut place_name,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.clone());
            }
        }
    }

    Some(RawCandidate {
        coordinates,
        formatted_address: result.formatted_address,
        components,
        provider_confidence: Some(confidence),
        alternatives,
        place_name,
        source: ProviderId::Primary,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<GoogleAddressComponent>,
    geometry: GoogleGeometry,
    #[serde(default)]
    partial_match: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleAddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
    location_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
    error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DistanceMatrixRow {
    #[serde(default)]
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Clone, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    distance: Option<ValueField>,
    duration: Option<ValueField>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ValueField {
    value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::StaticHttpClient;
    use crate::SourceErrorKind;

    fn adapter(client: Arc<StaticHttpClient>) -> GoogleMapsAdapter {
        GoogleMapsAdapter::with_http_client(client, "test-key")
            .with_base_url("https://maps.example.test/")
    }

    #[tokio::test]
    async fn geocode_maps_components_and_location_type() {
        let client = Arc::new(StaticHttpClient::ok_json(
            r#"{
                "status": "OK",
                "results": [{
                    "formatted_address": "70/1 Khlong Nueng, Khlong Luang District, Pathum Thani 12120, Thailand",
                    "address_components": [
                        {"long_name": "70/1", "short_name": "70/1", "types": ["street_number"]},
                        {"long_name": "Khlong Nueng", "short_name": "Khlong Nueng", "types": ["locality", "political"]},
                        {"long_name": "Amphoe Khlong Luang", "short_name": "Amphoe Khlong Luang", "types": ["administrative_area_level_2", "political"]},
                        {"long_name": "Chang Wat Pathum Thani", "short_name": "Chang Wat Pathum Thani", "types": ["administrative_area_level_1", "political"]},
                        {"long_name": "Thailand", "short_name": "TH", "types": ["country", "political"]},
                        {"long_name": "12120", "short_name": "12120", "types": ["postal_code"]}
                    ],
                    "geometry": {"location": {"lat": 14.0716, "lng": 100.6122}, "location_type": "ROOFTOP"},
                    "partial_match": true
                }]
            }"#,
        ));

        let request = GeocodeRequest::new("70/1 Khlong Nueng, Pathum Thani", None).expect("valid");
        let candidates = adapter(Arc::clone(&client))
            .geocode(request)
            .await
            .expect("geocode succeeds");

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.source, ProviderId::Primary);
        assert_eq!(candidate.components.house_number.as_deref(), Some("70/1"));
        assert_eq!(candidate.components.district.as_deref(), Some("Amphoe Khlong Luang"));
        assert_eq!(candidate.components.postcode.as_deref(), Some("12120"));
        assert_eq!(candidate.provider_confidence, Some(0.8));
        assert_eq!(candidate.alternatives, 0);

        let sent = client.requests();
        assert!(sent[0].url.starts_with("https://maps.example.test/maps/api/geocode/json?address="));
        assert!(sent[0].url.ends_with("&key=test-key"));
        assert!(sent[0].url.contains("language=en"));
    }

    #[tokio::test]
    async fn zero_results_is_not_found() {
        let client = Arc::new(StaticHttpClient::ok_json(r#"{"status": "ZERO_RESULTS", "results": []}"#));
        let request = GeocodeRequest::new("nowhere at all", None).expect("valid");

        let error = adapter(client).geocode(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn daily_over_query_limit_is_quota_exceeded() {
        let client = Arc::new(StaticHttpClient::ok_json(
            r#"{"status": "OVER_QUERY_LIMIT", "error_message": "You have exceeded your daily request quota"}"#,
        ));
        let request = GeocodeRequest::new("Bangkok", None).expect("valid");

        let error = adapter(client).geocode(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::QuotaExceeded);
        assert!(!error.is_rate_limited());
        assert!(error.message().contains("daily request quota"));
    }

    #[tokio::test]
    async fn per_second_limit_is_only_rate_limited() {
        let client = Arc::new(StaticHttpClient::ok_json(
            r#"{"status": "OVER_QUERY_LIMIT", "error_message": "You have exceeded your rate-limit for this API."}"#,
        ));
        let request = GeocodeRequest::new("Bangkok", None).expect("valid");

        let error = adapter(client).geocode(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::QuotaExceeded);
        assert!(error.is_rate_limited());
    }

    #[tokio::test]
    async fn request_denied_is_transient() {
        let client = Arc::new(StaticHttpClient::ok_json(r#"{"status": "REQUEST_DENIED"}"#));
        let request = GeocodeRequest::new("Bangkok", None).expect("valid");

        let error = adapter(client).geocode(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::TransientError);
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let client = Arc::new(StaticHttpClient::new(Ok(HttpResponse::with_status(503, "unavailable"))));
        let request = GeocodeRequest::new("Bangkok", None).expect("valid");

        let error = adapter(client).geocode(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::TransientError);
    }

    #[tokio::test]
    async fn distance_matrix_reports_km_and_seconds() {
        let client = Arc::new(StaticHttpClient::ok_json(
            r#"{
                "status": "OK",
                "rows": [{"elements": [{
                    "status": "OK",
                    "distance": {"text": "52.3 km", "value": 52311},
                    "duration": {"text": "48 mins", "value": 2890}
                }]}]
            }"#,
        ));
        let request = DistanceRequest::from_degrees(13.7563, 100.5018, 14.0716, 100.6122).expect("valid");

        let distance = adapter(Arc::clone(&client))
            .distance(request)
            .await
            .expect("distance succeeds");

        assert!((distance.distance_km - 52.311).abs() < 1e-9);
        assert_eq!(distance.duration_seconds, Some(2890));
        assert!(client.requests()[0].url.contains("origins=13.7563%2C100.5018"));
    }

    #[tokio::test]
    async fn unroutable_element_is_not_found() {
        let client = Arc::new(StaticHttpClient::ok_json(
            r#"{"status": "OK", "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]}"#,
        ));
        let request = DistanceRequest::from_degrees(13.0, 100.0, 7.0, 98.0).expect("valid");

        let error = adapter(client).distance(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn transport_timeout_is_timeout() {
        let client = Arc::new(StaticHttpClient::new(Err(HttpError::timed_out("request timeout"))));
        let request = DistanceRequest::from_degrees(13.0, 100.0, 14.0, 100.0).expect("valid");

        let error = adapter(client).distance(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Timeout);
    }
}
