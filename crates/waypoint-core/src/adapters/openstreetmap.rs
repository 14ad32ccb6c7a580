use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::data_source::{
    CapabilitySet, DistanceRequest, GeocodeRequest, LocationSource, RawCandidate, RawDistance,
    SourceError, SourceFuture,
};
use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::throttling::RequestGate;
use crate::{AddressComponents, Coordinates, ProviderId};

pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const OSRM_BASE_URL: &str = "https://router.project-osrm.org";

/// OpenStreetMap adapter: Nominatim for geocoding, OSRM for driving distance.
///
/// The public Nominatim instance allows one request per second per client
/// and requires an identifying User-Agent. Requests beyond the gate are
/// refused locally as a rate limit instead of being queued. OSRM is a
/// separate service and is only gated when an OSRM gate is configured.
#[derive(Clone)]
pub struct OpenStreetMapAdapter {
    http_client: Arc<dyn HttpClient>,
    nominatim_url: String,
    osrm_url: String,
    user_agent: String,
    country_codes: String,
    result_limit: u8,
    nominatim_gate: RequestGate,
    osrm_gate: Option<RequestGate>,
    request_timeout: Duration,
}

impl OpenStreetMapAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, user_agent: impl Into<String>) -> Self {
        Self {
            http_client,
            nominatim_url: String::from(NOMINATIM_BASE_URL),
            osrm_url: String::from(OSRM_BASE_URL),
            user_agent: user_agent.into(),
            country_codes: String::from("th"),
            result_limit: 5,
            nominatim_gate: RequestGate::per_second(1),
            osrm_gate: None,
            request_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_nominatim_url(mut self, url: impl Into<String>) -> Self {
        self.nominatim_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_osrm_url(mut self, url: impl Into<String>) -> Self {
        self.osrm_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_country_codes(mut self, codes: impl Into<String>) -> Self {
        self.country_codes = codes.into();
        self
    }

    pub fn with_result_limit(mut self, limit: u8) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    pub fn with_nominatim_gate(mut self, gate: RequestGate) -> Self {
        self.nominatim_gate = gate;
        self
    }

    pub fn with_osrm_gate(mut self, gate: RequestGate) -> Self {
        self.osrm_gate = Some(gate);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn send(
        &self,
        service: &str,
        gate: Option<&RequestGate>,
        url: String,
    ) -> Result<HttpResponse, SourceError> {
        if let Some(Err(wait)) = gate.map(RequestGate::acquire) {
            return Err(SourceError::rate_limited(format!(
                "{service} request rate exceeded, next slot in {} ms",
                wait.as_millis()
            ))
            .with_retry_after(wait));
        }

        let request = HttpRequest::get(url)
            .with_header("User-Agent", self.user_agent.as_str())
            .with_header("Accept", "application/json")
            .with_timeout(self.request_timeout);
        tracing::debug!(url = %request.redacted_url(), "openstreetmap request");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(transport_error)?;

        if response.status == 429 {
            return Err(SourceError::rate_limited(format!(
                "{service} returned HTTP 429 (too many requests)"
            )));
        }
        Ok(response)
    }

    async fn fetch_geocode(&self, req: &GeocodeRequest) -> Result<Vec<RawCandidate>, SourceError> {
        let url = format!(
            "{}/search?q={}&format=jsonv2&addressdetails=1&limit={}&countrycodes={}&accept-language={}",
            self.nominatim_url,
            urlencoding::encode(req.address()),
            self.result_limit,
            urlencoding::encode(&self.country_codes),
            req.language_hint(),
        );
        let response = self.send("nominatim", Some(&self.nominatim_gate), url).await?;
        if !response.is_success() {
            return Err(SourceError::transient(format!(
                "nominatim returned HTTP {}",
                response.status
            )));
        }

        let places: Vec<NominatimPlace> = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::transient(format!("failed to parse nominatim response: {e}"))
        })?;

        let alternatives = places.len().saturating_sub(1);
        let candidates = places
            .into_iter()
            .filter_map(|place| to_candidate(place, alternatives))
            .collect::<Vec<_>>();

        if candidates.is_empty() {
            return Err(SourceError::not_found("nominatim returned no results"));
        }
        Ok(candidates)
    }

    async fn fetch_distance(&self, req: &DistanceRequest) -> Result<RawDistance, SourceError> {
        // OSRM takes lng,lat order.
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false&alternatives=false",
            self.osrm_url,
            req.origin.lng(),
            req.origin.lat(),
            req.destination.lng(),
            req.destination.lat(),
        );
        let response = self.send("osrm", self.osrm_gate.as_ref(), url).await?;

        // OSRM reports its error code in the body of 4xx responses as well.
        let payload: OsrmRouteResponse = match serde_json::from_str(&response.body) {
            Ok(payload) => payload,
            Err(_) if !response.is_success() => {
                return Err(SourceError::transient(format!(
                    "osrm returned HTTP {}",
                    response.status
                )))
            }
            Err(e) => {
                return Err(SourceError::transient(format!(
                    "failed to parse osrm response: {e}"
                )))
            }
        };

        let detail = payload.message.as_deref().unwrap_or("no detail");
        match payload.code.as_str() {
            "Ok" => {}
            "NoRoute" | "NoSegment" => {
                return Err(SourceError::not_found(format!(
                    "osrm found no route ({}): {detail}",
                    payload.code
                )))
            }
            "InvalidQuery" | "InvalidValue" | "InvalidOptions" | "InvalidUrl" => {
                return Err(SourceError::invalid_input(format!(
                    "osrm rejected the request ({}): {detail}",
                    payload.code
                )))
            }
            other => {
                return Err(SourceError::transient(format!(
                    "osrm status {other}: {detail}"
                )))
            }
        }

        let route = payload
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::not_found("osrm returned no routes"))?;

        Ok(RawDistance {
            distance_km: route.distance / 1_000.0,
            duration_seconds: Some(route.duration.max(0.0).round() as u64),
            source: ProviderId::Secondary,
        })
    }
}

impl LocationSource for OpenStreetMapAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Secondary
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
        SourceError::timeout(format!("openstreetmap transport timeout: {}", error.message()))
    } else {
        SourceError::transient(format!("openstreetmap transport error: {}", error.message()))
    }
}

fn to_candidate(place: NominatimPlace, alternatives: usize) -> Option<RawCandidate> {
    let lat = place.lat.trim().parse::<f64>().ok()?;
    let lng = place.lon.trim().parse::<f64>().ok()?;
    let coordinates = Coordinates::new(lat, lng).ok()?;

    let address = place.address.unwrap_or_default();
    let components = AddressComponents {
        country: address.country,
        state: address.state.or(address.province),
        city: address.city.or(address.town).or(address.village).or(address.municipality),
        district: address.city_district.or(address.county).or(address.district),
        subdistrict: address.suburb.or(address.quarter).or(address.neighbourhood),
        postcode: address.postcode,
        road: address.road,
        house_number: address.house_number,
    };

    let place_name = place.name.filter(|name| !name.trim().is_empty());

    Some(RawCandidate {
        coordinates,
        formatted_address: place.display_name,
        components,
        provider_confidence: place.importance.map(|value| value.clamp(0.0, 1.0)),
        alternatives,
        place_name,
        source: ProviderId::Secondary,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
    name: Option<String>,
    importance: Option<f64>,
    address: Option<NominatimAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    neighbourhood: Option<String>,
    quarter: Option<String>,
    suburb: Option<String>,
    city_district: Option<String>,
    district: Option<String>,
    county: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    province: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
}
