//! Location source trait and request/response types.
//!
//! This module defines the adapter contract (`LocationSource`) that every
//! provider implements, the validated request types, and the adapter-agnostic
//! raw result shapes that adapters translate provider payloads into.
//!
//! # Endpoints
//!
//! | Endpoint | Request | Response | Description |
//! |----------|---------|----------|-------------|
//! | Geocode | [`GeocodeRequest`] | `Vec<`[`RawCandidate`]`>` | Free-text address to coordinates |
//! | Distance | [`DistanceRequest`] | [`RawDistance`] | Travel distance between two points |
//!
//! # Example
//!
//! ```rust,ignore
//! use waypoint_core::{DistanceRequest, LocationSource, MathematicalSource};
//!
//! async fn straight_line(source: &MathematicalSource) -> Result<(), waypoint_core::SourceError> {
//!     let request = DistanceRequest::from_degrees(13.75, 100.50, 14.02, 100.61)?;
//!     let distance = source.distance(request).await?;
//!     println!("{:.2} km", distance.distance_km);
//!     Ok(())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AddressComponents, Coordinates, ProviderId, ValidationError};

/// Longest address accepted before any provider is contacted.
pub const MAX_ADDRESS_LEN: usize = 500;

/// Endpoint type used for routing and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Geocode,
    Distance,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Geocode => "geocode",
            Self::Distance => "distance",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a location source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub geocode: bool,
    pub distance: bool,
}

impl CapabilitySet {
    pub const fn new(geocode: bool, distance: bool) -> Self {
        Self { geocode, distance }
    }

    pub const fn full() -> Self {
        Self::new(true, true)
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Geocode => self.geocode,
            Endpoint::Distance => self.distance,
        }
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(2);
        if self.geocode {
            values.push(Endpoint::Geocode.as_str());
        }
        if self.distance {
            values.push(Endpoint::Distance.as_str());
        }
        values
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// Network failure, provider 5xx, unparseable payload.
    TransientError,
    /// The attempt exceeded its time budget.
    Timeout,
    /// Provider is out of budget, either per the quota tracker or by its own report.
    QuotaExceeded,
    /// Malformed input no provider can interpret.
    InvalidInput,
    /// Provider answered but found no match.
    NotFound,
    UnsupportedEndpoint,
}

impl SourceErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransientError => "transient_error",
            Self::Timeout => "timeout",
            Self::QuotaExceeded => "quota_exceeded",
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::UnsupportedEndpoint => "unsupported_endpoint",
        }
    }
}

/// Structured source error used by the fallback orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    rate_limited: bool,
    retry_after: Option<Duration>,
}

impl SourceError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::TransientError,
            message: message.into(),
            rate_limited: false,
            retry_after: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            rate_limited: false,
            retry_after: None,
        }
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::QuotaExceeded,
            message: message.into(),
            rate_limited: false,
            retry_after: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidInput,
            message: message.into(),
            rate_limited: false,
            retry_after: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            rate_limited: false,
            retry_after: None,
        }
    }

    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedEndpoint,
            message: format!("endpoint '{endpoint}' is not supported by this source"),
            rate_limited: false,
            retry_after: None,
        }
    }

    /// Short-term refusal on request frequency. Classified as quota
    /// exhaustion, but it only benches the provider for a cool-off instead
    /// of spending its window.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::QuotaExceeded,
            message: message.into(),
            rate_limited: true,
            retry_after: None,
        }
    }

    /// When the provider or the local gate said how long to back off.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn is_rate_limited(&self) -> bool {
        self.rate_limited
    }

    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Whether the orchestrator should move on to the next provider.
    pub const fn cascades(&self) -> bool {
        !matches!(self.kind, SourceErrorKind::InvalidInput)
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::TransientError => "source.transient_error",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::QuotaExceeded => "source.quota_exceeded",
            SourceErrorKind::InvalidInput => "source.invalid_input",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_input(error.to_string())
    }
}

/// Validated geocoding input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeRequest {
    address: String,
    company_name: Option<String>,
}

impl GeocodeRequest {
    pub fn new(
        address: impl AsRef<str>,
        company_name: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let address = address.as_ref().trim();
        if address.is_empty() {
            return Err(ValidationError::EmptyAddress);
        }

        let len = address.chars().count();
        if len > MAX_ADDRESS_LEN {
            return Err(ValidationError::AddressTooLong {
                len,
                max: MAX_ADDRESS_LEN,
            });
        }

        let company_name = company_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);

        Ok(Self {
            address: address.to_owned(),
            company_name,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    /// Response language matching the script the address was written in,
    /// so resolved component names compare against the query text.
    pub fn language_hint(&self) -> &'static str {
        if self
            .address
            .chars()
            .any(|ch| ('\u{0E00}'..='\u{0E7F}').contains(&ch))
        {
            "th"
        } else {
            "en"
        }
    }
}

/// Validated distance input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRequest {
    pub origin: Coordinates,
    pub destination: Coordinates,
}

impl DistanceRequest {
    pub const fn new(origin: Coordinates, destination: Coordinates) -> Self {
        Self {
            origin,
            destination,
        }
    }

    /// Validates raw degrees, naming the offending field on failure.
    pub fn from_degrees(
        origin_lat: f64,
        origin_lng: f64,
        dest_lat: f64,
        dest_lng: f64,
    ) -> Result<Self, ValidationError> {
        let origin = Coordinates::validated("originLat", origin_lat, "originLng", origin_lng)?;
        let destination = Coordinates::validated("destLat", dest_lat, "destLng", dest_lng)?;
        Ok(Self::new(origin, destination))
    }
}

/// Provider result translated into the shared shape, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub coordinates: Coordinates,
    pub formatted_address: String,
    pub components: AddressComponents,
    /// Provider's own certainty signal mapped to `[0, 1]`, when it reports one.
    pub provider_confidence: Option<f64>,
    /// Number of other interpretations the provider returned for the same query.
    pub alternatives: usize,
    /// Point-of-interest name when the provider resolved a named place.
    pub place_name: Option<String>,
    pub source: ProviderId,
}

/// Provider distance result translated into the shared shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDistance {
    pub distance_km: f64,
    pub duration_seconds: Option<u64>,
    pub source: ProviderId,
}

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Location source adapter contract.
///
/// Adapters build the provider request, parse the provider response into
/// [`RawCandidate`]/[`RawDistance`], and classify failures into
/// [`SourceErrorKind`]. They never retry and never consult quota; both
/// belong to the orchestrator.
///
/// Implementations must be `Send + Sync` as they are shared across requests.
pub trait LocationSource: Send + Sync {
    /// Returns the provider identifier.
    fn id(&self) -> ProviderId;

    /// Returns the set of supported endpoints.
    fn capabilities(&self) -> CapabilitySet;

    /// Resolves a free-text address into unscored candidates.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] classified as transient, quota, invalid input or not found.
    fn geocode<'a>(&'a self, req: GeocodeRequest) -> SourceFuture<'a, Vec<RawCandidate>>;

    /// Computes the travel distance between two points.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] classified as transient, quota, invalid input or not found.
    fn distance<'a>(&'a self, req: DistanceRequest) -> SourceFuture<'a, RawDistance>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geocode_request_trims_and_rejects_blank() {
        assert_eq!(
            GeocodeRequest::new("   \t", None),
            Err(ValidationError::EmptyAddress)
        );

        let request = GeocodeRequest::new("  Khlong Luang  ", Some("  ")).expect("valid");
        assert_eq!(request.address(), "Khlong Luang");
        assert_eq!(request.company_name(), None);
        assert_eq!(request.language_hint(), "en");
        assert_eq!(
            GeocodeRequest::new("อ.คลองหลวง", None)
                .expect("valid")
                .language_hint(),
            "th"
        );
    }

    #[test]
    fn geocode_request_rejects_overlong_address() {
        let long = "a".repeat(MAX_ADDRESS_LEN + 1);
        assert!(matches!(
            GeocodeRequest::new(long, None),
            Err(ValidationError::AddressTooLong { .. })
        ));
    }

    #[test]
    fn distance_request_names_offending_field() {
        let err = DistanceRequest::from_degrees(13.0, 100.0, 13.0, 200.0).expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::LongitudeOutOfRange { field: "destLng", .. }
        ));
    }

    #[test]
    fn only_invalid_input_stops_the_cascade() {
        assert!(!SourceError::invalid_input("bad").cascades());
        assert!(SourceError::timeout("slow").cascades());
        assert!(SourceError::not_found("none").cascades());
        assert!(SourceError::quota_exceeded("spent").cascades());
    }
}
