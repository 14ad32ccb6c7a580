//! Core contracts for waypoint.
//!
//! This crate contains:
//! - Canonical location models and validation
//! - Provider identifiers, adapters, and the HTTP transport they share
//! - Quota tracking and per-attempt deadlines
//! - The fallback orchestrator, candidate scoring, and response envelopes

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod provider_policy;
pub mod quota;
pub mod routing;
pub mod scoring;
pub mod source;
pub mod throttling;
pub mod timeout;

pub use adapters::{GoogleMapsAdapter, MathematicalSource, OpenStreetMapAdapter};
pub use config::{GoogleMapsConfig, OpenStreetMapConfig, ResolverConfig};
pub use data_source::{
    CapabilitySet, DistanceRequest, Endpoint, GeocodeRequest, LocationSource, RawCandidate,
    RawDistance, SourceError, SourceErrorKind, SourceFuture, MAX_ADDRESS_LEN,
};
pub use domain::{
    AddressComponents, Coordinates, DistanceResult, GeocodeCandidate, MatchLevel, EARTH_RADIUS_KM,
};
pub use envelope::{
    DistanceResponse, Envelope, ErrorResponse, GeocodeResponse, ResponseAssembler,
};
pub use error::{ConfigError, ValidationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    StaticHttpClient,
};
pub use provider_policy::ProviderPolicy;
pub use quota::{Eligibility, QuotaSnapshot, QuotaTracker};
pub use routing::{
    Attempt, AttemptOutcome, FallbackOrchestrator, FallbackOrchestratorBuilder, ProviderSnapshot,
    ResolveError, RouteResult, RouteSuccess,
};
pub use scoring::{ScoringEngine, ScoringWeights};
pub use source::ProviderId;
pub use throttling::RequestGate;
pub use timeout::with_timeout;
