use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{
    GoogleMapsAdapter, MathematicalSource, OpenStreetMapAdapter, GOOGLE_MAPS_BASE_URL,
    NOMINATIM_BASE_URL, OSRM_BASE_URL,
};
use crate::http_client::HttpClient;
use crate::provider_policy::ProviderPolicy;
use crate::routing::FallbackOrchestrator;
use crate::scoring::{ScoringEngine, ScoringWeights};
use crate::throttling::RequestGate;
use crate::ConfigError;

/// Deployments talking to the public Nominatim instance should override
/// this with an agent that carries a contact address.
pub const DEFAULT_USER_AGENT: &str = concat!("waypoint/", env!("CARGO_PKG_VERSION"));

/// Google Maps Platform settings.
#[derive(Clone, PartialEq)]
pub struct GoogleMapsConfig {
    /// The provider is left out of the chain when no key is set.
    pub api_key: Option<String>,
    pub base_url: String,
    pub region: String,
    pub policy: ProviderPolicy,
}

impl Default for GoogleMapsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: String::from(GOOGLE_MAPS_BASE_URL),
            region: String::from("th"),
            policy: ProviderPolicy::google_maps_default(),
        }
    }
}

impl fmt::Debug for GoogleMapsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleMapsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("region", &self.region)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Nominatim and OSRM settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenStreetMapConfig {
    pub nominatim_url: String,
    pub osrm_url: String,
    pub user_agent: String,
    pub country_codes: String,
    /// Nominatim gate; the public instance allows one request per second.
    pub requests_per_second: u32,
    /// OSRM gate; `None` leaves routing ungated.
    pub osrm_requests_per_second: Option<u32>,
    pub result_limit: u8,
    pub policy: ProviderPolicy,
}

impl Default for OpenStreetMapConfig {
    fn default() -> Self {
        Self {
            nominatim_url: String::from(NOMINATIM_BASE_URL),
            osrm_url: String::from(OSRM_BASE_URL),
            user_agent: String::from(DEFAULT_USER_AGENT),
            country_codes: String::from("th"),
            requests_per_second: 1,
            osrm_requests_per_second: None,
            result_limit: 5,
            policy: ProviderPolicy::openstreetmap_default(),
        }
    }
}

/// Everything needed to assemble the provider chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub google: GoogleMapsConfig,
    pub openstreetmap: OpenStreetMapConfig,
    pub mathematical: ProviderPolicy,
    pub scoring: ScoringWeights,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            google: GoogleMapsConfig::default(),
            openstreetmap: OpenStreetMapConfig::default(),
            mathematical: ProviderPolicy::mathematical_default(),
            scoring: ScoringWeights::default(),
        }
    }
}

impl ResolverConfig {
    /// Defaults overlaid with `WAYPOINT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        config.google.api_key = var("WAYPOINT_GOOGLE_MAPS_API_KEY").or_else(|| var("GOOGLE_MAPS_API_KEY"));
        if let Some(limit) = parse_var::<u32>(&var, "WAYPOINT_GOOGLE_QUOTA_LIMIT", "a non-negative integer")? {
            config.google.policy.quota_limit = Some(limit);
        }
        if let Some(secs) = parse_var::<u64>(&var, "WAYPOINT_GOOGLE_QUOTA_WINDOW_SECS", "a positive number of seconds")? {
            config.google.policy.quota_window = positive_secs("WAYPOINT_GOOGLE_QUOTA_WINDOW_SECS", secs)?;
        }
        if let Some(secs) = parse_var::<u64>(&var, "WAYPOINT_GOOGLE_TIMEOUT_SECS", "a positive number of seconds")? {
            config.google.policy.timeout = Some(positive_secs("WAYPOINT_GOOGLE_TIMEOUT_SECS", secs)?);
        }

        if let Some(secs) = parse_var::<u64>(&var, "WAYPOINT_OSM_TIMEOUT_SECS", "a positive number of seconds")? {
            config.openstreetmap.policy.timeout = Some(positive_secs("WAYPOINT_OSM_TIMEOUT_SECS", secs)?);
        }
        if let Some(rate) = parse_var::<u32>(&var, "WAYPOINT_OSM_REQUESTS_PER_SECOND", "a positive integer")? {
            if rate == 0 {
                return Err(invalid("WAYPOINT_OSM_REQUESTS_PER_SECOND", "a positive integer", "0"));
            }
            config.openstreetmap.requests_per_second = rate;
        }
        if let Some(rate) = parse_var::<u32>(&var, "WAYPOINT_OSRM_REQUESTS_PER_SECOND", "a positive integer")? {
            if rate == 0 {
                return Err(invalid("WAYPOINT_OSRM_REQUESTS_PER_SECOND", "a positive integer", "0"));
            }
            config.openstreetmap.osrm_requests_per_second = Some(rate);
        }
        if let Some(url) = var("WAYPOINT_NOMINATIM_URL") {
            config.openstreetmap.nominatim_url = url;
        }
        if let Some(url) = var("WAYPOINT_OSRM_URL") {
            config.openstreetmap.osrm_url = url;
        }
        if let Some(agent) = var("WAYPOINT_USER_AGENT") {
            config.openstreetmap.user_agent = agent;
        }

        Ok(config)
    }

    /// Builds the provider chain over `http_client`.
    ///
    /// Google Maps is included only when an API key is configured.
    pub fn build_orchestrator(&self, http_client: Arc<dyn HttpClient>) -> FallbackOrchestrator {
        let mut builder =
            FallbackOrchestrator::builder().with_scoring(ScoringEngine::new(self.scoring.clone()));

        match &self.google.api_key {
            Some(key) => {
                let adapter = GoogleMapsAdapter::with_http_client(Arc::clone(&http_client), key.clone())
                    .with_base_url(self.google.base_url.as_str())
                    .with_region(self.google.region.as_str())
                    .with_request_timeout(request_timeout(&self.google.policy));
                builder = builder.with_source(Arc::new(adapter), self.google.policy.clone());
            }
            None => tracing::warn!("no Google Maps API key configured, primary provider disabled"),
        }

        let osm = &self.openstreetmap;
        let mut adapter = OpenStreetMapAdapter::with_http_client(http_client, osm.user_agent.as_str())
            .with_nominatim_url(osm.nominatim_url.as_str())
            .with_osrm_url(osm.osrm_url.as_str())
            .with_country_codes(osm.country_codes.as_str())
            .with_result_limit(osm.result_limit)
            .with_nominatim_gate(RequestGate::per_second(osm.requests_per_second))
            .with_request_timeout(request_timeout(&osm.policy));
        if let Some(rate) = osm.osrm_requests_per_second {
            adapter = adapter.with_osrm_gate(RequestGate::per_second(rate));
        }
        builder = builder.with_source(Arc::new(adapter), osm.policy.clone());

        builder
            .with_source(Arc::new(MathematicalSource::new()), self.mathematical.clone())
            .build()
    }
}

/// Transport deadline: a little past the attempt budget so the
/// orchestrator's timeout fires first and reports the attempt.
fn request_timeout(policy: &ProviderPolicy) -> Duration {
    policy
        .timeout
        .map_or(Duration::from_secs(30), |budget| budget + Duration::from_secs(1))
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    var(name)
        .map(|raw| raw.parse::<T>().map_err(|_| invalid(name, expected, &raw)))
        .transpose()
}

fn positive_secs(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(invalid(name, "a positive number of seconds", "0"));
    }
    Ok(Duration::from_secs(secs))
}

fn invalid(name: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        expected,
        value: value.to_owned(),
    }
}
