use std::time::Duration;

use crate::ProviderId;

/// Per-provider budget: how long one attempt may take and how many billable
/// calls fit in a quota window.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    /// `None` runs the call without a deadline (synchronous sources only).
    pub timeout: Option<Duration>,
    /// `None` means the provider is never quota-limited.
    pub quota_limit: Option<u32>,
    pub quota_window: Duration,
    /// How long the provider is benched after refusing on request frequency,
    /// unless the refusal names its own delay.
    pub rate_limit_cool_off: Duration,
}

impl ProviderPolicy {
    pub fn google_maps_default() -> Self {
        Self {
            provider_id: ProviderId::Primary,
            timeout: Some(Duration::from_secs(12)),
            quota_limit: Some(1_000),
            quota_window: Duration::from_secs(24 * 60 * 60),
            rate_limit_cool_off: Duration::from_secs(30),
        }
    }

    pub fn openstreetmap_default() -> Self {
        Self {
            provider_id: ProviderId::Secondary,
            timeout: Some(Duration::from_secs(15)),
            quota_limit: None,
            quota_window: Duration::from_secs(60 * 60),
            rate_limit_cool_off: Duration::from_secs(1),
        }
    }

    pub fn mathematical_default() -> Self {
        Self {
            provider_id: ProviderId::Mathematical,
            timeout: None,
            quota_limit: None,
            quota_window: Duration::from_secs(60 * 60),
            rate_limit_cool_off: Duration::ZERO,
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Primary => Self::google_maps_default(),
            ProviderId::Secondary => Self::openstreetmap_default(),
            ProviderId::Mathematical => Self::mathematical_default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rate_limit_cool_off(mut self, cool_off: Duration) -> Self {
        self.rate_limit_cool_off = cool_off;
        self
    }

    pub fn with_quota(mut self, limit: Option<u32>, window: Duration) -> Self {
        self.quota_limit = limit;
        self.quota_window = window;
        self
    }
}
