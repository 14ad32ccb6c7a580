use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::adapters::MathematicalSource;
use crate::data_source::{
    CapabilitySet, DistanceRequest, Endpoint, GeocodeRequest, LocationSource, SourceError,
    SourceErrorKind, SourceFuture,
};
use crate::envelope::distance_warning;
use crate::provider_policy::ProviderPolicy;
use crate::quota::{Eligibility, QuotaSnapshot, QuotaTracker};
use crate::scoring::ScoringEngine;
use crate::timeout::with_timeout;
use crate::{DistanceResult, GeocodeCandidate, ProviderId, ValidationError};

/// What happened to one provider during a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    /// Quota window spent; no call was made.
    SkippedQuota,
    /// Still cooling off from an earlier rate-limit refusal; no call was made.
    SkippedRateLimited,
    /// Source does not serve the endpoint; no call was made.
    SkippedUnsupported,
    /// Source refused on request frequency.
    RateLimited,
    Failed(SourceErrorKind),
}

impl AttemptOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::SkippedQuota => "skipped_quota",
            Self::SkippedRateLimited => "skipped_rate_limited",
            Self::SkippedUnsupported => "skipped_unsupported",
            Self::RateLimited => "rate_limited",
            Self::Failed(kind) => kind.as_str(),
        }
    }

    pub const fn was_called(self) -> bool {
        matches!(self, Self::Succeeded | Self::RateLimited | Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub provider: ProviderId,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// Successful routed call.
#[derive(Debug, Clone)]
pub struct RouteSuccess<T> {
    pub data: T,
    pub selected_source: ProviderId,
    /// Every provider visited, in order, including skipped ones.
    pub attempts: Vec<Attempt>,
    pub warnings: Vec<String>,
    /// Primary provider budget after this call, when a primary is configured.
    pub primary_quota: Option<QuotaSnapshot>,
    pub latency_ms: u64,
}

impl<T> RouteSuccess<T> {
    /// Whether any provider ahead of the selected one was skipped or failed.
    pub fn fell_back(&self) -> bool {
        self.attempts
            .iter()
            .any(|attempt| attempt.outcome != AttemptOutcome::Succeeded)
    }

    /// Providers that were actually called, in order.
    pub fn source_chain(&self) -> Vec<ProviderId> {
        self.attempts
            .iter()
            .filter(|attempt| attempt.outcome.was_called())
            .map(|attempt| attempt.provider)
            .collect()
    }
}

/// Caller-visible resolution failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{provider} rejected the request: {message}")]
    Rejected {
        provider: ProviderId,
        message: String,
    },

    /// Only reachable when the chain was built without a mathematical tail.
    #[error("no provider produced a result for endpoint '{endpoint}'")]
    Exhausted {
        endpoint: Endpoint,
        attempts: Vec<Attempt>,
    },
}

impl ResolveError {
    /// Whether the caller sent something no provider can interpret.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Rejected { .. })
    }
}

pub type RouteResult<T> = Result<RouteSuccess<T>, ResolveError>;

/// Source snapshot used by the provider diagnostics endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub timeout: Option<Duration>,
    pub quota: QuotaSnapshot,
}

impl ProviderSnapshot {
    pub fn status_label(self) -> &'static str {
        if self.quota.is_exhausted() {
            "quota_exhausted"
        } else {
            "available"
        }
    }
}

struct SourceSlot {
    source: Arc<dyn LocationSource>,
    policy: ProviderPolicy,
}

/// Ordered provider chain with quota and deadline enforcement.
///
/// Attempts are strictly sequential: only one provider is in flight per
/// request. Quota counters are shared across concurrent requests.
pub struct FallbackOrchestrator {
    slots: Vec<SourceSlot>,
    quota: QuotaTracker,
    scoring: ScoringEngine,
}

impl Default for FallbackOrchestrator {
    fn default() -> Self {
        FallbackOrchestratorBuilder::new().build()
    }
}

impl FallbackOrchestrator {
    pub fn builder() -> FallbackOrchestratorBuilder {
        FallbackOrchestratorBuilder::new()
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    pub fn chain(&self) -> Vec<ProviderId> {
        self.slots.iter().map(|slot| slot.source.id()).collect()
    }

    pub fn providers(&self) -> Vec<ProviderSnapshot> {
        self.slots
            .iter()
            .map(|slot| {
                let id = slot.source.id();
                ProviderSnapshot {
                    id,
                    capabilities: slot.source.capabilities(),
                    timeout: slot.policy.timeout,
                    quota: self.quota.snapshot(id),
                }
            })
            .collect()
    }

    /// Resolves an address and returns the scored candidates, best first.
    pub async fn route_geocode(&self, req: &GeocodeRequest) -> RouteResult<Vec<GeocodeCandidate>> {
        let request = req.clone();
        let routed = self
            .route_endpoint(Endpoint::Geocode, move |source| {
                let request = request.clone();
                Box::pin(async move {
                    let candidates = source.geocode(request).await?;
                    if candidates.is_empty() {
                        return Err(SourceError::not_found("source returned no candidates"));
                    }
                    Ok(candidates)
                })
            })
            .await?;

        let ranked = self.scoring.rank(req, routed.data);
        Ok(RouteSuccess {
            data: ranked,
            selected_source: routed.selected_source,
            attempts: routed.attempts,
            warnings: routed.warnings,
            primary_quota: routed.primary_quota,
            latency_ms: routed.latency_ms,
        })
    }

    pub async fn route_distance(&self, req: &DistanceRequest) -> RouteResult<DistanceResult> {
        let request = *req;
        let routed = self
            .route_endpoint(Endpoint::Distance, move |source| source.distance(request))
            .await?;

        let raw = routed.data;
        Ok(RouteSuccess {
            data: DistanceResult {
                distance_km: raw.distance_km,
                duration_seconds: raw.duration_seconds,
                source: raw.source,
                warning: distance_warning(raw.source).map(str::to_owned),
            },
            selected_source: routed.selected_source,
            attempts: routed.attempts,
            warnings: routed.warnings,
            primary_quota: routed.primary_quota,
            latency_ms: routed.latency_ms,
        })
    }

    async fn route_endpoint<T, F>(&self, endpoint: Endpoint, mut invoke: F) -> RouteResult<T>
    where
        F: for<'a> FnMut(&'a dyn LocationSource) -> SourceFuture<'a, T>,
    {
        let started = Instant::now();
        let mut attempts = Vec::with_capacity(self.slots.len());

        for slot in &self.slots {
            let provider = slot.source.id();

            if !slot.source.capabilities().supports(endpoint) {
                tracing::debug!(%provider, %endpoint, "source does not support endpoint, skipping");
                attempts.push(Attempt {
                    provider,
                    outcome: AttemptOutcome::SkippedUnsupported,
                    elapsed_ms: 0,
                });
                continue;
            }

            let skipped = match self.quota.eligibility(provider) {
                Eligibility::Eligible => None,
                Eligibility::Exhausted => {
                    tracing::info!(%provider, %endpoint, "quota window spent, skipping");
                    Some(AttemptOutcome::SkippedQuota)
                }
                Eligibility::CoolingOff(left) => {
                    tracing::info!(%provider, %endpoint, cool_off_ms = left.as_millis() as u64, "rate limited, skipping");
                    Some(AttemptOutcome::SkippedRateLimited)
                }
            };
            if let Some(outcome) = skipped {
                attempts.push(Attempt {
                    provider,
                    outcome,
                    elapsed_ms: 0,
                });
                continue;
            }

            tracing::debug!(%provider, %endpoint, timeout = ?slot.policy.timeout, "attempting source");
            let attempt_started = Instant::now();
            let result = with_timeout(slot.policy.timeout, invoke(slot.source.as_ref())).await;
            let elapsed = elapsed_ms(attempt_started);

            match result {
                Ok(data) => {
                    self.quota.record_usage(provider);
                    attempts.push(Attempt {
                        provider,
                        outcome: AttemptOutcome::Succeeded,
                        elapsed_ms: elapsed,
                    });

                    let mut warnings = Vec::new();
                    let unsuccessful = attempts.len() - 1;
                    if unsuccessful > 0 {
                        warnings.push(format!(
                            "resolved by '{}' after {unsuccessful} unsuccessful attempt(s)",
                            provider.as_str()
                        ));
                    }

                    let latency_ms = elapsed_ms(started);
                    tracing::info!(%provider, %endpoint, elapsed_ms = elapsed, latency_ms, "source succeeded");

                    return Ok(RouteSuccess {
                        data,
                        selected_source: provider,
                        attempts,
                        warnings,
                        primary_quota: self.primary_quota(),
                        latency_ms,
                    });
                }
                Err(error) => {
                    let outcome = if error.is_rate_limited() {
                        let cool_off = error.retry_after().unwrap_or(slot.policy.rate_limit_cool_off);
                        self.quota.cool_off(provider, cool_off);
                        AttemptOutcome::RateLimited
                    } else {
                        if error.kind() == SourceErrorKind::QuotaExceeded {
                            self.quota.mark_exhausted(provider);
                        }
                        AttemptOutcome::Failed(error.kind())
                    };
                    attempts.push(Attempt {
                        provider,
                        outcome,
                        elapsed_ms: elapsed,
                    });

                    if !error.cascades() {
                        tracing::warn!(%provider, %endpoint, code = error.code(), error = %error.message(), "source rejected input, aborting");
                        return Err(ResolveError::Rejected {
                            provider,
                            message: error.message().to_owned(),
                        });
                    }

                    tracing::warn!(%provider, %endpoint, code = error.code(), elapsed_ms = elapsed, error = %error.message(), "source failed, falling back");
                }
            }
        }

        tracing::error!(%endpoint, "every source in the chain failed");
        Err(ResolveError::Exhausted { endpoint, attempts })
    }

    fn primary_quota(&self) -> Option<QuotaSnapshot> {
        self.slots
            .iter()
            .any(|slot| slot.source.id() == ProviderId::Primary)
            .then(|| self.quota.snapshot(ProviderId::Primary))
    }
}

/// Assembles the provider chain.
///
/// Sources are tried in the order they are added; a provider id added twice
/// keeps its first registration. The mathematical source always ends the
/// chain, whether or not it was added explicitly.
#[derive(Default)]
pub struct FallbackOrchestratorBuilder {
    slots: Vec<SourceSlot>,
    scoring: ScoringEngine,
}

impl FallbackOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn LocationSource>, policy: ProviderPolicy) -> Self {
        let id = source.id();
        if self.slots.iter().any(|slot| slot.source.id() == id) {
            tracing::warn!(provider = %id, "duplicate source ignored");
            return self;
        }
        self.slots.push(SourceSlot { source, policy });
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn build(mut self) -> FallbackOrchestrator {
        let tail = match self
            .slots
            .iter()
            .position(|slot| slot.source.id() == ProviderId::Mathematical)
        {
            Some(index) => self.slots.remove(index),
            None => SourceSlot {
                source: Arc::new(MathematicalSource::new()),
                policy: ProviderPolicy::mathematical_default(),
            },
        };
        self.slots.push(tail);

        let quota = QuotaTracker::from_policies(self.slots.iter().map(|slot| &slot.policy));
        tracing::debug!(
            chain = ?self.slots.iter().map(|slot| slot.source.id()).collect::<Vec<_>>(),
            "fallback chain assembled"
        );

        FallbackOrchestrator {
            slots: self.slots,
            quota,
            scoring: self.scoring,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
