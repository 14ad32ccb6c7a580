//! Fixed-window call budgets per provider.
//!
//! Windows expire lazily: every eligibility check or usage record first rolls
//! the window forward if `window_start + window_duration` has passed, so no
//! background timer is needed. Limits are soft safety margins; two concurrent
//! requests may both observe the last free slot and both proceed.
//!
//! Separately from the window, a provider that refused on request frequency
//! can be benched for a short cool-off. Cool-offs expire lazily too and never
//! touch the call counter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use time::OffsetDateTime;

use crate::provider_policy::ProviderPolicy;
use crate::ProviderId;

#[derive(Debug)]
struct WindowState {
    window_start: Instant,
    calls_used: u32,
}

impl WindowState {
    fn roll(&mut self, now: Instant, window: Duration) {
        if now.saturating_duration_since(self.window_start) >= window {
            self.window_start = now;
            self.calls_used = 0;
        }
    }
}

#[derive(Debug)]
struct ProviderQuota {
    calls_limit: u32,
    window_duration: Duration,
    state: Mutex<WindowState>,
}

impl ProviderQuota {
    fn new(calls_limit: u32, window_duration: Duration) -> Self {
        Self {
            calls_limit,
            window_duration,
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                calls_used: 0,
            }),
        }
    }

    /// Locks and rolls the window; a poisoned lock still holds valid counters.
    fn current(&self) -> MutexGuard<'_, WindowState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.roll(Instant::now(), self.window_duration);
        state
    }
}

/// Point-in-time view of one provider's budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub provider: ProviderId,
    pub calls_used: u32,
    /// `None` for providers without a budget.
    pub calls_limit: Option<u32>,
    pub window_duration: Duration,
    /// Time left in the current window; `None` for providers without a budget.
    pub resets_in: Option<Duration>,
}

impl QuotaSnapshot {
    pub fn is_exhausted(&self) -> bool {
        self.calls_limit
            .is_some_and(|limit| self.calls_used >= limit)
    }

    pub fn remaining(&self) -> Option<u32> {
        self.calls_limit
            .map(|limit| limit.saturating_sub(self.calls_used))
    }

    /// Share of the budget spent, in `[0, 1]`.
    pub fn usage_ratio(&self) -> f64 {
        match self.calls_limit {
            Some(0) => 1.0,
            Some(limit) => (f64::from(self.calls_used) / f64::from(limit)).min(1.0),
            None => 0.0,
        }
    }

    pub fn resets_at(&self) -> Option<OffsetDateTime> {
        self.resets_in
            .map(|remaining| OffsetDateTime::now_utc() + remaining)
    }
}

/// Whether a provider may be attempted right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// The current window's budget is spent.
    Exhausted,
    /// Benched after a rate-limit refusal; carries the time left.
    CoolingOff(Duration),
}

/// Process-wide owner of every provider's call counter.
///
/// Providers without a registered limit, and the mathematical source
/// always, are eligible and never counted.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    providers: HashMap<ProviderId, ProviderQuota>,
    cool_offs: Mutex<HashMap<ProviderId, Instant>>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_policies<'a>(policies: impl IntoIterator<Item = &'a ProviderPolicy>) -> Self {
        policies
            .into_iter()
            .fold(Self::new(), |tracker, policy| match policy.quota_limit {
                Some(limit) => tracker.with_limit(policy.provider_id, limit, policy.quota_window),
                None => tracker,
            })
    }

    pub fn with_limit(mut self, provider: ProviderId, calls_limit: u32, window: Duration) -> Self {
        if provider != ProviderId::Mathematical {
            self.providers
                .insert(provider, ProviderQuota::new(calls_limit, window));
        }
        self
    }

    pub fn eligibility(&self, provider: ProviderId) -> Eligibility {
        if let Some(quota) = self.providers.get(&provider) {
            if quota.current().calls_used >= quota.calls_limit {
                return Eligibility::Exhausted;
            }
        }

        let mut cool_offs = self.cool_offs.lock().unwrap_or_else(PoisonError::into_inner);
        match cool_offs.get(&provider).copied() {
            Some(until) => {
                let left = until.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    cool_offs.remove(&provider);
                    Eligibility::Eligible
                } else {
                    Eligibility::CoolingOff(left)
                }
            }
            None => Eligibility::Eligible,
        }
    }

    /// Whether `provider` may be attempted now.
    pub fn is_eligible(&self, provider: ProviderId) -> bool {
        self.eligibility(provider) == Eligibility::Eligible
    }

    /// Counts one successful billable call.
    pub fn record_usage(&self, provider: ProviderId) {
        if let Some(quota) = self.providers.get(&provider) {
            let mut state = quota.current();
            state.calls_used = state.calls_used.saturating_add(1);
        }
    }

    /// Spends the rest of the current window after the provider itself
    /// reported that its quota is gone.
    pub fn mark_exhausted(&self, provider: ProviderId) {
        if let Some(quota) = self.providers.get(&provider) {
            let mut state = quota.current();
            state.calls_used = state.calls_used.max(quota.calls_limit);
        }
    }

    /// Benches `provider` for `duration` without spending its window. A
    /// longer cool-off already in place is kept.
    pub fn cool_off(&self, provider: ProviderId, duration: Duration) {
        if provider == ProviderId::Mathematical || duration.is_zero() {
            return;
        }
        let until = Instant::now() + duration;
        let mut cool_offs = self.cool_offs.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cool_offs.entry(provider).or_insert(until);
        *entry = (*entry).max(until);
    }

    pub fn snapshot(&self, provider: ProviderId) -> QuotaSnapshot {
        match self.providers.get(&provider) {
            Some(quota) => {
                let state = quota.current();
                let elapsed = state.window_start.elapsed();
                QuotaSnapshot {
                    provider,
                    calls_used: state.calls_used,
                    calls_limit: Some(quota.calls_limit),
                    window_duration: quota.window_duration,
                    resets_in: Some(quota.window_duration.saturating_sub(elapsed)),
                }
            }
            None => QuotaSnapshot {
                provider,
                calls_used: 0,
                calls_limit: None,
                window_duration: Duration::ZERO,
                resets_in: None,
            },
        }
    }
}
