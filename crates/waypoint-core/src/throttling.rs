use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Client-side request-rate gate for providers with a usage policy on
/// request frequency (as opposed to the per-window billing quota).
///
/// A refused request is never queued; the adapter reports it as quota
/// exhaustion and the orchestrator moves on.
#[derive(Clone)]
pub struct RequestGate {
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
}

impl RequestGate {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(window, limit))),
            clock: DefaultClock::default(),
        }
    }

    pub fn per_second(limit: u32) -> Self {
        Self::new(Duration::from_secs(1), limit)
    }

    /// Takes one slot, or returns how long until the next one frees up.
    pub fn acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate").finish_non_exhaustive()
    }
}

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_beyond_burst_and_reports_wait() {
        let gate = RequestGate::new(Duration::from_secs(60), 2);

        assert!(gate.acquire().is_ok());
        assert!(gate.acquire().is_ok());

        let wait = gate.acquire().expect_err("third request should be refused");
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(30));
    }

    #[test]
    fn zero_limit_still_admits_one_request() {
        let gate = RequestGate::per_second(0);
        assert!(gate.acquire().is_ok());
    }
}
