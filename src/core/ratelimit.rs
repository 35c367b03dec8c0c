//! Per-route, per-client rate limiting

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::Quota;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::warn;

use crate::config::{BucketConfig, RateLimits};
use crate::error::{ApiError, ApiResult};

/// Replenish period used when a configured rate is zero or unusable
const FALLBACK_PERIOD: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Search,
    Play,
    Queue,
    History,
    Library,
}

type ClientLimiter<C> = governor::RateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    C,
    NoOpMiddleware<<C as Clock>::Instant>,
>;

/// GCRA quota equivalent to a bucket of `max_tokens` refilled at `refill_rate`/s
fn quota(config: &BucketConfig) -> Quota {
    let period = Duration::try_from_secs_f64(1.0 / config.refill_rate)
        .ok()
        .filter(|period| !period.is_zero())
        .unwrap_or(FALLBACK_PERIOD);
    let burst = NonZeroU32::new(config.max_tokens.max(1.0).min(u32::MAX as f64) as u32)
        .unwrap_or(NonZeroU32::MIN);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_hour(NonZeroU32::MIN))
        .allow_burst(burst)
}

pub struct RateLimiter<C: Clock = DefaultClock> {
    clock: C,
    search: ClientLimiter<C>,
    play: ClientLimiter<C>,
    queue: ClientLimiter<C>,
    history: ClientLimiter<C>,
    library: ClientLimiter<C>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self::with_clock(limits, DefaultClock::default())
    }
}

impl<C: Clock + Clone> RateLimiter<C> {
    pub fn with_clock(limits: RateLimits, clock: C) -> Self {
        let limiter = |config: &BucketConfig| {
            ClientLimiter::new(quota(config), DefaultKeyedStateStore::default(), clock.clone())
        };
        Self {
            search: limiter(&limits.search),
            play: limiter(&limits.play),
            queue: limiter(&limits.queue),
            history: limiter(&limits.history),
            library: limiter(&limits.library),
            clock,
        }
    }

    fn route(&self, route: Route) -> &ClientLimiter<C> {
        match route {
            Route::Search => &self.search,
            Route::Play => &self.play,
            Route::Queue => &self.queue,
            Route::History => &self.history,
            Route::Library => &self.library,
        }
    }

    fn all(&self) -> [&ClientLimiter<C>; 5] {
        [
            &self.search,
            &self.play,
            &self.queue,
            &self.history,
            &self.library,
        ]
    }

    /// Take one cell for `client` on `route`
    pub fn check(&self, route: Route, client: &str) -> ApiResult<()> {
        match self.route(route).check_key(&client.to_string()) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                warn!("Rate limit hit on {:?} by {}", route, client);
                Err(ApiError::RateLimited {
                    retry_after: (wait.as_secs_f64().ceil() as u64).max(1),
                })
            }
        }
    }

    /// Forget clients whose allowance has fully replenished
    pub fn sweep(&self) -> usize {
        let before = self.len();
        for limiter in self.all() {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
        before.saturating_sub(self.len())
    }

    pub fn len(&self) -> usize {
        self.all().iter().map(|limiter| limiter.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;
    use tokio_test::{assert_err, assert_ok};

    fn limiter() -> (RateLimiter<FakeRelativeClock>, FakeRelativeClock) {
        let clock = FakeRelativeClock::default();
        let limits = RateLimits {
            search: BucketConfig::new(2.0, 0.5),
            ..Default::default()
        };
        (RateLimiter::with_clock(limits, clock.clone()), clock)
    }

    #[test]
    fn test_bucket_drains_and_refills() {
        let (limiter, clock) = limiter();

        assert_ok!(limiter.check(Route::Search, "1.2.3.4"));
        assert_ok!(limiter.check(Route::Search, "1.2.3.4"));
        match limiter.check(Route::Search, "1.2.3.4") {
            Err(ApiError::RateLimited { retry_after }) => assert_eq!(retry_after, 2),
            other => panic!("expected rate limit, got {:?}", other),
        }

        // 0.5 per second: one cell back after two seconds
        clock.advance(Duration::from_secs(2));
        assert_ok!(limiter.check(Route::Search, "1.2.3.4"));
        assert_err!(limiter.check(Route::Search, "1.2.3.4"));
    }

    #[test]
    fn test_buckets_are_per_route_and_client() {
        let (limiter, _clock) = limiter();
        limiter.check(Route::Search, "a").unwrap();
        limiter.check(Route::Search, "a").unwrap();

        assert_ok!(limiter.check(Route::Search, "b"));
        assert_ok!(limiter.check(Route::Play, "a"));
        assert_eq!(limiter.len(), 3);
    }

    #[test]
    fn test_sweep_drops_replenished_clients() {
        let (limiter, clock) = limiter();
        limiter.check(Route::Search, "a").unwrap();
        assert_eq!(limiter.sweep(), 0);

        clock.advance(Duration::from_secs(60));
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.len(), 0);
    }

    #[test]
    fn test_unusable_rates_fall_back() {
        let limits = RateLimits {
            play: BucketConfig::new(0.0, 0.0),
            queue: BucketConfig::new(f64::NAN, -3.0),
            ..Default::default()
        };
        let limiter = RateLimiter::with_clock(limits, FakeRelativeClock::default());

        assert_ok!(limiter.check(Route::Play, "a"));
        match limiter.check(Route::Play, "a") {
            Err(ApiError::RateLimited { retry_after }) => assert_eq!(retry_after, 3600),
            other => panic!("expected rate limit, got {:?}", other),
        }
        assert_ok!(limiter.check(Route::Queue, "a"));
        assert_err!(limiter.check(Route::Queue, "a"));
    }
}
