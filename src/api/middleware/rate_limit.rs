use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use crate::api::handlers::AppState;
use crate::errors::ApiFailure;
use crate::metrics::registry::RATE_LIMITED_REQUESTS_TOTAL;

/// Process-wide request rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    requests_per_second: u32,
}

impl RateLimiter {
    /// Zero values are raised to one
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(burst).unwrap_or(rate);
        let quota = Quota::per_second(rate).allow_burst(burst);

        Self {
            limiter: Arc::new(GovernorRateLimiter::direct(quota)),
            requests_per_second: rate.get(),
        }
    }

    /// Admit one request, or fail with the whole seconds until the next
    /// slot opens
    pub fn check(&self) -> Result<(), ApiFailure> {
        match self.limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                debug!("Rate limit exceeded, retry after {}s", retry_after);
                RATE_LIMITED_REQUESTS_TOTAL.inc();
                Err(ApiFailure::rate_limited(Some(retry_after.max(1))))
            }
        }
    }

    /// Get the configured requests per second
    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Err(failure) = state.rate_limiter.check() {
        return failure.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;

    #[test]
    fn test_burst_then_reject() {
        let limiter = RateLimiter::new(1, 3);
        for _ in 0..3 {
            assert!(limiter.check().is_ok());
        }

        let failure = limiter.check().unwrap_err();
        match failure.kind() {
            FailureKind::RateLimited { retry_after } => assert_eq!(*retry_after, Some(1)),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_zero_rate_is_raised() {
        let limiter = RateLimiter::new(0, 0);
        assert_eq!(limiter.requests_per_second(), 1);
        assert!(limiter.check().is_ok());
    }
}
