//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use kca_portal_common::{
    auth::AuthContext,
    errors::{AppError, Result},
};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::AppState;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// A shared limiter together with the quota it was built from
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

impl RateLimit {
    pub fn check(&self) -> Result<()> {
        self.limiter.check().map_err(|_| AppError::RateLimited {
            limit: self.requests_per_second,
        })
    }
}

/// Create a new rate limiter
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Result<RateLimit> {
    let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| AppError::Configuration {
        message: "rate_limit.requests_per_second must be greater than 0".to_string(),
    })?;
    let burst = NonZeroU32::new(burst).ok_or_else(|| AppError::Configuration {
        message: "rate_limit.burst must be greater than 0".to_string(),
    })?;

    Ok(RateLimit {
        limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate).allow_burst(burst))),
        requests_per_second,
    })
}

/// Rate limiting middleware
///
/// The token is checked first so unauthenticated calls never drain the bucket.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    auth: AuthContext,
    request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(limit) = &state.rate_limit {
        if let Err(e) = limit.check() {
            tracing::warn!(
                path = %request.uri().path(),
                user = %auth.username,
                "Rate limit exceeded"
            );
            return Err(e);
        }
    }
    Ok(next.run(request).await)
}
