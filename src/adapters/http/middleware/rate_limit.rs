//! Rate limiting middleware for the public endpoints.
//!
//! Each public route has its own `RateLimiter` instance, keyed by the client
//! address resolved through `ClientIpSource`.
//! A rejected request waits the configured failure delay before the 429 goes
//! out, so a throttled caller sees the same timing as a processed one.
//!
//! # Example
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/license/claim", post(claim_license_key))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), claim_rate_limit));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::adapters::http::error::ApiError;
use crate::adapters::http::state::BillingAppState;
use crate::domain::billing::BillingError;
use crate::ports::RateLimiter;

/// Limits `POST /api/v1/public/license/claim`.
pub async fn claim_rate_limit(
    State(state): State<BillingAppState>,
    request: Request,
    next: Next,
) -> Response {
    let limiter = state.claim_limiter.clone();
    enforce(&state, limiter, "license_claim", request, next).await
}

/// Limits `POST /api/v1/public/subscribe`.
pub async fn subscribe_rate_limit(
    State(state): State<BillingAppState>,
    request: Request,
    next: Next,
) -> Response {
    let limiter = state.subscribe_limiter.clone();
    enforce(&state, limiter, "subscribe", request, next).await
}

async fn enforce(
    state: &BillingAppState,
    limiter: Arc<dyn RateLimiter>,
    endpoint: &'static str,
    request: Request,
    next: Next,
) -> Response {
    let key = state
        .settings
        .client_ip_source
        .client_key(request.headers(), request.extensions());

    if limiter.allow(&key) {
        return next.run(request).await;
    }

    tracing::warn!(client = %key, endpoint, "Public endpoint rate limit exceeded");
    tokio::time::sleep(state.settings.failure_delay).await;
    ApiError(BillingError::RateLimited).into_response()
}
