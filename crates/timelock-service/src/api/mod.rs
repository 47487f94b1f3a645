//! HTTP API for the time-lock service.

mod handlers;
mod middleware;
mod pages;
mod types;

pub use handlers::*;
pub use middleware::{caller_key, logging_middleware, rate_limit_middleware, RateLimitState};
pub use pages::{service_index, SERVICES};
pub use types::*;

use crate::engine::LockEngine;
use crate::rate_limit::{EndpointClass, RateGovernor};
use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Lock lifecycle engine
    pub engine: LockEngine,
}

impl AppState {
    /// Create new application state.
    pub fn new(engine: LockEngine) -> Self {
        Self { engine }
    }
}

/// Create the API router with a custom rate governor.
pub fn create_router_with_rate_limit(
    state: AppState,
    governor: RateGovernor,
    trust_forwarded_for: bool,
) -> Router {
    let strict = RateLimitState::new(governor.clone(), EndpointClass::Create, trust_forwarded_for);
    let relaxed = RateLimitState::new(governor, EndpointClass::Query, trust_forwarded_for);

    Router::new()
        // Index, health and docs (no rate limiting)
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/lock", get(handlers::usage))
        .route("/lock/", get(handlers::usage))
        // Lock endpoints, one rate limit tier each
        .route(
            "/lock/create",
            get(handlers::create_lock).layer(axum_middleware::from_fn_with_state(
                strict,
                rate_limit_middleware,
            )),
        )
        .route(
            "/lock/info",
            get(handlers::lock_info).layer(axum_middleware::from_fn_with_state(
                relaxed.clone(),
                rate_limit_middleware,
            )),
        )
        .route(
            "/lock/release",
            get(handlers::release_lock).layer(axum_middleware::from_fn_with_state(
                relaxed,
                rate_limit_middleware,
            )),
        )
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handlers::handle_panic))
        .with_state(state)
}
