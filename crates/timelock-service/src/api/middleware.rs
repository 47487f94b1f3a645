//! Rate limiting and other middleware.

use crate::error::LockError;
use crate::rate_limit::{Admission, EndpointClass, RateGovernor};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Rate limit tier bound to one group of routes.
#[derive(Clone)]
pub struct RateLimitState {
    pub governor: RateGovernor,
    pub class: EndpointClass,
    /// Use the first X-Forwarded-For entry as the caller key
    pub trust_forwarded_for: bool,
}

impl RateLimitState {
    pub fn new(governor: RateGovernor, class: EndpointClass, trust_forwarded_for: bool) -> Self {
        Self {
            governor,
            class,
            trust_forwarded_for,
        }
    }
}

/// Identify the caller for rate limiting.
pub fn caller_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn set_rate_headers(headers: &mut HeaderMap, limit: u32, remaining: u32) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
}

/// Whole seconds to wait, rounded up and at least one.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Rate limiting middleware.
///
/// Rejects with 429 Too Many Requests before the handler runs when the
/// caller has exhausted the tier's quota.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let caller = caller_key(&request, rate_limit.trust_forwarded_for);

    match rate_limit.governor.admit(&caller, rate_limit.class) {
        Admission::Allowed { limit, remaining } => {
            debug!(%caller, class = ?rate_limit.class, remaining, "Rate limit check passed");
            let mut response = next.run(request).await;
            set_rate_headers(response.headers_mut(), limit, remaining);
            response
        }
        Admission::Denied { limit, retry_after } => {
            warn!(%caller, class = ?rate_limit.class, "Rate limit exceeded");
            let mut response = LockError::RateLimited {
                retry_after_secs: retry_after_secs(retry_after),
            }
            .into_response();
            set_rate_headers(response.headers_mut(), limit, 0);
            response
        }
    }
}

/// Logging middleware for requests.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = std::time::Instant::now();

    debug!(%method, %path, "Request started");

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        debug!(%method, %path, %status, ?duration, "Request completed");
    } else {
        warn!(%method, %path, %status, ?duration, "Request failed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(2_100)), 3);
        assert_eq!(retry_after_secs(Duration::from_secs(2)), 2);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn test_caller_key_from_connect_info() {
        let addr: SocketAddr = "192.0.2.7:5555".parse().unwrap();
        let request = HttpRequest::builder()
            .extension(ConnectInfo(addr))
            .header(FORWARDED_FOR, "203.0.113.9")
            .body(Body::empty())
            .unwrap();

        assert_eq!(caller_key(&request, false), "192.0.2.7");
        assert_eq!(caller_key(&request, true), "203.0.113.9");
    }

    #[test]
    fn test_caller_key_forwarded_list_takes_first() {
        let request = HttpRequest::builder()
            .header(FORWARDED_FOR, " 198.51.100.1 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(caller_key(&request, true), "198.51.100.1");
    }

    #[test]
    fn test_caller_key_unknown() {
        let request = HttpRequest::builder().body(Body::empty()).unwrap();
        assert_eq!(caller_key(&request, true), "unknown");
    }
}
