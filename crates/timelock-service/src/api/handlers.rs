//! HTTP request handlers.

use super::pages::{service_index, USAGE_PAGE};
use super::types::{
    CreateQuery, CreateResponse, HealthResponse, InfoResponse, LockQuery, ReleaseResponse,
};
use super::AppState;
use crate::engine::{ms_to_seconds, Release};
use crate::error::LockError;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use secrecy::ExposeSecret;
use std::any::Any;
use tracing::warn;

/// An unparseable query string carries no usable parameter.
fn query_or_default<T: Default>(query: Result<Query<T>, QueryRejection>) -> T {
    match query {
        Ok(Query(q)) => q,
        Err(e) => {
            warn!("Ignoring malformed query string: {}", e);
            T::default()
        }
    }
}

/// Plain-text list of mounted services.
pub async fn index() -> String {
    service_index()
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, LockError> {
    let locks = state.engine.lock_count().await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        locks,
    }))
}

/// Usage page for the lock endpoints.
pub async fn usage() -> Html<&'static str> {
    Html(USAGE_PAGE)
}

/// Create a lock and return its public key.
pub async fn create_lock(
    State(state): State<AppState>,
    query: Result<Query<CreateQuery>, QueryRejection>,
) -> Result<Json<CreateResponse>, LockError> {
    let query = query_or_default(query);
    let lock = state.engine.create(query.time.as_deref()).await?;

    Ok(Json(CreateResponse {
        error: false,
        id: lock.secret,
        public_key: lock.public_key,
        unlock_time: lock.unlock_at,
    }))
}

/// Report the status of a lock.
pub async fn lock_info(
    State(state): State<AppState>,
    query: Result<Query<LockQuery>, QueryRejection>,
) -> Result<Json<InfoResponse>, LockError> {
    let query = query_or_default(query);
    let status = state.engine.info(query.id.as_deref()).await?;

    Ok(Json(InfoResponse {
        error: false,
        created: status.created_at,
        locked: status.locked,
        remaining: ms_to_seconds(status.remaining_ms),
    }))
}

/// Release the private key of an open lock.
pub async fn release_lock(
    State(state): State<AppState>,
    query: Result<Query<LockQuery>, QueryRejection>,
) -> Result<Response, LockError> {
    let query = query_or_default(query);

    let response = match state.engine.release(query.id.as_deref()).await? {
        Release::Unlocked { private_key } => Json(ReleaseResponse {
            error: false,
            private_key: Some(private_key.expose_secret().clone()),
            message: "Ok.".to_string(),
            remaining: 0.0,
        })
        .into_response(),
        Release::Locked { remaining_ms } => (
            StatusCode::LOCKED,
            Json(ReleaseResponse {
                error: true,
                private_key: None,
                message: "The lock cannot be released yet.".to_string(),
                remaining: ms_to_seconds(remaining_ms),
            }),
        )
            .into_response(),
    };

    Ok(response)
}

/// Turn a handler panic into a generic 500 response.
pub fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    LockError::Internal("request handler panicked".to_string()).into_response()
}
