//! API request and response types.

use serde::{Deserialize, Serialize};

/// Query parameters of `/lock/create`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateQuery {
    /// Seconds until the private key is released
    pub time: Option<String>,
}

/// Query parameters of `/lock/info` and `/lock/release`.
#[derive(Debug, Default, Deserialize)]
pub struct LockQuery {
    /// Secret returned by `/lock/create`
    pub id: Option<String>,
}

/// Response after creating a lock.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub error: bool,
    pub id: String,
    pub public_key: String,
    /// Milliseconds since the Unix epoch
    pub unlock_time: i64,
}

/// Lock status response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub error: bool,
    /// Milliseconds since the Unix epoch
    pub created: i64,
    pub locked: bool,
    /// Seconds until unlock, zero once open
    pub remaining: f64,
}

/// Release response. `private_key` is null while the lock is closed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub error: bool,
    pub private_key: Option<String>,
    pub message: String,
    pub remaining: f64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub locks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_response_uses_camel_case() {
        let json = serde_json::to_value(CreateResponse {
            error: false,
            id: "abc".into(),
            public_key: "pem".into(),
            unlock_time: 42,
        })
        .unwrap();

        assert_eq!(json["publicKey"], "pem");
        assert_eq!(json["unlockTime"], 42);
        assert_eq!(json["error"], false);
    }

    #[test]
    fn test_locked_release_serializes_null_key() {
        let json = serde_json::to_value(ReleaseResponse {
            error: true,
            private_key: None,
            message: "The lock cannot be released yet.".into(),
            remaining: 1.0,
        })
        .unwrap();

        assert!(json["privateKey"].is_null());
        assert_eq!(json["remaining"].as_f64(), Some(1.0));
    }
}
