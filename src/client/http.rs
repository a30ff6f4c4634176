//! Shared HTTP client and auth utilities.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::ColloquyError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-200 HTTP status to a typed error.
pub fn status_to_error(status: u16, body: &str) -> ColloquyError {
    match status {
        401 | 403 => ColloquyError::Upstream(format!("authentication rejected: {body}")),
        429 => ColloquyError::Upstream(format!("rate limited: {body}")),
        500..=599 => ColloquyError::Upstream(format!("provider error (status {status}): {body}")),
        _ => ColloquyError::Api {
            status,
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn server_errors_map_to_upstream() {
        assert_eq!(
            status_to_error(503, "down").category(),
            ErrorCategory::Upstream
        );
        assert_eq!(
            status_to_error(401, "bad key").category(),
            ErrorCategory::Upstream
        );
    }

    #[test]
    fn client_errors_stay_api() {
        let err = status_to_error(404, "no such model");
        assert!(matches!(err, ColloquyError::Api { status: 404, .. }));
    }

    #[test]
    fn bearer_headers_include_auth() {
        let headers = bearer_headers("sk-test");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
    }
}
