//! Caller authentication for the REST API
//!
//! Every caller-scoped route runs behind [`require_caller`], which asks the configured
//! [`IdentityProvider`] for the caller and stores the resulting [`Caller`] in the request
//! extensions. Handlers extract it with `Extension<Caller>`.
//!
//! The user lifecycle webhook is guarded separately by [`require_webhook_secret`].

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::types::Caller;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Header switching a request into test mode
pub const TEST_MODE_HEADER: &str = "x-test-mode";

/// Header carrying the test-mode secret
pub const TEST_SECRET_HEADER: &str = "x-test-secret";

/// Header naming the test-mode user
pub const TEST_USER_HEADER: &str = "x-test-user-id";

/// Test-mode identity used when no `X-Test-User-Id` is sent
pub const DEFAULT_TEST_USER: &str = "test-user-12345";

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the webhook secret
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Resolves the caller of a request from its headers
///
/// Implementations return [`Error::Unauthenticated`] when no identity can be established.
pub trait IdentityProvider: Send + Sync {
    /// Identify the caller of a request
    fn identify(&self, headers: &HeaderMap) -> Result<Caller>;
}

/// Identity provider trusting a header set by an upstream authentication proxy
///
/// Test mode is recognised first: `X-Test-Mode: true` together with an `X-Test-Secret`
/// equal to the configured secret yields a test caller named by `X-Test-User-Id`.
/// Otherwise the caller comes from the configured identity header, and the shared
/// `X-Api-Key` must match when one is configured.
#[derive(Clone, Debug)]
pub struct HeaderIdentityProvider {
    identity_header: String,
    api_key: Option<String>,
    test_mode_secret: Option<String>,
}

impl HeaderIdentityProvider {
    /// Build the provider from the `server.api.auth` configuration
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            identity_header: config.identity_header.trim().to_ascii_lowercase(),
            api_key: config.api_key.clone(),
            test_mode_secret: config.test_mode_secret.clone(),
        }
    }

    fn test_caller(&self, headers: &HeaderMap) -> Option<Caller> {
        let secret = self.test_mode_secret.as_deref()?;

        let enabled = header_str(headers, TEST_MODE_HEADER)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        if !enabled {
            return None;
        }

        let provided = header_str(headers, TEST_SECRET_HEADER)?;
        if !constant_time_eq(provided.as_bytes(), secret.as_bytes()) {
            tracing::warn!("Rejected test-mode request with a wrong secret");
            return None;
        }

        let user = header_str(headers, TEST_USER_HEADER)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_TEST_USER);
        Some(Caller::test(user))
    }
}

impl IdentityProvider for HeaderIdentityProvider {
    fn identify(&self, headers: &HeaderMap) -> Result<Caller> {
        if let Some(caller) = self.test_caller(headers) {
            return Ok(caller);
        }

        if let Some(expected_key) = &self.api_key {
            match header_str(headers, API_KEY_HEADER) {
                Some(provided_key)
                    if constant_time_eq(provided_key.as_bytes(), expected_key.as_bytes()) => {}
                Some(_) => return Err(Error::Unauthenticated("Invalid API key".to_string())),
                None => {
                    return Err(Error::Unauthenticated(
                        "Missing X-Api-Key header".to_string(),
                    ));
                }
            }
        }

        header_str(headers, &self.identity_header)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Caller::new)
            .ok_or_else(|| Error::Unauthenticated("missing caller identity".to_string()))
    }
}

/// Middleware resolving the caller and storing it in the request extensions
///
/// Responds with 401 `unauthorized` when the identity provider rejects the request.
pub async fn require_caller(
    State(identity): State<Arc<dyn IdentityProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    match identity.identify(request.headers()) {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "Unauthenticated request");
            e.into_response()
        }
    }
}

/// Middleware checking the `X-Webhook-Secret` header
///
/// When no webhook secret is configured every request is refused, which keeps the
/// webhook closed by default.
pub async fn require_webhook_secret(
    State(expected_secret): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_secret) = expected_secret else {
        return Error::Unauthenticated("webhook is not configured".to_string()).into_response();
    };

    match header_str(request.headers(), WEBHOOK_SECRET_HEADER) {
        Some(provided)
            if constant_time_eq(provided.as_bytes(), expected_secret.as_bytes()) =>
        {
            next.run(request).await
        }
        Some(_) => Error::Unauthenticated("Invalid webhook secret".to_string()).into_response(),
        None => {
            Error::Unauthenticated("Missing X-Webhook-Secret header".to_string()).into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
