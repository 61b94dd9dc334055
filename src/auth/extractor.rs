// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated requests.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(credentials): Auth) -> impl IntoResponse {
//!     // credentials is the validated identity
//! }
//! ```
//!
//! Credentials already attached by [`super::middleware`] are reused;
//! otherwise the scheme from application state runs here.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Response,
};

use super::middleware::attached;
use super::outcome::{AuthOutcome, HttpContinuation};
use super::resolution::Credentials;
use super::scheme::{RequestInfo, SharedAuthenticator};
use super::AuthError;

/// Extractor for authenticated requests.
///
/// Rejects with the scheme's error response (or redirect).
pub struct Auth(pub Credentials);

impl<S> FromRequestParts<S> for Auth
where
    SharedAuthenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(credentials) = attached(&parts.extensions) {
            return Ok(Auth(credentials));
        }

        let scheme = SharedAuthenticator::from_ref(state);
        let outcome = scheme.authenticate(&RequestInfo::from(&*parts)).await;
        let credentials = outcome.deliver(HttpContinuation::new(scheme.redirect_url()))?;
        parts.extensions.insert(credentials.clone());
        Ok(Auth(credentials))
    }
}

/// Optional authentication extractor.
///
/// `None` when the request carries no `Authorization` header. A request that
/// does carry one is rejected exactly like [`Auth`] if it fails.
pub struct MaybeAuth(pub Option<Credentials>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    SharedAuthenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(credentials) = attached(&parts.extensions) {
            return Ok(MaybeAuth(Some(credentials)));
        }

        let scheme = SharedAuthenticator::from_ref(state);
        let outcome = scheme.authenticate(&RequestInfo::from(&*parts)).await;
        if let AuthOutcome::Unauthenticated {
            error: AuthError::MissingHeader,
            ..
        } = outcome
        {
            return Ok(MaybeAuth(None));
        }

        let credentials = outcome.deliver(HttpContinuation::new(scheme.redirect_url()))?;
        parts.extensions.insert(credentials.clone());
        Ok(MaybeAuth(Some(credentials)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::key::VerifyKey;
    use crate::auth::scheme::{JwtScheme, SchemeConfig};
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::sync::Arc;

    const SECRET: &str = "extractor-test-secret";

    fn state() -> SharedAuthenticator {
        Arc::new(JwtScheme::new(SchemeConfig::new().key(VerifyKey::secret(SECRET))).unwrap())
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut request = Request::builder().uri("/test");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        request.body(()).unwrap().into_parts().0
    }

    fn bearer(claims: serde_json::Value) -> String {
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let mut parts = parts(None);
        let rejection = Auth::from_request_parts(&mut parts, &state())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_jwt() {
        let mut parts = parts(Some(&bearer(json!({ "sub": "user_123" }))));
        let Auth(credentials) = Auth::from_request_parts(&mut parts, &state())
            .await
            .ok()
            .unwrap();
        assert_eq!(credentials.get_str("sub"), Some("user_123"));
        assert!(parts.extensions.get::<Credentials>().is_some());
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let mut parts = parts(None);
        let credentials = Credentials::try_from(json!({ "sub": "user_from_middleware" })).unwrap();
        parts.extensions.insert(credentials);

        let Auth(credentials) = Auth::from_request_parts(&mut parts, &state())
            .await
            .ok()
            .unwrap();
        assert_eq!(credentials.get_str("sub"), Some("user_from_middleware"));
    }

    #[tokio::test]
    async fn maybe_auth_returns_none_without_header() {
        let mut parts = parts(None);
        let MaybeAuth(credentials) = MaybeAuth::from_request_parts(&mut parts, &state())
            .await
            .ok()
            .unwrap();
        assert!(credentials.is_none());
    }

    #[tokio::test]
    async fn maybe_auth_rejects_bad_token() {
        let mut parts = parts(Some("Bearer only.two"));
        let rejection = MaybeAuth::from_request_parts(&mut parts, &state())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }
}
