// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Apply to a router subtree with `from_fn_with_state`:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/v1/token-required", get(handler))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         scheme.clone(),
//!         require_auth,
//!     ));
//! ```
//!
//! On success the [`Credentials`] are inserted into the request extensions,
//! where the [`super::extractor::Auth`] extractor picks them up.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::outcome::{AuthOutcome, HttpContinuation};
use super::resolution::Credentials;
use super::scheme::{RequestInfo, SharedAuthenticator};
use super::AuthError;

/// Reject the request unless the scheme authenticates it.
pub async fn require_auth(
    State(scheme): State<SharedAuthenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let info = RequestInfo::from(&request);
    let outcome = scheme.authenticate(&info).await;

    match outcome.deliver(HttpContinuation::new(scheme.redirect_url())) {
        Ok(credentials) => {
            request.extensions_mut().insert(credentials);
            next.run(request).await
        }
        Err(response) => response,
    }
}

/// Authenticate when a token is present; let anonymous requests through.
///
/// A request without `Authorization` proceeds with no [`Credentials`]. A
/// request that carries a token must authenticate like under
/// [`require_auth`].
pub async fn optional_auth(
    State(scheme): State<SharedAuthenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let info = RequestInfo::from(&request);
    let outcome = scheme.authenticate(&info).await;

    if let AuthOutcome::Unauthenticated {
        error: AuthError::MissingHeader,
        ..
    } = outcome
    {
        return next.run(request).await;
    }

    match outcome.deliver(HttpContinuation::new(scheme.redirect_url())) {
        Ok(credentials) => {
            request.extensions_mut().insert(credentials);
            next.run(request).await
        }
        Err(response) => response,
    }
}

/// Credentials attached by a previous middleware, if any.
pub(crate) fn attached(request_extensions: &axum::http::Extensions) -> Option<Credentials> {
    request_extensions.get::<Credentials>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::key::VerifyKey;
    use crate::auth::scheme::{JwtScheme, SchemeConfig};
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, LOCATION, WWW_AUTHENTICATE},
            StatusCode,
        },
        routing::get,
        Router,
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret";

    fn token() -> String {
        encode(
            &Header::default(),
            &json!({ "username": "john" }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn scheme(config: SchemeConfig) -> SharedAuthenticator {
        Arc::new(JwtScheme::new(config.key(VerifyKey::secret(SECRET))).unwrap())
    }

    async fn whoami(request: Request) -> String {
        attached(request.extensions())
            .and_then(|c| c.get_str("username").map(str::to_string))
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn app(scheme: SharedAuthenticator, optional: bool) -> Router {
        let router = Router::new().route("/", get(whoami));
        if optional {
            router.route_layer(axum::middleware::from_fn_with_state(scheme, optional_auth))
        } else {
            router.route_layer(axum::middleware::from_fn_with_state(scheme, require_auth))
        }
    }

    async fn call(app: Router, authorization: Option<&str>) -> Response {
        let mut request = axum::http::Request::builder().uri("/");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn require_auth_attaches_credentials() {
        let response = call(
            app(scheme(SchemeConfig::new()), false),
            Some(&format!("Bearer {}", token())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "john");
    }

    #[tokio::test]
    async fn require_auth_challenges_missing_header() {
        let response = call(app(scheme(SchemeConfig::new()), false), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn require_auth_redirects_when_configured() {
        let response = call(
            app(scheme(SchemeConfig::new().redirect_url("/login")), false),
            Some("Bearer abc.def"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/login");
    }

    #[tokio::test]
    async fn optional_auth_lets_anonymous_through() {
        let response = call(app(scheme(SchemeConfig::new()), true), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn optional_auth_still_rejects_bad_tokens() {
        let app = app(scheme(SchemeConfig::new()), true);
        let response = call(app.clone(), Some("Bearer abc.def")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = call(app.clone(), Some("Basic xyz")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = call(app, Some(&format!("Bearer {}", token()))).await;
        assert_eq!(body_text(response).await, "john");
    }
}
