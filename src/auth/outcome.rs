// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication outcomes and how they reach the host.
//!
//! An [`AuthOutcome`] is produced exactly once per attempt. [`AuthOutcome::deliver`]
//! hands it to a [`Continuation`], which is consumed by value: one call, no
//! more, no less.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::Value;

use super::error::AuthError;
use super::resolution::Credentials;

/// Terminal result of one authentication attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(Credentials),
    /// Client-side failure. `credentials` is whatever the validation
    /// callback returned alongside a rejection, kept for auditing only.
    Unauthenticated {
        error: AuthError,
        credentials: Option<Value>,
    },
    Errored(AuthError),
}

impl AuthOutcome {
    /// Classify a pipeline failure as `Unauthenticated` or `Errored`.
    pub fn from_error(error: AuthError) -> Self {
        if error.is_fatal() {
            AuthOutcome::Errored(error)
        } else {
            AuthOutcome::Unauthenticated {
                error,
                credentials: None,
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }

    pub fn error(&self) -> Option<&AuthError> {
        match self {
            AuthOutcome::Authenticated(_) => None,
            AuthOutcome::Unauthenticated { error, .. } | AuthOutcome::Errored(error) => Some(error),
        }
    }

    /// Status the host should respond with. `200 OK` when authenticated.
    pub fn status(&self) -> StatusCode {
        self.error().map_or(StatusCode::OK, AuthError::status_code)
    }

    /// Challenge scheme for 401-class outcomes.
    pub fn challenge(&self) -> Option<&'static str> {
        self.error().and_then(AuthError::challenge)
    }

    /// Hand the outcome to the host. Exactly one continuation method runs.
    pub fn deliver<K: Continuation>(self, continuation: K) -> K::Output {
        match self {
            AuthOutcome::Authenticated(credentials) => continuation.authenticated(credentials),
            AuthOutcome::Unauthenticated { error, credentials } => {
                continuation.unauthenticated(error, credentials)
            }
            AuthOutcome::Errored(error) => continuation.fail(error),
        }
    }
}

/// The host's side of an authentication attempt.
pub trait Continuation {
    type Output;

    fn authenticated(self, credentials: Credentials) -> Self::Output;

    fn unauthenticated(self, error: AuthError, credentials: Option<Value>) -> Self::Output;

    fn fail(self, error: AuthError) -> Self::Output;
}

/// Continuation that turns failures into HTTP responses.
///
/// With a redirect target every failure becomes a `303 See Other` to it;
/// otherwise the error's own status, body and challenge are used.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpContinuation<'a> {
    redirect: Option<&'a str>,
}

impl<'a> HttpContinuation<'a> {
    pub fn new(redirect: Option<&'a str>) -> Self {
        Self { redirect }
    }

    fn respond(self, error: AuthError) -> Response {
        match self.redirect {
            Some(target) => Redirect::to(target).into_response(),
            None => error.into_response(),
        }
    }
}

impl Continuation for HttpContinuation<'_> {
    type Output = Result<Credentials, Response>;

    fn authenticated(self, credentials: Credentials) -> Self::Output {
        Ok(credentials)
    }

    fn unauthenticated(self, error: AuthError, credentials: Option<Value>) -> Self::Output {
        tracing::debug!(
            error_code = error.error_code(),
            credentials_attached = credentials.is_some(),
            "Request not authenticated"
        );
        Err(self.respond(error))
    }

    fn fail(self, error: AuthError) -> Self::Output {
        tracing::warn!(
            error_code = error.error_code(),
            error = %error,
            "Authentication errored"
        );
        Err(self.respond(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{LOCATION, WWW_AUTHENTICATE};
    use serde_json::json;
    use tracing_test::traced_test;

    #[derive(Debug, PartialEq)]
    enum Call {
        Authenticated,
        Unauthenticated(Option<Value>),
        Fail(StatusCode),
    }

    struct Recorder;

    impl Continuation for Recorder {
        type Output = Call;

        fn authenticated(self, _credentials: Credentials) -> Call {
            Call::Authenticated
        }

        fn unauthenticated(self, _error: AuthError, credentials: Option<Value>) -> Call {
            Call::Unauthenticated(credentials)
        }

        fn fail(self, error: AuthError) -> Call {
            Call::Fail(error.status_code())
        }
    }

    fn credentials() -> Credentials {
        Credentials::try_from(json!({ "user": "john" })).unwrap()
    }

    #[test]
    fn deliver_calls_matching_continuation() {
        assert_eq!(
            AuthOutcome::Authenticated(credentials()).deliver(Recorder),
            Call::Authenticated
        );
        assert_eq!(
            AuthOutcome::Unauthenticated {
                error: AuthError::InvalidCredentials,
                credentials: Some(json!("audit")),
            }
            .deliver(Recorder),
            Call::Unauthenticated(Some(json!("audit")))
        );
        assert_eq!(
            AuthOutcome::Errored(AuthError::Implementation("x".into())).deliver(Recorder),
            Call::Fail(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[test]
    fn from_error_splits_client_and_fatal_errors() {
        assert!(matches!(
            AuthOutcome::from_error(AuthError::MalformedToken),
            AuthOutcome::Unauthenticated { credentials: None, .. }
        ));
        assert!(matches!(
            AuthOutcome::from_error(AuthError::KeyResolution("x".into())),
            AuthOutcome::Errored(_)
        ));
    }

    #[test]
    fn challenge_only_on_401() {
        assert_eq!(
            AuthOutcome::from_error(AuthError::MissingHeader).challenge(),
            Some("Bearer")
        );
        assert_eq!(AuthOutcome::from_error(AuthError::MalformedHeader).challenge(), None);
        assert_eq!(AuthOutcome::Authenticated(credentials()).challenge(), None);
        assert_eq!(AuthOutcome::Authenticated(credentials()).status(), StatusCode::OK);
    }

    #[test]
    fn http_continuation_responds_with_error() {
        let response = AuthOutcome::from_error(AuthError::WrongScheme)
            .deliver(HttpContinuation::default())
            .unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn http_continuation_redirects_every_failure() {
        for outcome in [
            AuthOutcome::from_error(AuthError::MissingHeader),
            AuthOutcome::Errored(AuthError::ValidationCallback("x".into())),
        ] {
            let response = outcome
                .deliver(HttpContinuation::new(Some("/login")))
                .unwrap_err();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[LOCATION], "/login");
        }
    }

    #[test]
    #[traced_test]
    fn rejected_credentials_stay_out_of_logs() {
        let response = AuthOutcome::Unauthenticated {
            error: AuthError::InvalidCredentials,
            credentials: Some(json!({ "ssn": "078-05-1120" })),
        }
        .deliver(HttpContinuation::default())
        .unwrap_err();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert!(logs_contain("credentials_attached=true"));
        assert!(!logs_contain("078-05-1120"));
    }

    #[test]
    fn http_continuation_passes_credentials_through() {
        let result = AuthOutcome::Authenticated(credentials()).deliver(HttpContinuation::default());
        assert_eq!(result.ok(), Some(credentials()));
    }
}
