// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! [`AuthError`] is the terminal failure taxonomy of the pipeline. Every
//! variant knows its HTTP status, a stable `error_code`, the message a client
//! is allowed to see, and whether it carries a `WWW-Authenticate` challenge.
//!
//! [`CallbackError`] is what application collaborators (key resolvers and
//! validation callbacks) hand back. Only the `Classified` and `Rejected`
//! variants may choose the response; everything else becomes a 500.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication scheme name used in challenges.
pub const CHALLENGE: &str = "Bearer";

/// Public message for every 5xx outcome. Internal detail only goes to logs.
const INTERNAL_MESSAGE: &str = "An internal server error occurred";

/// Boxed error accepted from application collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An application-supplied error with its own status and message.
///
/// Returned by a key resolver or validation callback to pick the response
/// explicitly, e.g. a 403 for a user that exists but is suspended.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub status: StatusCode,
    pub message: String,
}

impl ClassifiedError {
    /// A status outside 4xx/5xx is replaced by 500.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let status = if is_error_status(status) {
            status
        } else {
            tracing::warn!(%status, "Classified error with a non-error status, answering 500");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

fn is_error_status(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Missing authentication")]
    MissingHeader,
    /// Header does not split into exactly two words
    #[error("Bad HTTP authentication header format")]
    MalformedHeader,
    /// Scheme word is not `Bearer`
    #[error("Unsupported authentication scheme")]
    WrongScheme,
    /// Token is not three dot-separated segments
    #[error("Bad HTTP authentication header format")]
    MalformedToken,
    /// Token `exp` is in the past
    #[error("Expired token received for JSON Web Token validation")]
    ExpiredToken,
    /// Any other verification failure
    #[error("Invalid signature received for JSON Web Token validation")]
    InvalidSignature,
    /// Key resolver failed without classifying the failure
    #[error("key resolution failed: {0}")]
    KeyResolution(String),
    /// Validation callback failed without classifying the failure
    #[error("validation callback failed: {0}")]
    ValidationCallback(String),
    /// Validation callback rejected the token
    #[error("Invalid token")]
    InvalidCredentials,
    /// Validation callback reported success with unusable credentials
    #[error("bad credentials object received for jwt auth validation: {0}")]
    Implementation(String),
    /// Application-supplied error, honored verbatim
    #[error(transparent)]
    Classified(ClassifiedError),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: &'static str,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::WrongScheme => "wrong_scheme",
            AuthError::MalformedToken => "malformed_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::KeyResolution(_) => "key_resolution_error",
            AuthError::ValidationCallback(_) => "validation_callback_error",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Implementation(_) => "implementation_error",
            AuthError::Classified(_) => "application_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader
            | AuthError::WrongScheme
            | AuthError::ExpiredToken
            | AuthError::InvalidSignature
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::MalformedHeader | AuthError::MalformedToken => StatusCode::BAD_REQUEST,
            AuthError::KeyResolution(_)
            | AuthError::ValidationCallback(_)
            | AuthError::Implementation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Classified(classified) if is_error_status(classified.status) => {
                classified.status
            }
            AuthError::Classified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error ends the attempt as `Errored` rather than
    /// `Unauthenticated`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuthError::KeyResolution(_)
                | AuthError::ValidationCallback(_)
                | AuthError::Implementation(_)
                | AuthError::Classified(_)
        )
    }

    /// Message safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::KeyResolution(_)
            | AuthError::ValidationCallback(_)
            | AuthError::Implementation(_) => INTERNAL_MESSAGE.to_string(),
            AuthError::Classified(classified) if !is_error_status(classified.status) => {
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    /// Challenge scheme for 401-class errors.
    pub fn challenge(&self) -> Option<&'static str> {
        (self.status_code() == StatusCode::UNAUTHORIZED).then_some(CHALLENGE)
    }

    /// Value for the `WWW-Authenticate` response header.
    ///
    /// A missing header or foreign scheme gets the bare scheme name; every
    /// other 401 also names the error.
    pub fn www_authenticate(&self) -> Option<String> {
        let scheme = self.challenge()?;
        match self {
            AuthError::MissingHeader | AuthError::WrongScheme => Some(scheme.to_string()),
            other => Some(format!(
                r#"{scheme} error="{}""#,
                other.public_message().replace('"', "'")
            )),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let challenge = self.www_authenticate();
        let body = Json(AuthErrorBody {
            error: self.public_message(),
            error_code: self.error_code(),
        });

        let mut response = (status, body).into_response();
        if let Some(value) = challenge.and_then(|c| HeaderValue::from_str(&c).ok()) {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        response
    }
}

/// Failure reported by a key resolver or validation callback.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// Application-chosen status and message.
    #[error(transparent)]
    Classified(ClassifiedError),
    /// A client-facing authentication failure, kept as-is.
    #[error(transparent)]
    Rejected(AuthError),
    /// Anything else. Surfaces as a 500.
    #[error(transparent)]
    Failed(BoxError),
}

impl CallbackError {
    pub fn classified(status: StatusCode, message: impl Into<String>) -> Self {
        CallbackError::Classified(ClassifiedError::new(status, message))
    }

    pub fn failed(err: impl Into<BoxError>) -> Self {
        CallbackError::Failed(err.into())
    }

    /// Convert into a terminal [`AuthError`].
    ///
    /// Unclassified failures are wrapped with `wrap`, which receives the
    /// collaborator's own message for logging.
    pub fn into_auth_error(self, wrap: impl FnOnce(String) -> AuthError) -> AuthError {
        match self {
            CallbackError::Classified(classified) => AuthError::Classified(classified),
            CallbackError::Rejected(err) => err,
            CallbackError::Failed(err) => wrap(err.to_string()),
        }
    }
}

impl From<ClassifiedError> for CallbackError {
    fn from(err: ClassifiedError) -> Self {
        CallbackError::Classified(err)
    }
}
