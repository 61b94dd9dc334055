// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential resolution.
//!
//! The application may plug in a validation callback that turns verified
//! claims into credentials. It can answer directly, through a future, or
//! through a [`Completion`] handle; all three land in one [`Resolution`]
//! (`error`, `is_valid`, `credentials`) before the outcome is decided.
//!
//! | Resolution | Outcome |
//! |------------|---------|
//! | `error` set | `Errored` (classified errors keep their status) |
//! | `is_valid == false` | `Unauthenticated(InvalidCredentials)`, credentials attached |
//! | `is_valid`, credentials not an object | `Errored(Implementation)` |
//! | `is_valid`, object credentials | `Authenticated` |

use std::future::Future;

use serde::Serialize;
use serde_json::{Map, Value};

use super::completion::Completion;
use super::error::{AuthError, CallbackError};
use super::key::KeyContext;
use super::outcome::AuthOutcome;
use super::scheme::RequestInfo;
use super::verifier::Claims;
use super::BoxFuture;

/// Application identity attached to an authenticated request.
///
/// Always a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Credentials(Map<String, Value>);

impl Credentials {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Claims> for Credentials {
    fn from(claims: Claims) -> Self {
        Credentials(claims.into_map())
    }
}

impl TryFrom<Value> for Credentials {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Credentials(map)),
            other => Err(other),
        }
    }
}

/// What a direct or future-returning callback answers.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_valid: bool,
    pub credentials: Option<Value>,
}

impl Verdict {
    pub fn valid(credentials: Value) -> Self {
        Self {
            is_valid: true,
            credentials: Some(credentials),
        }
    }

    pub fn invalid() -> Self {
        Self {
            is_valid: false,
            credentials: None,
        }
    }

    /// Rejection that still records what the callback found, for auditing.
    pub fn invalid_with(credentials: Value) -> Self {
        Self {
            is_valid: false,
            credentials: Some(credentials),
        }
    }
}

/// Normalized result of a validation callback.
#[derive(Debug)]
pub struct Resolution {
    pub error: Option<CallbackError>,
    pub is_valid: bool,
    pub credentials: Option<Value>,
}

impl From<Result<Verdict, CallbackError>> for Resolution {
    fn from(result: Result<Verdict, CallbackError>) -> Self {
        match result {
            Ok(verdict) => Resolution {
                error: None,
                is_valid: verdict.is_valid,
                credentials: verdict.credentials,
            },
            Err(err) => Resolution {
                error: Some(err),
                is_valid: false,
                credentials: None,
            },
        }
    }
}

impl Resolution {
    /// Decide the terminal outcome for this resolution.
    pub fn into_outcome(self) -> AuthOutcome {
        if let Some(err) = self.error {
            let err = err.into_auth_error(AuthError::ValidationCallback);
            if let AuthError::ValidationCallback(detail) = &err {
                tracing::error!(error = %detail, "Validation callback failed");
            }
            return AuthOutcome::from_error(err);
        }

        if !self.is_valid {
            tracing::debug!("Validation callback rejected the token");
            return AuthOutcome::Unauthenticated {
                error: AuthError::InvalidCredentials,
                credentials: self.credentials,
            };
        }

        match self.credentials.map(Credentials::try_from) {
            Some(Ok(credentials)) => AuthOutcome::Authenticated(credentials),
            other => {
                let detail = match other {
                    Some(Err(value)) => format!("expected a JSON object, got {}", json_kind(&value)),
                    _ => "no credentials returned".to_string(),
                };
                tracing::warn!(
                    kind = "implementation_error",
                    detail = %detail,
                    "Validation callback reported success without usable credentials"
                );
                AuthOutcome::Errored(AuthError::Implementation(detail))
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Completion<Resolution> {
    /// Report the callback's result as the `(error, is_valid, credentials)` triple.
    pub fn done(self, error: Option<CallbackError>, is_valid: bool, credentials: Option<Value>) {
        self.complete(Resolution {
            error,
            is_valid,
            credentials,
        });
    }
}

/// Application step that turns verified claims into credentials.
pub trait CredentialValidator: Send + Sync + 'static {
    fn validate<'a>(
        &'a self,
        request: &'a RequestInfo,
        claims: &'a Claims,
        context: Option<&'a KeyContext>,
    ) -> BoxFuture<'a, Resolution>;
}

/// Validator that answers directly.
pub fn validate_with<F>(f: F) -> impl CredentialValidator
where
    F: Fn(&RequestInfo, &Claims, Option<&KeyContext>) -> Result<Verdict, CallbackError>
        + Send
        + Sync
        + 'static,
{
    ValidateFn(f)
}

/// Validator that returns a future. Receives owned copies of its inputs.
pub fn validate_async<F, Fut>(f: F) -> impl CredentialValidator
where
    F: Fn(RequestInfo, Claims, Option<KeyContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Verdict, CallbackError>> + Send + 'static,
{
    ValidateAsync(f)
}

/// Validator that reports through [`Completion::done`].
pub fn validate_with_completion<F>(f: F) -> impl CredentialValidator
where
    F: Fn(RequestInfo, Claims, Option<KeyContext>, Completion<Resolution>) + Send + Sync + 'static,
{
    ValidateWithCompletion(f)
}

struct ValidateFn<F>(F);

impl<F> CredentialValidator for ValidateFn<F>
where
    F: Fn(&RequestInfo, &Claims, Option<&KeyContext>) -> Result<Verdict, CallbackError>
        + Send
        + Sync
        + 'static,
{
    fn validate<'a>(
        &'a self,
        request: &'a RequestInfo,
        claims: &'a Claims,
        context: Option<&'a KeyContext>,
    ) -> BoxFuture<'a, Resolution> {
        let resolution = Resolution::from((self.0)(request, claims, context));
        Box::pin(std::future::ready(resolution))
    }
}

struct ValidateAsync<F>(F);

impl<F, Fut> CredentialValidator for ValidateAsync<F>
where
    F: Fn(RequestInfo, Claims, Option<KeyContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Verdict, CallbackError>> + Send + 'static,
{
    fn validate<'a>(
        &'a self,
        request: &'a RequestInfo,
        claims: &'a Claims,
        context: Option<&'a KeyContext>,
    ) -> BoxFuture<'a, Resolution> {
        let future = (self.0)(request.clone(), claims.clone(), context.cloned());
        Box::pin(async move { Resolution::from(future.await) })
    }
}

struct ValidateWithCompletion<F>(F);

impl<F> CredentialValidator for ValidateWithCompletion<F>
where
    F: Fn(RequestInfo, Claims, Option<KeyContext>, Completion<Resolution>) + Send + Sync + 'static,
{
    fn validate<'a>(
        &'a self,
        request: &'a RequestInfo,
        claims: &'a Claims,
        context: Option<&'a KeyContext>,
    ) -> BoxFuture<'a, Resolution> {
        let (completion, pending) = Completion::channel();
        (self.0)(request.clone(), claims.clone(), context.cloned(), completion);
        Box::pin(async move {
            pending.wait().await.unwrap_or_else(|| {
                Resolution::from(Err(CallbackError::failed(
                    "validation callback dropped its completion handle without a result",
                )))
            })
        })
    }
}

/// Run the optional validator; without one the claims are the credentials.
pub(crate) async fn resolve_credentials(
    validator: Option<&dyn CredentialValidator>,
    request: &RequestInfo,
    claims: Claims,
    context: Option<&KeyContext>,
) -> AuthOutcome {
    let Some(validator) = validator else {
        return AuthOutcome::Authenticated(Credentials::from(claims));
    };
    validator.validate(request, &claims, context).await.into_outcome()
}
