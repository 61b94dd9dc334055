// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The Bearer JWT scheme.
//!
//! ## Pipeline
//!
//! 1. Parse `Authorization: Bearer <token>` ([`super::header`])
//! 2. Resolve the verification key, statically or per token ([`super::key`])
//! 3. Verify signature and claims ([`super::verifier`])
//! 4. Resolve credentials through the optional validator ([`super::resolution`])
//!
//! Any stage may end the attempt; nothing is retried. Configuration is
//! checked once in [`JwtScheme::new`] and never mutated afterwards, so one
//! scheme can serve any number of concurrent requests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue, Method, Request, Uri};
use url::Url;

use super::error::AuthError;
use super::header::bearer_token;
use super::key::KeySource;
use super::outcome::AuthOutcome;
use super::resolution::{resolve_credentials, CredentialValidator};
use super::verifier::{verify, VerifyOptions};
use super::BoxFuture;

/// Registration-time configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required key or key resolver in configuration")]
    MissingKey,
    #[error("invalid redirect target '{0}': expected an absolute URL or an absolute path")]
    InvalidRedirect(String),
    #[error("authentication scheme '{0}' is already registered")]
    DuplicateScheme(String),
    #[error("invalid value for {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
}

/// The parts of a request the scheme and validators may look at.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn authorization(&self) -> Option<&HeaderValue> {
        self.headers.get(AUTHORIZATION)
    }
}

impl From<&Parts> for RequestInfo {
    fn from(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }
}

impl<B> From<&Request<B>> for RequestInfo {
    fn from(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        }
    }
}

/// Builder for a [`JwtScheme`].
#[derive(Default)]
pub struct SchemeConfig {
    key: Option<KeySource>,
    verify: VerifyOptions,
    validator: Option<Arc<dyn CredentialValidator>>,
    redirect_url: Option<String>,
}

impl SchemeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static key or key resolver. Required.
    pub fn key(mut self, key: impl Into<KeySource>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn verify_options(mut self, options: VerifyOptions) -> Self {
        self.verify = options;
        self
    }

    pub fn validator(mut self, validator: impl CredentialValidator) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Redirect every failed attempt here instead of answering with an error.
    pub fn redirect_url(mut self, target: impl Into<String>) -> Self {
        self.redirect_url = Some(target.into());
        self
    }
}

impl fmt::Debug for SchemeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeConfig")
            .field("key", &self.key)
            .field("verify", &self.verify)
            .field("validator", &self.validator.is_some())
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

fn check_redirect(target: &str) -> Result<(), ConfigError> {
    let is_path = target.starts_with('/') && !target.starts_with("//");
    if is_path || Url::parse(target).is_ok() {
        Ok(())
    } else {
        Err(ConfigError::InvalidRedirect(target.to_string()))
    }
}

/// Capability the host needs from an authentication scheme.
pub trait Authenticator: Send + Sync + 'static {
    /// Run one attempt. Always yields an outcome; never panics on bad input.
    fn authenticate<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, AuthOutcome>;

    /// Where failed attempts should be redirected, if anywhere.
    fn redirect_url(&self) -> Option<&str> {
        None
    }
}

/// Shared handle to a registered scheme.
pub type SharedAuthenticator = Arc<dyn Authenticator>;

/// Bearer JWT authentication scheme.
pub struct JwtScheme {
    key: KeySource,
    verify: VerifyOptions,
    validator: Option<Arc<dyn CredentialValidator>>,
    redirect_url: Option<String>,
}

impl JwtScheme {
    /// Validate the configuration and build the scheme.
    pub fn new(config: SchemeConfig) -> Result<Self, ConfigError> {
        let key = config.key.ok_or(ConfigError::MissingKey)?;
        if let KeySource::Static(static_key) = &key {
            if static_key.is_empty() {
                return Err(ConfigError::MissingKey);
            }
        }
        if let Some(target) = &config.redirect_url {
            check_redirect(target)?;
        }

        Ok(Self {
            key,
            verify: config.verify,
            validator: config.validator,
            redirect_url: config.redirect_url,
        })
    }

    pub fn verify_options(&self) -> &VerifyOptions {
        &self.verify
    }

    /// Authenticate one request.
    pub async fn authenticate(&self, request: &RequestInfo) -> AuthOutcome {
        match self.run(request).await {
            Ok(outcome) => outcome,
            Err(error) => AuthOutcome::from_error(error),
        }
    }

    async fn run(&self, request: &RequestInfo) -> Result<AuthOutcome, AuthError> {
        let token = bearer_token(request.authorization())?;

        let (key, context) = self.key.resolve(token).await.map_err(|e| {
            let error = e.into_auth_error(AuthError::KeyResolution);
            if let AuthError::KeyResolution(detail) = &error {
                tracing::error!(error = %detail, "Key resolver failed");
            }
            error
        })?;

        let claims = verify(token, &key, &self.verify)?;

        Ok(resolve_credentials(self.validator.as_deref(), request, claims, context.as_ref()).await)
    }
}

impl Authenticator for JwtScheme {
    fn authenticate<'a>(&'a self, request: &'a RequestInfo) -> BoxFuture<'a, AuthOutcome> {
        Box::pin(JwtScheme::authenticate(self, request))
    }

    fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }
}

impl fmt::Debug for JwtScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtScheme")
            .field("key", &self.key)
            .field("verify", &self.verify)
            .field("validator", &self.validator.is_some())
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// Named authentication schemes, set up once at startup.
#[derive(Clone, Default)]
pub struct SchemeRegistry {
    schemes: HashMap<String, SharedAuthenticator>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a [`JwtScheme`] from `config` and register it under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        config: SchemeConfig,
    ) -> Result<SharedAuthenticator, ConfigError> {
        let scheme = JwtScheme::new(config)?;
        self.register_scheme(name, scheme)
    }

    pub fn register_scheme(
        &mut self,
        name: impl Into<String>,
        scheme: impl Authenticator,
    ) -> Result<SharedAuthenticator, ConfigError> {
        let name = name.into();
        if self.schemes.contains_key(&name) {
            return Err(ConfigError::DuplicateScheme(name));
        }

        let shared: SharedAuthenticator = Arc::new(scheme);
        tracing::info!(scheme = %name, "Registered authentication scheme");
        self.schemes.insert(name, Arc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, name: &str) -> Option<SharedAuthenticator> {
        self.schemes.get(name).cloned()
    }
}
