// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification keys and key resolution.
//!
//! A scheme either holds one [`VerifyKey`] for every token or asks a
//! [`KeyResolver`] per token. Resolvers may look inside the token before it
//! is verified, but only through [`UnverifiedToken`], whose claims come back
//! as [`UntrustedClaims`]. That type has no path into credentials; it exists
//! to pick a key and nothing else.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Header};
use serde_json::{Map, Value};

use super::completion::Completion;
use super::error::{AuthError, CallbackError};
use super::BoxFuture;

/// Auxiliary data a resolver hands on to the validation callback.
pub type KeyContext = Value;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];
const EC_ALGORITHMS: [Algorithm; 2] = [Algorithm::ES256, Algorithm::ES384];

/// Key material plus the algorithms it accepts when none are configured.
#[derive(Clone)]
pub struct VerifyKey {
    key: DecodingKey,
    algorithms: Vec<Algorithm>,
    empty: bool,
}

impl VerifyKey {
    /// Shared HMAC secret.
    pub fn secret(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            algorithms: HMAC_ALGORITHMS.to_vec(),
            empty: secret.as_ref().is_empty(),
        }
    }

    /// RSA public key in PEM form.
    pub fn rsa_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            key: DecodingKey::from_rsa_pem(pem)?,
            algorithms: RSA_ALGORITHMS.to_vec(),
            empty: false,
        })
    }

    /// EC public key in PEM form.
    pub fn ec_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            key: DecodingKey::from_ec_pem(pem)?,
            algorithms: EC_ALGORITHMS.to_vec(),
            empty: false,
        })
    }

    /// Ed25519 public key in PEM form.
    pub fn ed_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            key: DecodingKey::from_ed_pem(pem)?,
            algorithms: vec![Algorithm::EdDSA],
            empty: false,
        })
    }

    /// Key from a JWK. A declared `alg` narrows the accepted algorithms to it.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            key: DecodingKey::from_jwk(jwk)?,
            algorithms: jwk_algorithms(jwk),
            empty: matches!(&jwk.algorithm, AlgorithmParameters::OctetKey(oct) if oct.value.is_empty()),
        })
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }

    /// Algorithms used when the verify options leave the list empty.
    pub fn default_algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// True for a zero-length HMAC secret, which anyone can sign with.
    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

impl fmt::Debug for VerifyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyKey")
            .field("key", &"<redacted>")
            .field("algorithms", &self.algorithms)
            .finish()
    }
}

fn jwk_algorithms(jwk: &Jwk) -> Vec<Algorithm> {
    let declared = jwk.common.key_algorithm.and_then(|alg| match alg {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    });
    if let Some(alg) = declared {
        return vec![alg];
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => RSA_ALGORITHMS.to_vec(),
        AlgorithmParameters::EllipticCurve(_) => EC_ALGORITHMS.to_vec(),
        AlgorithmParameters::OctetKeyPair(_) => vec![Algorithm::EdDSA],
        _ => HMAC_ALGORITHMS.to_vec(),
    }
}

/// A raw token whose signature has not been checked yet.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    raw: String,
}

impl UnverifiedToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Decode the JOSE header without verification (e.g. to read `kid`).
    pub fn peek_header(&self) -> Result<Header, CallbackError> {
        jsonwebtoken::decode_header(&self.raw).map_err(|e| {
            tracing::debug!(error = %e, "Token header could not be decoded for key selection");
            CallbackError::Rejected(AuthError::InvalidSignature)
        })
    }

    /// Decode the payload without verification, for key selection only.
    pub fn peek_claims(&self) -> Result<UntrustedClaims, CallbackError> {
        jsonwebtoken::dangerous::insecure_decode::<Map<String, Value>>(&self.raw)
            .map(|data| UntrustedClaims(data.claims))
            .map_err(|e| {
                tracing::debug!(error = %e, "Token payload could not be decoded for key selection");
                CallbackError::Rejected(AuthError::InvalidSignature)
            })
    }
}

/// Claims read before verification. Not convertible into credentials.
#[derive(Debug, Clone)]
pub struct UntrustedClaims(Map<String, Value>);

impl UntrustedClaims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

/// Output of a key resolver.
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub key: VerifyKey,
    pub context: Option<KeyContext>,
}

impl ResolvedKey {
    pub fn new(key: VerifyKey) -> Self {
        Self { key, context: None }
    }

    pub fn with_context(mut self, context: KeyContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Picks the verification key for one token.
pub trait KeyResolver: Send + Sync + 'static {
    fn resolve(&self, token: UnverifiedToken) -> BoxFuture<'_, Result<ResolvedKey, CallbackError>>;
}

/// Where a scheme gets its verification key.
#[derive(Clone)]
pub enum KeySource {
    Static(VerifyKey),
    Dynamic(Arc<dyn KeyResolver>),
}

impl KeySource {
    pub fn resolver(resolver: impl KeyResolver) -> Self {
        KeySource::Dynamic(Arc::new(resolver))
    }

    /// Resolver that returns its answer directly.
    pub fn resolve_with<F>(f: F) -> Self
    where
        F: Fn(&UnverifiedToken) -> Result<ResolvedKey, CallbackError> + Send + Sync + 'static,
    {
        Self::resolver(ResolveFn(f))
    }

    /// Resolver that returns a future.
    pub fn resolve_async<F, Fut>(f: F) -> Self
    where
        F: Fn(UnverifiedToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResolvedKey, CallbackError>> + Send + 'static,
    {
        Self::resolver(ResolveAsync(f))
    }

    /// Resolver that reports through a [`Completion`] handle.
    pub fn resolve_with_completion<F>(f: F) -> Self
    where
        F: Fn(UnverifiedToken, Completion<Result<ResolvedKey, CallbackError>>)
            + Send
            + Sync
            + 'static,
    {
        Self::resolver(ResolveWithCompletion(f))
    }

    pub(crate) async fn resolve(
        &self,
        token: &str,
    ) -> Result<(Cow<'_, VerifyKey>, Option<KeyContext>), CallbackError> {
        match self {
            KeySource::Static(key) => Ok((Cow::Borrowed(key), None)),
            KeySource::Dynamic(resolver) => {
                let resolved = resolver.resolve(UnverifiedToken::new(token)).await?;
                if resolved.key.is_empty() {
                    return Err(CallbackError::failed("resolver returned an empty secret"));
                }
                Ok((Cow::Owned(resolved.key), resolved.context))
            }
        }
    }
}

impl From<VerifyKey> for KeySource {
    fn from(key: VerifyKey) -> Self {
        KeySource::Static(key)
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Static(key) => f.debug_tuple("Static").field(key).finish(),
            KeySource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

struct ResolveFn<F>(F);

impl<F> KeyResolver for ResolveFn<F>
where
    F: Fn(&UnverifiedToken) -> Result<ResolvedKey, CallbackError> + Send + Sync + 'static,
{
    fn resolve(&self, token: UnverifiedToken) -> BoxFuture<'_, Result<ResolvedKey, CallbackError>> {
        let result = (self.0)(&token);
        Box::pin(std::future::ready(result))
    }
}

struct ResolveAsync<F>(F);

impl<F, Fut> KeyResolver for ResolveAsync<F>
where
    F: Fn(UnverifiedToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResolvedKey, CallbackError>> + Send + 'static,
{
    fn resolve(&self, token: UnverifiedToken) -> BoxFuture<'_, Result<ResolvedKey, CallbackError>> {
        Box::pin((self.0)(token))
    }
}

struct ResolveWithCompletion<F>(F);

impl<F> KeyResolver for ResolveWithCompletion<F>
where
    F: Fn(UnverifiedToken, Completion<Result<ResolvedKey, CallbackError>>) + Send + Sync + 'static,
{
    fn resolve(&self, token: UnverifiedToken) -> BoxFuture<'_, Result<ResolvedKey, CallbackError>> {
        let (completion, pending) = Completion::channel();
        (self.0)(token, completion);
        Box::pin(async move {
            pending.wait().await.unwrap_or_else(|| {
                Err(CallbackError::failed(
                    "key resolver dropped its completion handle without a result",
                ))
            })
        })
    }
}

/// Per-tenant keys chosen by one unverified claim (e.g. `username`).
///
/// The claim only selects the key; the token is still verified with it
/// afterwards, so a forged claim just picks a key that will not verify.
#[derive(Debug, Clone, Default)]
pub struct ClaimKeyResolver {
    claim: String,
    tenants: HashMap<String, ResolvedKey>,
}

impl ClaimKeyResolver {
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            tenants: HashMap::new(),
        }
    }

    pub fn with_key(self, value: impl Into<String>, key: VerifyKey) -> Self {
        self.with_tenant(value, ResolvedKey::new(key))
    }

    pub fn with_tenant(mut self, value: impl Into<String>, resolved: ResolvedKey) -> Self {
        self.tenants.insert(value.into(), resolved);
        self
    }

    fn lookup(&self, token: &UnverifiedToken) -> Result<ResolvedKey, CallbackError> {
        let claims = token.peek_claims()?;
        let Some(value) = claims.get_str(&self.claim) else {
            tracing::debug!(claim = %self.claim, "Key selection claim missing from token");
            return Err(CallbackError::Rejected(AuthError::InvalidSignature));
        };

        self.tenants.get(value).cloned().ok_or_else(|| {
            tracing::debug!(claim = %self.claim, value, "No key registered for tenant");
            CallbackError::Rejected(AuthError::InvalidSignature)
        })
    }
}

impl KeyResolver for ClaimKeyResolver {
    fn resolve(&self, token: UnverifiedToken) -> BoxFuture<'_, Result<ResolvedKey, CallbackError>> {
        Box::pin(std::future::ready(self.lookup(&token)))
    }
}
