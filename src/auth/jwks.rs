// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) key resolution.
//!
//! ## Behaviour
//!
//! - The key is chosen by the token's `kid` header; a token without `kid`
//!   is accepted only when the set holds exactly one usable key
//! - Remote sets are cached with a configurable TTL
//! - An unknown `kid` triggers at most one early refresh per
//!   [`MIN_REFRESH_INTERVAL`] to pick up rotated keys
//! - Stale cache is used on fetch failure

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::RwLock;

use super::error::{AuthError, CallbackError};
use super::key::{KeyResolver, ResolvedKey, UnverifiedToken, VerifyKey};
use super::BoxFuture;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Lower bound between refreshes forced by unknown key ids.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

#[derive(Clone)]
struct Remote {
    url: String,
    client: reqwest::Client,
}

/// Key resolver backed by a JSON Web Key Set.
#[derive(Clone)]
pub struct JwksKeyResolver {
    remote: Option<Remote>,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
}

impl JwksKeyResolver {
    /// Resolver fetching its keys from `jwks_url`.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            remote: Some(Remote {
                url: jwks_url.into(),
                client,
            }),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Resolver over a fixed, already-loaded key set.
    pub fn with_keys(jwks: JwkSet) -> Self {
        Self {
            remote: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(Some(CacheEntry {
                jwks,
                fetched_at: Instant::now(),
            }))),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn jwks_url(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.url.as_str())
    }

    /// Force refresh the JWKS cache. A no-op for fixed key sets.
    pub async fn refresh(&self) -> Result<(), CallbackError> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };
        let jwks = fetch_jwks(remote).await?;
        self.store(jwks).await;
        Ok(())
    }

    /// Whether a key set is cached and still fresh.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        match &*cache {
            Some(entry) => self.remote.is_none() || entry.fetched_at.elapsed() < self.cache_ttl,
            None => false,
        }
    }

    async fn store(&self, jwks: JwkSet) {
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks,
            fetched_at: Instant::now(),
        });
    }

    async fn get_jwks(&self) -> Result<JwkSet, CallbackError> {
        let stale = {
            let cache = self.cache.read().await;
            match (&*cache, &self.remote) {
                (Some(entry), None) => return Ok(entry.jwks.clone()),
                (Some(entry), Some(_)) if entry.fetched_at.elapsed() < self.cache_ttl => {
                    return Ok(entry.jwks.clone());
                }
                (entry, _) => entry.as_ref().map(|e| e.jwks.clone()),
            }
        };

        let Some(remote) = &self.remote else {
            return Err(CallbackError::failed("JWKS resolver has no keys"));
        };

        match fetch_jwks(remote).await {
            Ok(jwks) => {
                self.store(jwks.clone()).await;
                Ok(jwks)
            }
            Err(e) => match stale {
                Some(jwks) => {
                    tracing::warn!(url = %remote.url, error = %e, "JWKS refresh failed, using stale keys");
                    Ok(jwks)
                }
                None => Err(e),
            },
        }
    }

    /// Refresh early if the cache is older than [`MIN_REFRESH_INTERVAL`].
    async fn refresh_for_unknown_kid(&self) -> Result<bool, CallbackError> {
        if self.remote.is_none() {
            return Ok(false);
        }
        let recent = {
            let cache = self.cache.read().await;
            cache
                .as_ref()
                .is_some_and(|e| e.fetched_at.elapsed() < MIN_REFRESH_INTERVAL)
        };
        if recent {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    async fn resolve_token(&self, token: UnverifiedToken) -> Result<ResolvedKey, CallbackError> {
        let header = token.peek_header()?;
        let jwks = self.get_jwks().await?;

        let Some(kid) = header.kid.as_deref() else {
            return single_key(&jwks);
        };

        if let Some(jwk) = find_key(&jwks, kid) {
            return to_resolved(jwk);
        }

        if self.refresh_for_unknown_kid().await? {
            let jwks = self.get_jwks().await?;
            if let Some(jwk) = find_key(&jwks, kid) {
                return to_resolved(jwk);
            }
        }

        tracing::debug!(kid, "No JWKS key matches token kid");
        Err(CallbackError::Rejected(AuthError::InvalidSignature))
    }
}

impl KeyResolver for JwksKeyResolver {
    fn resolve(&self, token: UnverifiedToken) -> BoxFuture<'_, Result<ResolvedKey, CallbackError>> {
        Box::pin(self.resolve_token(token))
    }
}

async fn fetch_jwks(remote: &Remote) -> Result<JwkSet, CallbackError> {
    let response = remote
        .client
        .get(&remote.url)
        .send()
        .await
        .map_err(CallbackError::failed)?;

    if !response.status().is_success() {
        return Err(CallbackError::failed(format!(
            "HTTP {} from JWKS endpoint",
            response.status()
        )));
    }

    let jwks: JwkSet = response.json().await.map_err(CallbackError::failed)?;
    tracing::info!(url = %remote.url, keys = jwks.keys.len(), "Fetched JWKS");
    Ok(jwks)
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

fn to_resolved(jwk: &Jwk) -> Result<ResolvedKey, CallbackError> {
    let key = VerifyKey::from_jwk(jwk)
        .map_err(|e| CallbackError::failed(format!("unusable JWK in key set: {e}")))?;
    let context = jwk
        .common
        .key_id
        .as_ref()
        .map(|kid| serde_json::json!({ "kid": kid }));

    let resolved = ResolvedKey::new(key);
    Ok(match context {
        Some(context) => resolved.with_context(context),
        None => resolved,
    })
}

fn single_key(jwks: &JwkSet) -> Result<ResolvedKey, CallbackError> {
    let mut usable = jwks.keys.iter().filter_map(|jwk| to_resolved(jwk).ok());
    match (usable.next(), usable.next()) {
        (Some(resolved), None) => Ok(resolved),
        _ => {
            tracing::debug!("Token has no kid and the key set is ambiguous");
            Err(CallbackError::Rejected(AuthError::InvalidSignature))
        }
    }
}
