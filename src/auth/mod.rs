// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer JWT authentication as a pluggable scheme.
//!
//! ## Auth Flow
//!
//! 1. Client sends `Authorization: Bearer <JWT>`
//! 2. The scheme:
//!    - Parses the header
//!    - Picks the verification key (static, or per token from a resolver)
//!    - Verifies signature, expiry, audience, issuer
//!    - Runs the optional validation callback to turn claims into credentials
//! 3. The outcome is handed to the host exactly once: authenticated,
//!    unauthenticated (with a `Bearer` challenge on 401), or errored
//!
//! ## Security
//!
//! - Claims read before verification are typed separately and never
//!   become credentials
//! - Internal failures answer with a generic 500 message; details are logged
//! - The scheme never logs tokens, keys, secrets or credentials
//! - An empty HMAC secret is rejected at registration and from resolvers

use std::future::Future;
use std::pin::Pin;

pub mod completion;
pub mod error;
pub mod extractor;
pub mod header;
pub mod jwks;
pub mod key;
pub mod middleware;
pub mod outcome;
pub mod resolution;
pub mod scheme;
pub mod verifier;

/// Boxed, sendable future used at the trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use completion::Completion;
pub use error::{AuthError, CallbackError, ClassifiedError};
pub use extractor::{Auth, MaybeAuth};
pub use jwks::JwksKeyResolver;
pub use key::{
    ClaimKeyResolver, KeyContext, KeyResolver, KeySource, ResolvedKey, UnverifiedToken,
    UntrustedClaims, VerifyKey,
};
pub use middleware::{optional_auth, require_auth};
pub use outcome::{AuthOutcome, Continuation, HttpContinuation};
pub use resolution::{
    validate_async, validate_with, validate_with_completion, CredentialValidator, Credentials,
    Resolution, Verdict,
};
pub use scheme::{
    Authenticator, ConfigError, JwtScheme, RequestInfo, SchemeConfig, SchemeRegistry,
    SharedAuthenticator,
};
pub use verifier::{verify, Claims, VerifyOptions};
