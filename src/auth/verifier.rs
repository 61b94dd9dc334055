// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature and claim verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::AuthError;
use super::key::VerifyKey;

/// Claims recovered from a token whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
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

/// Options applied on top of the signature check.
///
/// An empty `algorithms` list means "whatever the key family supports".
/// Empty `audience` / `issuer` lists disable those checks. `exp` is optional
/// but enforced when present, unless `ignore_expiration` is set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerifyOptions {
    pub algorithms: Vec<Algorithm>,
    pub audience: Vec<String>,
    pub issuer: Vec<String>,
    pub subject: Option<String>,
    /// Clock skew tolerance in seconds.
    pub clock_tolerance: u64,
    pub ignore_expiration: bool,
}

impl VerifyOptions {
    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms.into_iter().collect();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience.push(audience.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer.push(issuer.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_clock_tolerance(mut self, seconds: u64) -> Self {
        self.clock_tolerance = seconds;
        self
    }

    fn validation(&self, key: &VerifyKey) -> Validation {
        let mut validation = Validation::default();
        validation.algorithms = if self.algorithms.is_empty() {
            key.default_algorithms().to_vec()
        } else {
            self.algorithms.clone()
        };
        validation.required_spec_claims.clear();
        validation.leeway = self.clock_tolerance;
        validation.validate_exp = !self.ignore_expiration;
        validation.validate_nbf = true;

        // A configured restriction also requires its claim to be present.
        if self.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&self.audience);
            validation.required_spec_claims.insert("aud".to_string());
        }
        if !self.issuer.is_empty() {
            validation.set_issuer(&self.issuer);
            validation.required_spec_claims.insert("iss".to_string());
        }
        if self.subject.is_some() {
            validation.required_spec_claims.insert("sub".to_string());
        }
        validation.sub = self.subject.clone();

        validation
    }
}

/// Verify `token` with `key` and return its claims.
///
/// Expiry is reported as [`AuthError::ExpiredToken`]; every other failure
/// (bad signature, disallowed algorithm, audience, issuer, a missing
/// restricted claim, undecodable payload) is [`AuthError::InvalidSignature`].
pub fn verify(token: &str, key: &VerifyKey, options: &VerifyOptions) -> Result<Claims, AuthError> {
    let validation = options.validation(key);

    decode::<Map<String, Value>>(token, key.decoding_key(), &validation)
        .map(|data| Claims(data.claims))
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => {
                tracing::debug!("Token rejected: expired");
                AuthError::ExpiredToken
            }
            kind => {
                tracing::debug!(?kind, "Token rejected: verification failed");
                AuthError::InvalidSignature
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "PajeH0mz4of85T9FB1oFzaB39lbNLbDbtCQ";

    fn sign_with(header: &Header, claims: Value, secret: &str) -> String {
        encode(header, &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn sign(claims: Value) -> String {
        sign_with(&Header::default(), claims, SECRET)
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    #[test]
    fn returns_claims_exactly() {
        let token = sign(json!({ "username": "john", "scope": ["a"] }));
        let claims = verify(&token, &VerifyKey::secret(SECRET), &VerifyOptions::default()).unwrap();
        assert_eq!(
            Value::Object(claims.into_map()),
            json!({ "username": "john", "scope": ["a"] })
        );
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let token = sign(json!({ "username": "john" }));
        let result = verify(&token, &VerifyKey::secret("K2"), &VerifyOptions::default());
        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[test]
    fn expired_token_is_reported_separately() {
        let token = sign(json!({ "username": "john", "exp": now() - 600 }));
        let result = verify(&token, &VerifyKey::secret(SECRET), &VerifyOptions::default());
        assert_eq!(result, Err(AuthError::ExpiredToken));
    }

    #[test]
    fn clock_tolerance_accepts_recent_expiry() {
        let token = sign(json!({ "username": "john", "exp": now() - 30 }));
        let options = VerifyOptions::default().with_clock_tolerance(120);
        assert!(verify(&token, &VerifyKey::secret(SECRET), &options).is_ok());
    }

    #[test]
    fn ignore_expiration_skips_exp_check() {
        let token = sign(json!({ "username": "john", "exp": now() - 600 }));
        let options = VerifyOptions {
            ignore_expiration: true,
            ..Default::default()
        };
        assert!(verify(&token, &VerifyKey::secret(SECRET), &options).is_ok());
    }

    #[test]
    fn audience_and_issuer_are_checked() {
        let token = sign(json!({ "username": "john", "aud": "urn:foo", "iss": "urn:issuer" }));
        let key = VerifyKey::secret(SECRET);

        let good = VerifyOptions::default()
            .with_audience("urn:foo")
            .with_issuer("urn:issuer");
        assert!(verify(&token, &key, &good).is_ok());

        let wrong_aud = VerifyOptions::default().with_audience("urn:bar");
        assert_eq!(verify(&token, &key, &wrong_aud), Err(AuthError::InvalidSignature));

        let wrong_iss = VerifyOptions::default().with_issuer("urn:other");
        assert_eq!(verify(&token, &key, &wrong_iss), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn missing_restricted_claims_are_rejected() {
        let token = sign(json!({ "username": "john" }));
        let key = VerifyKey::secret(SECRET);

        let options = VerifyOptions::default().with_issuer("urn:issuer");
        assert_eq!(verify(&token, &key, &options), Err(AuthError::InvalidSignature));

        let options = VerifyOptions::default().with_audience("urn:foo");
        assert_eq!(verify(&token, &key, &options), Err(AuthError::InvalidSignature));

        let options = VerifyOptions::default().with_subject("u1");
        assert_eq!(verify(&token, &key, &options), Err(AuthError::InvalidSignature));

        assert!(verify(&token, &key, &VerifyOptions::default()).is_ok());
    }

    #[test]
    fn disallowed_algorithm_is_invalid_signature() {
        let token = sign(json!({ "username": "john" }));
        let options = VerifyOptions::default().with_algorithms([Algorithm::HS512]);
        assert_eq!(
            verify(&token, &VerifyKey::secret(SECRET), &options),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn subject_is_checked() {
        let token = sign(json!({ "sub": "user_1" }));
        let key = VerifyKey::secret(SECRET);
        assert!(verify(&token, &key, &VerifyOptions::default().with_subject("user_1")).is_ok());
        assert_eq!(
            verify(&token, &key, &VerifyOptions::default().with_subject("user_2")),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn options_deserialize_from_json() {
        let options: VerifyOptions = serde_json::from_value(json!({
            "algorithms": ["HS256"],
            "audience": ["urn:foo"],
            "clock_tolerance": 5
        }))
        .unwrap();
        assert_eq!(options.algorithms, vec![Algorithm::HS256]);
        assert_eq!(options.audience, vec!["urn:foo".to_string()]);
        assert_eq!(options.clock_tolerance, 5);
        assert!(options.issuer.is_empty());
    }
}
