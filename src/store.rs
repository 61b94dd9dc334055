// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory account store backing the demo credential validator.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::auth::{validate_with, CallbackError, Claims, CredentialValidator, Verdict};
use crate::models::Account;

/// Claim holding the account id.
pub const ACCOUNT_ID_CLAIM: &str = "id";

#[derive(Debug, Default, Clone)]
pub struct AccountStore {
    accounts: HashMap<u64, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the demo account (`id` 123, user `john`).
    pub fn with_demo_accounts() -> Self {
        let mut store = Self::new();
        store.insert(Account {
            id: 123,
            user: "john".to_string(),
            full_name: "John Doe".to_string(),
            scope: vec!["a".to_string(), "b".to_string()],
        });
        store
    }

    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    pub fn get(&self, id: u64) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Account referenced by verified claims.
    pub fn lookup(&self, claims: &Claims) -> Option<&Account> {
        claims
            .get(ACCOUNT_ID_CLAIM)
            .and_then(Value::as_u64)
            .and_then(|id| self.get(id))
    }

    /// Validator accepting tokens whose `id` names a known account.
    pub fn validator(self: Arc<Self>) -> impl CredentialValidator {
        validate_with(move |_, claims, _| match self.lookup(claims) {
            Some(account) => {
                let credentials = serde_json::to_value(account).map_err(CallbackError::failed)?;
                Ok(Verdict::valid(credentials))
            }
            None => Ok(Verdict::invalid()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtScheme, RequestInfo, SchemeConfig, VerifyKey};
    use crate::auth::AuthOutcome;
    use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn claims(value: Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn lookup_by_id_claim() {
        let store = AccountStore::with_demo_accounts();
        assert_eq!(store.lookup(&claims(json!({ "id": 123 }))).map(|a| a.user.as_str()), Some("john"));
        assert!(store.lookup(&claims(json!({ "id": 7 }))).is_none());
        assert!(store.lookup(&claims(json!({ "id": "123" }))).is_none());
        assert!(store.lookup(&claims(json!({}))).is_none());
    }

    #[tokio::test]
    async fn validator_turns_account_into_credentials() {
        let scheme = JwtScheme::new(
            SchemeConfig::new()
                .key(VerifyKey::secret("store-secret"))
                .validator(Arc::new(AccountStore::with_demo_accounts()).validator()),
        )
        .unwrap();

        let request = |id: u64| {
            let token = encode(
                &Header::default(),
                &json!({ "id": id }),
                &EncodingKey::from_secret(b"store-secret"),
            )
            .unwrap();
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
            );
            RequestInfo {
                headers,
                ..Default::default()
            }
        };

        let AuthOutcome::Authenticated(credentials) = scheme.authenticate(&request(123)).await else {
            panic!("expected account 123 to authenticate");
        };
        assert_eq!(credentials.get_str("fullName"), Some("John Doe"));

        let unknown = scheme.authenticate(&request(9)).await;
        assert!(!unknown.is_authenticated());
        assert_eq!(unknown.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
