// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde_json::Value;

use crate::{auth::Auth, error::ApiError, models::Account, state::AppState, store::ACCOUNT_ID_CLAIM};

/// The caller's own account.
pub async fn me(
    Auth(credentials): Auth,
    State(state): State<AppState>,
) -> Result<Json<Account>, ApiError> {
    credentials
        .get(ACCOUNT_ID_CLAIM)
        .and_then(Value::as_u64)
        .and_then(|id| state.accounts.get(id))
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Account not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, JwtScheme, SchemeConfig, VerifyKey};
    use crate::store::AccountStore;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    fn state() -> AppState {
        let scheme = JwtScheme::new(SchemeConfig::new().key(VerifyKey::secret("unused"))).unwrap();
        AppState::new(Arc::new(scheme), Arc::new(AccountStore::with_demo_accounts()))
    }

    fn auth(credentials: Value) -> Auth {
        Auth(Credentials::try_from(credentials).unwrap())
    }

    #[tokio::test]
    async fn returns_own_account() {
        let Json(account) = me(auth(json!({ "id": 123 })), State(state()))
            .await
            .expect("account lookup succeeds");
        assert_eq!(account.user, "john");
        assert_eq!(account.full_name, "John Doe");
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let result = me(auth(json!({ "id": 5 })), State(state())).await;
        match result {
            Err(err) => assert_eq!(err.status, StatusCode::NOT_FOUND),
            Ok(_) => panic!("expected unknown account to be rejected"),
        }
    }
}
