// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::SharedAuthenticator;
use crate::store::AccountStore;

#[derive(Clone)]
pub struct AppState {
    pub scheme: SharedAuthenticator,
    pub accounts: Arc<AccountStore>,
}

impl AppState {
    pub fn new(scheme: SharedAuthenticator, accounts: Arc<AccountStore>) -> Self {
        Self { scheme, accounts }
    }
}

impl FromRef<AppState> for SharedAuthenticator {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.scheme)
    }
}
