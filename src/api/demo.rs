// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::{
    auth::{Auth, MaybeAuth},
    models::{MessageResponse, WhoAmIResponse},
};

pub async fn token_required(Auth(_credentials): Auth) -> Json<MessageResponse> {
    Json(MessageResponse::new("You used a Token!"))
}

pub async fn no_token_required() -> Json<MessageResponse> {
    Json(MessageResponse::new("Token not required"))
}

/// Answers for anonymous callers too; a bad token is still rejected.
pub async fn whoami(MaybeAuth(credentials): MaybeAuth) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        authenticated: credentials.is_some(),
        user: credentials
            .as_ref()
            .and_then(|c| c.get_str("user"))
            .map(str::to_string),
    })
}
