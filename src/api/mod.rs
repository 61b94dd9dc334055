// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::require_auth, state::AppState};

pub mod accounts;
pub mod demo;
pub mod health;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/token-required", get(demo::token_required))
        .route("/accounts/me", get(accounts::me))
        .route_layer(middleware::from_fn_with_state(
            state.scheme.clone(),
            require_auth,
        ));

    let v1_routes = Router::new()
        .route("/no-token-required", get(demo::no_token_required))
        .route("/whoami", get(demo::whoami))
        .merge(protected)
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
