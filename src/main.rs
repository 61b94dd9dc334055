// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jwt_bearer_scheme::{
    api::router,
    auth::SchemeRegistry,
    config::{LogFormat, ServerConfig, DEFAULT_LOG_FILTER},
    state::AppState,
    store::AccountStore,
};

/// Name the demo scheme is registered under.
const SCHEME_NAME: &str = "jwt";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Token for the demo account, valid for one hour.
fn demo_token(config: &ServerConfig) -> Result<String, jsonwebtoken::errors::Error> {
    let mut header = Header::default();
    if let Some(alg) = config.verify.algorithms.first() {
        header.alg = *alg;
    }
    let exp = chrono::Utc::now().timestamp() + 3600;
    encode(
        &header,
        &json!({ "id": 123, "name": "Charlie", "exp": exp }),
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    init_tracing(config.log_format);

    let accounts = Arc::new(AccountStore::with_demo_accounts());

    let mut registry = SchemeRegistry::new();
    let scheme = registry
        .register(
            SCHEME_NAME,
            config.scheme_config().validator(Arc::clone(&accounts).validator()),
        )
        .map_err(|e| {
            error!(error = %e, "Invalid authentication configuration");
            e
        })?;

    match demo_token(&config) {
        Ok(token) => info!(%token, "Demo token for account 123"),
        Err(e) => error!(error = %e, "Failed to mint demo token"),
    }

    let app = router(AppState::new(scheme, accounts));

    let addr = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "JWT bearer demo server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
