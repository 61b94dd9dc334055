// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! by the demo server. Configuration is loaded from the environment at
//! startup and turned into a [`SchemeConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HMAC secret tokens are verified with | Required |
//! | `JWT_ALGORITHMS` | Comma-separated accepted algorithms | `HS256,HS384,HS512` |
//! | `JWT_AUDIENCE` | Comma-separated accepted `aud` values | Not checked |
//! | `JWT_ISSUER` | Comma-separated accepted `iss` values | Not checked |
//! | `JWT_CLOCK_TOLERANCE` | Clock skew tolerance in seconds | `0` |
//! | `AUTH_REDIRECT_URL` | Redirect target for failed authentication | None |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::str::FromStr;

use jsonwebtoken::Algorithm;

use crate::auth::{ConfigError, SchemeConfig, VerifyKey, VerifyOptions};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ALGORITHMS_ENV: &str = "JWT_ALGORITHMS";
pub const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_CLOCK_TOLERANCE_ENV: &str = "JWT_CLOCK_TOLERANCE";
pub const AUTH_REDIRECT_URL_ENV: &str = "AUTH_REDIRECT_URL";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Demo server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub verify: VerifyOptions,
    pub redirect_url: Option<String>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get(PORT_ENV) {
            Some(raw) => parse_number(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::MissingKey)?;

        let algorithms = get(JWT_ALGORITHMS_ENV)
            .map(|raw| {
                split_list(&raw)
                    .into_iter()
                    .map(|name| {
                        Algorithm::from_str(&name).map_err(|_| ConfigError::InvalidEnv {
                            name: JWT_ALGORITHMS_ENV,
                            reason: format!("unknown algorithm '{name}'"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let clock_tolerance = match get(JWT_CLOCK_TOLERANCE_ENV) {
            Some(raw) => parse_number(JWT_CLOCK_TOLERANCE_ENV, &raw)?,
            None => 0,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidEnv {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            jwt_secret,
            verify: VerifyOptions {
                algorithms,
                audience: get(JWT_AUDIENCE_ENV).map(|v| split_list(&v)).unwrap_or_default(),
                issuer: get(JWT_ISSUER_ENV).map(|v| split_list(&v)).unwrap_or_default(),
                clock_tolerance,
                ..Default::default()
            },
            redirect_url: get(AUTH_REDIRECT_URL_ENV),
            log_format,
        })
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::InvalidEnv {
                name: HOST_ENV,
                reason: format!("{e}"),
            })
    }

    /// Scheme configuration without a validator; the caller adds one.
    pub fn scheme_config(&self) -> SchemeConfig {
        let config = SchemeConfig::new()
            .key(VerifyKey::secret(&self.jwt_secret))
            .verify_options(self.verify.clone());
        match &self.redirect_url {
            Some(target) => config.redirect_url(target.clone()),
            None => config,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        name,
        reason: format!("'{raw}': {e}"),
    })
}
