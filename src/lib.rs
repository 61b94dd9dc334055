// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT Bearer Scheme - pluggable Bearer-token authentication for Axum
//!
//! Authenticates requests carrying `Authorization: Bearer <JWT>` against a
//! static or per-token key, then lets the application turn verified claims
//! into credentials.
//!
//! ## Modules
//!
//! - `auth` - The scheme: header parsing, key resolution, verification,
//!   credential resolution, outcomes, axum middleware and extractors
//! - `api` - Demo HTTP API handlers (Axum)
//! - `config` - Environment configuration of the demo server
//! - `store` - In-memory accounts used by the demo validator

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
