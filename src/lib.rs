// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shopfront Auth - token authentication for a fleet of services
//!
//! One authority service mints signed tokens after a credential check. Every
//! other service verifies those tokens locally with a shared key, or asks the
//! authority over HTTP when it holds none, and then checks the caller's
//! authorities before running an operation.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token issuing, verification, relay and authorization
//! - `config` - Environment-driven settings
//! - `directory` - Credential check collaborator
//! - `observability` - Logging setup

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod observability;
pub mod state;
