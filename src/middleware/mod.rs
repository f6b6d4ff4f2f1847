// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (route guards).

pub mod auth;

pub use auth::{login_redirect_path, require_auth, GateDecision};
