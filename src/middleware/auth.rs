// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Guard for protected routes.

use crate::services::SessionState;

/// Login route the gate redirects to.
pub const LOGIN_PATH: &str = "/login";

/// What a protected route should do given the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session not settled yet; render nothing conclusive
    RenderLoading,
    RenderProtected,
    /// Send the user to log in, then back to `return_to`
    RedirectToLogin { return_to: String },
}

impl GateDecision {
    /// Login URL for a redirect decision.
    pub fn redirect_path(&self) -> Option<String> {
        match self {
            GateDecision::RedirectToLogin { return_to } => Some(login_redirect_path(return_to)),
            _ => None,
        }
    }
}

/// Decide how to handle a request for `requested`.
pub fn require_auth(session: &SessionState, requested: &str) -> GateDecision {
    if session.is_loading {
        GateDecision::RenderLoading
    } else if session.credential.is_some() {
        GateDecision::RenderProtected
    } else {
        GateDecision::RedirectToLogin {
            return_to: requested.to_string(),
        }
    }
}

/// `/login?next=<return_to>`. Anything not site-relative returns to `/`.
pub fn login_redirect_path(return_to: &str) -> String {
    let target = if is_site_relative(return_to) {
        return_to
    } else {
        "/"
    };
    format!("{}?next={}", LOGIN_PATH, urlencoding::encode(target))
}

// Rejects "//host" and "/\host", which browsers treat as another origin.
fn is_site_relative(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}
