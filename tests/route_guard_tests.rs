// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use common::{logged_in_app, test_app, test_app_with_credential, ScriptedTransport};
use fittrack::middleware::{login_redirect_path, require_auth, GateDecision};
use fittrack::services::SessionState;
use serde_json::json;

fn settled(credential: Option<&str>) -> SessionState {
    let mut state = SessionState::default();
    state.is_loading = false;
    state.is_initialized = true;
    state.credential = credential.map(str::to_string);
    state
}

#[test]
fn test_loading_session_renders_placeholder() {
    let state = SessionState::default();
    assert_eq!(require_auth(&state, "/workouts"), GateDecision::RenderLoading);

    // Even with a credential present, loading wins
    let mut state = settled(Some("abc"));
    state.is_loading = true;
    assert_eq!(require_auth(&state, "/workouts"), GateDecision::RenderLoading);
}

#[test]
fn test_authenticated_session_renders_route() {
    let state = settled(Some("abc"));
    assert_eq!(
        require_auth(&state, "/dashboard"),
        GateDecision::RenderProtected
    );
}

#[test]
fn test_anonymous_session_redirects_with_return_location() {
    let decision = require_auth(&settled(None), "/workouts/12?tab=notes");
    assert_eq!(
        decision,
        GateDecision::RedirectToLogin {
            return_to: "/workouts/12?tab=notes".to_string()
        }
    );
    assert_eq!(
        decision.redirect_path().as_deref(),
        Some("/login?next=%2Fworkouts%2F12%3Ftab%3Dnotes")
    );
    assert_eq!(GateDecision::RenderProtected.redirect_path(), None);
}

#[test]
fn test_backslash_return_location_is_not_followed() {
    assert_eq!(login_redirect_path("/\\evil.example"), "/login?next=%2F");
    assert_eq!(login_redirect_path("/"), "/login?next=%2F");
}

#[tokio::test]
async fn test_gate_follows_session_lifecycle() {
    let transport = ScriptedTransport::new();
    let app = test_app(transport.clone());
    assert_eq!(
        require_auth(&app.session.snapshot(), "/profile"),
        GateDecision::RenderLoading
    );

    app.session.initialize().await;
    assert!(matches!(
        require_auth(&app.session.snapshot(), "/profile"),
        GateDecision::RedirectToLogin { .. }
    ));
}

#[tokio::test]
async fn test_gate_after_restart_with_stored_credential() {
    let transport = ScriptedTransport::new();
    transport.respond("GET", "profiles/me/", 200, common::profile_json(1, "alice"));
    let app = test_app_with_credential(transport.clone(), "tok-stored");

    app.session.initialize().await;

    assert_eq!(
        require_auth(&app.session.snapshot(), "/dashboard"),
        GateDecision::RenderProtected
    );
}

#[tokio::test]
async fn test_gate_redirects_after_logout() {
    let transport = ScriptedTransport::new();
    let app = logged_in_app(transport.clone()).await;
    transport.respond("POST", "auth/logout/", 200, json!({"detail": "Successfully logged out."}));
    assert_eq!(
        require_auth(&app.session.snapshot(), "/workouts"),
        GateDecision::RenderProtected
    );

    app.session.logout().await;

    assert_eq!(
        require_auth(&app.session.snapshot(), "/workouts"),
        GateDecision::RedirectToLogin {
            return_to: "/workouts".to_string()
        }
    );
}
