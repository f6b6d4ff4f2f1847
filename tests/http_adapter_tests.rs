// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use common::{test_config, workout_json, ScriptedTransport};
use fittrack::config::Config;
use fittrack::error::AppError;
use fittrack::models::Credentials;
use fittrack::services::{ApiClient, ApiRequest, CredentialProvider, TransportError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Fixed credential that records revocations.
#[derive(Default)]
struct FixedCredential {
    credential: Mutex<Option<String>>,
    revoked: Mutex<Vec<String>>,
}

impl FixedCredential {
    fn new(credential: &str) -> Arc<Self> {
        Arc::new(Self {
            credential: Mutex::new(Some(credential.to_string())),
            revoked: Mutex::default(),
        })
    }

    fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }
}

impl CredentialProvider for FixedCredential {
    fn current_credential(&self) -> Option<String> {
        self.credential.lock().unwrap().clone()
    }

    fn revoke(&self, rejected: &str) {
        self.revoked.lock().unwrap().push(rejected.to_string());
        let mut current = self.credential.lock().unwrap();
        if current.as_deref() == Some(rejected) {
            *current = None;
        }
    }
}

fn client(
    config: &Config,
    transport: &Arc<ScriptedTransport>,
    credentials: &Arc<FixedCredential>,
) -> ApiClient {
    ApiClient::new(config, transport.clone(), credentials.clone())
}

#[tokio::test]
async fn test_request_carries_credential_and_resolves_url() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    let config = Config {
        api_url: "https://api.example.com/api/".to_string(),
        auth_scheme: "Bearer".to_string(),
        ..test_config()
    };
    transport.respond("GET", "workouts/summary/", 200, json!({"total_workouts": 2}));

    let summary = client(&config, &transport, &credentials)
        .get_summary()
        .await
        .unwrap();

    assert_eq!(summary.total_count, 2);
    assert_eq!(summary.total_calories, 0);

    let request = transport.last_request("GET", "workouts/summary/").unwrap();
    assert_eq!(request.url, "https://api.example.com/api/workouts/summary/");
    assert_eq!(request.header("Authorization"), Some("Bearer abc123"));
    assert_eq!(request.header("Accept"), Some("application/json"));
    assert_eq!(request.header("Content-Type"), None);
    assert_eq!(request.timeout, Duration::from_secs(15));
}

#[tokio::test]
async fn test_401_revokes_only_the_session_credential() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    let api = client(&test_config(), &transport, &credentials);
    transport.respond("GET", "profiles/me/", 401, json!({"detail": "Invalid token."}));

    // Explicit token: caller handles it, nothing revoked
    let err = api.get_profile_with("other-token").await.unwrap_err();
    assert!(err.is_auth_error());
    assert!(credentials.revoked().is_empty());

    let err = api.get_profile().await.unwrap_err();
    match err {
        AppError::Unauthorized(message) => assert_eq!(message, "Invalid token."),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
    assert_eq!(credentials.revoked(), vec!["abc123".to_string()]);
    assert_eq!(credentials.current_credential(), None);
}

#[tokio::test]
async fn test_503_waits_for_backoff_before_retrying() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    let config = Config {
        retry_backoff: Duration::from_millis(30),
        ..test_config()
    };
    transport.respond("GET", "workouts/", 503, json!({}));

    let started = Instant::now();
    let err = client(&config, &transport, &credentials)
        .list_workouts()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Unavailable));
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(transport.calls("GET", "workouts/"), 2);
}

#[tokio::test]
async fn test_mutations_are_retried_once_too() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    transport.respond("DELETE", "workouts/4/", 503, json!({}));
    transport.respond("DELETE", "workouts/4/", 204, serde_json::Value::Null);

    client(&test_config(), &transport, &credentials)
        .delete_workout(4)
        .await
        .unwrap();

    assert_eq!(transport.calls("DELETE", "workouts/4/"), 2);
}

#[tokio::test]
async fn test_transport_failures_map_to_network() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    let api = client(&test_config(), &transport, &credentials);

    transport.fail(
        "GET",
        "workouts/",
        TransportError::Connect("dns error".to_string()),
    );
    assert!(matches!(
        api.list_workouts().await.unwrap_err(),
        AppError::Network(_)
    ));

    transport.fail("GET", "workouts/summary/", TransportError::Timeout);
    let err = api.get_summary().await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)));
    assert_eq!(err.user_message(), AppError::NETWORK_MESSAGE);
}

#[tokio::test]
async fn test_server_error_messages_extracted_at_boundary() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    let api = client(&test_config(), &transport, &credentials);

    transport.respond(
        "POST",
        "workouts/",
        400,
        json!({"duration": ["Ensure this value is less than or equal to 1440."]}),
    );
    let request = ApiRequest::post(ApiClient::WORKOUTS_PATH)
        .json(&json!({"duration": 2000}))
        .unwrap();
    match api.send(request).await.unwrap_err() {
        AppError::Server { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Ensure this value is less than or equal to 1440.");
        }
        other => panic!("expected Server, got {:?}", other),
    }

    transport.respond("GET", "workouts/8/", 500, json!([]));
    match api.get_workout(8).await.unwrap_err() {
        AppError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("expected Server, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_success_body_is_payload_error() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    let api = client(&test_config(), &transport, &credentials);

    transport.respond("GET", "workouts/3/", 200, json!({"id": "three"}));
    assert!(matches!(
        api.get_workout(3).await.unwrap_err(),
        AppError::Payload(_)
    ));

    transport.respond("POST", "auth/login/", 200, json!({"key": ""}));
    assert!(matches!(
        api.login(&Credentials::new("alice", "s3cretpass"))
            .await
            .unwrap_err(),
        AppError::Payload(_)
    ));
}

#[tokio::test]
async fn test_workout_list_shapes() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    let api = client(&test_config(), &transport, &credentials);

    transport.respond(
        "GET",
        "workouts/",
        200,
        json!({"results": [workout_json(1, "cardio", "2024-01-01", 30, 250)]}),
    );
    assert_eq!(api.list_workouts().await.unwrap().len(), 1);

    transport.respond("GET", "workouts/", 200, json!(42));
    assert!(api.list_workouts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_rejection_maps_to_unauthorized() {
    let transport = ScriptedTransport::new();
    let credentials = FixedCredential::new("abc123");
    let api = client(&test_config(), &transport, &credentials);

    transport.respond(
        "POST",
        "auth/login/",
        400,
        json!({"non_field_errors": ["Unable to log in with provided credentials."]}),
    );
    let err = api
        .login(&Credentials::new("alice", "wrong"))
        .await
        .unwrap_err();

    assert!(err.is_auth_error());
    assert_eq!(
        err.user_message(),
        "Unable to log in with provided credentials."
    );
    // Anonymous request: the session credential is untouched
    let request = transport.last_request("POST", "auth/login/").unwrap();
    assert_eq!(request.header("Authorization"), None);
    assert!(credentials.revoked().is_empty());
}
