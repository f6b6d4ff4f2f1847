// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use fittrack::config::Config;
use fittrack::services::{
    MemoryCredentialSlot, PreparedRequest, RawResponse, Transport, TransportError,
};
use fittrack::AppState;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// One scripted reply.
enum Reply {
    Respond(u16, Value),
    /// Wait for the test to release it before answering
    Gated(oneshot::Receiver<()>, u16, Value),
    Fail(TransportError),
}

struct Scripted {
    reply: Reply,
    served: bool,
}

/// Transport that answers from a per-route script and records every request.
///
/// Replies for a route are consumed in order. The last one keeps answering
/// until something new is scripted for the route. Unscripted routes answer
/// 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(String, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<PreparedRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: &str, path: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .entry((method.to_string(), path.to_string()))
            .or_default();
        if queue.len() == 1 && queue.front().is_some_and(|r| r.served) {
            queue.clear();
        }
        queue.push_back(Scripted {
            reply,
            served: false,
        });
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        self.push(method, path, Reply::Respond(status, body));
    }

    /// Reply that is held back until the returned sender fires.
    pub fn respond_gated(
        &self,
        method: &str,
        path: &str,
        status: u16,
        body: Value,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(method, path, Reply::Gated(rx, status, body));
        tx
    }

    pub fn fail(&self, method: &str, path: &str, error: TransportError) {
        self.push(method, path, Reply::Fail(error));
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Number of requests sent to one route.
    pub fn calls(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method.as_str() == method && r.path == path)
            .count()
    }

    pub fn last_request(&self, method: &str, path: &str) -> Option<PreparedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.method.as_str() == method && r.path == path)
            .cloned()
    }

    fn next_reply(&self, method: &str, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&(method.to_string(), path.to_string()))?;
        let gated = matches!(queue.front().map(|s| &s.reply), Some(Reply::Gated(..)));
        if queue.len() > 1 || gated {
            return queue.pop_front().map(|s| s.reply);
        }
        let front = queue.front_mut()?;
        front.served = true;
        match &front.reply {
            Reply::Respond(status, body) => Some(Reply::Respond(*status, body.clone())),
            Reply::Fail(e) => Some(Reply::Fail(e.clone())),
            Reply::Gated(..) => None,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let method = request.method.as_str().to_string();
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        let (status, body) = match self.next_reply(&method, &path) {
            Some(Reply::Respond(status, body)) => (status, body),
            Some(Reply::Gated(gate, status, body)) => {
                let _ = gate.await;
                (status, body)
            }
            Some(Reply::Fail(e)) => return Err(e),
            None => (404, serde_json::json!({"detail": "Not found."})),
        };

        let body = if body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&body).unwrap()
        };
        Ok(RawResponse { status, body })
    }
}

/// Test config: local base URL, no retry backoff.
#[allow(dead_code)]
pub fn test_config() -> Config {
    Config::default()
}

/// App state over a scripted transport with an empty credential slot.
#[allow(dead_code)]
pub fn test_app(transport: Arc<ScriptedTransport>) -> AppState {
    AppState::new(
        test_config(),
        transport,
        Box::new(MemoryCredentialSlot::new()),
    )
}

/// App state over a slot the test keeps a handle to.
#[allow(dead_code)]
pub fn test_app_with_slot(
    transport: Arc<ScriptedTransport>,
    slot: Arc<MemoryCredentialSlot>,
) -> AppState {
    AppState::new(test_config(), transport, Box::new(slot))
}

/// App state whose slot already holds `credential` (a returning user).
#[allow(dead_code)]
pub fn test_app_with_credential(transport: Arc<ScriptedTransport>, credential: &str) -> AppState {
    AppState::new(
        test_config(),
        transport,
        Box::new(MemoryCredentialSlot::with_credential(credential)),
    )
}

#[allow(dead_code)]
pub fn profile_json(id: u64, username: &str) -> Value {
    serde_json::json!({
        "id": id,
        "username": username,
        "name": "Alice Example",
        "email": format!("{}@example.com", username),
        "weight": "61.50",
        "height": 168,
        "gender": "F",
        "profile_picture": null
    })
}

#[allow(dead_code)]
pub fn workout_json(id: u64, workout_type: &str, date: &str, duration: u32, calories: u32) -> Value {
    serde_json::json!({
        "id": id,
        "workout_type": workout_type,
        "date_logged": date,
        "duration": duration,
        "calories": calories,
        "intensity": "moderate",
        "notes": ""
    })
}

#[allow(dead_code)]
pub fn summary_json(total: u64, duration: u64, calories: u64) -> Value {
    serde_json::json!({
        "total_workouts": total,
        "total_duration": duration,
        "total_calories": calories,
        "workouts_this_week": 0,
        "workouts_this_month": 0,
        "recent_workouts": []
    })
}

/// Log in `alice` against a fresh script.
#[allow(dead_code)]
pub async fn logged_in_app(transport: Arc<ScriptedTransport>) -> AppState {
    transport.respond("POST", "auth/login/", 200, serde_json::json!({"key": "tok-alice"}));
    transport.respond("GET", "profiles/me/", 200, profile_json(1, "alice"));

    let app = test_app(transport);
    app.session.initialize().await;
    app.session
        .login(&fittrack::models::Credentials::new("alice", "s3cretpass"))
        .await
        .expect("login should succeed");
    app
}
