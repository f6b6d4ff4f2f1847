// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitness API client: the single choke point for outbound calls.
//!
//! Handles:
//! - Credential attachment (`Authorization: Token <key>`)
//! - One retry after a backoff on 503
//! - Revoking the session credential on 401
//! - Error and response-shape normalization

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    AvatarUpload, Credentials, LoginResponse, ProfilePatch, Registration, UserProfile,
    WorkoutDraft, WorkoutId, WorkoutRecord, WorkoutSummary,
};
use crate::services::transport::{
    MultipartForm, PreparedBody, PreparedRequest, RawResponse, Transport,
};

/// Source of the session credential, notified when the server rejects it.
pub trait CredentialProvider: Send + Sync {
    fn current_credential(&self) -> Option<String>;

    /// The server answered 401 to a request made with `rejected`.
    fn revoke(&self, rejected: &str);
}

/// Which credential a request carries.
#[derive(Clone, Default)]
pub enum AuthMode {
    /// Whatever the session currently holds
    #[default]
    Session,
    /// An explicit token not yet committed to the session
    Token(String),
    Anonymous,
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Session => f.write_str("Session"),
            AuthMode::Token(_) => f.write_str("Token(<redacted>)"),
            AuthMode::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Request body before encoding.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// Outbound call description.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    /// Overrides the configured request timeout
    pub timeout: Option<Duration>,
    pub auth: AuthMode,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            timeout: None,
            auth: AuthMode::Session,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| AppError::Payload(format!("failed to encode request: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMode::Token(token.into());
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }
}

/// Successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AppError::Payload(format!("JSON parse error: {}", e)))
    }

    /// Decode the body as untyped JSON; an empty body is `null`.
    pub fn value(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        self.json()
    }
}

/// Fitness API client.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    config: Config,
}

impl ApiClient {
    pub const LOGIN_PATH: &'static str = "auth/login/";
    pub const REGISTER_PATH: &'static str = "auth/register/";
    pub const LOGOUT_PATH: &'static str = "auth/logout/";
    pub const PROFILE_PATH: &'static str = "profiles/me/";
    pub const WORKOUTS_PATH: &'static str = "workouts/";
    pub const SUMMARY_PATH: &'static str = "workouts/summary/";

    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            transport,
            credentials,
            config: config.clone(),
        }
    }

    pub fn workout_path(id: WorkoutId) -> String {
        format!("{}{}/", Self::WORKOUTS_PATH, id)
    }

    /// Send a request, applying the auth, retry and error policies.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let credential = match &request.auth {
            AuthMode::Session => self.credentials.current_credential(),
            AuthMode::Token(token) => Some(token.clone()),
            AuthMode::Anonymous => None,
        };
        let prepared = self.prepare(&request, credential.as_deref())?;
        let mut retried = false;

        loop {
            tracing::debug!(
                method = %prepared.method,
                path = %prepared.path,
                retried,
                "Sending API request"
            );

            let response = self
                .transport
                .execute(prepared.clone())
                .await
                .map_err(|e| {
                    tracing::warn!(
                        method = %prepared.method,
                        path = %prepared.path,
                        error = %e,
                        "API request failed without a response"
                    );
                    AppError::Network(e.to_string())
                })?;

            match response.status {
                200..=299 => {
                    return Ok(ApiResponse {
                        status: response.status,
                        body: response.body,
                    })
                }
                401 => {
                    if let (AuthMode::Session, Some(rejected)) = (&request.auth, &credential) {
                        tracing::warn!(path = %prepared.path, "Credential rejected (401)");
                        self.credentials.revoke(rejected);
                    }
                    let message = error_message(&response.body)
                        .unwrap_or_else(|| "Invalid or expired credential".to_string());
                    return Err(AppError::Unauthorized(message));
                }
                503 if !retried => {
                    tracing::warn!(
                        method = %prepared.method,
                        path = %prepared.path,
                        backoff_ms = self.config.retry_backoff.as_millis() as u64,
                        "Service unavailable (503), retrying once"
                    );
                    retried = true;
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                503 => {
                    tracing::warn!(path = %prepared.path, "Service still unavailable after retry");
                    return Err(AppError::Unavailable);
                }
                _ => return Err(server_error(&response)),
            }
        }
    }

    fn prepare(&self, request: &ApiRequest, credential: Option<&str>) -> Result<PreparedRequest> {
        let path = request.path.trim_start_matches('/').to_string();
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];

        if let Some(credential) = credential {
            headers.push((
                "Authorization".to_string(),
                format!("{} {}", self.config.auth_scheme, credential),
            ));
        }

        let body = match &request.body {
            RequestBody::Empty => PreparedBody::Empty,
            RequestBody::Json(value) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                let bytes = serde_json::to_vec(value)
                    .map_err(|e| AppError::Payload(format!("failed to encode request: {}", e)))?;
                PreparedBody::Json(bytes)
            }
            // No Content-Type here: the transport adds the multipart boundary.
            RequestBody::Multipart(form) => PreparedBody::Multipart(form.clone()),
        };

        Ok(PreparedRequest {
            method: request.method.clone(),
            url: self.config.endpoint(&path),
            path,
            headers,
            body,
            timeout: request.timeout.unwrap_or(self.config.request_timeout),
        })
    }

    // ─── Auth ────────────────────────────────────────────────────────────────

    /// Exchange username/password for a credential.
    ///
    /// The backend answers 400 for bad credentials; both 400 and 401 come
    /// back as `Unauthorized`.
    pub async fn login(&self, credentials: &Credentials) -> Result<String> {
        let request = ApiRequest::post(Self::LOGIN_PATH)
            .anonymous()
            .json(credentials)?;

        let response = self.send(request).await.map_err(|e| match e {
            AppError::Server {
                status: 400,
                message,
            } => AppError::Unauthorized(message),
            other => other,
        })?;

        let login: LoginResponse = response.json()?;
        if login.key.trim().is_empty() {
            return Err(AppError::Payload("login response has empty key".to_string()));
        }
        Ok(login.key)
    }

    pub async fn register(&self, registration: &Registration) -> Result<()> {
        let request = ApiRequest::post(Self::REGISTER_PATH)
            .anonymous()
            .json(registration)?;
        self.send(request).await?;
        Ok(())
    }

    /// Invalidate a credential server-side.
    ///
    /// Takes the token explicitly since the session has usually dropped it
    /// by the time this runs.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.send(ApiRequest::post(Self::LOGOUT_PATH).with_token(token))
            .await?;
        Ok(())
    }

    // ─── Profile ─────────────────────────────────────────────────────────────

    pub async fn get_profile(&self) -> Result<UserProfile> {
        self.get_json(ApiRequest::get(Self::PROFILE_PATH)).await
    }

    /// Fetch the profile with a token that is not yet the session credential.
    pub async fn get_profile_with(&self, token: &str) -> Result<UserProfile> {
        self.get_json(ApiRequest::get(Self::PROFILE_PATH).with_token(token)).await
    }

    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile> {
        let request = ApiRequest::patch(Self::PROFILE_PATH).json(patch)?;
        self.get_json(request).await
    }

    /// Upload a new profile picture as multipart form data.
    pub async fn upload_avatar(&self, upload: &AvatarUpload) -> Result<()> {
        let form = MultipartForm::new().file(
            "profile_picture",
            upload.file_name.clone(),
            upload.content_type.clone(),
            upload.bytes.clone(),
        );
        let request = ApiRequest::patch(Self::PROFILE_PATH)
            .multipart(form)
            .timeout(self.config.upload_timeout);
        self.send(request).await?;
        Ok(())
    }

    // ─── Workouts ────────────────────────────────────────────────────────────

    /// List workouts, accepting either a bare array or `{results: [...]}`.
    pub async fn list_workouts(&self) -> Result<Vec<WorkoutRecord>> {
        let response = self.send(ApiRequest::get(Self::WORKOUTS_PATH)).await?;
        normalize_workout_list(response.value()?)
    }

    pub async fn get_workout(&self, id: WorkoutId) -> Result<WorkoutRecord> {
        self.get_json(ApiRequest::get(Self::workout_path(id))).await
    }

    pub async fn create_workout(&self, draft: &WorkoutDraft) -> Result<WorkoutRecord> {
        let request = ApiRequest::post(Self::WORKOUTS_PATH).json(draft)?;
        self.get_json(request).await
    }

    pub async fn update_workout(
        &self,
        id: WorkoutId,
        draft: &WorkoutDraft,
    ) -> Result<WorkoutRecord> {
        let request = ApiRequest::patch(Self::workout_path(id)).json(draft)?;
        self.get_json(request).await
    }

    pub async fn delete_workout(&self, id: WorkoutId) -> Result<()> {
        self.send(ApiRequest::delete(Self::workout_path(id))).await?;
        Ok(())
    }

    pub async fn get_summary(&self) -> Result<WorkoutSummary> {
        self.get_json(ApiRequest::get(Self::SUMMARY_PATH)).await
    }

    /// Send and decode the JSON response.
    async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send(request).await?.json()
    }
}

/// Reduce the list endpoint's payload to one canonical shape.
///
/// Anything that is neither an array nor `{results: [...]}` becomes an empty
/// list.
pub fn normalize_workout_list(payload: Value) -> Result<Vec<WorkoutRecord>> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                tracing::warn!("Workout list payload has no results array, treating as empty");
                Vec::new()
            }
        },
        other => {
            tracing::warn!(kind = %json_kind(&other), "Workout list payload is not a list, treating as empty");
            Vec::new()
        }
    };

    items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<WorkoutRecord>, _>>()
        .map_err(|e| AppError::Payload(format!("invalid workout record: {}", e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn server_error(response: &RawResponse) -> AppError {
    let message = error_message(&response.body).unwrap_or_else(|| {
        reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown error")
            .to_string()
    });
    tracing::debug!(status = response.status, message = %message, "API error response");
    AppError::Server {
        status: response.status,
        message,
    }
}

/// Pull a human-readable message out of an error body.
///
/// Checks `detail`, `message`, `non_field_errors`, then the first field
/// error of any other key.
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Object(map) => {
            for key in ["detail", "message", "non_field_errors"] {
                if let Some(message) = map.get(key).and_then(first_text) {
                    return Some(message);
                }
            }
            map.values().find_map(first_text)
        }
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}
