// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types shared by the adapter and the stores.
//!
//! Errors are built once at the HTTP boundary. Stores and the UI match on the
//! variant and never look at transport-specific shapes.

use std::collections::BTreeMap;
use std::fmt;

/// Field-keyed validation messages, e.g. `duration -> ["must be between 1 and 1440"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages recorded for a field (empty if none).
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Turn a non-empty map into an `Err`.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

/// Client error returned by every public store and adapter operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Service temporarily unavailable")]
    Unavailable,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid API payload: {0}")]
    Payload(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Discarded stale result: {0}")]
    Stale(String),
}

impl AppError {
    pub const NETWORK_MESSAGE: &'static str = "Network error. Please check your connection.";
    pub const SERVER_MESSAGE: &'static str = "Server error. Please try again later.";
    pub const UNAUTHORIZED_MESSAGE: &'static str = "Please log in to continue.";
    pub const FORBIDDEN_MESSAGE: &'static str =
        "You do not have permission to perform this action.";
    pub const NOT_FOUND_MESSAGE: &'static str = "The requested resource was not found.";
    pub const UNAVAILABLE_MESSAGE: &'static str =
        "Service is temporarily unavailable. Please try again later.";

    /// True for the 401 family (including rejected logins).
    pub fn is_auth_error(&self) -> bool {
        matches!(self, AppError::Unauthorized(_))
    }

    /// True when the error never left the client.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    /// Field errors, if this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Validation(fields) => Some(fields),
            _ => None,
        }
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(fields) => fields.to_string(),
            AppError::Unauthorized(msg) if !msg.is_empty() => msg.clone(),
            AppError::Unauthorized(_) => Self::UNAUTHORIZED_MESSAGE.to_string(),
            AppError::Unavailable => Self::UNAVAILABLE_MESSAGE.to_string(),
            AppError::Network(_) => Self::NETWORK_MESSAGE.to_string(),
            AppError::Server { status: 403, .. } => Self::FORBIDDEN_MESSAGE.to_string(),
            AppError::Server { status: 404, .. } => Self::NOT_FOUND_MESSAGE.to_string(),
            AppError::Server { status, message } if *status < 500 && !message.is_empty() => {
                message.clone()
            }
            AppError::Server { .. } | AppError::Payload(_) => {
                Self::SERVER_MESSAGE.to_string()
            }
            AppError::Storage(msg) | AppError::Stale(msg) => msg.clone(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, AppError>;
