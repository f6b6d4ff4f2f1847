// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wire-level transport seam.
//!
//! [`ApiClient`](crate::services::ApiClient) prepares fully-resolved requests
//! (URL, headers, encoded body) and hands them to a [`Transport`]. The
//! production transport is reqwest. Tests substitute a scripted one.

use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;

/// A request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    /// Endpoint path relative to the API base (e.g. `workouts/3/`)
    pub path: String,
    /// Absolute URL
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: PreparedBody,
    pub timeout: Duration,
}

impl PreparedRequest {
    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Encoded request body.
#[derive(Debug, Clone, Default)]
pub enum PreparedBody {
    #[default]
    Empty,
    /// Serialized JSON bytes
    Json(Vec<u8>),
    /// Multipart form; the transport picks the boundary.
    Multipart(MultipartForm),
}

/// Multipart form kept as plain data so a request can be replayed on retry.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file part.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            bytes,
        });
        self
    }

    /// Add a text part.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            file_name: None,
            content_type: None,
            bytes: value.into().into_bytes(),
        });
        self
    }

    /// Total payload size in bytes.
    pub fn len(&self) -> usize {
        self.parts.iter().map(|p| p.bytes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// A single multipart field.
#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Failure to get any response at all.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Sends prepared requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            PreparedBody::Empty => builder,
            PreparedBody::Json(bytes) => builder.body(bytes),
            PreparedBody::Multipart(form) => builder.multipart(build_form(form)?),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

        Ok(RawResponse { status, body })
    }
}

fn build_form(form: MultipartForm) -> Result<reqwest::multipart::Form, TransportError> {
    let mut out = reqwest::multipart::Form::new();
    for part in form.parts {
        let mut body = reqwest::multipart::Part::bytes(part.bytes);
        if let Some(file_name) = part.file_name {
            body = body.file_name(file_name);
        }
        if let Some(content_type) = part.content_type {
            body = body
                .mime_str(&content_type)
                .map_err(|e| TransportError::Request(format!("invalid content type: {}", e)))?;
        }
        out = out.part(part.name, body);
    }
    Ok(out)
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
