// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - API adapter and client-side stores.

pub mod credential;
pub mod http;
pub mod session;
pub mod transport;
pub mod workouts;

pub use credential::{CredentialSlot, FileCredentialSlot, MemoryCredentialSlot};
pub use http::{ApiClient, ApiRequest, ApiResponse, AuthMode, CredentialProvider, RequestBody};
pub use session::{SessionState, SessionStatus, SessionStore};
pub use transport::{
    FormPart, MultipartForm, PreparedBody, PreparedRequest, RawResponse, ReqwestTransport,
    Transport, TransportError,
};
pub use workouts::{WorkoutState, WorkoutStore};
