// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FitTrack: client-side session and workout sync for the fitness API
//!
//! This crate keeps a session (credential and profile) and a local cache of
//! the user's workouts consistent with the remote REST API.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use services::{
    CredentialSlot, FileCredentialSlot, ReqwestTransport, SessionStore, Transport, WorkoutStore,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: SessionStore,
    pub workouts: Arc<WorkoutStore>,
}

impl AppState {
    /// Wire the stores together over one transport and credential slot.
    ///
    /// The workout cache is cleared whenever the session drops its
    /// credential.
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        slot: Box<dyn CredentialSlot>,
    ) -> Self {
        let session = SessionStore::new(&config, transport, slot);
        let workouts = Arc::new(WorkoutStore::new(session.api().clone()));

        let weak = Arc::downgrade(&workouts);
        session.on_sign_out(move || {
            if let Some(workouts) = weak.upgrade() {
                workouts.clear();
            }
        });

        Self {
            config,
            session,
            workouts,
        }
    }

    /// Production wiring: reqwest transport and a file-backed credential.
    pub fn from_config(config: Config) -> Self {
        let slot = FileCredentialSlot::new(config.credential_path.clone());
        Self::new(config, Arc::new(ReqwestTransport::new()), Box::new(slot))
    }
}
