// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: credential, profile and the login state machine.
//!
//! State lives in a `watch` channel. Each login or logout starts a new
//! generation. A completion only lands if its generation is still current,
//! so the most recently started operation wins.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AvatarUpload, Credentials, ProfilePatch, Registration, UserProfile};
use crate::services::credential::CredentialSlot;
use crate::services::http::{ApiClient, CredentialProvider};
use crate::services::transport::Transport;

/// Snapshot of the session.
#[derive(Clone)]
pub struct SessionState {
    pub credential: Option<String>,
    pub profile: Option<UserProfile>,
    pub is_loading: bool,
    pub is_initialized: bool,
    pub last_error: Option<AppError>,
    generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            credential: None,
            profile: None,
            is_loading: true,
            is_initialized: false,
            last_error: None,
            generation: 0,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        if !self.is_initialized {
            SessionStatus::Uninitialized
        } else if self.is_loading {
            SessionStatus::Loading
        } else if self.credential.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }

    fn sign_out(&mut self) {
        self.credential = None;
        self.profile = None;
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("profile", &self.profile)
            .field("is_loading", &self.is_loading)
            .field("is_initialized", &self.is_initialized)
            .field("last_error", &self.last_error)
            .field("generation", &self.generation)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

type SignOutHook = Box<dyn Fn() + Send + Sync>;

/// Sole writer of the credential slot and the session state.
struct SessionCore {
    slot: Box<dyn CredentialSlot>,
    state: watch::Sender<SessionState>,
    sign_out_hooks: Mutex<Vec<SignOutHook>>,
}

impl SessionCore {
    fn new(slot: Box<dyn CredentialSlot>) -> Self {
        let mut initial = SessionState::default();
        match slot.load() {
            Ok(credential) => initial.credential = credential,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load persisted credential");
                initial.last_error = Some(e);
            }
        }
        let (state, _) = watch::channel(initial);
        Self {
            slot,
            state,
            sign_out_hooks: Mutex::new(Vec::new()),
        }
    }

    /// Start a login: new generation, loading on.
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            s.is_loading = true;
            s.last_error = None;
            generation = s.generation;
        });
        generation
    }

    /// Record a failed operation. Superseded failures come back as `Stale`.
    fn fail(&self, generation: u64, error: AppError) -> AppError {
        let current = self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            s.is_loading = false;
            s.last_error = Some(error.clone());
            true
        });
        if current {
            error
        } else {
            tracing::warn!(error = %error, "Discarding failure of superseded session operation");
            AppError::Stale("session changed while the request was in flight".to_string())
        }
    }

    /// Persist and publish a fresh login in one step.
    ///
    /// Replacing a different credential counts as a sign-out of the old one.
    fn commit_login(
        &self,
        generation: u64,
        token: String,
        profile: Option<UserProfile>,
        hydration_error: Option<AppError>,
    ) -> Result<Option<UserProfile>> {
        let mut outcome = Err(AppError::Stale(
            "a newer login or logout superseded this one".to_string(),
        ));
        let mut replaced = false;
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            s.is_loading = false;
            match self.slot.store(&token) {
                Ok(()) => {
                    replaced = s.credential.as_ref().is_some_and(|old| *old != token);
                    s.credential = Some(token.clone());
                    s.profile = profile.clone();
                    s.last_error = hydration_error.clone();
                    outcome = Ok(profile.clone());
                }
                Err(e) => {
                    s.last_error = Some(e.clone());
                    outcome = Err(e);
                }
            }
            true
        });
        if replaced {
            tracing::info!("Previous session replaced by a new login");
            self.run_sign_out_hooks();
        }
        outcome
    }

    /// Drop the credential locally; returns the credential that was held.
    fn sign_out(&self) -> Option<String> {
        let mut previous = None;
        self.state.send_modify(|s| {
            if let Err(e) = self.slot.clear() {
                tracing::warn!(error = %e, "Failed to clear persisted credential");
            }
            previous = s.credential.take();
            s.sign_out();
            s.generation += 1;
            s.is_loading = false;
            s.last_error = None;
        });
        self.run_sign_out_hooks();
        previous
    }

    fn run_sign_out_hooks(&self) {
        if let Ok(hooks) = self.sign_out_hooks.lock() {
            for hook in hooks.iter() {
                hook();
            }
        }
    }
}

impl CredentialProvider for SessionCore {
    fn current_credential(&self) -> Option<String> {
        self.state.borrow().credential.clone()
    }

    fn revoke(&self, rejected: &str) {
        let revoked = self.state.send_if_modified(|s| {
            if s.credential.as_deref() != Some(rejected) {
                return false;
            }
            if let Err(e) = self.slot.clear() {
                tracing::warn!(error = %e, "Failed to clear persisted credential");
            }
            s.sign_out();
            s.last_error = Some(AppError::Unauthorized(
                AppError::UNAUTHORIZED_MESSAGE.to_string(),
            ));
            true
        });

        if revoked {
            tracing::info!("Session credential revoked, now anonymous");
            self.run_sign_out_hooks();
        } else {
            tracing::debug!("Ignoring 401 for a credential that is no longer current");
        }
    }
}

/// Authentication state machine exposed to the UI layer.
pub struct SessionStore {
    api: ApiClient,
    core: Arc<SessionCore>,
    initialized: AtomicBool,
}

impl SessionStore {
    /// Build the store and its API client, loading any persisted credential.
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        slot: Box<dyn CredentialSlot>,
    ) -> Self {
        let core = Arc::new(SessionCore::new(slot));
        let api = ApiClient::new(config, transport, core.clone());
        Self {
            api,
            core,
            initialized: AtomicBool::new(false),
        }
    }

    /// API client whose requests carry this session's credential.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn snapshot(&self) -> SessionState {
        self.core.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.core.state.subscribe()
    }

    /// Run `hook` every time the session drops its credential or a login
    /// replaces it with a different one.
    pub fn on_sign_out(&self, hook: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut hooks) = self.core.sign_out_hooks.lock() {
            hooks.push(Box::new(hook));
        }
    }

    /// Hydrate the persisted session. Only the first call does anything.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        if self.core.current_credential().is_some() {
            if let Err(e) = self.refresh_profile().await {
                tracing::warn!(error = %e, "Profile refresh during initialization failed");
            }
        }

        self.core.state.send_modify(|s| {
            s.is_initialized = true;
            s.is_loading = false;
        });

        let state = self.snapshot();
        tracing::info!(status = ?state.status(), "Session initialized");
    }

    /// Log in and hydrate the profile.
    ///
    /// Returns `Ok(None)` when the login succeeded but the profile could not
    /// be loaded; the error is left in `last_error`.
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<UserProfile>> {
        credentials.check()?;

        let generation = self.core.begin();
        tracing::info!(username = %credentials.username, "Logging in");

        let token = match self.api.login(credentials).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(username = %credentials.username, error = %e, "Login failed");
                return Err(self.core.fail(generation, e));
            }
        };

        match self.api.get_profile_with(&token).await {
            Ok(profile) => {
                let result = self
                    .core
                    .commit_login(generation, token, Some(profile), None);
                if result.is_ok() {
                    tracing::info!(username = %credentials.username, "Logged in");
                }
                result
            }
            Err(e) if e.is_auth_error() => {
                tracing::warn!(error = %e, "New credential rejected during profile hydration");
                Err(self.core.fail(generation, e))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Logged in but profile hydration failed");
                self.core.commit_login(generation, token, None, Some(e))
            }
        }
    }

    /// Drop the session locally, then tell the server. Never fails.
    pub async fn logout(&self) {
        let previous = self.core.sign_out();
        tracing::info!("Logged out");

        if let Some(token) = previous {
            if let Err(e) = self.api.logout(&token).await {
                tracing::warn!(error = %e, "Remote logout failed, local session already cleared");
            }
        }
    }

    /// Re-fetch the profile. A 401 drops the session.
    pub async fn refresh_profile(&self) -> Result<UserProfile> {
        let (generation, credential) = {
            let state = self.core.state.borrow();
            (state.generation, state.credential.clone())
        };
        if credential.is_none() {
            return Err(AppError::Unauthorized(
                AppError::UNAUTHORIZED_MESSAGE.to_string(),
            ));
        }

        match self.api.get_profile().await {
            Ok(profile) => {
                self.apply_profile(generation, credential.as_deref(), profile.clone())?;
                Ok(profile)
            }
            Err(e) => {
                self.record_error(generation, &e);
                Err(e)
            }
        }
    }

    /// Validate and send a partial profile update.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile> {
        patch.validate()?;
        let (generation, credential) = self.require_credential()?;

        match self.api.update_profile(patch).await {
            Ok(profile) => {
                self.apply_profile(generation, Some(&credential), profile.clone())?;
                tracing::info!("Profile updated");
                Ok(profile)
            }
            Err(e) => {
                self.record_error(generation, &e);
                Err(e)
            }
        }
    }

    /// Upload a new avatar, then reload the profile.
    pub async fn update_avatar(&self, upload: &AvatarUpload) -> Result<UserProfile> {
        upload.check()?;
        let (generation, _) = self.require_credential()?;

        if let Err(e) = self.api.upload_avatar(upload).await {
            self.record_error(generation, &e);
            return Err(e);
        }
        tracing::info!(file_name = %upload.file_name, bytes = upload.bytes.len(), "Avatar uploaded");

        self.refresh_profile().await
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        registration.validate()?;
        self.api.register(registration).await?;
        tracing::info!(username = %registration.username, "Account registered");
        Ok(())
    }

    fn require_credential(&self) -> Result<(u64, String)> {
        let state = self.core.state.borrow();
        match &state.credential {
            Some(credential) => Ok((state.generation, credential.clone())),
            None => Err(AppError::Unauthorized(
                AppError::UNAUTHORIZED_MESSAGE.to_string(),
            )),
        }
    }

    /// Replace the profile if the session hasn't moved on.
    fn apply_profile(
        &self,
        generation: u64,
        credential: Option<&str>,
        profile: UserProfile,
    ) -> Result<()> {
        let applied = self.core.state.send_if_modified(|s| {
            if s.generation != generation || s.credential.as_deref() != credential {
                return false;
            }
            s.profile = Some(profile);
            s.last_error = None;
            true
        });
        if applied {
            Ok(())
        } else {
            tracing::warn!("Discarding profile response for a superseded session");
            Err(AppError::Stale(
                "session changed while the profile request was in flight".to_string(),
            ))
        }
    }

    fn record_error(&self, generation: u64, error: &AppError) {
        self.core.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            s.last_error = Some(error.clone());
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SessionState::default();
        assert!(state.is_loading);
        assert!(!state.is_initialized);
        assert_eq!(state.status(), SessionStatus::Uninitialized);
    }

    #[test]
    fn test_status_transitions() {
        let mut state = SessionState {
            is_initialized: true,
            is_loading: false,
            ..Default::default()
        };
        assert_eq!(state.status(), SessionStatus::Anonymous);

        state.credential = Some("tok".to_string());
        assert_eq!(state.status(), SessionStatus::Authenticated);

        state.is_loading = true;
        assert_eq!(state.status(), SessionStatus::Loading);
    }

    #[test]
    fn test_debug_redacts_credential() {
        let state = SessionState {
            credential: Some("super-secret-token".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", state);
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}
