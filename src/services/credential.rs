// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable slot holding the session credential.
//!
//! Only the session core writes to a slot. Everything else reads the
//! credential from session state.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{AppError, Result};

/// One key-value slot for the credential string.
pub trait CredentialSlot: Send + Sync {
    /// Read the persisted credential, if any.
    fn load(&self) -> Result<Option<String>>;
    fn store(&self, credential: &str) -> Result<()>;
    /// Remove the credential. Clearing an empty slot is not an error.
    fn clear(&self) -> Result<()>;
}

impl<T: CredentialSlot + ?Sized> CredentialSlot for Arc<T> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn store(&self, credential: &str) -> Result<()> {
        (**self).store(credential)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Credential persisted in a file so it survives restarts.
#[derive(Debug, Clone)]
pub struct FileCredentialSlot {
    path: PathBuf,
}

impl FileCredentialSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialSlot for FileCredentialSlot {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let credential = contents.trim();
                if credential.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(credential.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn store(&self, credential: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(&self.path, credential).map_err(|e| {
            AppError::Storage(format!("failed to write {}: {}", self.path.display(), e))
        })?;
        restrict_permissions(&self.path);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!(error = %e, path = %path.display(), "Failed to restrict credential file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

/// In-memory slot (tests, ephemeral sessions).
#[derive(Debug, Default)]
pub struct MemoryCredentialSlot {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-seeded with a credential, as if persisted by an earlier run.
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(credential.into())),
        }
    }

    /// Current contents, for assertions.
    pub fn peek(&self) -> Option<String> {
        self.value.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl CredentialSlot for MemoryCredentialSlot {
    fn load(&self) -> Result<Option<String>> {
        self.value
            .lock()
            .map(|v| v.clone())
            .map_err(|_| AppError::Storage("credential slot poisoned".to_string()))
    }

    fn store(&self, credential: &str) -> Result<()> {
        let mut value = self
            .value
            .lock()
            .map_err(|_| AppError::Storage("credential slot poisoned".to_string()))?;
        *value = Some(credential.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut value = self
            .value
            .lock()
            .map_err(|_| AppError::Storage("credential slot poisoned".to_string()))?;
        *value = None;
        Ok(())
    }
}
