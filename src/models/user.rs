//! User profile, login and registration models.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use validator::Validate;

use crate::error::FieldErrors;

/// Authenticated user's profile as returned by `profiles/me/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    /// Display name
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    /// Body weight in kilograms
    #[serde(
        rename = "weight",
        default,
        deserialize_with = "deserialize_decimal"
    )]
    pub weight_kg: Option<f64>,
    /// Height in centimeters
    #[serde(
        rename = "height",
        default,
        deserialize_with = "deserialize_decimal"
    )]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub fitness_goals: Option<String>,
    /// Profile picture URL
    #[serde(rename = "profile_picture", default)]
    pub avatar_url: Option<String>,
}

/// Gender choice codes used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
    #[serde(other)]
    Unspecified,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::Unspecified => "Unspecified",
        })
    }
}

/// Decimal fields come back either as JSON numbers or as strings ("72.50").
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid decimal: {s:?}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected decimal, got {other}"
        ))),
    }
}

/// Partial profile update. Only the fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct ProfilePatch {
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 150, message = "Name is too long"))]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: Option<String>,
    #[serde(rename = "weight", skip_serializing_if = "Option::is_none")]
    #[validate(range(
        exclusive_min = 0.0,
        max = 500.0,
        message = "Weight must be between 0 and 500 kg"
    ))]
    pub weight_kg: Option<f64>,
    #[serde(rename = "height", skip_serializing_if = "Option::is_none")]
    #[validate(range(
        exclusive_min = 0.0,
        max = 300.0,
        message = "Height must be between 0 and 300 cm"
    ))]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Fitness goals are too long"))]
    pub fitness_goals: Option<String>,
}

/// Username/password pair for `auth/login/`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields must be non-blank before the login call.
    pub fn check(&self) -> crate::error::Result<()> {
        let mut errors = FieldErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", "Username is required");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login response body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub key: String,
}

/// New account request for `auth/register/`.
///
/// The confirmation is checked locally and never sent.
#[derive(Clone, Default, Serialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub password_confirm: String,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Largest avatar the API accepts (5 MiB).
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Image selected for the profile picture.
#[derive(Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, inferring the content type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_string());
        Ok(Self::new(file_name, content_type, bytes))
    }

    /// Image type and size checks, run before any upload.
    pub fn check(&self) -> crate::error::Result<()> {
        let mut errors = FieldErrors::new();
        if !self.content_type.trim().starts_with("image/") {
            errors.add("profile_picture", "Please select an image file");
        }
        if self.bytes.len() > MAX_AVATAR_BYTES {
            errors.add("profile_picture", "File size should be less than 5MB");
        }
        errors.into_result()
    }
}

impl fmt::Debug for AvatarUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
