// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout record model and the draft used to create or edit one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::Result;

/// Server-assigned workout identifier.
pub type WorkoutId = u64;

/// Stored workout as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: WorkoutId,
    pub workout_type: WorkoutType,
    /// Day the workout was performed
    #[serde(rename = "date_logged")]
    pub logged_date: NaiveDate,
    /// Duration in minutes (1..=1440)
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    /// Calories burned
    pub calories: u32,
    pub intensity: Intensity,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WorkoutRecord {
    /// True if every field the draft sets matches this record.
    pub fn matches_draft(&self, draft: &WorkoutDraft) -> bool {
        draft.workout_type == Some(self.workout_type)
            && draft.logged_date == Some(self.logged_date)
            && draft.duration_minutes == Some(i64::from(self.duration_minutes))
            && draft.calories == Some(i64::from(self.calories))
            && draft.intensity == Some(self.intensity)
            && draft.notes.as_deref().unwrap_or_default()
                == self.notes.as_deref().unwrap_or_default()
    }
}

/// Kind of workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    Cardio,
    Strength,
    Flexibility,
    Sports,
    Other,
}

impl WorkoutType {
    pub const ALL: [WorkoutType; 5] = [
        WorkoutType::Cardio,
        WorkoutType::Strength,
        WorkoutType::Flexibility,
        WorkoutType::Sports,
        WorkoutType::Other,
    ];

    /// Wire value, e.g. `"cardio"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutType::Cardio => "cardio",
            WorkoutType::Strength => "strength",
            WorkoutType::Flexibility => "flexibility",
            WorkoutType::Sports => "sports",
            WorkoutType::Other => "other",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            WorkoutType::Cardio => "Cardio",
            WorkoutType::Strength => "Strength Training",
            WorkoutType::Flexibility => "Flexibility",
            WorkoutType::Sports => "Sports",
            WorkoutType::Other => "Other",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WorkoutType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        WorkoutType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown workout type: {s}"))
    }
}

/// Workout intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

impl Intensity {
    pub const ALL: [Intensity; 3] = [Intensity::Low, Intensity::Moderate, Intensity::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Moderate => "moderate",
            Intensity::High => "high",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intensity::Low => "Low",
            Intensity::Moderate => "Moderate",
            Intensity::High => "High",
        })
    }
}

impl FromStr for Intensity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Intensity::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown intensity: {s}"))
    }
}

/// Workout form input for create and update.
///
/// Required fields are optional here so that missing input is reported as a
/// field error instead of being impossible to express.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Validate)]
pub struct WorkoutDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Workout type is required"))]
    pub workout_type: Option<WorkoutType>,
    #[serde(rename = "date_logged", skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Date is required"))]
    pub logged_date: Option<NaiveDate>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    #[validate(
        required(message = "Duration is required"),
        range(min = 1, max = 1440, message = "Duration must be between 1 and 1440 minutes")
    )]
    pub duration_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        required(message = "Calories is required"),
        range(min = 0, message = "Calories cannot be negative")
    )]
    pub calories: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(required(message = "Intensity is required"))]
    pub intensity: Option<Intensity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000, message = "Notes are too long"))]
    pub notes: Option<String>,
}

impl WorkoutDraft {
    /// Draft pre-filled from an existing record (the edit form).
    pub fn from_record(record: &WorkoutRecord) -> Self {
        Self {
            workout_type: Some(record.workout_type),
            logged_date: Some(record.logged_date),
            duration_minutes: Some(i64::from(record.duration_minutes)),
            calories: Some(i64::from(record.calories)),
            intensity: Some(record.intensity),
            notes: record.notes.clone(),
        }
    }

    /// Run the local checks, returning the field-keyed errors on failure.
    pub fn check(&self) -> Result<()> {
        Ok(self.validate()?)
    }
}
