// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models exchanged with the fitness API.

pub mod summary;
pub mod user;
pub mod workout;

pub use summary::WorkoutSummary;
pub use user::{
    AvatarUpload, Credentials, Gender, LoginResponse, ProfilePatch, Registration, UserProfile,
};
pub use workout::{Intensity, WorkoutDraft, WorkoutId, WorkoutRecord, WorkoutType};
