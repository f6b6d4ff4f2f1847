// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitTrack command-line client
//!
//! Logs in to the fitness API and manages the user's workouts from the
//! terminal. The session survives restarts through the credential file.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use fittrack::{
    config::Config,
    error::AppError,
    middleware::{require_auth, GateDecision},
    models::{
        AvatarUpload, Credentials, Gender, Intensity, ProfilePatch, Registration, UserProfile,
        WorkoutDraft, WorkoutId, WorkoutRecord, WorkoutSummary, WorkoutType,
    },
    time_utils, AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// FitTrack CLI.
#[derive(Parser)]
#[command(name = "fittrack", version, about = "Track workouts against the FitTrack API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session.
    Login {
        #[arg(long, env = "FITTRACK_USERNAME")]
        username: String,
        #[arg(long, env = "FITTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the session.
    Logout,

    /// Show the logged-in user's profile.
    Whoami,

    /// Create an account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "FITTRACK_PASSWORD", hide_env_values = true)]
        password: String,
        /// Repeat the password
        #[arg(long)]
        password_confirm: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Edit the profile.
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Manage workouts.
    #[command(subcommand)]
    Workouts(WorkoutCommand),

    /// Show dashboard totals.
    Summary,
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Update profile fields.
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,
        /// Height in cm
        #[arg(long)]
        height: Option<f64>,
        #[arg(long)]
        date_of_birth: Option<NaiveDate>,
        /// M, F or O
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        goals: Option<String>,
    },

    /// Upload a new profile picture.
    Avatar { path: PathBuf },
}

#[derive(Subcommand)]
enum WorkoutCommand {
    /// List all workouts.
    List,

    /// Show one workout.
    Show { id: WorkoutId },

    /// Log a new workout.
    Add(WorkoutFields),

    /// Change an existing workout. Unset fields keep their current value.
    Edit {
        id: WorkoutId,
        #[command(flatten)]
        fields: WorkoutFields,
    },

    /// Delete a workout.
    Delete { id: WorkoutId },
}

#[derive(Args)]
struct WorkoutFields {
    /// cardio, strength, flexibility, sports or other
    #[arg(long = "type")]
    workout_type: Option<WorkoutType>,
    /// YYYY-MM-DD (defaults to today when adding)
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Minutes
    #[arg(long, allow_negative_numbers = true)]
    duration: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    calories: Option<i64>,
    /// low, moderate or high
    #[arg(long)]
    intensity: Option<Intensity>,
    #[arg(long)]
    notes: Option<String>,
}

impl WorkoutFields {
    /// Overlay the given fields onto `base`.
    fn apply_to(self, mut base: WorkoutDraft) -> WorkoutDraft {
        if self.workout_type.is_some() {
            base.workout_type = self.workout_type;
        }
        if self.date.is_some() {
            base.logged_date = self.date;
        }
        if self.duration.is_some() {
            base.duration_minutes = self.duration;
        }
        if self.calories.is_some() {
            base.calories = self.calories;
        }
        if self.intensity.is_some() {
            base.intensity = self.intensity;
        }
        if self.notes.is_some() {
            base.notes = self.notes;
        }
        base
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(api_url = %config.api_url, "Configuration loaded");

    let state = AppState::from_config(config);
    state.session.initialize().await;

    match cli.command {
        Commands::Login { username, password } => {
            let credentials = Credentials::new(username, password);
            match state.session.login(&credentials).await.map_err(user_facing)? {
                Some(profile) => println!("Logged in as {}", profile.username),
                None => println!(
                    "Logged in as {}, but the profile could not be loaded",
                    credentials.username
                ),
            }
        }
        Commands::Logout => {
            state.session.logout().await;
            println!("Logged out");
        }
        Commands::Whoami => {
            ensure_logged_in(&state, "/profile")?;
            let profile = state.session.refresh_profile().await.map_err(user_facing)?;
            print_profile(&profile);
        }
        Commands::Register {
            username,
            email,
            password,
            password_confirm,
            name,
        } => {
            let registration = Registration {
                username,
                email,
                password,
                password_confirm,
                name,
            };
            state
                .session
                .register(&registration)
                .await
                .map_err(user_facing)?;
            println!("Account created. Run `fittrack login` to sign in.");
        }
        Commands::Profile(command) => {
            ensure_logged_in(&state, "/profile")?;
            run_profile(&state, command).await?;
        }
        Commands::Workouts(command) => {
            ensure_logged_in(&state, "/workouts")?;
            run_workouts(&state, command).await?;
        }
        Commands::Summary => {
            ensure_logged_in(&state, "/dashboard")?;
            let summary = state
                .workouts
                .fetch_summary()
                .await
                .map_err(user_facing)?;
            print_summary(&summary);
        }
    }

    Ok(())
}

async fn run_profile(state: &AppState, command: ProfileCommand) -> anyhow::Result<()> {
    let profile = match command {
        ProfileCommand::Set {
            name,
            email,
            weight,
            height,
            date_of_birth,
            gender,
            goals,
        } => {
            let gender = gender.map(|g| parse_gender(&g)).transpose()?;
            let patch = ProfilePatch {
                display_name: name,
                email,
                weight_kg: weight,
                height_cm: height,
                date_of_birth,
                gender,
                fitness_goals: goals,
            };
            state
                .session
                .update_profile(&patch)
                .await
                .map_err(user_facing)?
        }
        ProfileCommand::Avatar { path } => {
            let upload = AvatarUpload::from_path(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            state
                .session
                .update_avatar(&upload)
                .await
                .map_err(user_facing)?
        }
    };
    print_profile(&profile);
    Ok(())
}

async fn run_workouts(state: &AppState, command: WorkoutCommand) -> anyhow::Result<()> {
    let workouts = &state.workouts;

    match command {
        WorkoutCommand::List => {
            let records = workouts.fetch_all().await.map_err(user_facing)?;
            if records.is_empty() {
                println!("No workouts logged yet");
            }
            for record in &records {
                print_record_line(record);
            }
            if let Some(synced) = workouts.snapshot().last_synced_at {
                println!("(synced {})", time_utils::format_utc_rfc3339(synced));
            }
        }
        WorkoutCommand::Show { id } => {
            let record = workouts.fetch_one(id).await.map_err(user_facing)?;
            print_record_line(&record);
            if let Some(notes) = record.notes.as_deref().filter(|n| !n.is_empty()) {
                println!("    {}", notes);
            }
        }
        WorkoutCommand::Add(fields) => {
            let base = WorkoutDraft {
                logged_date: Some(time_utils::today()),
                ..Default::default()
            };
            let draft = fields.apply_to(base);
            let record = workouts.create(&draft).await.map_err(user_facing)?;
            println!("Created workout {}", record.id);
        }
        WorkoutCommand::Edit { id, fields } => {
            let current = workouts.fetch_one(id).await.map_err(user_facing)?;
            let draft = fields.apply_to(WorkoutDraft::from_record(&current));
            let record = workouts.update(id, &draft).await.map_err(user_facing)?;
            print_record_line(&record);
        }
        WorkoutCommand::Delete { id } => {
            workouts.remove(id).await.map_err(user_facing)?;
            println!("Deleted workout {}", id);
        }
    }

    Ok(())
}

fn ensure_logged_in(state: &AppState, location: &str) -> anyhow::Result<()> {
    match require_auth(&state.session.snapshot(), location) {
        GateDecision::RenderProtected => Ok(()),
        GateDecision::RenderLoading => anyhow::bail!("Session is still loading"),
        decision @ GateDecision::RedirectToLogin { .. } => {
            tracing::debug!(redirect = ?decision.redirect_path(), "Not logged in");
            anyhow::bail!("Not logged in. Run `fittrack login` first.")
        }
    }
}

fn user_facing(error: AppError) -> anyhow::Error {
    tracing::debug!(error = ?error, "Command failed");
    anyhow::anyhow!(error.user_message())
}

fn parse_gender(value: &str) -> anyhow::Result<Gender> {
    match value.trim().to_ascii_uppercase().as_str() {
        "M" => Ok(Gender::Male),
        "F" => Ok(Gender::Female),
        "O" => Ok(Gender::Other),
        other => anyhow::bail!("Unknown gender code {:?} (expected M, F or O)", other),
    }
}

fn print_profile(profile: &UserProfile) {
    println!("{} (#{})", profile.username, profile.id);
    if !profile.display_name.is_empty() {
        println!("  Name:   {}", profile.display_name);
    }
    if !profile.email.is_empty() {
        println!("  Email:  {}", profile.email);
    }
    if let Some(weight) = profile.weight_kg {
        println!("  Weight: {:.1} kg", weight);
    }
    if let Some(height) = profile.height_cm {
        println!("  Height: {:.1} cm", height);
    }
    if let Some(gender) = profile.gender {
        println!("  Gender: {}", gender);
    }
    if let Some(goals) = profile.fitness_goals.as_deref().filter(|g| !g.is_empty()) {
        println!("  Goals:  {}", goals);
    }
}

fn print_record_line(record: &WorkoutRecord) {
    println!(
        "#{:<5} {}  {:<18} {:>8}  {:>5} kcal  {}",
        record.id,
        record.logged_date,
        record.workout_type.label(),
        time_utils::format_duration_minutes(u64::from(record.duration_minutes)),
        record.calories,
        record.intensity
    );
}

fn print_summary(summary: &WorkoutSummary) {
    println!("Workouts:       {}", summary.total_count);
    println!(
        "Total time:     {}",
        time_utils::format_duration_minutes(summary.total_duration_minutes)
    );
    println!("Total calories: {}", summary.total_calories);
    println!("This week:      {}", summary.count_this_week);
    println!("This month:     {}", summary.count_this_month);
    println!(
        "Averages:       {} / {} kcal",
        time_utils::format_duration_minutes(summary.average_duration_minutes()),
        summary.average_calories()
    );
    if !summary.recent_records.is_empty() {
        println!("Recent:");
        for record in &summary.recent_records {
            print_record_line(record);
        }
    }
}

/// Initialize structured JSON logging on stderr.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let directives = log_directives(std::env::var("RUST_LOG").ok());
    let filter = tracing_subscriber::EnvFilter::new(directives);

    tracing_subscriber::registry().with(filter).with(format).init();
}

/// `RUST_LOG` when set, otherwise debug for this crate and info elsewhere.
fn log_directives(rust_log: Option<String>) -> String {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_DIRECTIVES.to_string())
}

const DEFAULT_LOG_DIRECTIVES: &str = "fittrack=debug,info";
