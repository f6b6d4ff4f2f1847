//! Workout summary aggregate for the dashboard.
//!
//! Normally fetched from `workouts/summary/`. It can also be derived from a
//! cached record list when the endpoint is unreachable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::WorkoutRecord;
use crate::time_utils::{month_start, week_start};

/// How many records `recent_workouts` holds when derived locally.
pub const RECENT_WORKOUTS_LIMIT: usize = 5;

/// Dashboard totals. Always replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    /// Number of workouts logged
    #[serde(rename = "total_workouts", default)]
    pub total_count: u64,
    /// Sum of durations (minutes)
    #[serde(rename = "total_duration", default)]
    pub total_duration_minutes: u64,
    #[serde(default)]
    pub total_calories: u64,
    /// Workouts in the current ISO week
    #[serde(rename = "workouts_this_week", default)]
    pub count_this_week: u64,
    /// Workouts in the current calendar month
    #[serde(rename = "workouts_this_month", default)]
    pub count_this_month: u64,
    /// Newest workouts first
    #[serde(rename = "recent_workouts", default)]
    pub recent_records: Vec<WorkoutRecord>,
}

impl WorkoutSummary {
    /// Derive a summary from a full record list as seen on `today`.
    pub fn from_records(records: &[WorkoutRecord], today: NaiveDate) -> Self {
        let week_start = week_start(today);
        let month_start = month_start(today);

        let mut summary = WorkoutSummary::default();
        for record in records {
            summary.total_count += 1;
            summary.total_duration_minutes += u64::from(record.duration_minutes);
            summary.total_calories += u64::from(record.calories);

            if record.logged_date <= today {
                if record.logged_date >= week_start {
                    summary.count_this_week += 1;
                }
                if record.logged_date >= month_start {
                    summary.count_this_month += 1;
                }
            }
        }

        let mut recent: Vec<WorkoutRecord> = records.to_vec();
        recent.sort_by(|a, b| {
            b.logged_date
                .cmp(&a.logged_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        recent.truncate(RECENT_WORKOUTS_LIMIT);
        summary.recent_records = recent;

        summary
    }

    /// Average duration per workout, rounded (0 when empty).
    pub fn average_duration_minutes(&self) -> u64 {
        rounded_average(self.total_duration_minutes, self.total_count)
    }

    /// Average calories per workout, rounded (0 when empty).
    pub fn average_calories(&self) -> u64 {
        rounded_average(self.total_calories, self.total_count)
    }
}

fn rounded_average(total: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (total + count / 2) / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Intensity, WorkoutType};

    fn make_record(id: u64, date: &str, duration: u32, calories: u32) -> WorkoutRecord {
        WorkoutRecord {
            id,
            workout_type: WorkoutType::Cardio,
            logged_date: date.parse().unwrap(),
            duration_minutes: duration,
            calories,
            intensity: Intensity::Moderate,
            notes: None,
        }
    }

    #[test]
    fn test_from_records_totals() {
        // 2024-01-17 is a Wednesday; its ISO week starts Monday 2024-01-15
        let today: NaiveDate = "2024-01-17".parse().unwrap();
        let records = vec![
            make_record(1, "2024-01-15", 30, 250),
            make_record(2, "2024-01-14", 45, 400),
            make_record(3, "2023-12-31", 60, 500),
        ];

        let summary = WorkoutSummary::from_records(&records, today);

        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.total_duration_minutes, 135);
        assert_eq!(summary.total_calories, 1150);
        assert_eq!(summary.count_this_week, 1);
        assert_eq!(summary.count_this_month, 2);
        assert_eq!(summary.average_duration_minutes(), 45);
    }

    #[test]
    fn test_recent_records_newest_first() {
        let today: NaiveDate = "2024-03-01".parse().unwrap();
        let records: Vec<_> = (1..=7)
            .map(|i| make_record(i, &format!("2024-02-{:02}", i), 10, 10))
            .chain(std::iter::once(make_record(8, "2024-02-07", 10, 10)))
            .collect();

        let summary = WorkoutSummary::from_records(&records, today);
        let ids: Vec<u64> = summary.recent_records.iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![8, 7, 6, 5, 4]);
    }

    #[test]
    fn test_empty_summary_decodes_defaults() {
        let summary: WorkoutSummary = serde_json::from_str("{}").unwrap();
        assert_eq!(summary, WorkoutSummary::default());
        assert_eq!(summary.average_calories(), 0);
    }
}
