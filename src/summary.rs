//! Aggregation over activities
//!
//! Per-day and per-week totals built from a list of activities. Optional fields that are
//! absent count as zero; an empty list yields all-zero totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::ActivityRecord;
use crate::store::{LiveQuery, RecordStore, Table};
use crate::time_utils::week_start;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
  pub date: NaiveDate,
  pub total_steps: i64,
  pub total_distance_meters: f64,
  pub total_calories: f64,
  pub total_active_millis: i64,
  pub activity_count: usize,
}

impl ActivitySummary {
  pub fn empty(date: NaiveDate) -> Self {
    Self {
      date,
      total_steps: 0,
      total_distance_meters: 0.0,
      total_calories: 0.0,
      total_active_millis: 0,
      activity_count: 0,
    }
  }

  pub fn from_activities(date: NaiveDate, activities: &[ActivityRecord]) -> Self {
    activities
      .iter()
      .fold(Self::empty(date), |mut summary, activity| {
        summary.total_steps += activity.steps.unwrap_or(0);
        summary.total_distance_meters += activity.distance_meters.unwrap_or(0.0);
        summary.total_calories += activity.calories_burned.unwrap_or(0.0);
        summary.total_active_millis += activity.duration_millis;
        summary.activity_count += 1;
        summary
      })
  }

  pub fn total_distance_km(&self) -> f64 {
    self.total_distance_meters / 1000.0
  }

  pub fn total_active_minutes(&self) -> f64 {
    self.total_active_millis as f64 / 60_000.0
  }
}

impl RecordStore {
  /// Totals for the activities that started on `date`
  pub async fn daily_summary(&self, date: NaiveDate) -> Result<ActivitySummary, StoreError> {
    let activities = self.activities_for_date(date).await?;
    Ok(ActivitySummary::from_activities(date, &activities))
  }

  /// Totals for the Monday-based week containing `date`, dated to its Monday
  pub async fn weekly_summary(&self, date: NaiveDate) -> Result<ActivitySummary, StoreError> {
    let activities = self.activities_for_week(date).await?;
    Ok(ActivitySummary::from_activities(week_start(date), &activities))
  }

  pub fn live_daily_summary(&self, date: NaiveDate) -> LiveQuery<ActivitySummary> {
    LiveQuery::new(self, &[Table::Activities], move |store| async move {
      store.daily_summary(date).await
    })
  }
}
