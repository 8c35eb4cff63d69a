//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Helper assertions

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::models::{GeoPoint, NewActivityRecord, Units, UserProfile};
use crate::store::RecordStore;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) and no idle/lifetime limits: every new connection
/// to `sqlite::memory:` would otherwise open a fresh, empty database
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .idle_timeout(None)
    .max_lifetime(None)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  crate::db::run_migrations(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// In-memory store with the schema applied
pub async fn setup_test_store() -> RecordStore {
  RecordStore::new(setup_test_db().await)
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Seed `count` activities on `date`, one per hour from 06:00.
/// Returns the IDs of created activities
pub async fn seed_test_activities(store: &RecordStore, date: NaiveDate, count: usize) -> Vec<i64> {
  let mut ids = Vec::new();

  for i in 0..count {
    let activity_type = if i % 2 == 0 { "Running" } else { "Cycling" };
    let mut record = mock_activity(activity_type, at(date, 6 + i as u32, 0), 30);
    record.distance_meters = Some(5000.0);
    record.calories_burned = Some(250.0);
    record.steps = if activity_type == "Running" { Some(4000) } else { None };

    let id = store
      .insert_activity(&record)
      .await
      .expect("Failed to insert test activity");
    ids.push(id);
  }

  ids
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A manual-entry activity of `minutes` length starting at `start`
pub fn mock_activity(activity_type: &str, start: DateTime<Utc>, minutes: i64) -> NewActivityRecord {
  NewActivityRecord::manual(activity_type, start, start + Duration::minutes(minutes))
}

/// A fully populated tracked activity, route included
pub fn mock_tracked_activity(start: DateTime<Utc>) -> NewActivityRecord {
  let mut record = mock_activity("Running", start, 25);
  record.distance_meters = Some(4321.5);
  record.calories_burned = Some(313.4);
  record.average_speed_kmh = Some(10.37);
  record.max_speed_kmh = Some(14.2);
  record.steps = Some(5120);
  record.route_path = Some(vec![
    GeoPoint::new(37.3861, -122.0839),
    GeoPoint::new(37.3870, -122.0841),
    GeoPoint::new(37.3885, -122.0850),
  ]);
  record.notes = Some("Easy loop".to_string());
  record
}

pub fn mock_profile() -> UserProfile {
  UserProfile {
    name: Some("Test Runner".to_string()),
    date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17),
    weight_kg: Some(64.0),
    height_cm: Some(172.0),
    gender: None,
    preferred_units: Units::Metric,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

pub fn test_date() -> NaiveDate {
  NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
}

/// `date` at `hour:minute` UTC
pub fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
  Utc
    .from_utc_datetime(&date.and_hms_opt(hour, minute, 0).expect("valid time"))
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('activities', 'user_goals', 'user_profile', 'weight_records', 'sleep_records')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 5, "Expected 5 tables, got {:?}", tables);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_activities_returns_correct_count() {
    let store = setup_test_store().await;

    let ids = seed_test_activities(&store, test_date(), 4).await;
    assert_eq!(ids.len(), 4);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activities")
      .fetch_one(store.pool())
      .await
      .expect("Failed to count activities");

    assert_eq!(count, 4);
  }
}
