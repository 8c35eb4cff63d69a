use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One weight measurement per calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeightRecord {
  pub date: NaiveDate,
  pub weight_kg: f64,
  pub body_fat_percentage: Option<f64>,
  pub notes: Option<String>,
}

/// One night of sleep, keyed by the day the night started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SleepRecord {
  pub date_of_sleep: NaiveDate,
  pub sleep_start: DateTime<Utc>,
  pub sleep_end: DateTime<Utc>,
  pub total_sleep_millis: i64,
  pub deep_sleep_millis: Option<i64>,
  pub light_sleep_millis: Option<i64>,
  pub rem_sleep_millis: Option<i64>,
  pub awakenings: Option<i64>,
  pub quality_score: Option<i64>,
}

impl SleepRecord {
  /// Sum of the staged durations that were reported
  pub fn staged_millis(&self) -> i64 {
    [
      self.deep_sleep_millis,
      self.light_sleep_millis,
      self.rem_sleep_millis,
    ]
    .into_iter()
    .flatten()
    .sum()
  }
}
