use chrono::{DateTime, NaiveDate, Utc};

use super::{LiveQuery, RecordStore, Table};
use crate::error::StoreError;
use crate::models::activity::ActivityRow;
use crate::models::{ActivityRecord, GeoPoint, NewActivityRecord};
use crate::time_utils::{day_range, week_range};

const SELECT_ACTIVITY: &str = r#"
  SELECT
    id, activity_type, start_time, end_time, duration_millis,
    distance_meters, calories_burned, average_speed_kmh, max_speed_kmh,
    steps, route_json, notes
  FROM activities
"#;

fn encode_route(route: &Option<Vec<GeoPoint>>) -> Result<Option<String>, StoreError> {
  Ok(route.as_ref().map(serde_json::to_string).transpose()?)
}

fn decode_rows(rows: Vec<ActivityRow>) -> Result<Vec<ActivityRecord>, StoreError> {
  rows
    .into_iter()
    .map(|row| ActivityRecord::try_from(row).map_err(StoreError::from))
    .collect()
}

impl RecordStore {
  /// ---------------------------------------------------------------------------
  /// Writes
  /// ---------------------------------------------------------------------------

  /// Insert a finished activity and return its store-assigned id
  pub async fn insert_activity(&self, record: &NewActivityRecord) -> Result<i64, StoreError> {
    record.validate().map_err(StoreError::Invalid)?;
    let route_json = encode_route(&record.route_path)?;

    let result = sqlx::query(
      r#"
      INSERT INTO activities (
        activity_type, start_time, end_time, duration_millis,
        distance_meters, calories_burned, average_speed_kmh, max_speed_kmh,
        steps, route_json, notes
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
      "#,
    )
    .bind(&record.activity_type)
    .bind(record.start_time)
    .bind(record.end_time)
    .bind(record.duration_millis)
    .bind(record.distance_meters)
    .bind(record.calories_burned)
    .bind(record.average_speed_kmh)
    .bind(record.max_speed_kmh)
    .bind(record.steps)
    .bind(route_json)
    .bind(&record.notes)
    .execute(&self.pool)
    .await?;

    let id = result.last_insert_rowid();
    tracing::info!(
      activity_id = id,
      activity_type = %record.activity_type,
      duration_millis = record.duration_millis,
      "Activity saved"
    );
    self.notify(Table::Activities);
    Ok(id)
  }

  /// Replace an existing activity. Returns false if no row has that id.
  pub async fn update_activity(&self, record: &ActivityRecord) -> Result<bool, StoreError> {
    let candidate = NewActivityRecord::from(record.clone());
    candidate.validate().map_err(StoreError::Invalid)?;
    let route_json = encode_route(&record.route_path)?;

    let result = sqlx::query(
      r#"
      UPDATE activities SET
        activity_type = ?1,
        start_time = ?2,
        end_time = ?3,
        duration_millis = ?4,
        distance_meters = ?5,
        calories_burned = ?6,
        average_speed_kmh = ?7,
        max_speed_kmh = ?8,
        steps = ?9,
        route_json = ?10,
        notes = ?11
      WHERE id = ?12
      "#,
    )
    .bind(&record.activity_type)
    .bind(record.start_time)
    .bind(record.end_time)
    .bind(record.duration_millis)
    .bind(record.distance_meters)
    .bind(record.calories_burned)
    .bind(record.average_speed_kmh)
    .bind(record.max_speed_kmh)
    .bind(record.steps)
    .bind(route_json)
    .bind(&record.notes)
    .bind(record.id)
    .execute(&self.pool)
    .await?;

    let updated = result.rows_affected() > 0;
    if updated {
      self.notify(Table::Activities);
    }
    Ok(updated)
  }

  pub async fn delete_activity(&self, id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM activities WHERE id = ?1")
      .bind(id)
      .execute(&self.pool)
      .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
      tracing::info!(activity_id = id, "Activity deleted");
      self.notify(Table::Activities);
    }
    Ok(deleted)
  }

  /// Bulk delete; returns the number of removed activities
  pub async fn delete_all_activities(&self) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM activities")
      .execute(&self.pool)
      .await?;

    tracing::info!(count = result.rows_affected(), "All activities deleted");
    self.notify(Table::Activities);
    Ok(result.rows_affected())
  }

  /// ---------------------------------------------------------------------------
  /// Reads
  /// ---------------------------------------------------------------------------

  pub async fn get_activity(&self, id: i64) -> Result<Option<ActivityRecord>, StoreError> {
    let row: Option<ActivityRow> = sqlx::query_as(&format!("{SELECT_ACTIVITY} WHERE id = ?1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;

    Ok(row.map(ActivityRecord::try_from).transpose()?)
  }

  /// All activities, newest first
  pub async fn list_activities(&self) -> Result<Vec<ActivityRecord>, StoreError> {
    let rows: Vec<ActivityRow> =
      sqlx::query_as(&format!("{SELECT_ACTIVITY} ORDER BY start_time DESC, id DESC"))
        .fetch_all(&self.pool)
        .await?;

    decode_rows(rows)
  }

  pub async fn list_activities_by_type(
    &self,
    activity_type: &str,
  ) -> Result<Vec<ActivityRecord>, StoreError> {
    let rows: Vec<ActivityRow> = sqlx::query_as(&format!(
      "{SELECT_ACTIVITY} WHERE activity_type = ?1 ORDER BY start_time DESC, id DESC"
    ))
    .bind(activity_type)
    .fetch_all(&self.pool)
    .await?;

    decode_rows(rows)
  }

  /// Activities whose start time lies in `[start, end]`, newest first
  pub async fn list_activities_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<ActivityRecord>, StoreError> {
    let rows: Vec<ActivityRow> = sqlx::query_as(&format!(
      "{SELECT_ACTIVITY} WHERE start_time BETWEEN ?1 AND ?2 ORDER BY start_time DESC, id DESC"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await?;

    decode_rows(rows)
  }

  /// Activities that started on `date`
  pub async fn activities_for_date(
    &self,
    date: NaiveDate,
  ) -> Result<Vec<ActivityRecord>, StoreError> {
    self.activities_starting_in(day_range(date)).await
  }

  /// Activities that started in the Monday-based week containing `date`
  pub async fn activities_for_week(
    &self,
    date: NaiveDate,
  ) -> Result<Vec<ActivityRecord>, StoreError> {
    self.activities_starting_in(week_range(date)).await
  }

  async fn activities_starting_in(
    &self,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
  ) -> Result<Vec<ActivityRecord>, StoreError> {
    let rows: Vec<ActivityRow> = sqlx::query_as(&format!(
      "{SELECT_ACTIVITY} WHERE start_time >= ?1 AND start_time < ?2 ORDER BY start_time DESC, id DESC"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await?;

    decode_rows(rows)
  }

  /// ---------------------------------------------------------------------------
  /// Aggregates (absent values count as zero)
  /// ---------------------------------------------------------------------------

  pub async fn total_steps_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<i64, StoreError> {
    let total: i64 = sqlx::query_scalar(
      "SELECT COALESCE(SUM(steps), 0) FROM activities WHERE start_time BETWEEN ?1 AND ?2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(&self.pool)
    .await?;

    Ok(total)
  }

  pub async fn total_distance_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<f64, StoreError> {
    let total: f64 = sqlx::query_scalar(
      "SELECT COALESCE(SUM(distance_meters), 0.0) FROM activities WHERE start_time BETWEEN ?1 AND ?2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(&self.pool)
    .await?;

    Ok(total)
  }

  pub async fn total_calories_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<f64, StoreError> {
    let total: f64 = sqlx::query_scalar(
      "SELECT COALESCE(SUM(calories_burned), 0.0) FROM activities WHERE start_time BETWEEN ?1 AND ?2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(&self.pool)
    .await?;

    Ok(total)
  }

  pub async fn total_distance_for_type(&self, activity_type: &str) -> Result<f64, StoreError> {
    let total: f64 = sqlx::query_scalar(
      "SELECT COALESCE(SUM(distance_meters), 0.0) FROM activities WHERE activity_type = ?1",
    )
    .bind(activity_type)
    .fetch_one(&self.pool)
    .await?;

    Ok(total)
  }

  /// ---------------------------------------------------------------------------
  /// Live Queries
  /// ---------------------------------------------------------------------------

  pub fn live_activity(&self, id: i64) -> LiveQuery<Option<ActivityRecord>> {
    LiveQuery::new(self, &[Table::Activities], move |store| async move {
      store.get_activity(id).await
    })
  }

  pub fn live_activities(&self) -> LiveQuery<Vec<ActivityRecord>> {
    LiveQuery::new(self, &[Table::Activities], |store| async move {
      store.list_activities().await
    })
  }

  pub fn live_activities_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> LiveQuery<Vec<ActivityRecord>> {
    LiveQuery::new(self, &[Table::Activities], move |store| async move {
      store.list_activities_between(start, end).await
    })
  }
}
