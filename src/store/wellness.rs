use chrono::NaiveDate;

use super::{LiveQuery, RecordStore, Table};
use crate::error::StoreError;
use crate::models::{SleepRecord, WeightRecord};

impl RecordStore {
  /// ---------------------------------------------------------------------------
  /// Weight
  /// ---------------------------------------------------------------------------

  /// Insert or replace the weight measurement for `record.date`
  pub async fn upsert_weight(&self, record: &WeightRecord) -> Result<(), StoreError> {
    if !(record.weight_kg.is_finite() && record.weight_kg > 0.0) {
      return Err(StoreError::Invalid(format!(
        "weight must be positive, got {}",
        record.weight_kg
      )));
    }

    sqlx::query(
      r#"
      INSERT INTO weight_records (date, weight_kg, body_fat_percentage, notes)
      VALUES (?1, ?2, ?3, ?4)
      ON CONFLICT(date) DO UPDATE SET
        weight_kg = excluded.weight_kg,
        body_fat_percentage = excluded.body_fat_percentage,
        notes = excluded.notes
      "#,
    )
    .bind(record.date)
    .bind(record.weight_kg)
    .bind(record.body_fat_percentage)
    .bind(&record.notes)
    .execute(&self.pool)
    .await?;

    tracing::debug!(date = %record.date, weight_kg = record.weight_kg, "Weight recorded");
    self.notify(Table::Weights);
    Ok(())
  }

  pub async fn get_weight(&self, date: NaiveDate) -> Result<Option<WeightRecord>, StoreError> {
    Ok(
      sqlx::query_as::<_, WeightRecord>("SELECT * FROM weight_records WHERE date = ?1")
        .bind(date)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  pub async fn list_weights(&self) -> Result<Vec<WeightRecord>, StoreError> {
    Ok(
      sqlx::query_as::<_, WeightRecord>("SELECT * FROM weight_records ORDER BY date DESC")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  pub async fn list_weights_between(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<WeightRecord>, StoreError> {
    Ok(
      sqlx::query_as::<_, WeightRecord>(
        "SELECT * FROM weight_records WHERE date BETWEEN ?1 AND ?2 ORDER BY date DESC",
      )
      .bind(start)
      .bind(end)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  pub async fn delete_weight(&self, date: NaiveDate) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM weight_records WHERE date = ?1")
      .bind(date)
      .execute(&self.pool)
      .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
      self.notify(Table::Weights);
    }
    Ok(deleted)
  }

  pub fn live_weights(&self) -> LiveQuery<Vec<WeightRecord>> {
    LiveQuery::new(self, &[Table::Weights], |store| async move {
      store.list_weights().await
    })
  }

  /// ---------------------------------------------------------------------------
  /// Sleep
  /// ---------------------------------------------------------------------------

  /// Insert or replace the sleep record for `record.date_of_sleep`
  pub async fn upsert_sleep(&self, record: &SleepRecord) -> Result<(), StoreError> {
    if record.sleep_end < record.sleep_start || record.total_sleep_millis < 0 {
      return Err(StoreError::Invalid(format!(
        "sleep on {} has an inverted or negative duration",
        record.date_of_sleep
      )));
    }

    sqlx::query(
      r#"
      INSERT INTO sleep_records (
        date_of_sleep, sleep_start, sleep_end, total_sleep_millis,
        deep_sleep_millis, light_sleep_millis, rem_sleep_millis,
        awakenings, quality_score
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
      ON CONFLICT(date_of_sleep) DO UPDATE SET
        sleep_start = excluded.sleep_start,
        sleep_end = excluded.sleep_end,
        total_sleep_millis = excluded.total_sleep_millis,
        deep_sleep_millis = excluded.deep_sleep_millis,
        light_sleep_millis = excluded.light_sleep_millis,
        rem_sleep_millis = excluded.rem_sleep_millis,
        awakenings = excluded.awakenings,
        quality_score = excluded.quality_score
      "#,
    )
    .bind(record.date_of_sleep)
    .bind(record.sleep_start)
    .bind(record.sleep_end)
    .bind(record.total_sleep_millis)
    .bind(record.deep_sleep_millis)
    .bind(record.light_sleep_millis)
    .bind(record.rem_sleep_millis)
    .bind(record.awakenings)
    .bind(record.quality_score)
    .execute(&self.pool)
    .await?;

    tracing::debug!(date = %record.date_of_sleep, "Sleep recorded");
    self.notify(Table::Sleep);
    Ok(())
  }

  pub async fn get_sleep(&self, date: NaiveDate) -> Result<Option<SleepRecord>, StoreError> {
    Ok(
      sqlx::query_as::<_, SleepRecord>("SELECT * FROM sleep_records WHERE date_of_sleep = ?1")
        .bind(date)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  pub async fn list_sleep(&self) -> Result<Vec<SleepRecord>, StoreError> {
    Ok(
      sqlx::query_as::<_, SleepRecord>("SELECT * FROM sleep_records ORDER BY date_of_sleep DESC")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  pub async fn list_sleep_between(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<SleepRecord>, StoreError> {
    Ok(
      sqlx::query_as::<_, SleepRecord>(
        "SELECT * FROM sleep_records WHERE date_of_sleep BETWEEN ?1 AND ?2 ORDER BY date_of_sleep DESC",
      )
      .bind(start)
      .bind(end)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  pub async fn delete_sleep(&self, date: NaiveDate) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM sleep_records WHERE date_of_sleep = ?1")
      .bind(date)
      .execute(&self.pool)
      .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
      self.notify(Table::Sleep);
    }
    Ok(deleted)
  }

  pub fn live_sleep(&self) -> LiveQuery<Vec<SleepRecord>> {
    LiveQuery::new(self, &[Table::Sleep], |store| async move {
      store.list_sleep().await
    })
  }
}
