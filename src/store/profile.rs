use super::{LiveQuery, RecordStore, Table};
use crate::error::StoreError;
use crate::models::profile::{UserProfileRow, PROFILE_ID};
use crate::models::UserProfile;

impl RecordStore {
  /// Upsert the whole profile row
  pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO user_profile (
        id, name, date_of_birth, weight_kg, height_cm, gender, preferred_units, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, CURRENT_TIMESTAMP)
      ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        date_of_birth = excluded.date_of_birth,
        weight_kg = excluded.weight_kg,
        height_cm = excluded.height_cm,
        gender = excluded.gender,
        preferred_units = excluded.preferred_units,
        updated_at = CURRENT_TIMESTAMP
      "#,
    )
    .bind(PROFILE_ID)
    .bind(&profile.name)
    .bind(profile.date_of_birth)
    .bind(profile.weight_kg)
    .bind(profile.height_cm)
    .bind(&profile.gender)
    .bind(profile.preferred_units.to_string())
    .execute(&self.pool)
    .await?;

    tracing::debug!("Profile saved");
    self.notify(Table::Profile);
    Ok(())
  }

  /// `None` until the profile has been saved once
  pub async fn get_profile(&self) -> Result<Option<UserProfile>, StoreError> {
    let row: Option<UserProfileRow> = sqlx::query_as(
      r#"
      SELECT name, date_of_birth, weight_kg, height_cm, gender, preferred_units
      FROM user_profile
      WHERE id = ?1
      "#,
    )
    .bind(PROFILE_ID)
    .fetch_optional(&self.pool)
    .await?;

    row
      .map(UserProfile::try_from)
      .transpose()
      .map_err(StoreError::Invalid)
  }

  pub async fn body_weight_kg(&self) -> Result<Option<f64>, StoreError> {
    Ok(self.get_profile().await?.and_then(|p| p.weight_kg))
  }

  pub fn live_profile(&self) -> LiveQuery<Option<UserProfile>> {
    LiveQuery::new(self, &[Table::Profile], |store| async move {
      store.get_profile().await
    })
  }
}
