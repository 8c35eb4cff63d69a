use chrono::{NaiveDate, Utc};

use super::{LiveQuery, RecordStore, Table};
use crate::error::StoreError;
use crate::models::goal::UserGoalRow;
use crate::models::{GoalPeriod, GoalType, NewUserGoal, UserGoal};

const SELECT_GOAL: &str = r#"
  SELECT id, goal_type, period, target_value, created_at, is_active, applies_to_date
  FROM user_goals
"#;

fn decode_row(row: UserGoalRow) -> Result<UserGoal, StoreError> {
  UserGoal::try_from(row).map_err(StoreError::Invalid)
}

fn decode_rows(rows: Vec<UserGoalRow>) -> Result<Vec<UserGoal>, StoreError> {
  rows.into_iter().map(decode_row).collect()
}

fn check_target(target_value: f64) -> Result<(), StoreError> {
  if target_value.is_finite() {
    Ok(())
  } else {
    Err(StoreError::Invalid(format!(
      "goal target must be a finite number, got {}",
      target_value
    )))
  }
}

impl RecordStore {
  /// Insert a new active goal and deactivate every other goal with the same
  /// type and period, in one transaction. Deactivated goals are kept.
  pub async fn insert_goal(&self, goal: &NewUserGoal) -> Result<UserGoal, StoreError> {
    check_target(goal.target_value)?;
    let created_at = Utc::now();

    let mut tx = self.pool.begin().await?;

    let id = sqlx::query(
      r#"
      INSERT INTO user_goals (goal_type, period, target_value, created_at, is_active, applies_to_date)
      VALUES (?1, ?2, ?3, ?4, 1, ?5)
      "#,
    )
    .bind(goal.goal_type.as_str())
    .bind(goal.period.as_str())
    .bind(goal.target_value)
    .bind(created_at)
    .bind(goal.applies_to_date)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let deactivated = sqlx::query(
      "UPDATE user_goals SET is_active = 0 WHERE goal_type = ?1 AND period = ?2 AND id != ?3 AND is_active = 1",
    )
    .bind(goal.goal_type.as_str())
    .bind(goal.period.as_str())
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    tracing::info!(
      goal_id = id,
      goal_type = %goal.goal_type,
      period = %goal.period,
      target = goal.target_value,
      deactivated,
      "Goal set"
    );
    self.notify(Table::Goals);

    Ok(UserGoal {
      id,
      goal_type: goal.goal_type,
      period: goal.period,
      target_value: goal.target_value,
      created_at,
      is_active: true,
      applies_to_date: goal.applies_to_date,
    })
  }

  /// Replace an existing goal. An active goal still deactivates its siblings.
  pub async fn update_goal(&self, goal: &UserGoal) -> Result<bool, StoreError> {
    check_target(goal.target_value)?;

    let mut tx = self.pool.begin().await?;

    let updated = sqlx::query(
      r#"
      UPDATE user_goals SET
        goal_type = ?1,
        period = ?2,
        target_value = ?3,
        created_at = ?4,
        is_active = ?5,
        applies_to_date = ?6
      WHERE id = ?7
      "#,
    )
    .bind(goal.goal_type.as_str())
    .bind(goal.period.as_str())
    .bind(goal.target_value)
    .bind(goal.created_at)
    .bind(goal.is_active)
    .bind(goal.applies_to_date)
    .bind(goal.id)
    .execute(&mut *tx)
    .await?
    .rows_affected()
      > 0;

    if updated && goal.is_active {
      sqlx::query(
        "UPDATE user_goals SET is_active = 0 WHERE goal_type = ?1 AND period = ?2 AND id != ?3",
      )
      .bind(goal.goal_type.as_str())
      .bind(goal.period.as_str())
      .bind(goal.id)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;

    if updated {
      self.notify(Table::Goals);
    }
    Ok(updated)
  }

  pub async fn delete_goal(&self, id: i64) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM user_goals WHERE id = ?1")
      .bind(id)
      .execute(&self.pool)
      .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
      self.notify(Table::Goals);
    }
    Ok(deleted)
  }

  pub async fn get_goal(&self, id: i64) -> Result<Option<UserGoal>, StoreError> {
    let row: Option<UserGoalRow> = sqlx::query_as(&format!("{SELECT_GOAL} WHERE id = ?1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;

    row.map(decode_row).transpose()
  }

  /// Active goals, most recently created first
  pub async fn active_goals(&self) -> Result<Vec<UserGoal>, StoreError> {
    let rows: Vec<UserGoalRow> = sqlx::query_as(&format!(
      "{SELECT_GOAL} WHERE is_active = 1 ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&self.pool)
    .await?;

    decode_rows(rows)
  }

  pub async fn active_goal(
    &self,
    goal_type: GoalType,
    period: GoalPeriod,
  ) -> Result<Option<UserGoal>, StoreError> {
    let row: Option<UserGoalRow> = sqlx::query_as(&format!(
      "{SELECT_GOAL} WHERE goal_type = ?1 AND period = ?2 AND is_active = 1 ORDER BY created_at DESC, id DESC LIMIT 1"
    ))
    .bind(goal_type.as_str())
    .bind(period.as_str())
    .fetch_optional(&self.pool)
    .await?;

    row.map(decode_row).transpose()
  }

  pub async fn active_daily_goal_for_date(
    &self,
    goal_type: GoalType,
    date: NaiveDate,
  ) -> Result<Option<UserGoal>, StoreError> {
    let row: Option<UserGoalRow> = sqlx::query_as(&format!(
      "{SELECT_GOAL} WHERE goal_type = ?1 AND period = 'DAILY' AND is_active = 1 AND applies_to_date = ?2 ORDER BY created_at DESC, id DESC LIMIT 1"
    ))
    .bind(goal_type.as_str())
    .bind(date)
    .fetch_optional(&self.pool)
    .await?;

    row.map(decode_row).transpose()
  }

  /// Every active daily goal that applies to `date`, one per goal type
  pub async fn active_daily_goals_for_date(
    &self,
    date: NaiveDate,
  ) -> Result<Vec<UserGoal>, StoreError> {
    let rows: Vec<UserGoalRow> = sqlx::query_as(&format!(
      "{SELECT_GOAL} WHERE period = 'DAILY' AND is_active = 1 AND applies_to_date = ?1 ORDER BY goal_type"
    ))
    .bind(date)
    .fetch_all(&self.pool)
    .await?;

    decode_rows(rows)
  }

  /// Active weekly goals for the week starting on `week_start`. A weekly goal
  /// without a start date applies to every week.
  pub async fn active_weekly_goals(
    &self,
    week_start: NaiveDate,
  ) -> Result<Vec<UserGoal>, StoreError> {
    let rows: Vec<UserGoalRow> = sqlx::query_as(&format!(
      "{SELECT_GOAL} WHERE period = 'WEEKLY' AND is_active = 1 AND (applies_to_date IS NULL OR applies_to_date = ?1) ORDER BY goal_type"
    ))
    .bind(week_start)
    .fetch_all(&self.pool)
    .await?;

    decode_rows(rows)
  }

  pub fn live_active_goals(&self) -> LiveQuery<Vec<UserGoal>> {
    LiveQuery::new(self, &[Table::Goals], |store| async move {
      store.active_goals().await
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{setup_test_store, test_date};

  #[tokio::test]
  async fn test_insert_deactivates_previous_goal_of_same_kind() {
    let store = setup_test_store().await;
    let date = test_date();

    let first = store
      .insert_goal(&NewUserGoal::daily(GoalType::Steps, 8000.0, date))
      .await
      .unwrap();
    let calories = store
      .insert_goal(&NewUserGoal::daily(GoalType::CaloriesBurned, 500.0, date))
      .await
      .unwrap();
    let second = store
      .insert_goal(&NewUserGoal::daily(GoalType::Steps, 10000.0, date))
      .await
      .unwrap();

    let active = store.active_goals().await.unwrap();
    let active_ids: Vec<i64> = active.iter().map(|g| g.id).collect();
    assert_eq!(active.len(), 2);
    assert!(active_ids.contains(&second.id));
    assert!(active_ids.contains(&calories.id));

    // History is preserved, only deactivated
    let old = store.get_goal(first.id).await.unwrap().expect("old goal kept");
    assert!(!old.is_active);
    assert_eq!(old.target_value, 8000.0);
  }

  #[tokio::test]
  async fn test_daily_and_weekly_goals_are_independent() {
    let store = setup_test_store().await;
    let date = test_date();

    store
      .insert_goal(&NewUserGoal::daily(GoalType::DistanceKm, 5.0, date))
      .await
      .unwrap();
    store
      .insert_goal(&NewUserGoal::weekly(GoalType::DistanceKm, 30.0, None))
      .await
      .unwrap();

    let daily = store.active_goal(GoalType::DistanceKm, GoalPeriod::Daily).await.unwrap();
    let weekly = store.active_goal(GoalType::DistanceKm, GoalPeriod::Weekly).await.unwrap();
    assert_eq!(daily.unwrap().target_value, 5.0);
    assert_eq!(weekly.unwrap().target_value, 30.0);
  }

  #[tokio::test]
  async fn test_daily_goals_for_date() {
    let store = setup_test_store().await;
    let date = test_date();
    let other_day = date.succ_opt().unwrap();

    store
      .insert_goal(&NewUserGoal::daily(GoalType::Steps, 9000.0, date))
      .await
      .unwrap();
    store
      .insert_goal(&NewUserGoal::daily(GoalType::ActiveMinutes, 45.0, date))
      .await
      .unwrap();

    let goals = store.active_daily_goals_for_date(date).await.unwrap();
    assert_eq!(goals.len(), 2);
    assert!(store.active_daily_goals_for_date(other_day).await.unwrap().is_empty());

    let steps = store
      .active_daily_goal_for_date(GoalType::Steps, date)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(steps.target_value, 9000.0);
  }

  #[tokio::test]
  async fn test_update_reactivation_keeps_single_active() {
    let store = setup_test_store().await;
    let date = test_date();

    let first = store
      .insert_goal(&NewUserGoal::daily(GoalType::Steps, 8000.0, date))
      .await
      .unwrap();
    store
      .insert_goal(&NewUserGoal::daily(GoalType::Steps, 12000.0, date))
      .await
      .unwrap();

    let mut revived = store.get_goal(first.id).await.unwrap().unwrap();
    revived.is_active = true;
    revived.target_value = 8500.0;
    assert!(store.update_goal(&revived).await.unwrap());

    let active = store.active_goal(GoalType::Steps, GoalPeriod::Daily).await.unwrap().unwrap();
    assert_eq!(active.id, first.id);
    assert_eq!(store.active_goals().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_insert_rejects_nan_target() {
    let store = setup_test_store().await;
    let result = store
      .insert_goal(&NewUserGoal::daily(GoalType::Steps, f64::NAN, test_date()))
      .await;
    assert!(matches!(result, Err(StoreError::Invalid(_))));
  }

  #[tokio::test]
  async fn test_delete_goal() {
    let store = setup_test_store().await;
    let goal = store
      .insert_goal(&NewUserGoal::weekly(GoalType::CaloriesBurned, 3500.0, None))
      .await
      .unwrap();

    assert!(store.delete_goal(goal.id).await.unwrap());
    assert!(store.get_goal(goal.id).await.unwrap().is_none());
  }
}
