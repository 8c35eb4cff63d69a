use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalType {
  Steps,
  DistanceKm,
  ActiveMinutes,
  CaloriesBurned,
}

impl GoalType {
  pub const ALL: [GoalType; 4] = [
    GoalType::Steps,
    GoalType::DistanceKm,
    GoalType::ActiveMinutes,
    GoalType::CaloriesBurned,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      GoalType::Steps => "STEPS",
      GoalType::DistanceKm => "DISTANCE_KM",
      GoalType::ActiveMinutes => "ACTIVE_MINUTES",
      GoalType::CaloriesBurned => "CALORIES_BURNED",
    }
  }
}

impl std::fmt::Display for GoalType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for GoalType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "STEPS" => Ok(Self::Steps),
      "DISTANCE_KM" => Ok(Self::DistanceKm),
      "ACTIVE_MINUTES" => Ok(Self::ActiveMinutes),
      "CALORIES_BURNED" => Ok(Self::CaloriesBurned),
      _ => Err(format!("Unknown goal type: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalPeriod {
  Daily,
  Weekly,
}

impl GoalPeriod {
  pub fn as_str(&self) -> &'static str {
    match self {
      GoalPeriod::Daily => "DAILY",
      GoalPeriod::Weekly => "WEEKLY",
    }
  }
}

impl std::fmt::Display for GoalPeriod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for GoalPeriod {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "DAILY" => Ok(Self::Daily),
      "WEEKLY" => Ok(Self::Weekly),
      _ => Err(format!("Unknown goal period: {}", s)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGoal {
  pub id: i64,
  pub goal_type: GoalType,
  pub period: GoalPeriod,
  pub target_value: f64,
  pub created_at: DateTime<Utc>,
  pub is_active: bool,
  /// Day a daily goal applies to; first day of the week for weekly goals
  pub applies_to_date: Option<NaiveDate>,
}

/// For inserting new goals (without id). New goals are always active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUserGoal {
  pub goal_type: GoalType,
  pub period: GoalPeriod,
  pub target_value: f64,
  pub applies_to_date: Option<NaiveDate>,
}

impl NewUserGoal {
  pub fn daily(goal_type: GoalType, target_value: f64, date: NaiveDate) -> Self {
    Self {
      goal_type,
      period: GoalPeriod::Daily,
      target_value,
      applies_to_date: Some(date),
    }
  }

  pub fn weekly(goal_type: GoalType, target_value: f64, week_start: Option<NaiveDate>) -> Self {
    Self {
      goal_type,
      period: GoalPeriod::Weekly,
      target_value,
      applies_to_date: week_start,
    }
  }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserGoalRow {
  pub id: i64,
  pub goal_type: String,
  pub period: String,
  pub target_value: f64,
  pub created_at: DateTime<Utc>,
  pub is_active: bool,
  pub applies_to_date: Option<NaiveDate>,
}

impl TryFrom<UserGoalRow> for UserGoal {
  type Error = String;

  fn try_from(row: UserGoalRow) -> Result<Self, Self::Error> {
    Ok(Self {
      id: row.id,
      goal_type: row.goal_type.parse()?,
      period: row.period.parse()?,
      target_value: row.target_value,
      created_at: row.created_at,
      is_active: row.is_active,
      applies_to_date: row.applies_to_date,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_goal_type_text_roundtrip() {
    for goal_type in GoalType::ALL {
      let parsed: GoalType = goal_type.to_string().parse().unwrap();
      assert_eq!(parsed, goal_type);
    }
    assert!("MILES".parse::<GoalType>().is_err());
  }

  #[test]
  fn test_serde_uses_storage_names() {
    let json = serde_json::to_string(&GoalType::DistanceKm).unwrap();
    assert_eq!(json, "\"DISTANCE_KM\"");
    let period: GoalPeriod = serde_json::from_str("\"WEEKLY\"").unwrap();
    assert_eq!(period, GoalPeriod::Weekly);
  }
}
