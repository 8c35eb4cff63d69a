use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The profile table only ever holds this row id
pub const PROFILE_ID: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Units {
  #[default]
  Metric,
  Imperial,
}

impl std::fmt::Display for Units {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Metric => write!(f, "metric"),
      Self::Imperial => write!(f, "imperial"),
    }
  }
}

impl std::str::FromStr for Units {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "metric" => Ok(Self::Metric),
      "imperial" => Ok(Self::Imperial),
      _ => Err(format!("Unknown units: {}", s)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserProfile {
  pub name: Option<String>,
  pub date_of_birth: Option<NaiveDate>,
  pub weight_kg: Option<f64>,
  pub height_cm: Option<f64>,
  pub gender: Option<String>,
  pub preferred_units: Units,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserProfileRow {
  pub name: Option<String>,
  pub date_of_birth: Option<NaiveDate>,
  pub weight_kg: Option<f64>,
  pub height_cm: Option<f64>,
  pub gender: Option<String>,
  pub preferred_units: String,
}

impl TryFrom<UserProfileRow> for UserProfile {
  type Error = String;

  fn try_from(row: UserProfileRow) -> Result<Self, Self::Error> {
    Ok(Self {
      name: row.name,
      date_of_birth: row.date_of_birth,
      weight_kg: row.weight_kg,
      height_cm: row.height_cm,
      gender: row.gender,
      preferred_units: row.preferred_units.parse()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(preferred_units: &str) -> UserProfileRow {
    UserProfileRow {
      name: None,
      date_of_birth: None,
      weight_kg: Some(70.0),
      height_cm: None,
      gender: None,
      preferred_units: preferred_units.to_string(),
    }
  }

  #[test]
  fn test_row_units_decode() {
    let profile = UserProfile::try_from(row("imperial")).unwrap();
    assert_eq!(profile.preferred_units, Units::Imperial);
    assert_eq!(profile.weight_kg, Some(70.0));
  }

  #[test]
  fn test_row_with_unknown_units_fails() {
    let err = UserProfile::try_from(row("furlongs")).unwrap_err();
    assert_eq!(err, "Unknown units: furlongs");
  }
}
