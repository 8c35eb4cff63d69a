use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single WGS84 coordinate on a recorded route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub latitude: f64,
  pub longitude: f64,
}

impl GeoPoint {
  pub fn new(latitude: f64, longitude: f64) -> Self {
    Self { latitude, longitude }
  }

  /// Finite and within WGS84 bounds
  pub fn is_valid(&self) -> bool {
    self.latitude.is_finite()
      && self.longitude.is_finite()
      && (-90.0..=90.0).contains(&self.latitude)
      && (-180.0..=180.0).contains(&self.longitude)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
  pub id: i64,
  pub activity_type: String,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub duration_millis: i64,
  pub distance_meters: Option<f64>,
  pub calories_burned: Option<f64>,
  pub average_speed_kmh: Option<f64>,
  pub max_speed_kmh: Option<f64>,
  pub steps: Option<i64>,
  /// Present only for GPS-tracked sessions, in recording order
  pub route_path: Option<Vec<GeoPoint>>,
  pub notes: Option<String>,
}

/// For inserting new activities (without id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivityRecord {
  pub activity_type: String,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub duration_millis: i64,
  pub distance_meters: Option<f64>,
  pub calories_burned: Option<f64>,
  pub average_speed_kmh: Option<f64>,
  pub max_speed_kmh: Option<f64>,
  pub steps: Option<i64>,
  pub route_path: Option<Vec<GeoPoint>>,
  pub notes: Option<String>,
}

impl NewActivityRecord {
  /// Manual entry: a finished activity with only the required fields set
  pub fn manual(
    activity_type: impl Into<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
  ) -> Self {
    Self {
      activity_type: activity_type.into(),
      start_time,
      end_time,
      duration_millis: (end_time - start_time).num_milliseconds(),
      distance_meters: None,
      calories_burned: None,
      average_speed_kmh: None,
      max_speed_kmh: None,
      steps: None,
      route_path: None,
      notes: None,
    }
  }

  pub fn with_id(self, id: i64) -> ActivityRecord {
    ActivityRecord {
      id,
      activity_type: self.activity_type,
      start_time: self.start_time,
      end_time: self.end_time,
      duration_millis: self.duration_millis,
      distance_meters: self.distance_meters,
      calories_burned: self.calories_burned,
      average_speed_kmh: self.average_speed_kmh,
      max_speed_kmh: self.max_speed_kmh,
      steps: self.steps,
      route_path: self.route_path,
      notes: self.notes,
    }
  }

  /// Check the record-level invariants enforced before any write
  pub fn validate(&self) -> Result<(), String> {
    if self.duration_millis < 0 {
      return Err(format!("duration_millis must be >= 0, got {}", self.duration_millis));
    }
    if self.end_time < self.start_time {
      return Err(format!(
        "end_time {} is before start_time {}",
        self.end_time, self.start_time
      ));
    }

    let measures = [
      ("distance_meters", self.distance_meters),
      ("calories_burned", self.calories_burned),
      ("average_speed_kmh", self.average_speed_kmh),
      ("max_speed_kmh", self.max_speed_kmh),
    ];
    for (field, value) in measures {
      if let Some(value) = value.filter(|v| !v.is_finite()) {
        return Err(format!("{} must be a finite number, got {}", field, value));
      }
    }

    if let Some(route) = &self.route_path {
      if let Some(index) = route.iter().position(|p| !p.is_valid()) {
        return Err(format!(
          "route point {} is not a valid coordinate: {:?}",
          index, route[index]
        ));
      }
    }

    Ok(())
  }
}

impl From<ActivityRecord> for NewActivityRecord {
  fn from(record: ActivityRecord) -> Self {
    Self {
      activity_type: record.activity_type,
      start_time: record.start_time,
      end_time: record.end_time,
      duration_millis: record.duration_millis,
      distance_meters: record.distance_meters,
      calories_burned: record.calories_burned,
      average_speed_kmh: record.average_speed_kmh,
      max_speed_kmh: record.max_speed_kmh,
      steps: record.steps,
      route_path: record.route_path,
      notes: record.notes,
    }
  }
}

/// Raw `activities` row; the route is stored as JSON text
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ActivityRow {
  pub id: i64,
  pub activity_type: String,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub duration_millis: i64,
  pub distance_meters: Option<f64>,
  pub calories_burned: Option<f64>,
  pub average_speed_kmh: Option<f64>,
  pub max_speed_kmh: Option<f64>,
  pub steps: Option<i64>,
  pub route_json: Option<String>,
  pub notes: Option<String>,
}

impl TryFrom<ActivityRow> for ActivityRecord {
  type Error = serde_json::Error;

  fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
    let route_path = row
      .route_json
      .as_deref()
      .map(serde_json::from_str::<Vec<GeoPoint>>)
      .transpose()?;

    Ok(Self {
      id: row.id,
      activity_type: row.activity_type,
      start_time: row.start_time,
      end_time: row.end_time,
      duration_millis: row.duration_millis,
      distance_meters: row.distance_meters,
      calories_burned: row.calories_burned,
      average_speed_kmh: row.average_speed_kmh,
      max_speed_kmh: row.max_speed_kmh,
      steps: row.steps,
      route_path,
      notes: row.notes,
    })
  }
}
