//! Display formatting for durations and distances

use crate::models::Units;

const METERS_PER_KILOMETER: f64 = 1000.0;
const MILES_PER_METER: f64 = 0.000621371;
const FEET_PER_METER: f64 = 3.28084;

/// `"1h 05m"`, `"3m 07s"` or `"42s"`. Negative input renders as `"0s"`.
pub fn format_duration(millis: i64) -> String {
  let total_seconds = millis.max(0) / 1000;
  let hours = total_seconds / 3600;
  let minutes = (total_seconds % 3600) / 60;
  let seconds = total_seconds % 60;

  if hours > 0 {
    format!("{}h {:02}m", hours, minutes)
  } else if minutes > 0 {
    format!("{}m {:02}s", minutes, seconds)
  } else {
    format!("{}s", seconds)
  }
}

pub fn format_distance(meters: f64, units: Units) -> String {
  match units {
    Units::Metric if meters >= METERS_PER_KILOMETER => {
      format!("{:.2} km", meters / METERS_PER_KILOMETER)
    }
    Units::Metric => format!("{:.0} m", meters),
    Units::Imperial => {
      let miles = meters * MILES_PER_METER;
      if miles >= 0.1 {
        format!("{:.2} mi", miles)
      } else {
        format!("{:.0} ft", meters * FEET_PER_METER)
      }
    }
  }
}
