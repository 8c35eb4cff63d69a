use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

pub use crate::models::GeoPoint;

/// One position report from the location source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
  pub point: GeoPoint,
  pub recorded_at: DateTime<Utc>,
}

impl Fix {
  pub fn new(latitude: f64, longitude: f64, recorded_at: DateTime<Utc>) -> Self {
    Self {
      point: GeoPoint::new(latitude, longitude),
      recorded_at,
    }
  }
}

impl From<GeoPoint> for Point<f64> {
  fn from(point: GeoPoint) -> Self {
    Point::new(point.longitude, point.latitude)
  }
}

/// Great-circle distance in meters on a sphere of mean earth radius
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
  Haversine.distance(Point::from(a), Point::from(b))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;

  #[test]
  fn test_same_point_is_zero() {
    let p = GeoPoint::new(37.4219, -122.0840);
    assert_eq!(haversine_meters(p, p), 0.0);
  }

  #[test]
  fn test_one_degree_of_latitude() {
    let a = GeoPoint::new(0.0, 0.0);
    let b = GeoPoint::new(1.0, 0.0);
    // 6_371_008.8 m * pi / 180
    assert_approx_eq!(haversine_meters(a, b), 111_195.08, 1.0);
  }

  #[test]
  fn test_distance_is_symmetric() {
    let a = GeoPoint::new(51.5007, -0.1246);
    let b = GeoPoint::new(48.8584, 2.2945);
    assert_approx_eq!(haversine_meters(a, b), haversine_meters(b, a), 1e-6);
  }
}
