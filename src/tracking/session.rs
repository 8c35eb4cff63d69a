//! Tracking Session state machine
//!
//! Pure and clock-free: every transition takes the current monotonic instant
//! from the caller. The session only ever counts time spent in `Tracking`;
//! paused intervals are never added to the duration.
//!
//! ```text
//! Idle --start--> Tracking <--pause/resume--> Paused
//!                    |                          |
//!                    +----------stop------------+--> Idle
//! ```

use chrono::{DateTime, Utc};
use tokio::time::{Duration, Instant};

use super::geo::{haversine_meters, Fix, GeoPoint};
use super::TrackingStatus;
use crate::error::TrackingError;
use crate::models::NewActivityRecord;

#[derive(Debug, Clone, Default)]
pub struct TrackingSession {
  status: TrackingStatus,
  activity_type: Option<String>,
  /// Time spent in closed tracking intervals
  accumulated: Duration,
  /// Start of the open tracking interval, set only while `Tracking`
  tracking_since: Option<Instant>,
  distance_meters: f64,
  fixes: Vec<Fix>,
  max_speed_kmh: Option<f64>,
}

impl TrackingSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn status(&self) -> TrackingStatus {
    self.status
  }

  pub fn activity_type(&self) -> Option<&str> {
    self.activity_type.as_deref()
  }

  pub fn distance_meters(&self) -> f64 {
    self.distance_meters
  }

  pub fn fixes(&self) -> &[Fix] {
    &self.fixes
  }

  pub fn path(&self) -> Vec<GeoPoint> {
    self.fixes.iter().map(|f| f.point).collect()
  }

  pub fn elapsed(&self, now: Instant) -> Duration {
    let open = self
      .tracking_since
      .map(|since| now.saturating_duration_since(since))
      .unwrap_or_default();
    self.accumulated + open
  }

  /// Begin a new session. When a session already exists this resumes it
  /// instead and the original activity type is kept.
  ///
  /// Returns `true` only when a fresh session was created.
  pub fn start(&mut self, activity_type: impl Into<String>, now: Instant) -> bool {
    if self.status != TrackingStatus::Idle {
      self.resume(now);
      return false;
    }

    *self = Self {
      status: TrackingStatus::Tracking,
      activity_type: Some(activity_type.into()),
      tracking_since: Some(now),
      ..Self::default()
    };
    true
  }

  /// Returns `false` (and does nothing) unless currently tracking
  pub fn pause(&mut self, now: Instant) -> bool {
    if self.status != TrackingStatus::Tracking {
      return false;
    }
    self.close_interval(now);
    self.status = TrackingStatus::Paused;
    true
  }

  /// Returns `false` (and does nothing) unless currently paused
  pub fn resume(&mut self, now: Instant) -> bool {
    if self.status != TrackingStatus::Paused {
      return false;
    }
    self.tracking_since = Some(now);
    self.status = TrackingStatus::Tracking;
    true
  }

  /// Apply a location fix. Fixes arriving while not tracking, or with
  /// coordinates outside WGS84 bounds, are dropped.
  pub fn record_fix(&mut self, fix: Fix) -> bool {
    if self.status != TrackingStatus::Tracking || !fix.point.is_valid() {
      return false;
    }

    if let Some(prev) = self.fixes.last() {
      let segment = haversine_meters(prev.point, fix.point);
      self.distance_meters += segment;

      let millis = (fix.recorded_at - prev.recorded_at).num_milliseconds();
      if millis > 0 {
        let kmh = segment / millis as f64 * 3600.0;
        self.max_speed_kmh = Some(self.max_speed_kmh.map_or(kmh, |max| max.max(kmh)));
      }
    }

    self.fixes.push(fix);
    true
  }

  /// End the session and build the finished activity.
  ///
  /// The session returns to `Idle` on success. From `Idle` this fails and
  /// nothing changes.
  pub fn stop(
    &mut self,
    now: Instant,
    ended_at: DateTime<Utc>,
    weight_kg: f64,
    met_coefficient: f64,
  ) -> Result<NewActivityRecord, TrackingError> {
    if self.status == TrackingStatus::Idle {
      return Err(TrackingError::InvalidState {
        command: "stop",
        status: self.status,
      });
    }

    self.close_interval(now);
    let finished = std::mem::take(self);

    let duration_millis = finished.accumulated.as_millis() as i64;
    let distance_km = finished.distance_meters / 1000.0;
    let hours = duration_millis as f64 / 3_600_000.0;

    let route_path = if finished.fixes.is_empty() {
      None
    } else {
      Some(finished.path())
    };

    Ok(NewActivityRecord {
      activity_type: finished.activity_type.unwrap_or_default(),
      start_time: ended_at - chrono::Duration::milliseconds(duration_millis),
      end_time: ended_at,
      duration_millis,
      distance_meters: Some(finished.distance_meters),
      calories_burned: Some(distance_km * weight_kg * met_coefficient),
      average_speed_kmh: (hours > 0.0).then(|| distance_km / hours),
      max_speed_kmh: finished.max_speed_kmh,
      steps: None,
      route_path,
      notes: None,
    })
  }

  fn close_interval(&mut self, now: Instant) {
    if let Some(since) = self.tracking_since.take() {
      self.accumulated += now.saturating_duration_since(since);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::test_utils::{at, test_date};

  fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
  }

  fn fix_at(latitude: f64, longitude: f64, second: i64) -> Fix {
    Fix::new(
      latitude,
      longitude,
      at(test_date(), 8, 0) + chrono::Duration::seconds(second),
    )
  }

  #[test]
  fn test_paused_interval_excluded_from_duration() {
    let t0 = Instant::now();
    let mut session = TrackingSession::new();

    assert!(session.start("Running", t0));
    assert!(session.pause(t0 + ms(1000)));
    assert_eq!(session.elapsed(t0 + ms(2500)), ms(1000));
    assert!(session.resume(t0 + ms(3000)));
    assert_eq!(session.elapsed(t0 + ms(3200)), ms(1200));

    let ended_at = at(test_date(), 9, 0);
    let record = session.stop(t0 + ms(3500), ended_at, 70.0, 1.036).unwrap();
    assert_eq!(record.duration_millis, 1500);
    assert_eq!(record.end_time, ended_at);
    assert_eq!(record.start_time, ended_at - chrono::Duration::milliseconds(1500));
    assert_eq!(session.status(), TrackingStatus::Idle);
  }

  #[test]
  fn test_stop_from_idle_fails_without_side_effects() {
    let mut session = TrackingSession::new();
    let err = session
      .stop(Instant::now(), at(test_date(), 9, 0), 70.0, 1.036)
      .unwrap_err();

    assert!(matches!(
      err,
      TrackingError::InvalidState {
        command: "stop",
        status: TrackingStatus::Idle
      }
    ));
    assert_eq!(session.status(), TrackingStatus::Idle);
    assert!(session.activity_type().is_none());
  }

  #[test]
  fn test_second_start_is_resume() {
    let t0 = Instant::now();
    let mut session = TrackingSession::new();
    session.start("Running", t0);
    session.record_fix(fix_at(0.0, 0.0, 0));
    session.record_fix(fix_at(0.0, 0.001, 10));

    // While tracking, a second start changes nothing
    assert!(!session.start("Cycling", t0 + ms(400)));
    assert_eq!(session.activity_type(), Some("Running"));
    assert_eq!(session.fixes().len(), 2);
    assert_eq!(session.elapsed(t0 + ms(1000)), ms(1000));

    // While paused, it resumes
    session.pause(t0 + ms(1000));
    assert!(!session.start("Walking", t0 + ms(5000)));
    assert_eq!(session.status(), TrackingStatus::Tracking);
    assert_eq!(session.activity_type(), Some("Running"));
    assert_eq!(session.elapsed(t0 + ms(5500)), ms(1500));
  }

  #[test]
  fn test_pause_and_resume_are_noops_out_of_state() {
    let t0 = Instant::now();
    let mut session = TrackingSession::new();
    assert!(!session.pause(t0));
    assert!(!session.resume(t0));
    assert_eq!(session.status(), TrackingStatus::Idle);

    session.start("Walking", t0);
    assert!(!session.resume(t0 + ms(100)));
    session.pause(t0 + ms(200));
    assert!(!session.pause(t0 + ms(300)));
    assert_eq!(session.elapsed(t0 + ms(900)), ms(200));
  }

  #[test]
  fn test_distance_is_sum_of_segments() {
    let t0 = Instant::now();
    let mut session = TrackingSession::new();
    session.start("Running", t0);

    let fixes = [
      fix_at(37.4219, -122.0840, 0),
      fix_at(37.4229, -122.0840, 5),
      fix_at(37.4229, -122.0830, 10),
      fix_at(37.4239, -122.0825, 15),
    ];
    for fix in fixes {
      assert!(session.record_fix(fix));
    }

    let expected: f64 = fixes
      .windows(2)
      .map(|pair| haversine_meters(pair[0].point, pair[1].point))
      .sum();

    let record = session
      .stop(t0 + ms(15_000), at(test_date(), 8, 1), 70.0, 1.0)
      .unwrap();
    assert_approx_eq!(record.distance_meters.unwrap(), expected, 1e-9);
    assert_eq!(record.route_path.unwrap().len(), 4);
    assert_approx_eq!(record.calories_burned.unwrap(), expected / 1000.0 * 70.0, 1e-9);
  }

  #[test]
  fn test_fixes_while_paused_are_dropped() {
    let t0 = Instant::now();
    let mut session = TrackingSession::new();
    session.start("Running", t0);
    session.record_fix(fix_at(0.0, 0.0, 0));
    session.pause(t0 + ms(1000));

    assert!(!session.record_fix(fix_at(1.0, 1.0, 5)));
    assert_eq!(session.fixes().len(), 1);
    assert_eq!(session.distance_meters(), 0.0);
  }

  #[test]
  fn test_invalid_coordinates_are_dropped() {
    let t0 = Instant::now();
    let mut session = TrackingSession::new();
    session.start("Running", t0);

    assert!(session.record_fix(fix_at(0.0, 0.0, 0)));
    assert!(!session.record_fix(fix_at(f64::NAN, 0.0, 5)));
    assert!(!session.record_fix(fix_at(0.0, f64::INFINITY, 6)));
    assert!(!session.record_fix(fix_at(95.0, 0.0, 7)));
    assert!(session.record_fix(fix_at(0.0, 0.001, 10)));

    let record = session.stop(t0 + ms(10_000), at(test_date(), 8, 0), 70.0, 1.036).unwrap();
    assert!(record.distance_meters.unwrap().is_finite());
    assert_eq!(record.route_path.as_ref().unwrap().len(), 2);
    assert!(record.validate().is_ok());
  }

  #[test]
  fn test_speeds() {
    let t0 = Instant::now();
    let mut session = TrackingSession::new();
    session.start("Cycling", t0);
    session.record_fix(fix_at(0.0, 0.0, 0));
    session.record_fix(fix_at(0.0, 0.001, 10));
    // Same timestamp: counts toward distance, not toward max speed
    session.record_fix(fix_at(0.0, 0.01, 10));

    let first_segment = haversine_meters(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.001));
    let record = session
      .stop(t0 + ms(60_000), at(test_date(), 8, 1), 70.0, 1.036)
      .unwrap();

    assert_approx_eq!(record.max_speed_kmh.unwrap(), first_segment / 10.0 * 3.6, 1e-9);
    let km = record.distance_meters.unwrap() / 1000.0;
    assert_approx_eq!(record.average_speed_kmh.unwrap(), km * 60.0, 1e-9);
  }

  #[test]
  fn test_stop_without_fixes() {
    let t0 = Instant::now();
    let mut session = TrackingSession::new();
    session.start("Yoga", t0);
    session.pause(t0);

    let record = session.stop(t0 + ms(10), at(test_date(), 8, 0), 70.0, 1.036).unwrap();
    assert_eq!(record.duration_millis, 0);
    assert_eq!(record.distance_meters, Some(0.0));
    assert_eq!(record.calories_burned, Some(0.0));
    assert!(record.average_speed_kmh.is_none());
    assert!(record.max_speed_kmh.is_none());
    assert!(record.route_path.is_none());
    assert_eq!(record.activity_type, "Yoga");
    assert!(record.validate().is_ok());
  }
}
