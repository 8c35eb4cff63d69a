//! Live activity tracking
//!
//! - `session`: the pause-aware state machine and its metric accumulation
//! - `geo`: location fixes and great-circle distance
//! - `location`: the seam a platform location provider plugs into
//! - `service`: the single-task actor that owns a session and persists it

pub mod geo;
pub mod location;
pub mod service;
pub mod session;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use geo::{haversine_meters, Fix};
pub use location::{FixFeed, FixSubscription, LocationRequest, LocationSource};
pub use service::{LiveMetrics, TrackingHandle, TrackingService, TrackingSettings, TrackingStore};
pub use session::TrackingSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
  #[default]
  Idle,
  Tracking,
  Paused,
}

impl fmt::Display for TrackingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TrackingStatus::Idle => write!(f, "idle"),
      TrackingStatus::Tracking => write!(f, "tracking"),
      TrackingStatus::Paused => write!(f, "paused"),
    }
  }
}
