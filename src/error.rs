//! Error types shared across the store, the tracking service and input validation.
//!
//! Every error serializes as its display string so a front end can show it as-is.

use serde::Serialize;

use crate::tracking::TrackingStatus;

/// ---------------------------------------------------------------------------
/// Record Store Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Invalid record: {0}")]
  Invalid(String),

  #[error("Failed to encode or decode stored JSON: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Record store change feed closed")]
  Closed,
}

/// ---------------------------------------------------------------------------
/// Tracking Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
  #[error("Cannot {command} while {status}")]
  InvalidState {
    command: &'static str,
    status: TrackingStatus,
  },

  /// The session has ended; the finished activity is held for `retry_save`
  #[error("Failed to save finished activity: {0}")]
  Persistence(#[source] StoreError),

  #[error("No finished activity is waiting to be saved")]
  NoPendingActivity,

  #[error("Tracking service is not running")]
  ServiceStopped,
}

/// Transient failure of the location source. Never fatal to a session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FixError {
  #[error("Location unavailable: {0}")]
  Unavailable(String),
}

/// ---------------------------------------------------------------------------
/// Input Validation Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
  #[error("{field}: {message}")]
  Field {
    field: &'static str,
    message: String,
  },
}

impl ValidationError {
  pub fn field(field: &'static str, message: impl Into<String>) -> Self {
    Self::Field {
      field,
      message: message.into(),
    }
  }
}

macro_rules! serialize_as_display {
  ($($ty:ty),+) => {
    $(
      impl Serialize for $ty {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
          S: serde::Serializer,
        {
          serializer.serialize_str(&self.to_string())
        }
      }
    )+
  };
}

serialize_as_display!(StoreError, TrackingError, FixError, ValidationError);
