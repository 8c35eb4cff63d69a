pub mod config;
pub mod db;
pub mod error;
pub mod goals;
pub mod logging;
pub mod models;
pub mod store;
pub mod summary;
pub mod time_utils;
pub mod tracking;
pub mod units;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use config::Config;
use db::DbPool;
use error::StoreError;
use store::RecordStore;
use tracking::{FixFeed, TrackingHandle, TrackingService, TrackingSettings};

/// Everything a host application needs, wired once at startup
#[derive(Debug, Clone)]
pub struct AppState {
  pub config: Config,
  pub db: DbPool,
  pub store: RecordStore,
  /// The platform location binding publishes fixes here
  pub location: Arc<FixFeed>,
  pub tracking: TrackingHandle,
}

impl AppState {
  /// Open the database, run migrations and spawn the tracking service.
  ///
  /// Must be called from inside a tokio runtime.
  pub async fn initialize(config: Config) -> Result<Self, StoreError> {
    let db = db::initialize_db(&config).await?;
    let store = RecordStore::new(db.clone());
    let location = Arc::new(FixFeed::new());

    let tracking = TrackingService::spawn(
      Arc::new(store.clone()),
      location.clone(),
      TrackingSettings::from(&config),
    );

    tracing::info!("Application state ready");

    Ok(Self {
      config,
      db,
      store,
      location,
      tracking,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tracking::TrackingStatus;

  #[tokio::test]
  async fn test_initialize_wires_components() {
    let config = Config {
      database_url: "sqlite::memory:".to_string(),
      max_connections: 1,
      ..Config::default()
    };

    let state = AppState::initialize(config).await.unwrap();
    assert_eq!(state.tracking.status(), TrackingStatus::Idle);
    assert!(state.store.list_activities().await.unwrap().is_empty());

    state.tracking.start("Running").await.unwrap();
    assert!(state.location.is_subscribed());

    let record = state.tracking.stop().await.unwrap();
    let saved = state.store.get_activity(record.id).await.unwrap();
    assert_eq!(saved, Some(record));
  }
}
