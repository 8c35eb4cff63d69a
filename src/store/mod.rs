//! Record Store
//!
//! Typed access to the local SQLite database for every record kind:
//! - activities (logged by hand or produced by a tracking session)
//! - typed user goals with soft deactivation
//! - the single-user profile
//! - per-day weight and sleep records
//!
//! Every successful write is announced on a change feed so live queries
//! (see [`LiveQuery`]) can re-run and re-emit.

mod activities;
mod goals;
mod live;
mod profile;
mod wellness;

pub use live::LiveQuery;

use std::future::Future;

use tokio::sync::broadcast;

use crate::db::DbPool;

/// Change notifications are coalesced by live queries, so a small buffer is enough.
const CHANGE_FEED_CAPACITY: usize = 64;

/// Tables that announce writes on the change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Activities,
  Goals,
  Profile,
  Weights,
  Sleep,
}

/// Handle to the record store. Cheap to clone; clones share the pool and the feed.
#[derive(Debug, Clone)]
pub struct RecordStore {
  pool: DbPool,
  changes: broadcast::Sender<Table>,
}

impl RecordStore {
  pub fn new(pool: DbPool) -> Self {
    let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
    Self { pool, changes }
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  /// Raw change feed: one message per committed write
  pub fn subscribe(&self) -> broadcast::Receiver<Table> {
    self.changes.subscribe()
  }

  /// Run `query` now and again after every write to one of `tables`
  pub fn live<T, F, Fut>(&self, tables: &[Table], query: F) -> LiveQuery<T>
  where
    F: Fn(RecordStore) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, crate::error::StoreError>> + Send + 'static,
  {
    LiveQuery::new(self, tables, query)
  }

  fn notify(&self, table: Table) {
    // No receivers is fine: nobody is watching
    let _ = self.changes.send(table);
  }
}
