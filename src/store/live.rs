use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::broadcast::{
  self,
  error::{RecvError, TryRecvError},
};

use super::{RecordStore, Table};
use crate::error::StoreError;

type QueryFuture<T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send>>;
type QueryFn<T> = Arc<dyn Fn(RecordStore) -> QueryFuture<T> + Send + Sync>;

/// A query that re-runs whenever one of its tables is written.
///
/// The first `next()` yields the current snapshot. Each later `next()` waits
/// for a write to a watched table and yields a fresh snapshot, which may be
/// equal to the previous one. Notifications already queued when the wait ends
/// are folded into that snapshot. Dropping the value unsubscribes.
pub struct LiveQuery<T> {
  store: RecordStore,
  tables: Vec<Table>,
  changes: broadcast::Receiver<Table>,
  query: QueryFn<T>,
  primed: bool,
}

impl<T> LiveQuery<T> {
  pub(crate) fn new<F, Fut>(store: &RecordStore, tables: &[Table], query: F) -> Self
  where
    F: Fn(RecordStore) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
  {
    // Subscribe before the first read so no write can slip between them
    let changes = store.subscribe();
    Self {
      store: store.clone(),
      tables: tables.to_vec(),
      changes,
      query: Arc::new(move |store| Box::pin(query(store))),
      primed: false,
    }
  }

  pub async fn next(&mut self) -> Result<T, StoreError> {
    if self.primed {
      self.wait_for_change().await?;
    }
    self.primed = true;
    (self.query)(self.store.clone()).await
  }

  async fn wait_for_change(&mut self) -> Result<(), StoreError> {
    loop {
      match self.changes.recv().await {
        Ok(table) if self.tables.contains(&table) => break,
        Ok(_) => continue,
        Err(RecvError::Lagged(skipped)) => {
          tracing::debug!(skipped, "Live query lagged behind change feed");
          break;
        }
        Err(RecvError::Closed) => return Err(StoreError::Closed),
      }
    }
    self.drain_pending();
    Ok(())
  }

  /// Discard queued notifications; the query about to run observes them all
  fn drain_pending(&mut self) {
    loop {
      match self.changes.try_recv() {
        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
        Err(TryRecvError::Empty | TryRecvError::Closed) => break,
      }
    }
  }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LiveQuery")
      .field("tables", &self.tables)
      .field("primed", &self.primed)
      .finish()
  }
}
