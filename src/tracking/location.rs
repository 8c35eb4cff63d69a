//! Location fix source
//!
//! A session subscribes when it starts or resumes and drops its subscription
//! when it pauses or stops. Once the receiver is dropped, nothing sent after
//! that point can reach the session.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::geo::Fix;
use crate::error::FixError;

/// Fixes buffered per subscription before the source starts dropping them
const SUBSCRIPTION_CAPACITY: usize = 32;

pub type FixSubscription = mpsc::Receiver<Result<Fix, FixError>>;

/// Requested delivery cadence, passed to the source on each subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
  pub interval: Duration,
  pub fastest_interval: Duration,
}

pub trait LocationSource: Send + Sync {
  /// Begin delivering fixes. Replaces any earlier subscription.
  fn subscribe(&self, request: LocationRequest) -> FixSubscription;
}

/// In-process location source. The platform binding calls [`FixFeed::publish`]
/// from its location callback.
#[derive(Debug, Default)]
pub struct FixFeed {
  subscriber: Mutex<Option<Subscriber>>,
}

#[derive(Debug)]
struct Subscriber {
  request: LocationRequest,
  sender: mpsc::Sender<Result<Fix, FixError>>,
}

impl FixFeed {
  pub fn new() -> Self {
    Self::default()
  }

  fn subscriber(&self) -> MutexGuard<'_, Option<Subscriber>> {
    self.subscriber.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Forward a fix or a transient error to the current subscriber.
  ///
  /// Returns `false` when nobody is listening, the subscription was revoked,
  /// or its buffer is full.
  pub fn publish(&self, fix: Result<Fix, FixError>) -> bool {
    let mut guard = self.subscriber();
    let Some(subscriber) = guard.as_ref() else {
      return false;
    };

    match subscriber.sender.try_send(fix) {
      Ok(()) => true,
      Err(TrySendError::Closed(_)) => {
        tracing::debug!("Location subscription revoked");
        *guard = None;
        false
      }
      Err(TrySendError::Full(_)) => {
        tracing::warn!("Location subscriber is behind, dropping fix");
        false
      }
    }
  }

  /// The cadence requested by the live subscriber, if there is one
  pub fn active_request(&self) -> Option<LocationRequest> {
    self
      .subscriber()
      .as_ref()
      .filter(|s| !s.sender.is_closed())
      .map(|s| s.request)
  }

  pub fn is_subscribed(&self) -> bool {
    self.active_request().is_some()
  }
}

impl LocationSource for FixFeed {
  fn subscribe(&self, request: LocationRequest) -> FixSubscription {
    let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);
    tracing::debug!(
      interval_ms = request.interval.as_millis() as u64,
      fastest_interval_ms = request.fastest_interval.as_millis() as u64,
      "Location updates requested"
    );
    *self.subscriber() = Some(Subscriber { request, sender });
    receiver
  }
}
