//! Tracking service
//!
//! One spawned task owns the [`TrackingSession`], the location subscription
//! and any activity whose save failed. Commands arrive over a channel and are
//! handled one at a time, interleaved with fix deliveries, so a `stop` can
//! never race a `pause` and a fix is never applied mid-transition.
//!
//! The location subscription is dropped before a pause or stop is
//! acknowledged, so no fix sent after that point reaches the session.

use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, Instant, MissedTickBehavior};

use super::geo::{Fix, GeoPoint};
use super::location::{FixSubscription, LocationRequest, LocationSource};
use super::session::TrackingSession;
use super::TrackingStatus;
use crate::config::Config;
use crate::error::{FixError, StoreError, TrackingError};
use crate::models::{ActivityRecord, NewActivityRecord};
use crate::store::RecordStore;

const COMMAND_BUFFER: usize = 16;

/// ---------------------------------------------------------------------------
/// Persistence Seam
/// ---------------------------------------------------------------------------

/// What the tracking service needs from storage
#[async_trait]
pub trait TrackingStore: Send + Sync {
  /// Persist a finished activity, returning its id
  async fn save_activity(&self, activity: &NewActivityRecord) -> Result<i64, StoreError>;

  async fn body_weight_kg(&self) -> Result<Option<f64>, StoreError>;
}

#[async_trait]
impl TrackingStore for RecordStore {
  async fn save_activity(&self, activity: &NewActivityRecord) -> Result<i64, StoreError> {
    self.insert_activity(activity).await
  }

  async fn body_weight_kg(&self) -> Result<Option<f64>, StoreError> {
    RecordStore::body_weight_kg(self).await
  }
}

/// ---------------------------------------------------------------------------
/// Settings and Live Output
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
  pub location: LocationRequest,
  /// Republish cadence for live metrics while tracking
  pub live_tick: Duration,
  pub fallback_weight_kg: f64,
  pub met_coefficient: f64,
}

impl From<&Config> for TrackingSettings {
  fn from(config: &Config) -> Self {
    Self {
      location: LocationRequest {
        interval: config.location_interval,
        fastest_interval: config.fastest_location_interval,
      },
      live_tick: config.live_tick,
      fallback_weight_kg: config.fallback_weight_kg,
      met_coefficient: config.met_coefficient,
    }
  }
}

impl Default for TrackingSettings {
  fn default() -> Self {
    Self::from(&Config::default())
  }
}

/// Snapshot of the in-progress session for observers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveMetrics {
  pub status: TrackingStatus,
  pub activity_type: Option<String>,
  pub elapsed: Duration,
  pub distance_meters: f64,
  pub path: Vec<GeoPoint>,
}

impl LiveMetrics {
  fn of(session: &TrackingSession, now: Instant) -> Self {
    Self {
      status: session.status(),
      activity_type: session.activity_type().map(str::to_owned),
      elapsed: session.elapsed(now),
      distance_meters: session.distance_meters(),
      path: session.path(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Handle
/// ---------------------------------------------------------------------------

type Reply<T> = oneshot::Sender<T>;

enum Command {
  Start {
    activity_type: String,
    reply: Reply<TrackingStatus>,
  },
  Pause {
    reply: Reply<TrackingStatus>,
  },
  Resume {
    reply: Reply<TrackingStatus>,
  },
  Stop {
    reply: Reply<Result<ActivityRecord, TrackingError>>,
  },
  RetrySave {
    reply: Reply<Result<ActivityRecord, TrackingError>>,
  },
  PendingActivity {
    reply: Reply<Option<NewActivityRecord>>,
  },
  DiscardPending {
    reply: Reply<Option<NewActivityRecord>>,
  },
  Shutdown {
    reply: Reply<()>,
  },
}

/// Cloneable front door to the tracking task. The task exits once every
/// handle is dropped or [`TrackingHandle::shutdown`] is called.
#[derive(Debug, Clone)]
pub struct TrackingHandle {
  commands: mpsc::Sender<Command>,
  live: watch::Receiver<LiveMetrics>,
}

impl TrackingHandle {
  async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, TrackingError> {
    let (reply, response) = oneshot::channel();
    self
      .commands
      .send(command(reply))
      .await
      .map_err(|_| TrackingError::ServiceStopped)?;
    response.await.map_err(|_| TrackingError::ServiceStopped)
  }

  /// Start a session, or resume the existing one
  pub async fn start(&self, activity_type: impl Into<String>) -> Result<TrackingStatus, TrackingError> {
    let activity_type = activity_type.into();
    self
      .request(|reply| Command::Start { activity_type, reply })
      .await
  }

  pub async fn pause(&self) -> Result<TrackingStatus, TrackingError> {
    self.request(|reply| Command::Pause { reply }).await
  }

  pub async fn resume(&self) -> Result<TrackingStatus, TrackingError> {
    self.request(|reply| Command::Resume { reply }).await
  }

  /// End the session and persist it.
  ///
  /// If the save fails the session is still over; the finished activity is
  /// held for [`retry_save`](Self::retry_save).
  pub async fn stop(&self) -> Result<ActivityRecord, TrackingError> {
    self.request(|reply| Command::Stop { reply }).await?
  }

  pub async fn retry_save(&self) -> Result<ActivityRecord, TrackingError> {
    self.request(|reply| Command::RetrySave { reply }).await?
  }

  pub async fn pending_activity(&self) -> Result<Option<NewActivityRecord>, TrackingError> {
    self.request(|reply| Command::PendingActivity { reply }).await
  }

  /// Drop the unsaved activity, returning it if there was one
  pub async fn discard_pending(&self) -> Result<Option<NewActivityRecord>, TrackingError> {
    self.request(|reply| Command::DiscardPending { reply }).await
  }

  pub fn live(&self) -> watch::Receiver<LiveMetrics> {
    self.live.clone()
  }

  pub fn status(&self) -> TrackingStatus {
    self.live.borrow().status
  }

  /// Stop the task. An in-progress session is discarded.
  pub async fn shutdown(&self) -> Result<(), TrackingError> {
    self.request(|reply| Command::Shutdown { reply }).await
  }
}

/// ---------------------------------------------------------------------------
/// Service Task
/// ---------------------------------------------------------------------------

pub struct TrackingService {
  session: TrackingSession,
  store: Arc<dyn TrackingStore>,
  location: Arc<dyn LocationSource>,
  settings: TrackingSettings,
  fixes: Option<FixSubscription>,
  pending: Option<NewActivityRecord>,
  live: watch::Sender<LiveMetrics>,
}

impl TrackingService {
  /// Spawn the service task on the current tokio runtime
  pub fn spawn(
    store: Arc<dyn TrackingStore>,
    location: Arc<dyn LocationSource>,
    mut settings: TrackingSettings,
  ) -> TrackingHandle {
    if settings.live_tick.is_zero() {
      let fallback = TrackingSettings::default().live_tick;
      tracing::warn!(
        live_tick_ms = fallback.as_millis() as u64,
        "Live tick must be positive, using default"
      );
      settings.live_tick = fallback;
    }

    let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (live, live_rx) = watch::channel(LiveMetrics::default());

    let service = Self {
      session: TrackingSession::new(),
      store,
      location,
      settings,
      fixes: None,
      pending: None,
      live,
    };
    tokio::spawn(service.run(command_rx));

    TrackingHandle {
      commands,
      live: live_rx,
    }
  }

  async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
    let mut tick = tokio::time::interval(self.settings.live_tick);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!("Tracking service started");

    let shutdown_reply = loop {
      tokio::select! {
        command = commands.recv() => match command {
          Some(command) => {
            if let ControlFlow::Break(reply) = self.handle(command).await {
              break Some(reply);
            }
          }
          None => break None,
        },
        delivery = next_fix(&mut self.fixes) => match delivery {
          Some(delivery) => self.on_fix(delivery),
          None => {
            tracing::warn!("Location source ended the subscription");
            self.fixes = None;
          }
        },
        _ = tick.tick(), if self.session.status() == TrackingStatus::Tracking => self.publish(),
      }
    };

    self.fixes = None;
    if self.session.status() != TrackingStatus::Idle {
      tracing::warn!(
        activity_type = self.session.activity_type().unwrap_or_default(),
        "Tracking service stopping, discarding unfinished session"
      );
    }
    if self.pending.is_some() {
      tracing::warn!("Tracking service stopping with an unsaved activity");
    }
    tracing::debug!("Tracking service stopped");

    drop(commands);
    if let Some(reply) = shutdown_reply {
      let _ = reply.send(());
    }
  }

  async fn handle(&mut self, command: Command) -> ControlFlow<Reply<()>> {
    match command {
      Command::Start { activity_type, reply } => {
        let now = Instant::now();
        if self.session.start(activity_type, now) {
          tracing::info!(
            activity_type = self.session.activity_type().unwrap_or_default(),
            "Tracking session started"
          );
        }
        self.ensure_subscribed();
        self.publish();
        let _ = reply.send(self.session.status());
      }
      Command::Pause { reply } => {
        if self.session.pause(Instant::now()) {
          self.fixes = None;
          tracing::debug!("Tracking session paused");
        }
        self.publish();
        let _ = reply.send(self.session.status());
      }
      Command::Resume { reply } => {
        if self.session.resume(Instant::now()) {
          tracing::debug!("Tracking session resumed");
        }
        self.ensure_subscribed();
        self.publish();
        let _ = reply.send(self.session.status());
      }
      Command::Stop { reply } => {
        let result = self.stop().await;
        let _ = reply.send(result);
      }
      Command::RetrySave { reply } => {
        let result = match self.pending.take() {
          Some(activity) => self.persist(activity).await,
          None => Err(TrackingError::NoPendingActivity),
        };
        let _ = reply.send(result);
      }
      Command::PendingActivity { reply } => {
        let _ = reply.send(self.pending.clone());
      }
      Command::DiscardPending { reply } => {
        let discarded = self.pending.take();
        if discarded.is_some() {
          tracing::info!("Unsaved activity discarded");
        }
        let _ = reply.send(discarded);
      }
      Command::Shutdown { reply } => return ControlFlow::Break(reply),
    }
    ControlFlow::Continue(())
  }

  async fn stop(&mut self) -> Result<ActivityRecord, TrackingError> {
    if self.session.status() == TrackingStatus::Idle {
      return Err(TrackingError::InvalidState {
        command: "stop",
        status: TrackingStatus::Idle,
      });
    }

    let now = Instant::now();
    let ended_at = Utc::now();
    self.fixes = None;

    let weight_kg = self.weight_kg().await;
    let activity = self
      .session
      .stop(now, ended_at, weight_kg, self.settings.met_coefficient)?;
    self.publish();

    tracing::info!(
      activity_type = %activity.activity_type,
      duration_millis = activity.duration_millis,
      distance_meters = activity.distance_meters.unwrap_or_default(),
      "Tracking session stopped"
    );

    self.persist(activity).await
  }

  async fn persist(&mut self, activity: NewActivityRecord) -> Result<ActivityRecord, TrackingError> {
    match self.store.save_activity(&activity).await {
      Ok(id) => {
        tracing::info!(activity_id = id, "Tracked activity saved");
        Ok(activity.with_id(id))
      }
      Err(err) => {
        tracing::error!(error = %err, "Failed to save tracked activity");
        if self.pending.is_some() {
          tracing::warn!("Replacing an older unsaved activity");
        }
        self.pending = Some(activity);
        Err(TrackingError::Persistence(err))
      }
    }
  }

  async fn weight_kg(&self) -> f64 {
    match self.store.body_weight_kg().await {
      Ok(Some(weight)) if weight > 0.0 => weight,
      Ok(_) => self.settings.fallback_weight_kg,
      Err(err) => {
        tracing::warn!(error = %err, "Could not read body weight, using fallback");
        self.settings.fallback_weight_kg
      }
    }
  }

  fn ensure_subscribed(&mut self) {
    if self.session.status() == TrackingStatus::Tracking && self.fixes.is_none() {
      self.fixes = Some(self.location.subscribe(self.settings.location));
    }
  }

  fn on_fix(&mut self, delivery: Result<Fix, FixError>) {
    match delivery {
      Ok(fix) if !fix.point.is_valid() => {
        tracing::warn!(
          latitude = fix.point.latitude,
          longitude = fix.point.longitude,
          "Dropped location fix with invalid coordinates"
        );
      }
      Ok(fix) => {
        if self.session.record_fix(fix) {
          self.publish();
        } else {
          tracing::debug!("Dropped location fix outside of tracking");
        }
      }
      Err(err) => tracing::warn!(error = %err, "Location fix failed"),
    }
  }

  fn publish(&self) {
    self
      .live
      .send_replace(LiveMetrics::of(&self.session, Instant::now()));
  }
}

async fn next_fix(fixes: &mut Option<FixSubscription>) -> Option<Result<Fix, FixError>> {
  match fixes {
    Some(receiver) => receiver.recv().await,
    None => std::future::pending().await,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
