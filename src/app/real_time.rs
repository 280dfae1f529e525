//! Usage: Real-time state provider (single update loop owning location + notification state).
//!
//! All mutation is serialized through one task; consumers hold a cloneable `RealTimeProvider`
//! handle and only ever see published `RealTimeSnapshot`s.

use crate::app::cleanup;
use crate::app::notice::{self, NoticeLevel, NoticeSink};
use crate::domain::location::{self, Coordinates, LocationSample, LocationTracker};
use crate::domain::notifications::{NotificationCategory, NotificationEvent, NotificationFeed};
use crate::domain::simulator::SyntheticNotifications;
use crate::error::RealTimeError;
use crate::infra::local_storage::LocalStorage;
use crate::infra::positioning::{PositionDelivery, PositionOptions, PositionSink, PositionSource};
use crate::settings::AppSettings;
use crate::shared::time::now_unix_millis;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const COMMAND_BUFFER_CAPACITY: usize = 64;
const POSITION_BUFFER_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    AlreadyInactive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealTimeSnapshot {
    pub location: Option<LocationSample>,
    pub is_location_tracking: bool,
    pub notifications: Vec<NotificationEvent>,
    pub unread_count: usize,
}

/// External collaborators; `position_source: None` means the host has no positioning capability.
#[derive(Clone)]
pub struct RealTimeDeps {
    pub storage: Arc<dyn LocalStorage>,
    pub position_source: Option<Arc<dyn PositionSource>>,
    pub notices: Arc<dyn NoticeSink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealTimeConfig {
    pub position_options: PositionOptions,
    pub seed_demo_notifications: bool,
    pub synthetic_notifications: Option<SyntheticNotifications>,
    pub rng_seed: Option<u64>,
}

impl Default for RealTimeConfig {
    fn default() -> Self {
        Self {
            position_options: PositionOptions::default(),
            seed_demo_notifications: true,
            synthetic_notifications: Some(SyntheticNotifications::default()),
            rng_seed: None,
        }
    }
}

impl From<&AppSettings> for RealTimeConfig {
    fn from(settings: &AppSettings) -> Self {
        let synthetic = &settings.synthetic_notifications;
        Self {
            position_options: PositionOptions {
                enable_high_accuracy: settings.location.enable_high_accuracy,
                timeout: Duration::from_millis(settings.location.timeout_ms),
                maximum_age: Duration::from_millis(settings.location.maximum_age_ms),
            },
            seed_demo_notifications: settings.seed_demo_notifications,
            synthetic_notifications: synthetic.enabled.then(|| {
                SyntheticNotifications::new(
                    Duration::from_secs(synthetic.interval_seconds),
                    synthetic.probability,
                )
            }),
            rng_seed: None,
        }
    }
}

enum Command {
    StartTracking(oneshot::Sender<Result<StartOutcome, RealTimeError>>),
    StopTracking(oneshot::Sender<StopOutcome>),
    AddNotification {
        title: String,
        message: String,
        category: NotificationCategory,
        reply: oneshot::Sender<NotificationEvent>,
    },
    MarkRead {
        id: String,
        reply: oneshot::Sender<bool>,
    },
    ClearAll(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Cheap cloneable handle: action calls go to the update loop, reads come from the last snapshot.
#[derive(Clone)]
pub struct RealTimeProvider {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<RealTimeSnapshot>,
    position_source: Option<Arc<dyn PositionSource>>,
    position_options: PositionOptions,
}

impl RealTimeProvider {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RealTimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| RealTimeError::Closed)?;
        reply_rx.await.map_err(|_| RealTimeError::Closed)
    }

    pub async fn start_tracking(&self) -> Result<StartOutcome, RealTimeError> {
        self.request(Command::StartTracking).await?
    }

    pub async fn stop_tracking(&self) -> Result<StopOutcome, RealTimeError> {
        self.request(Command::StopTracking).await
    }

    pub async fn add_notification(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        category: NotificationCategory,
    ) -> Result<NotificationEvent, RealTimeError> {
        let title = title.into();
        let message = message.into();
        self.request(move |reply| Command::AddNotification {
            title,
            message,
            category,
            reply,
        })
        .await
    }

    /// `Ok(false)` when no event has `id`.
    pub async fn mark_read(&self, id: impl Into<String>) -> Result<bool, RealTimeError> {
        let id = id.into();
        self.request(move |reply| Command::MarkRead { id, reply })
            .await
    }

    pub async fn clear_all(&self) -> Result<(), RealTimeError> {
        self.request(Command::ClearAll).await
    }

    pub fn current_sample(&self) -> Option<LocationSample> {
        self.snapshot.borrow().location
    }

    pub fn is_tracking(&self) -> bool {
        self.snapshot.borrow().is_location_tracking
    }

    pub fn notifications(&self) -> Vec<NotificationEvent> {
        self.snapshot.borrow().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.snapshot.borrow().unread_count
    }

    pub fn snapshot(&self) -> RealTimeSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RealTimeSnapshot> {
        self.snapshot.clone()
    }

    pub async fn display_location(&self) -> Coordinates {
        location::resolve_display_location(
            self.current_sample(),
            self.position_source.as_deref(),
            self.position_options,
        )
        .await
    }

    pub(crate) async fn shutdown_loop(&self) -> Result<(), RealTimeError> {
        self.request(Command::Shutdown).await
    }
}

struct RealTimeCore {
    tracker: LocationTracker,
    feed: NotificationFeed,
    position_source: Option<Arc<dyn PositionSource>>,
    position_options: PositionOptions,
    position_tx: mpsc::Sender<PositionDelivery>,
    notices: Arc<dyn NoticeSink>,
    snapshot_tx: watch::Sender<RealTimeSnapshot>,
}

impl RealTimeCore {
    fn snapshot(&self) -> RealTimeSnapshot {
        build_snapshot(&self.tracker, &self.feed)
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn notify(&self, level: NoticeLevel, title: &str, body: &str) {
        self.notices
            .notify(notice::build(level, Some(title.to_string()), body.to_string()));
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::StartTracking(reply) => {
                let _ = reply.send(self.start_tracking());
            }
            Command::StopTracking(reply) => {
                let _ = reply.send(self.stop_tracking());
            }
            Command::AddNotification {
                title,
                message,
                category,
                reply,
            } => {
                let _ = reply.send(self.add_notification(&title, &message, category));
            }
            Command::MarkRead { id, reply } => {
                let matched = self.feed.mark_read(&id);
                if matched {
                    self.publish();
                } else {
                    tracing::debug!(id = %id, "mark_read: unknown notification id");
                }
                let _ = reply.send(matched);
            }
            Command::ClearAll(reply) => {
                self.feed.clear_all();
                self.publish();
                let _ = reply.send(());
            }
            Command::Shutdown(reply) => {
                self.teardown();
                let _ = reply.send(());
            }
        }
    }

    fn start_tracking(&mut self) -> Result<StartOutcome, RealTimeError> {
        let Some(source) = self.position_source.clone() else {
            tracing::warn!("location tracking requested but no positioning capability is available");
            self.notify(
                NoticeLevel::Error,
                "Location not supported",
                "Your device doesn't support location tracking",
            );
            return Err(RealTimeError::CapabilityUnavailable);
        };

        let Some(watch_id) = self.tracker.begin() else {
            return Ok(StartOutcome::AlreadyActive);
        };

        source.watch_position(
            self.position_options,
            PositionSink::new(watch_id, self.position_tx.clone()),
        );
        tracing::info!(watch_id = %watch_id, "location tracking started");
        self.publish();
        self.notify(
            NoticeLevel::Success,
            "Location Tracking Started",
            "We're now tracking your location for better trip planning",
        );
        Ok(StartOutcome::Started)
    }

    fn stop_tracking(&mut self) -> StopOutcome {
        if !self.end_watch() {
            return StopOutcome::AlreadyInactive;
        }
        self.notify(
            NoticeLevel::Info,
            "Location Tracking Stopped",
            "Location tracking has been disabled",
        );
        StopOutcome::Stopped
    }

    fn end_watch(&mut self) -> bool {
        let Some(watch_id) = self.tracker.end() else {
            return false;
        };
        if let Some(source) = &self.position_source {
            source.clear_watch(watch_id);
        }
        tracing::info!(watch_id = %watch_id, "location tracking stopped");
        self.publish();
        true
    }

    fn apply_delivery(&mut self, delivery: PositionDelivery) {
        match delivery.result {
            Ok(sample) => {
                if self.tracker.apply_fix(delivery.watch_id, sample) {
                    self.publish();
                }
            }
            Err(kind) => {
                if !self.tracker.accepts(delivery.watch_id) {
                    return;
                }
                // The watch stays registered; the source keeps retrying on its own.
                tracing::warn!(watch_id = %delivery.watch_id, "location error: {}", kind);
                self.notify(
                    NoticeLevel::Error,
                    "Location Error",
                    "Unable to get your current location",
                );
            }
        }
    }

    fn add_notification(
        &mut self,
        title: &str,
        message: &str,
        category: NotificationCategory,
    ) -> NotificationEvent {
        let event = self.feed.add(title, message, category, now_unix_millis());
        tracing::info!(id = %event.id(), category = %event.category(), "notification added");
        self.publish();
        self.notify(NoticeLevel::Info, title, message);
        event
    }

    fn teardown(&mut self) {
        self.end_watch();
    }
}

fn build_snapshot(tracker: &LocationTracker, feed: &NotificationFeed) -> RealTimeSnapshot {
    RealTimeSnapshot {
        location: tracker.current(),
        is_location_tracking: tracker.session().is_active(),
        notifications: feed.events().to_vec(),
        unread_count: feed.unread_count(),
    }
}

async fn run_loop(
    mut core: RealTimeCore,
    mut commands: mpsc::Receiver<Command>,
    mut positions: mpsc::Receiver<PositionDelivery>,
) {
    loop {
        tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(Command::Shutdown(reply)) => {
                    core.teardown();
                    let _ = reply.send(());
                    break;
                }
                Some(command) => core.handle(command),
                None => {
                    core.teardown();
                    break;
                }
            },
            Some(delivery) = positions.recv() => core.apply_delivery(delivery),
        }
    }
    tracing::debug!("real-time update loop exited");
}

fn spawn_synthetic_generator(
    provider: RealTimeProvider,
    generator: SyntheticNotifications,
    mut rng: StdRng,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = generator.interval();
        // First tick one full period after start, like a browser interval.
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(template) = generator.roll(&mut rng) else {
                continue;
            };
            if let Err(err) = provider
                .add_notification(template.title, template.message, template.category)
                .await
            {
                tracing::debug!("synthetic notifications stopped: {}", err);
                break;
            }
        }
    })
}

/// Owns the background tasks behind a `RealTimeProvider`; dropping it without `shutdown` aborts them.
pub struct RealTimeRuntime {
    provider: RealTimeProvider,
    loop_task: Option<JoinHandle<()>>,
    generator_task: Option<JoinHandle<()>>,
}

impl RealTimeRuntime {
    /// Rehydrates persisted state, seeds the feed and spawns the update loop. Needs a tokio runtime.
    pub fn start(deps: RealTimeDeps, config: RealTimeConfig) -> Self {
        let tracker = LocationTracker::rehydrate(deps.storage.clone());
        let feed = if config.seed_demo_notifications {
            NotificationFeed::seeded(now_unix_millis())
        } else {
            NotificationFeed::new()
        };

        let (snapshot_tx, snapshot_rx) = watch::channel(build_snapshot(&tracker, &feed));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_CAPACITY);
        let (position_tx, position_rx) = mpsc::channel(POSITION_BUFFER_CAPACITY);

        let core = RealTimeCore {
            tracker,
            feed,
            position_source: deps.position_source.clone(),
            position_options: config.position_options,
            position_tx,
            notices: deps.notices,
            snapshot_tx,
        };
        let loop_task = tokio::spawn(run_loop(core, command_rx, position_rx));

        let provider = RealTimeProvider {
            commands: command_tx,
            snapshot: snapshot_rx,
            position_source: deps.position_source,
            position_options: config.position_options,
        };

        let generator_task = config.synthetic_notifications.map(|generator| {
            let rng = match config.rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            tracing::debug!(
                interval_ms = generator.interval().as_millis() as u64,
                probability = generator.probability(),
                "synthetic notifications enabled"
            );
            spawn_synthetic_generator(provider.clone(), generator, rng)
        });

        Self {
            provider,
            loop_task: Some(loop_task),
            generator_task,
        }
    }

    pub fn provider(&self) -> RealTimeProvider {
        self.provider.clone()
    }

    /// Stops the generator, cancels any active watch and ends the update loop. Idempotent.
    pub async fn shutdown(&mut self) {
        let generator_task = self.generator_task.take();
        let loop_task = self.loop_task.take();
        cleanup::stop_real_time_best_effort(&self.provider, generator_task, loop_task).await;
    }
}

impl Drop for RealTimeRuntime {
    fn drop(&mut self) {
        if let Some(task) = self.generator_task.take() {
            task.abort();
        }
        if let Some(task) = self.loop_task.take() {
            task.abort();
        }
    }
}
