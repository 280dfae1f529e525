mod app;
mod domain;
pub mod error;
mod infra;
mod shared;

pub(crate) use app::logging;
pub(crate) use infra::{app_paths, profile, settings};

pub use app::notice::{
    BroadcastNoticeSink, NoticeLevel, NoticePayload, NoticeSink, TracingNoticeSink,
};
pub use app::real_time::{
    RealTimeConfig, RealTimeDeps, RealTimeProvider, RealTimeRuntime, RealTimeSnapshot,
    StartOutcome, StopOutcome,
};
pub use domain::location::{
    Coordinates, LocationSample, TrackingSession, DEFAULT_DISPLAY_COORDINATES,
    LAST_KNOWN_LOCATION_KEY,
};
pub use domain::notifications::{NotificationCategory, NotificationEvent};
pub use domain::simulator::{NotificationTemplate, SyntheticNotifications, TEMPLATE_CATALOG};
pub use error::{PositionErrorKind, RealTimeError};
pub use infra::local_storage::{FileLocalStorage, LocalStorage, MemoryLocalStorage};
pub use infra::positioning::{
    PositionDelivery, PositionOptions, PositionResult, PositionSink, PositionSource,
    SimulatedPositionSource, WatchId,
};
pub use infra::profile::{load_profile, save_profile, TravelUser};
pub use infra::settings::AppSettings;

use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Forwards every notice to the log; a UI host would render these as toasts instead.
fn spawn_notice_logger(sink: &BroadcastNoticeSink) -> JoinHandle<()> {
    let mut rx = sink.subscribe();
    tokio::spawn(async move {
        let log = TracingNoticeSink;
        loop {
            match rx.recv().await {
                Ok(payload) => log.notify(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notice logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn spawn_snapshot_logger(provider: &RealTimeProvider) -> JoinHandle<()> {
    let mut rx = provider.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            match snapshot.location {
                Some(sample) => tracing::info!(
                    latitude = sample.latitude,
                    longitude = sample.longitude,
                    accuracy_meters = sample.accuracy_meters,
                    tracking = snapshot.is_location_tracking,
                    unread = snapshot.unread_count,
                    "real-time state updated"
                ),
                None => tracing::info!(
                    tracking = snapshot.is_location_tracking,
                    unread = snapshot.unread_count,
                    "real-time state updated"
                ),
            }
        }
    })
}

/// Call after `logging::init` so repair warnings from `settings::read` reach the subscriber.
fn load_settings(app_dir: &Path, log_dir: &Path) -> AppSettings {
    let settings = match settings::read(app_dir) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!("settings read failed, using defaults: {}", err);
            AppSettings::default()
        }
    };
    logging::apply_retention(log_dir, settings.log_retention_days);
    settings
}

async fn log_display_location(provider: &RealTimeProvider) -> Coordinates {
    let coords = provider.display_location().await;
    tracing::info!(lat = coords.lat, lng = coords.lng, "display location");
    coords
}

/// Runs the companion core until Ctrl-C: loads settings, starts tracking, logs every state change.
pub async fn run() -> Result<(), String> {
    let app_dir = app_paths::app_data_dir()?;
    let log_dir = app_paths::log_dir(&app_dir);
    let _log_guard = logging::init(&log_dir);

    let settings = load_settings(&app_dir, &log_dir);

    let storage: Arc<dyn LocalStorage> = match FileLocalStorage::open(&app_dir) {
        Ok(storage) => Arc::new(storage),
        Err(err) => {
            tracing::warn!("local storage unavailable, state will not persist: {}", err);
            Arc::new(MemoryLocalStorage::new())
        }
    };
    let traveler = profile::load_profile(storage.as_ref());
    tracing::info!(name = %traveler.name, phone = %traveler.phone, "traveler profile loaded");

    let notices = Arc::new(BroadcastNoticeSink::default());
    let notice_logger = spawn_notice_logger(&notices);

    let position_source: Arc<dyn PositionSource> = Arc::new(SimulatedPositionSource::default());
    let mut runtime = RealTimeRuntime::start(
        RealTimeDeps {
            storage,
            position_source: Some(position_source),
            notices: notices.clone(),
        },
        RealTimeConfig::from(&settings),
    );
    let provider = runtime.provider();
    let snapshot_logger = spawn_snapshot_logger(&provider);

    log_display_location(&provider).await;

    match provider.start_tracking().await {
        Ok(outcome) => tracing::debug!(?outcome, "start tracking"),
        Err(err) => tracing::warn!("location tracking unavailable: {}", err),
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", err);
    }
    tracing::info!("shutting down");

    runtime.shutdown().await;
    snapshot_logger.abort();
    notice_logger.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::fs::test_support::unique_tmp_dir;

    #[test]
    fn load_settings_falls_back_to_defaults_on_broken_file() {
        let dir = unique_tmp_dir("run");
        std::fs::write(settings::settings_path(&dir), "{ broken").expect("write");
        let settings = load_settings(&dir, &app_paths::log_dir(&dir));
        assert_eq!(settings, AppSettings::default());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_settings_creates_file_on_first_run() {
        let dir = unique_tmp_dir("run");
        let settings = load_settings(&dir, &app_paths::log_dir(&dir));
        assert_eq!(settings.log_retention_days, 7);
        assert!(settings::settings_path(&dir).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn display_location_is_logged_and_returned() {
        let mut runtime = RealTimeRuntime::start(
            RealTimeDeps {
                storage: Arc::new(MemoryLocalStorage::new()),
                position_source: None,
                notices: Arc::new(TracingNoticeSink),
            },
            RealTimeConfig {
                synthetic_notifications: None,
                ..RealTimeConfig::default()
            },
        );
        let coords = log_display_location(&runtime.provider()).await;
        assert_eq!(coords, DEFAULT_DISPLAY_COORDINATES);
        runtime.shutdown().await;
    }
}
