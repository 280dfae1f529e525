//! Usage: Location tracking state (session lifecycle, latest sample, last-known persistence).

use crate::error::RealTimeError;
use crate::infra::local_storage::LocalStorage;
use crate::infra::positioning::{PositionOptions, PositionSource, WatchId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const LAST_KNOWN_LOCATION_KEY: &str = "lastKnownLocation";

/// Shown when neither a sample nor a positioning reading is available (New York City).
pub const DEFAULT_DISPLAY_COORDINATES: Coordinates = Coordinates {
    lat: 40.7128,
    lng: -74.006,
};

/// One reading from the positioning source. `captured_at` is the source timestamp (unix ms).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "accuracy")]
    pub accuracy_meters: f64,
    #[serde(rename = "timestamp")]
    pub captured_at: i64,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64, captured_at: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            captured_at,
        }
    }

    pub fn is_plausible(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.accuracy_meters.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy_meters >= 0.0
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingSession {
    #[default]
    Inactive,
    Active {
        watch_id: WatchId,
    },
}

impl TrackingSession {
    pub fn is_active(&self) -> bool {
        matches!(self, TrackingSession::Active { .. })
    }

    pub fn watch_id(&self) -> Option<WatchId> {
        match self {
            TrackingSession::Active { watch_id } => Some(*watch_id),
            TrackingSession::Inactive => None,
        }
    }
}

pub fn encode_sample(sample: &LocationSample) -> Result<String, String> {
    serde_json::to_string(sample)
        .map_err(|e| format!("STORAGE_ERROR: failed to serialize location sample: {e}"))
}

pub fn decode_sample(raw: &str) -> Result<LocationSample, RealTimeError> {
    let sample: LocationSample = serde_json::from_str(raw).map_err(|e| {
        RealTimeError::PersistenceCorrupt(format!("{LAST_KNOWN_LOCATION_KEY}: {e}"))
    })?;
    if !sample.is_plausible() {
        return Err(RealTimeError::PersistenceCorrupt(format!(
            "{LAST_KNOWN_LOCATION_KEY}: coordinates out of range"
        )));
    }
    Ok(sample)
}

/// Owns the session and current sample; every accepted fix is written through to storage.
pub struct LocationTracker {
    storage: Arc<dyn LocalStorage>,
    session: TrackingSession,
    current: Option<LocationSample>,
    next_watch_id: u64,
}

impl LocationTracker {
    /// Loads `lastKnownLocation`; a corrupt entry is dropped and tracking starts with no sample.
    pub fn rehydrate(storage: Arc<dyn LocalStorage>) -> Self {
        let current = match storage.get_item(LAST_KNOWN_LOCATION_KEY) {
            Ok(Some(raw)) => match decode_sample(&raw) {
                Ok(sample) => {
                    tracing::debug!(
                        captured_at = sample.captured_at,
                        "rehydrated last known location"
                    );
                    Some(sample)
                }
                Err(err) => {
                    tracing::warn!("discarding stored location: {}", err);
                    if let Err(err) = storage.remove_item(LAST_KNOWN_LOCATION_KEY) {
                        tracing::warn!("failed to remove corrupt stored location: {}", err);
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!("failed to read stored location: {}", err);
                None
            }
        };

        Self {
            storage,
            session: TrackingSession::Inactive,
            current,
            next_watch_id: 1,
        }
    }

    pub fn session(&self) -> TrackingSession {
        self.session
    }

    pub fn current(&self) -> Option<LocationSample> {
        self.current
    }

    /// Moves to `Active` with a fresh watch id, or `None` when a watch is already live.
    pub fn begin(&mut self) -> Option<WatchId> {
        if self.session.is_active() {
            return None;
        }
        let watch_id = WatchId(self.next_watch_id);
        self.next_watch_id += 1;
        self.session = TrackingSession::Active { watch_id };
        Some(watch_id)
    }

    /// Moves to `Inactive`, returning the watch that must be cleared (if any).
    pub fn end(&mut self) -> Option<WatchId> {
        let watch_id = self.session.watch_id();
        self.session = TrackingSession::Inactive;
        watch_id
    }

    pub fn accepts(&self, watch_id: WatchId) -> bool {
        self.session.watch_id() == Some(watch_id)
    }

    /// Replaces the current sample and persists it. Deliveries from a stale watch are ignored.
    pub fn apply_fix(&mut self, watch_id: WatchId, sample: LocationSample) -> bool {
        if !self.accepts(watch_id) {
            tracing::debug!(watch_id = %watch_id, "dropping fix from inactive watch");
            return false;
        }
        self.current = Some(sample);
        if let Err(err) = encode_sample(&sample)
            .and_then(|raw| self.storage.set_item(LAST_KNOWN_LOCATION_KEY, &raw))
        {
            tracing::warn!("failed to persist last known location: {}", err);
        }
        true
    }
}

/// Current sample first, then one on-demand reading, then the fixed default.
pub async fn resolve_display_location(
    current: Option<LocationSample>,
    source: Option<&dyn PositionSource>,
    options: PositionOptions,
) -> Coordinates {
    if let Some(sample) = current {
        return sample.coordinates();
    }
    let Some(source) = source else {
        return DEFAULT_DISPLAY_COORDINATES;
    };
    match source.current_position(options).await {
        Ok(sample) => sample.coordinates(),
        Err(kind) => {
            tracing::info!("location access failed, using default location: {}", kind);
            DEFAULT_DISPLAY_COORDINATES
        }
    }
}
