//! Usage: Positioning source seam (single read + continuous watch) and a simulated route source.

use crate::domain::location::LocationSample;
use crate::error::PositionErrorKind;
use crate::shared::mutex_ext::MutexExt;
use crate::shared::time::now_unix_millis;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_ACQUISITION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: DEFAULT_ACQUISITION_TIMEOUT,
            maximum_age: DEFAULT_MAXIMUM_AGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

pub type PositionResult = Result<LocationSample, PositionErrorKind>;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionDelivery {
    pub watch_id: WatchId,
    pub result: PositionResult,
}

/// Delivery endpoint handed to a source for one watch; every message is tagged with its watch id.
#[derive(Debug, Clone)]
pub struct PositionSink {
    watch_id: WatchId,
    tx: mpsc::Sender<PositionDelivery>,
}

impl PositionSink {
    pub fn new(watch_id: WatchId, tx: mpsc::Sender<PositionDelivery>) -> Self {
        Self { watch_id, tx }
    }

    pub fn watch_id(&self) -> WatchId {
        self.watch_id
    }

    /// Returns `false` once the receiving provider is gone.
    pub async fn deliver(&self, result: PositionResult) -> bool {
        self.tx
            .send(PositionDelivery {
                watch_id: self.watch_id,
                result,
            })
            .await
            .is_ok()
    }
}

#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self, options: PositionOptions) -> PositionResult;

    /// Begin delivering updates into `sink` until `clear_watch(sink.watch_id())`.
    fn watch_position(&self, options: PositionOptions, sink: PositionSink);

    fn clear_watch(&self, watch_id: WatchId);
}

pub(crate) const DEFAULT_ROUTE: [(f64, f64); 4] = [
    (40.7128, -74.0060),
    (40.7306, -73.9866),
    (40.7484, -73.9857),
    (40.7580, -73.9855),
];
const DEFAULT_STEP_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_ACCURACY_METERS: f64 = 12.0;

/// Walks a fixed route, one waypoint per step, looping at the end.
pub struct SimulatedPositionSource {
    route: Vec<(f64, f64)>,
    step_interval: Duration,
    accuracy_meters: f64,
    failure: Option<PositionErrorKind>,
    watches: Mutex<HashMap<WatchId, JoinHandle<()>>>,
}

impl Default for SimulatedPositionSource {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE.to_vec(), DEFAULT_STEP_INTERVAL)
    }
}

impl SimulatedPositionSource {
    pub fn new(route: Vec<(f64, f64)>, step_interval: Duration) -> Self {
        let route = if route.is_empty() {
            DEFAULT_ROUTE.to_vec()
        } else {
            route
        };
        Self {
            route,
            step_interval: step_interval.max(Duration::from_millis(1)),
            accuracy_meters: DEFAULT_ACCURACY_METERS,
            failure: None,
            watches: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_accuracy_meters(mut self, accuracy_meters: f64) -> Self {
        self.accuracy_meters = accuracy_meters.max(0.0);
        self
    }

    /// Every read and every watch delivery fails with `kind`.
    pub fn failing(mut self, kind: PositionErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    pub fn active_watch_count(&self) -> usize {
        self.watches.lock_or_recover().len()
    }

    fn sample_at(&self, step: usize) -> LocationSample {
        let (latitude, longitude) = self.route[step % self.route.len()];
        LocationSample::new(latitude, longitude, self.accuracy_meters, now_unix_millis())
    }
}

#[async_trait]
impl PositionSource for SimulatedPositionSource {
    async fn current_position(&self, _options: PositionOptions) -> PositionResult {
        match self.failure {
            Some(kind) => Err(kind),
            None => Ok(self.sample_at(0)),
        }
    }

    fn watch_position(&self, options: PositionOptions, sink: PositionSink) {
        let watch_id = sink.watch_id();
        let route = self.route.clone();
        let step_interval = self.step_interval;
        let accuracy_meters = self.accuracy_meters;
        let failure = self.failure;

        tracing::debug!(
            watch_id = %watch_id,
            high_accuracy = options.enable_high_accuracy,
            timeout_ms = options.timeout.as_millis() as u64,
            "simulated position watch started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(step_interval);
            let mut step = 0usize;
            loop {
                ticker.tick().await;
                let result = match failure {
                    Some(kind) => Err(kind),
                    None => {
                        let (latitude, longitude) = route[step % route.len()];
                        Ok(LocationSample::new(
                            latitude,
                            longitude,
                            accuracy_meters,
                            now_unix_millis(),
                        ))
                    }
                };
                if !sink.deliver(result).await {
                    break;
                }
                step = step.wrapping_add(1);
            }
        });

        if let Some(previous) = self.watches.lock_or_recover().insert(watch_id, task) {
            previous.abort();
        }
    }

    fn clear_watch(&self, watch_id: WatchId) {
        if let Some(task) = self.watches.lock_or_recover().remove(&watch_id) {
            task.abort();
            tracing::debug!(watch_id = %watch_id, "simulated position watch cleared");
        }
    }
}

impl Drop for SimulatedPositionSource {
    fn drop(&mut self) {
        for (_, task) in self.watches.lock_or_recover().drain() {
            task.abort();
        }
    }
}
