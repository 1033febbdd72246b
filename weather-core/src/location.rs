//! Location acquisition.
//!
//! [`LocationProvider`] is what the session consumes: a capability probe plus
//! a push-based stream of fixes. [`LocationSensor`] is the seam to whatever the
//! platform offers; [`SensorLocationProvider`] turns a sensor into a provider,
//! and [`StaticSensor`] is a sensor that always reports the same coordinate.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::error::{ErrorKind, Outcome};
use crate::model::Location;

pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(10);
pub const MIN_UPDATE_DISTANCE_M: f32 = 10.0;

/// Positioning backends, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixSource {
    /// Satellite positioning: precise.
    Gps,
    /// Cell/Wi-Fi positioning: coarse.
    Network,
}

impl FixSource {
    pub const fn by_precision() -> &'static [FixSource] {
        &[FixSource::Gps, FixSource::Network]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FixSource::Gps => "gps",
            FixSource::Network => "network",
        }
    }
}

/// Throttling hints passed to the sensor when registering for updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateRequest {
    pub min_interval: Duration,
    pub min_distance_m: f32,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            min_interval: MIN_UPDATE_INTERVAL,
            min_distance_m: MIN_UPDATE_DISTANCE_M,
        }
    }
}

/// Handle identifying one sensor registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("location permission not granted")]
    PermissionDenied,

    #[error("location sensor failure: {0}")]
    Unavailable(String),
}

impl From<SensorError> for ErrorKind {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::PermissionDenied => ErrorKind::LocationPermissionDenied,
            SensorError::Unavailable(_) => ErrorKind::LocationUnavailable,
        }
    }
}

/// Write side of a [`LocationStream`]. Sensors push fixes through it.
#[derive(Debug, Clone)]
pub struct FixSink {
    tx: mpsc::UnboundedSender<Outcome<Location>>,
}

impl FixSink {
    /// Deliver a fix. Returns `false` once the stream has been closed.
    pub fn push(&self, location: Location) -> bool {
        self.tx.send(Ok(location)).is_ok()
    }

    pub fn fail(&self, kind: ErrorKind) -> bool {
        self.tx.send(Err(kind)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct Registration {
    sensor: Arc<dyn LocationSensor>,
    id: ListenerId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.sensor.remove_updates(self.id);
        tracing::debug!(listener = self.id.0, "Location updates released");
    }
}

/// Subscription to location fixes.
///
/// The stream yields until the provider completes it or the subscriber lets
/// go. Dropping the stream (or calling [`LocationStream::close`]) releases the
/// underlying sensor registration exactly once.
pub struct LocationStream {
    rx: mpsc::UnboundedReceiver<Outcome<Location>>,
    registration: Option<Registration>,
}

impl LocationStream {
    /// A stream with no sensor registration attached, and its write side.
    /// The stream completes once every clone of the sink is dropped.
    pub fn channel() -> (FixSink, LocationStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FixSink { tx }, LocationStream { rx, registration: None })
    }

    pub async fn next(&mut self) -> Option<Outcome<Location>> {
        self.rx.recv().await
    }

    /// Stop listening and release the sensor registration.
    pub fn close(mut self) {
        self.rx.close();
        self.registration.take();
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }
}

impl Debug for LocationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationStream")
            .field("listener", &self.registration.as_ref().map(|r| r.id))
            .finish()
    }
}

/// Source of location fixes consumed by the session.
pub trait LocationProvider: Send + Sync + Debug {
    /// Subscribe to fixes. Failures are delivered in-band.
    fn observe_location(&self) -> LocationStream;

    /// Whether any positioning backend is currently switched on.
    fn is_enabled(&self) -> bool;
}

/// Platform positioning API.
pub trait LocationSensor: Send + Sync + Debug {
    fn is_source_enabled(&self, source: FixSource) -> bool;

    fn last_known(&self, source: FixSource) -> Result<Option<Location>, SensorError>;

    /// Start pushing fixes from `source` into `sink` until [`LocationSensor::remove_updates`].
    fn request_updates(
        &self,
        source: FixSource,
        request: UpdateRequest,
        sink: FixSink,
    ) -> Result<ListenerId, SensorError>;

    fn remove_updates(&self, id: ListenerId);
}

/// [`LocationProvider`] over a platform [`LocationSensor`].
#[derive(Debug, Clone)]
pub struct SensorLocationProvider {
    sensor: Arc<dyn LocationSensor>,
}

impl SensorLocationProvider {
    pub fn new(sensor: Arc<dyn LocationSensor>) -> Self {
        Self { sensor }
    }

    fn best_source(&self) -> Option<FixSource> {
        FixSource::by_precision()
            .iter()
            .copied()
            .find(|source| self.sensor.is_source_enabled(*source))
    }
}

impl LocationProvider for SensorLocationProvider {
    fn observe_location(&self) -> LocationStream {
        let (sink, mut stream) = LocationStream::channel();

        let Some(source) = self.best_source() else {
            tracing::debug!("No positioning source enabled");
            sink.fail(ErrorKind::LocationDisabled);
            return stream;
        };

        match self.sensor.last_known(source) {
            Ok(Some(cached)) => {
                sink.push(cached);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(source = source.as_str(), error = %err, "Last known location failed");
                sink.fail(err.into());
                return stream;
            }
        }

        match self.sensor.request_updates(source, UpdateRequest::default(), sink.clone()) {
            Ok(id) => {
                tracing::debug!(source = source.as_str(), listener = id.0, "Location updates requested");
                stream.registration = Some(Registration {
                    sensor: Arc::clone(&self.sensor),
                    id,
                });
            }
            Err(err) => {
                tracing::warn!(source = source.as_str(), error = %err, "Location updates refused");
                sink.fail(err.into());
            }
        }

        stream
    }

    fn is_enabled(&self) -> bool {
        self.best_source().is_some()
    }
}

/// Sensor that reports a fixed coordinate as a coarse fix.
///
/// Without a coordinate every source reads as disabled.
#[derive(Debug, Default)]
pub struct StaticSensor {
    fix: Option<Location>,
    listeners: Mutex<HashMap<ListenerId, FixSink>>,
    next_id: AtomicU64,
}

impl StaticSensor {
    pub fn new(fix: Option<Location>) -> Self {
        Self {
            fix,
            ..Self::default()
        }
    }

    /// Number of registrations not yet removed.
    pub fn active_listeners(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl LocationSensor for StaticSensor {
    fn is_source_enabled(&self, source: FixSource) -> bool {
        source == FixSource::Network && self.fix.is_some()
    }

    fn last_known(&self, source: FixSource) -> Result<Option<Location>, SensorError> {
        Ok(if self.is_source_enabled(source) {
            self.fix
        } else {
            None
        })
    }

    fn request_updates(
        &self,
        source: FixSource,
        _request: UpdateRequest,
        sink: FixSink,
    ) -> Result<ListenerId, SensorError> {
        if !self.is_source_enabled(source) {
            return Err(SensorError::Unavailable(format!(
                "source '{}' is not enabled",
                source.as_str()
            )));
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sink);
        Ok(id)
    }

    fn remove_updates(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}
