//! The session: single owner of [`ClientState`].
//!
//! Every intent from the presentation layer goes through [`WeatherSession`],
//! which talks to the location provider and the weather fetcher and publishes
//! the result as a fresh state snapshot. One-shot directives go out on a
//! separate event channel so they are never replayed to late subscribers.
//!
//! Overlapping foreground loads are not sequenced: whichever finishes last
//! writes the state.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{
    error::{ErrorKind, Outcome},
    location::LocationProvider,
    model::{Location, WeatherSnapshot},
    provider::WeatherFetcher,
    state::{ClientEvent, ClientState},
};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Receiving half of a session's event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<ClientEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Period of the silent background refresh.
    pub refresh_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

struct Shared {
    state: watch::Sender<ClientState>,
    events: mpsc::UnboundedSender<ClientEvent>,
    location: Arc<dyn LocationProvider>,
    fetcher: Arc<dyn WeatherFetcher>,
}

impl Shared {
    fn update(&self, apply: impl FnOnce(&mut ClientState)) {
        self.state.send_modify(apply);
        tracing::trace!(state = ?*self.state.borrow(), "State updated");
    }

    fn emit(&self, event: ClientEvent) {
        tracing::debug!(?event, "Emitting event");
        if self.events.send(event).is_err() {
            tracing::warn!(?event, "Event dropped: no receiver");
        }
    }

    fn fail(&self, kind: ErrorKind) {
        tracing::info!(error = ?kind, "Weather load failed");
        let message = kind.message();
        self.update(|s| {
            s.is_loading = false;
            s.error = Some(message);
        });
        if kind.opens_location_settings() {
            self.emit(ClientEvent::OpenLocationSettings);
        }
    }

    fn succeed(&self, snapshot: WeatherSnapshot) {
        tracing::info!(location = %snapshot.location_name, "Weather loaded");
        self.update(|s| {
            s.is_loading = false;
            s.weather = Some(snapshot);
            s.error = None;
        });
    }

    async fn load_weather(&self) {
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        if !self.location.is_enabled() {
            self.fail(ErrorKind::LocationDisabled);
            return;
        }

        match self.current_weather().await {
            Ok(snapshot) => self.succeed(snapshot),
            Err(kind) => self.fail(kind),
        }
    }

    async fn search_city(&self, city: &str) {
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });

        match self.fetcher.fetch_by_city(city).await {
            Ok(snapshot) => self.succeed(snapshot),
            Err(kind) => self.fail(kind),
        }
    }

    /// Background variant of [`Shared::load_weather`]: never shows a spinner
    /// and keeps the last good reading on failure.
    async fn silent_refresh(&self) {
        if !self.location.is_enabled() {
            tracing::debug!("Silent refresh skipped: location disabled");
            return;
        }

        match self.current_weather().await {
            Ok(snapshot) => {
                tracing::debug!(location = %snapshot.location_name, "Silent refresh updated weather");
                self.update(|s| {
                    s.weather = Some(snapshot);
                    s.error = None;
                });
            }
            Err(kind) => {
                tracing::warn!(error = ?kind, "Silent refresh failed; keeping last reading");
            }
        }
    }

    async fn current_weather(&self) -> Outcome<WeatherSnapshot> {
        let location = self.first_fix().await?;
        self.fetcher
            .fetch_by_coordinates(location.latitude, location.longitude)
            .await
    }

    /// First emission of a fresh location subscription; the subscription is
    /// released before returning.
    async fn first_fix(&self) -> Outcome<Location> {
        let mut stream = self.location.observe_location();
        let first = stream.next().await;
        stream.close();
        first.unwrap_or(Err(ErrorKind::LocationUnavailable))
    }

    fn refresh_due(&self) -> bool {
        let state = self.state.borrow();
        state.weather.is_some() && state.location_permission_granted
    }
}

/// State synchronizer for one client session.
///
/// Dropping the session (or calling [`WeatherSession::shutdown`]) cancels the
/// background refresh.
pub struct WeatherSession {
    shared: Arc<Shared>,
    settings: SessionSettings,
    auto_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl WeatherSession {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        fetcher: Arc<dyn WeatherFetcher>,
        settings: SessionSettings,
    ) -> (Self, EventReceiver) {
        let (state, _) = watch::channel(ClientState::default());
        let (events, events_rx) = mpsc::unbounded_channel();

        let session = Self {
            shared: Arc::new(Shared {
                state,
                events,
                location,
                fetcher,
            }),
            settings,
            auto_refresh: Mutex::new(None),
        };

        (session, events_rx)
    }

    /// Current snapshot.
    pub fn state(&self) -> ClientState {
        self.shared.state.borrow().clone()
    }

    /// Watch for new snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.shared.state.subscribe()
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Record the outcome of the OS permission prompt.
    ///
    /// A grant loads weather and (re)starts the background refresh.
    pub async fn on_permission_result(&self, granted: bool) {
        tracing::info!(granted, "Location permission result");

        let denied_message = (!granted).then(|| ErrorKind::LocationPermissionDenied.message());
        self.shared.update(|s| {
            s.location_permission_granted = granted;
            s.should_request_permission = false;
            if let Some(message) = denied_message {
                s.is_loading = false;
                s.error = Some(message);
            }
        });

        if granted {
            self.start_auto_refresh();
            self.shared.load_weather().await;
        }
    }

    /// Fetch weather for the current location, showing progress.
    pub async fn load_weather(&self) {
        self.shared.load_weather().await;
    }

    /// Fetch weather for a named city. Blank names are ignored.
    pub async fn search_city(&self, name: &str) {
        let city = name.trim();
        if city.is_empty() {
            return;
        }

        tracing::info!(city, "Searching city");
        self.shared.search_city(city).await;
    }

    /// Reload for the current location, or ask for permission first.
    pub async fn refresh(&self) {
        if self.shared.state.borrow().location_permission_granted {
            self.shared.load_weather().await;
        } else {
            self.request_permission();
        }
    }

    pub fn request_permission(&self) {
        self.shared.emit(ClientEvent::RequestLocationPermission);
    }

    pub fn on_settings_click(&self) {
        self.shared.emit(ClientEvent::OpenSettings);
    }

    pub fn on_share_click(&self) {
        self.shared.emit(ClientEvent::ShareWeather);
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.refresh_task()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the background refresh. Safe to call more than once.
    pub fn shutdown(&self) {
        if let Some(task) = self.refresh_task().take() {
            task.abort();
            tracing::debug!("Auto refresh cancelled");
        }
    }

    fn refresh_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.auto_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Ticks are fixed to the period; a refresh still running when the next
    /// tick is due is abandoned so it cannot push the cadence back.
    fn start_auto_refresh(&self) {
        let shared = Arc::clone(&self.shared);
        let period = match self.settings.refresh_interval {
            Duration::ZERO => DEFAULT_REFRESH_INTERVAL,
            period => period,
        };

        tracing::debug!(period_secs = period.as_secs(), "Starting auto refresh");
        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticks.tick().await;

            loop {
                ticks.tick().await;
                if !shared.refresh_due() {
                    continue;
                }
                if tokio::time::timeout(period, shared.silent_refresh()).await.is_err() {
                    tracing::warn!(
                        period_secs = period.as_secs(),
                        "Silent refresh timed out; dropped"
                    );
                }
            }
        });

        if let Some(previous) = self.refresh_task().replace(task) {
            previous.abort();
        }
    }
}

impl Drop for WeatherSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WeatherSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherSession")
            .field("state", &*self.shared.state.borrow())
            .field("settings", &self.settings)
            .field("auto_refresh", &self.is_auto_refreshing())
            .finish()
    }
}
