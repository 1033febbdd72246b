// Shared fakes for session tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use weather_core::{
    ErrorKind, Location, LocationProvider, LocationStream, Outcome, WeatherFetcher, WeatherSnapshot,
    session::EventReceiver,
    ClientEvent,
};

pub const BUENOS_AIRES: Location = Location {
    latitude: -34.6037,
    longitude: -58.3816,
};

pub fn snapshot(name: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        location_name: name.to_string(),
        country: "AR".to_string(),
        temperature: 25.0,
        feels_like: 26.0,
        temp_min: 22.0,
        temp_max: 28.0,
        humidity: 65,
        pressure: 1013,
        wind_speed: 3.5,
        wind_gust: Some(5.0),
        wind_degree: 180,
        clouds: 10,
        rain: None,
        description: "cielo claro".to_string(),
        icon: "01d".to_string(),
        sunrise: 1_699_950_000,
        sunset: 1_699_995_000,
        timezone: -10_800,
        observed_at: 1_699_999_999,
    }
}

pub fn drain(events: &mut EventReceiver) -> Vec<ClientEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

// ── Location ────────────────────────────────────────────────────────

/// Provider whose subscriptions each emit one scripted item and complete.
/// `None` in the script means "complete without emitting".
#[derive(Debug)]
pub struct FakeLocation {
    enabled: AtomicBool,
    script: Mutex<VecDeque<Option<Outcome<Location>>>>,
    fallback: Option<Outcome<Location>>,
    observe_calls: AtomicUsize,
    enabled_checks: AtomicUsize,
}

impl FakeLocation {
    pub fn at(location: Location) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            script: Mutex::new(VecDeque::new()),
            fallback: Some(Ok(location)),
            observe_calls: AtomicUsize::new(0),
            enabled_checks: AtomicUsize::new(0),
        }
    }

    pub fn disabled() -> Self {
        let fake = Self::at(BUENOS_AIRES);
        fake.set_enabled(false);
        fake
    }

    pub fn then_emit(self, outcome: Outcome<Location>) -> Self {
        self.script.lock().unwrap().push_back(Some(outcome));
        self
    }

    pub fn then_complete_empty(self) -> Self {
        self.script.lock().unwrap().push_back(None);
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn observe_calls(&self) -> usize {
        self.observe_calls.load(Ordering::SeqCst)
    }

    pub fn enabled_checks(&self) -> usize {
        self.enabled_checks.load(Ordering::SeqCst)
    }
}

impl LocationProvider for FakeLocation {
    fn observe_location(&self) -> LocationStream {
        self.observe_calls.fetch_add(1, Ordering::SeqCst);

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let (sink, stream) = LocationStream::channel();
        match next {
            Some(Ok(location)) => {
                sink.push(location);
            }
            Some(Err(kind)) => {
                sink.fail(kind);
            }
            None => {}
        }
        stream
    }

    fn is_enabled(&self) -> bool {
        self.enabled_checks.fetch_add(1, Ordering::SeqCst);
        self.enabled.load(Ordering::SeqCst)
    }
}

// ── Fetcher ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Scripted {
    outcome: Outcome<WeatherSnapshot>,
    delay: Duration,
}

/// Fetcher answering from per-lookup queues. The last queued answer repeats.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    by_coordinates: Mutex<VecDeque<Scripted>>,
    by_city: Mutex<VecDeque<Scripted>>,
    coordinate_calls: Mutex<Vec<(f64, f64)>>,
    city_calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordinates(self, outcome: Outcome<WeatherSnapshot>) -> Self {
        self.coordinates_after(Duration::ZERO, outcome)
    }

    pub fn coordinates_after(self, delay: Duration, outcome: Outcome<WeatherSnapshot>) -> Self {
        self.by_coordinates
            .lock()
            .unwrap()
            .push_back(Scripted { outcome, delay });
        self
    }

    pub fn city(self, outcome: Outcome<WeatherSnapshot>) -> Self {
        self.by_city.lock().unwrap().push_back(Scripted {
            outcome,
            delay: Duration::ZERO,
        });
        self
    }

    pub fn coordinate_calls(&self) -> Vec<(f64, f64)> {
        self.coordinate_calls.lock().unwrap().clone()
    }

    pub fn city_calls(&self) -> Vec<String> {
        self.city_calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.coordinate_calls.lock().unwrap().len() + self.city_calls.lock().unwrap().len()
    }

    fn next(queue: &Mutex<VecDeque<Scripted>>) -> Scripted {
        let mut queue = queue.lock().unwrap();
        match queue.len() {
            0 => Scripted {
                outcome: Err(ErrorKind::unknown("no scripted response")),
                delay: Duration::ZERO,
            },
            1 => queue[0].clone(),
            _ => queue.pop_front().unwrap(),
        }
    }

    async fn answer(scripted: Scripted) -> Outcome<WeatherSnapshot> {
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.outcome
    }
}

#[async_trait]
impl WeatherFetcher for FakeFetcher {
    async fn fetch_by_coordinates(&self, latitude: f64, longitude: f64) -> Outcome<WeatherSnapshot> {
        self.coordinate_calls.lock().unwrap().push((latitude, longitude));
        let scripted = Self::next(&self.by_coordinates);
        Self::answer(scripted).await
    }

    async fn fetch_by_city(&self, city: &str) -> Outcome<WeatherSnapshot> {
        self.city_calls.lock().unwrap().push(city.to_string());
        let scripted = Self::next(&self.by_city);
        Self::answer(scripted).await
    }
}
