//! Core library for the `weather` client.
//!
//! This crate defines:
//! - The session synchronizer that owns the client-visible state
//! - Location acquisition over a platform sensor seam
//! - The OpenWeather fetcher and the closed error taxonomy it reports in
//! - Configuration & credentials handling
//!
//! It is used by `weather-cli`, but any front-end can drive a [`WeatherSession`].

pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod session;
pub mod state;

pub use config::Config;
pub use error::{ErrorKind, Outcome};
pub use location::{LocationProvider, LocationSensor, LocationStream, SensorLocationProvider, StaticSensor};
pub use model::{CompassPoint, Location, WeatherSnapshot};
pub use provider::{WeatherFetcher, fetcher_from_config, openweather::OpenWeatherFetcher};
pub use session::{EventReceiver, SessionSettings, WeatherSession};
pub use state::{ClientEvent, ClientState, SessionPhase};
