use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    error::{ErrorKind, Outcome},
    model::WeatherSnapshot,
};

use super::WeatherFetcher;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_LANG: &str = "es";
const UNITS: &str = "metric";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Coordinates,
    City,
}

/// Why a request produced no payload, before it is folded into [`ErrorKind`].
#[derive(Debug)]
enum FetchFailure {
    Unreachable,
    Status(StatusCode, String),
    Other(String),
}

impl FetchFailure {
    fn into_kind(self, lookup: Lookup) -> ErrorKind {
        match self {
            FetchFailure::Unreachable => ErrorKind::NetworkUnreachable,
            FetchFailure::Status(status, _) if status.is_client_error() => match lookup {
                Lookup::City => ErrorKind::CityNotFound,
                Lookup::Coordinates => ErrorKind::ServerError,
            },
            FetchFailure::Status(status, _) if status.is_server_error() => ErrorKind::ServerError,
            FetchFailure::Status(status, body) => ErrorKind::unknown(format!(
                "OpenWeather request failed with status {status}: {body}"
            )),
            FetchFailure::Other(message) => ErrorKind::unknown(message),
        }
    }
}

/// Current-weather client for the OpenWeather REST API.
#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    api_key: String,
    base_url: String,
    lang: String,
    http: Client,
}

impl OpenWeatherFetcher {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_current(
        &self,
        lookup: Lookup,
        location_query: &[(&str, String)],
    ) -> Outcome<WeatherSnapshot> {
        self.request_current(location_query)
            .await
            .map(WeatherSnapshot::from)
            .map_err(|failure| {
                tracing::debug!(?lookup, ?failure, "OpenWeather request failed");
                failure.into_kind(lookup)
            })
    }

    async fn request_current(
        &self,
        location_query: &[(&str, String)],
    ) -> Result<OwCurrentResponse, FetchFailure> {
        let url = format!("{}/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(location_query)
            .query(&[
                ("appid", self.api_key.as_str()),
                ("units", UNITS),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    FetchFailure::Unreachable
                } else {
                    FetchFailure::Other(format!("Failed to send request to OpenWeather: {e}"))
                }
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            FetchFailure::Other(format!("Failed to read OpenWeather response body: {e}"))
        })?;

        tracing::debug!(%status, bytes = body.len(), "OpenWeather responded");

        if !status.is_success() {
            return Err(FetchFailure::Status(status, truncate_body(&body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            FetchFailure::Other(format!("Failed to parse OpenWeather current JSON: {e}"))
        })
    }
}

#[async_trait]
impl WeatherFetcher for OpenWeatherFetcher {
    async fn fetch_by_coordinates(&self, latitude: f64, longitude: f64) -> Outcome<WeatherSnapshot> {
        self.fetch_current(
            Lookup::Coordinates,
            &[("lat", latitude.to_string()), ("lon", longitude.to_string())],
        )
        .await
    }

    async fn fetch_by_city(&self, city: &str) -> Outcome<WeatherSnapshot> {
        self.fetch_current(Lookup::City, &[("q", city.to_string())]).await
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: u32,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: u16,
    gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: i64,
    #[serde(default)]
    timezone: i32,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwCondition>,
    wind: OwWind,
    rain: Option<OwRain>,
    #[serde(default)]
    clouds: OwClouds,
    sys: OwSys,
}

impl From<OwCurrentResponse> for WeatherSnapshot {
    fn from(parsed: OwCurrentResponse) -> Self {
        let rain = parsed
            .rain
            .and_then(|r| r.one_hour.or(r.three_hours));

        let (description, icon) = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| (w.description, w.icon))
            .unwrap_or_default();

        WeatherSnapshot {
            location_name: parsed.name,
            country: parsed.sys.country,
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            temp_min: parsed.main.temp_min,
            temp_max: parsed.main.temp_max,
            humidity: parsed.main.humidity,
            pressure: parsed.main.pressure,
            wind_speed: parsed.wind.speed,
            wind_gust: parsed.wind.gust,
            wind_degree: parsed.wind.deg,
            clouds: parsed.clouds.all,
            rain,
            description,
            icon,
            sunrise: parsed.sys.sunrise,
            sunset: parsed.sys.sunset,
            timezone: parsed.timezone,
            observed_at: parsed.dt,
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
