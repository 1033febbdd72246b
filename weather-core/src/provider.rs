use crate::{Config, WeatherSnapshot, error::Outcome, provider::openweather::OpenWeatherFetcher};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Remote source of current conditions.
///
/// Implementations issue exactly one request per call and report every
/// failure as an [`crate::ErrorKind`]; retry policy belongs to the caller.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch_by_coordinates(&self, latitude: f64, longitude: f64) -> Outcome<WeatherSnapshot>;

    async fn fetch_by_city(&self, city: &str) -> Outcome<WeatherSnapshot>;
}

/// Construct the OpenWeather fetcher from config.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<OpenWeatherFetcher> {
    let api_key = config.api_key.as_deref().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `weather configure` or set OPENWEATHER_API_KEY."
        )
    })?;

    Ok(OpenWeatherFetcher::new(api_key.to_owned())
        .with_base_url(config.base_url.clone())
        .with_lang(config.lang.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn fetcher_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = fetcher_from_config(&cfg).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No OpenWeather API key configured"));
        assert!(msg.contains("Hint: run `weather configure`"));
    }

    #[test]
    fn fetcher_from_config_rejects_blank_api_key() {
        let cfg = Config {
            api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(fetcher_from_config(&cfg).is_err());
    }

    #[test]
    fn fetcher_from_config_works_when_configured() {
        let cfg = Config {
            api_key: Some("KEY".to_string()),
            base_url: "http://localhost:1234/".to_string(),
            ..Config::default()
        };

        let fetcher = fetcher_from_config(&cfg).expect("fetcher");
        assert_eq!(fetcher.base_url(), "http://localhost:1234");
    }
}
