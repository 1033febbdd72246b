use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// A position fix, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Latitude within ±90° and longitude within ±180°.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Current conditions at one place, mapped once from a provider payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub country: String,
    /// Degrees Celsius.
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Percent, 0–100.
    pub humidity: u8,
    /// hPa.
    pub pressure: u32,
    /// Metres per second.
    pub wind_speed: f64,
    pub wind_gust: Option<f64>,
    /// Meteorological degrees, 0–359.
    pub wind_degree: u16,
    /// Cloud cover percent, 0–100.
    pub clouds: u8,
    /// Precipitation in mm (last hour preferred over last three hours).
    pub rain: Option<f64>,
    pub description: String,
    pub icon: String,
    /// Unix seconds.
    pub sunrise: i64,
    pub sunset: i64,
    /// Shift from UTC in seconds.
    pub timezone: i32,
    pub observed_at: i64,
}

impl WeatherSnapshot {
    /// UTC offset of the observed place. Out-of-range values fall back to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone).unwrap_or_else(|| Utc.fix())
    }

    /// Convert a unix timestamp into the observed place's local time.
    pub fn local_time(&self, epoch_secs: i64) -> Option<DateTime<FixedOffset>> {
        DateTime::<Utc>::from_timestamp(epoch_secs, 0).map(|utc| utc.with_timezone(&self.utc_offset()))
    }

    pub fn sunrise_local(&self) -> Option<DateTime<FixedOffset>> {
        self.local_time(self.sunrise)
    }

    pub fn sunset_local(&self) -> Option<DateTime<FixedOffset>> {
        self.local_time(self.sunset)
    }

    pub fn observed_local(&self) -> Option<DateTime<FixedOffset>> {
        self.local_time(self.observed_at)
    }

    pub fn wind_direction(&self) -> CompassPoint {
        CompassPoint::from_degrees(self.wind_degree)
    }

    pub fn wind_speed_kmh(&self) -> f64 {
        self.wind_speed * 3.6
    }

    /// Full URL of the provider's condition icon, if the payload had one.
    pub fn icon_url(&self) -> Option<String> {
        if self.icon.is_empty() {
            None
        } else {
            Some(format!("{ICON_BASE_URL}/{}@2x.png", self.icon))
        }
    }

    /// Plain-text summary handed to the platform share sheet.
    pub fn share_text(&self) -> String {
        format!(
            "🌤 Clima en {}, {}\n\
             🌡 Temperatura: {}°C\n\
             💨 Viento: {} km/h\n\
             💧 Humedad: {}%\n\
             ☁ Nubes: {}%\n\
             📊 Presión: {} hPa",
            self.location_name,
            self.country,
            self.temperature.round() as i64,
            self.wind_speed_kmh().round() as i64,
            self.humidity,
            self.clouds,
            self.pressure,
        )
    }
}

/// Eight-point compass rose, 45° sectors centred on north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompassPoint {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassPoint {
    const ROSE: [CompassPoint; 8] = [
        CompassPoint::North,
        CompassPoint::NorthEast,
        CompassPoint::East,
        CompassPoint::SouthEast,
        CompassPoint::South,
        CompassPoint::SouthWest,
        CompassPoint::West,
        CompassPoint::NorthWest,
    ];

    pub fn from_degrees(degrees: u16) -> Self {
        let normalized = f64::from(degrees % 360);
        let sector = ((normalized + 22.5) / 45.0).floor() as usize % Self::ROSE.len();
        Self::ROSE[sector]
    }

    /// Spanish abbreviation, matching the response language.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            CompassPoint::North => "N",
            CompassPoint::NorthEast => "NE",
            CompassPoint::East => "E",
            CompassPoint::SouthEast => "SE",
            CompassPoint::South => "S",
            CompassPoint::SouthWest => "SO",
            CompassPoint::West => "O",
            CompassPoint::NorthWest => "NO",
        }
    }
}

impl std::fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abbreviation())
    }
}

#[cfg(test)]
pub(crate) fn sample_snapshot() -> WeatherSnapshot {
    WeatherSnapshot {
        location_name: "Buenos Aires".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn coordinate_ranges() {
        assert!(Location::new(-34.6037, -58.3816).is_valid());
        assert!(Location::new(90.0, 180.0).is_valid());
        assert!(!Location::new(91.0, 0.0).is_valid());
        assert!(!Location::new(0.0, -180.5).is_valid());
        assert!(!Location::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn compass_sectors_follow_45_degree_boundaries() {
        assert_eq!(CompassPoint::from_degrees(0), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(22), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(23), CompassPoint::NorthEast);
        assert_eq!(CompassPoint::from_degrees(90), CompassPoint::East);
        assert_eq!(CompassPoint::from_degrees(180), CompassPoint::South);
        assert_eq!(CompassPoint::from_degrees(225), CompassPoint::SouthWest);
        assert_eq!(CompassPoint::from_degrees(337), CompassPoint::NorthWest);
        assert_eq!(CompassPoint::from_degrees(338), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(359), CompassPoint::North);
    }

    #[test]
    fn local_times_apply_utc_offset() {
        let snapshot = sample_snapshot();
        let offset = snapshot.utc_offset();
        assert_eq!(offset.local_minus_utc(), -10_800);

        // 1699950000 is 08:20:00 UTC, i.e. 05:20 in Buenos Aires.
        let sunrise = snapshot.sunrise_local().expect("valid timestamp");
        assert_eq!(sunrise.hour(), 5);
        assert_eq!(sunrise.minute(), 20);
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let mut snapshot = sample_snapshot();
        snapshot.timezone = 200_000;
        assert_eq!(snapshot.utc_offset().local_minus_utc(), 0);
    }

    #[test]
    fn icon_url_is_absent_for_empty_icon() {
        let mut snapshot = sample_snapshot();
        assert_eq!(
            snapshot.icon_url().as_deref(),
            Some("https://openweathermap.org/img/wn/01d@2x.png")
        );

        snapshot.icon.clear();
        assert!(snapshot.icon_url().is_none());
    }

    #[test]
    fn share_text_summarises_snapshot() {
        let text = sample_snapshot().share_text();
        assert!(text.starts_with("🌤 Clima en Buenos Aires, AR\n"));
        assert!(text.contains("Temperatura: 25°C"));
        // 3.5 m/s = 12.6 km/h
        assert!(text.contains("Viento: 13 km/h"));
        assert!(text.contains("Humedad: 65%"));
        assert!(text.contains("Nubes: 10%"));
        assert!(text.ends_with("Presión: 1013 hPa"));
    }
}
