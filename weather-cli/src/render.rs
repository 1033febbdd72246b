use std::fmt::Write as _;

use weather_core::{ClientState, SessionPhase, WeatherSnapshot};

/// Render a session snapshot as terminal text.
pub fn render_state(state: &ClientState) -> String {
    match state.phase() {
        SessionPhase::AwaitingPermission => "Waiting for location permission...".to_string(),
        SessionPhase::Loading => match &state.weather {
            Some(weather) => format!("Updating...\n\n{}", render_weather(weather)),
            None => "Loading weather...".to_string(),
        },
        SessionPhase::Success => match &state.weather {
            Some(weather) => render_weather(weather),
            None => String::new(),
        },
        SessionPhase::Error => render_error(state),
    }
}

fn render_error(state: &ClientState) -> String {
    let message = state.error.as_deref().unwrap_or_default();
    let mut out = format!("Error: {message}");

    if state.is_permission_denied() {
        out.push_str("\nHint: rerun with --allow-location, or search a city with --city <NAME>.");
    }

    if let Some(weather) = &state.weather {
        out.push_str("\n\nLast reading:\n");
        out.push_str(&render_weather(weather));
    }

    out
}

/// Multi-line block with every field of a snapshot.
pub fn render_weather(w: &WeatherSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}, {}: {}", w.location_name, w.country, w.description);
    let _ = writeln!(
        out,
        "  Temperature  {:.1}°C (feels like {:.1}°C, min {:.1}°C / max {:.1}°C)",
        w.temperature, w.feels_like, w.temp_min, w.temp_max
    );
    let _ = writeln!(out, "  Humidity     {}%", w.humidity);
    let _ = writeln!(out, "  Pressure     {} hPa", w.pressure);

    let _ = write!(
        out,
        "  Wind         {:.1} km/h {} ({}°)",
        w.wind_speed_kmh(),
        w.wind_direction(),
        w.wind_degree
    );
    if let Some(gust) = w.wind_gust {
        let _ = write!(out, ", gusts {:.1} km/h", gust * 3.6);
    }
    out.push('\n');

    let _ = writeln!(out, "  Clouds       {}%", w.clouds);
    if let Some(rain) = w.rain {
        let _ = writeln!(out, "  Rain         {rain:.1} mm");
    }

    if let (Some(sunrise), Some(sunset)) = (w.sunrise_local(), w.sunset_local()) {
        let _ = writeln!(
            out,
            "  Sun          {} / {}",
            sunrise.format("%H:%M"),
            sunset.format("%H:%M")
        );
    }
    if let Some(observed) = w.observed_local() {
        let _ = writeln!(out, "  Observed     {}", observed.format("%Y-%m-%d %H:%M (UTC%:z)"));
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WeatherSnapshot {
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
            wind_gust: None,
            wind_degree: 180,
            clouds: 10,
            rain: Some(0.8),
            description: "cielo claro".to_string(),
            icon: "01d".to_string(),
            sunrise: 1_699_950_000,
            sunset: 1_699_995_000,
            timezone: -10_800,
            observed_at: 1_699_999_999,
        }
    }

    fn loaded() -> ClientState {
        ClientState {
            is_loading: false,
            weather: Some(snapshot()),
            error: None,
            location_permission_granted: true,
            should_request_permission: false,
        }
    }

    #[test]
    fn renders_weather_in_local_time() {
        let out = render_state(&loaded());

        assert!(out.starts_with("Buenos Aires, AR: cielo claro"));
        assert!(out.contains("Temperature  25.0°C"));
        assert!(out.contains("Wind         12.6 km/h S (180°)"));
        assert!(out.contains("Rain         0.8 mm"));
        assert!(out.contains("Sun          05:20 / 17:50"));
        assert!(!out.contains("gusts"));
    }

    #[test]
    fn initial_state_waits_for_permission() {
        assert_eq!(
            render_state(&ClientState::default()),
            "Waiting for location permission..."
        );
    }

    #[test]
    fn denied_permission_adds_hint() {
        let state = ClientState {
            is_loading: false,
            weather: None,
            error: Some("Permiso de ubicación denegado. Actívalo en configuración.".to_string()),
            location_permission_granted: false,
            should_request_permission: false,
        };

        let out = render_state(&state);
        assert!(out.starts_with("Error: Permiso de ubicación denegado."));
        assert!(out.contains("--allow-location"));
    }

    #[test]
    fn failed_reload_keeps_last_reading() {
        let state = ClientState {
            error: Some("Error de conexión. Verifica tu internet.".to_string()),
            ..loaded()
        };

        let out = render_state(&state);
        assert!(out.starts_with("Error: Error de conexión."));
        assert!(!out.contains("--allow-location"));
        assert!(out.contains("Last reading:\nBuenos Aires, AR"));
    }
}
