use serde::Serialize;

use crate::model::WeatherSnapshot;

/// Everything the presentation layer needs to render a session.
///
/// Snapshots are replaced wholesale by the session; never mutate one in place
/// expecting the change to be observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientState {
    pub is_loading: bool,
    pub weather: Option<WeatherSnapshot>,
    pub error: Option<String>,
    pub location_permission_granted: bool,
    pub should_request_permission: bool,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            is_loading: true,
            weather: None,
            error: None,
            location_permission_granted: false,
            should_request_permission: true,
        }
    }
}

impl ClientState {
    pub fn is_success(&self) -> bool {
        self.weather.is_some() && self.error.is_none() && !self.is_loading
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some() && !self.is_loading
    }

    /// The user refused location access; render the permission prompt
    /// rather than the generic error view.
    pub fn is_permission_denied(&self) -> bool {
        self.is_error() && !self.location_permission_granted && !self.should_request_permission
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_error() {
            SessionPhase::Error
        } else if self.is_success() {
            SessionPhase::Success
        } else if self.should_request_permission {
            SessionPhase::AwaitingPermission
        } else {
            SessionPhase::Loading
        }
    }
}

/// Coarse view of [`ClientState`], one variant per screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    AwaitingPermission,
    Loading,
    Success,
    Error,
}

/// One-shot directive for the presentation layer. Not retained in state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    RequestLocationPermission,
    OpenLocationSettings,
    OpenSettings,
    ShareWeather,
}
