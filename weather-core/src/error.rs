use thiserror::Error;

/// Result of every call that crosses a component boundary.
///
/// Collaborators never panic or leak transport errors: each failure is
/// converted into an [`ErrorKind`] where it is detected.
pub type Outcome<T> = Result<T, ErrorKind>;

const UNKNOWN_FALLBACK: &str = "Error desconocido";

/// Closed set of failures the session knows how to surface.
///
/// `Display` yields the user-facing message for the kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("Error de conexión. Verifica tu internet.")]
    NetworkUnreachable,

    #[error("Error del servidor. Intenta más tarde.")]
    ServerError,

    #[error("Ciudad no encontrada. Verifica el nombre.")]
    CityNotFound,

    #[error("Permiso de ubicación denegado. Actívalo en configuración.")]
    LocationPermissionDenied,

    #[error("GPS deshabilitado. Actívalo para ver el clima.")]
    LocationDisabled,

    #[error("No se pudo obtener la ubicación.")]
    LocationUnavailable,

    /// Anything else; carries the underlying failure's description.
    #[error("{0}")]
    Unknown(String),
}

impl ErrorKind {
    /// Build an `Unknown` error, substituting a generic message for blank input.
    pub fn unknown(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            ErrorKind::Unknown(UNKNOWN_FALLBACK.to_string())
        } else {
            ErrorKind::Unknown(message)
        }
    }

    /// The message shown to the user for this failure.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether the presentation layer should be sent to the location settings.
    pub fn opens_location_settings(&self) -> bool {
        matches!(self, ErrorKind::LocationDisabled)
    }
}
