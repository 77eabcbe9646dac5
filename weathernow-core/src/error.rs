use thiserror::Error;

/// Fallback text when a failing response carries no `message` field.
pub const FETCH_FAILED: &str = "Failed to fetch weather";

/// Fallback text when a transport failure has no description.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Fallback text when the geolocation capability fails without a message.
pub const LOCATION_FAILED: &str = "Failed to get location.";

/// Everything that can go wrong while looking up weather.
///
/// `Display` yields the exact text shown in the error banner, so callers
/// convert with `to_string()` at the point where the triggering action is
/// handled and never propagate further.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// Network or decoding failure before a structured response was obtained.
    #[error("{0}")]
    Transport(String),

    /// The provider answered with a failure status.
    #[error("{0}")]
    Api(String),

    /// The geolocation capability was denied, unavailable or timed out.
    #[error("{0}")]
    Geolocation(String),

    /// No geolocation capability exists in this environment.
    #[error("Geolocation not supported on this system.")]
    UnsupportedCapability,
}

impl LookupError {
    pub fn transport(description: impl Into<String>) -> Self {
        Self::Transport(non_empty_or(description.into(), UNKNOWN_ERROR))
    }

    pub fn api(message: Option<String>) -> Self {
        Self::Api(non_empty_or(message.unwrap_or_default(), FETCH_FAILED))
    }

    pub fn geolocation(message: impl Into<String>) -> Self {
        Self::Geolocation(non_empty_or(message.into(), LOCATION_FAILED))
    }

    /// Short machine-friendly label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Api(_) => "api",
            Self::Geolocation(_) => "geolocation",
            Self::UnsupportedCapability => "unsupported",
        }
    }
}

fn non_empty_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key.
        Self::transport(err.without_url().to_string())
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::transport(err.to_string())
    }
}
