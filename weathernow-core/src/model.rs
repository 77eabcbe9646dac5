use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair, fixed at the moment it was captured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// What the next fetch (and every refresh after it) looks up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LookupTarget {
    City { name: String },
    Coords { lat: f64, lon: f64 },
}

impl LookupTarget {
    pub fn city(name: impl Into<String>) -> Self {
        Self::City { name: name.into() }
    }

    pub fn coords(coords: Coordinates) -> Self {
        Self::Coords {
            lat: coords.latitude,
            lon: coords.longitude,
        }
    }
}

impl fmt::Display for LookupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::City { name } => write!(f, "city '{name}'"),
            Self::Coords { lat, lon } => write!(f, "coords ({lat}, {lon})"),
        }
    }
}

/// Normalized display model for one observation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub country: Option<String>,
    pub temp: Option<i64>,
    pub feels_like: Option<i64>,
    pub temp_min: Option<i64>,
    pub temp_max: Option<i64>,
    pub humidity: Option<u8>,
    pub wind_speed: Option<f64>,
    pub weather_main: Option<String>,
    pub weather_desc: Option<String>,
    pub icon: Option<String>,
    /// Observation time, epoch milliseconds.
    pub timestamp: Option<i64>,
}

impl WeatherRecord {
    /// `<icon_base>/<icon>@2x.png`, when the observation carries an icon code.
    pub fn icon_url(&self, icon_base: &str) -> Option<String> {
        self.icon
            .as_deref()
            .map(|icon| format!("{}/{icon}@2x.png", icon_base.trim_end_matches('/')))
    }

    pub fn observed_at(&self) -> Option<DateTime<Local>> {
        self.timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.with_timezone(&Local))
    }
}

/// What the screen currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success(WeatherRecord),
    Error(String),
}
