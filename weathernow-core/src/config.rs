use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::model::Coordinates;

/// Environment variable holding the OpenWeatherMap API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Environment variable overriding the current-weather endpoint.
pub const BASE_URL_ENV: &str = "OPENWEATHER_BASE_URL";

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_ICON_URL: &str = "https://openweathermap.org/img/wn";

/// Provider endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub weather_url: String,
    pub icon_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            icon_url: DEFAULT_ICON_URL.to_string(),
        }
    }
}

/// Debounce and refresh cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub debounce_ms: u64,
    pub refresh_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce_ms: 550,
            refresh_secs: 60,
        }
    }
}

impl Timing {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn refresh_period(&self) -> Duration {
        // A zero period would spin the interval.
        Duration::from_secs(self.refresh_secs.max(1))
    }
}

/// Which geolocation capability backs the "use my location" action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeolocationProvider {
    #[default]
    Ip,
    Fixed,
    Disabled,
}

impl GeolocationProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeolocationProvider::Ip => "ip",
            GeolocationProvider::Fixed => "fixed",
            GeolocationProvider::Disabled => "disabled",
        }
    }

    pub const fn all() -> &'static [GeolocationProvider] {
        &[
            GeolocationProvider::Ip,
            GeolocationProvider::Fixed,
            GeolocationProvider::Disabled,
        ]
    }
}

impl std::fmt::Display for GeolocationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub provider: GeolocationProvider,

    /// Used by the `fixed` provider.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub timeout_secs: u64,
    pub high_accuracy: bool,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            provider: GeolocationProvider::default(),
            latitude: None,
            longitude: None,
            timeout_secs: 10,
            high_accuracy: true,
        }
    }
}

impl GeolocationConfig {
    pub fn fixed_coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
///
/// [timing]
/// debounce_ms = 550
/// refresh_secs = 60
///
/// [geolocation]
/// provider = "fixed"
/// latitude = 51.5072
/// longitude = -0.1276
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub endpoints: Endpoints,
    pub timing: Timing,
    pub geolocation: GeolocationConfig,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Overlay values found through `lookup` (normally the process environment).
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.endpoints.weather_url = url;
        }
        self
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weathernow", "weathernow")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_local_dir().join("logs"))
    }

    /// The key as sent on the wire. An absent key is not an error here:
    /// the provider rejects the request and that rejection is what the user sees.
    pub fn api_key_or_empty(&self) -> &str {
        self.api_key.as_deref().unwrap_or("")
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_lookup_cadence() {
        let cfg = Config::default();
        assert_eq!(cfg.timing.debounce(), Duration::from_millis(550));
        assert_eq!(cfg.timing.refresh_period(), Duration::from_secs(60));
        assert_eq!(cfg.geolocation.timeout_secs, 10);
        assert!(cfg.geolocation.high_accuracy);
        assert_eq!(cfg.endpoints.weather_url, DEFAULT_WEATHER_URL);
        assert!(!cfg.has_api_key());
        assert_eq!(cfg.api_key_or_empty(), "");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from(&dir.path().join("nope.toml")).expect("load");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config {
            api_key: Some("KEY".into()),
            ..Default::default()
        };
        cfg.geolocation.provider = GeolocationProvider::Fixed;
        cfg.geolocation.latitude = Some(48.8566);
        cfg.geolocation.longitude = Some(2.3522);
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
        assert_eq!(
            loaded.geolocation.fixed_coordinates(),
            Some(Coordinates::new(48.8566, 2.3522))
        );
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[timing]\nrefresh_secs = 30\n").expect("write");

        let cfg = Config::load_from(&path).expect("load");
        assert_eq!(cfg.timing.refresh_secs, 30);
        assert_eq!(cfg.timing.debounce_ms, 550);
        assert_eq!(cfg.geolocation.provider, GeolocationProvider::Ip);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = [").expect("write");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn env_overrides_file_values() {
        let cfg = Config {
            api_key: Some("FROM_FILE".into()),
            ..Default::default()
        }
        .with_env_overrides(|name| match name {
            API_KEY_ENV => Some("FROM_ENV".into()),
            BASE_URL_ENV => Some("http://localhost:9999/weather".into()),
            _ => None,
        });

        assert_eq!(cfg.api_key.as_deref(), Some("FROM_ENV"));
        assert_eq!(cfg.endpoints.weather_url, "http://localhost:9999/weather");
    }

    #[test]
    fn blank_env_key_does_not_clobber_file_key() {
        let cfg = Config {
            api_key: Some("FROM_FILE".into()),
            ..Default::default()
        }
        .with_env_overrides(|_| Some("   ".into()));

        assert_eq!(cfg.api_key.as_deref(), Some("FROM_FILE"));
    }

    #[test]
    fn zero_refresh_period_is_clamped() {
        let timing = Timing {
            debounce_ms: 0,
            refresh_secs: 0,
        };
        assert_eq!(timing.refresh_period(), Duration::from_secs(1));
    }
}
