//! Core library for the `weathernow` terminal app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap fetcher and response normalization
//! - The geolocation capability seam
//! - Debounced input, single-slot auto-refresh and the lookup session that
//!   ties them together
//!
//! It is used by `weathernow-cli`, but the session can drive any front-end
//! that can send commands and render a [`View`].

pub mod config;
pub mod debounce;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod refresh;
pub mod session;

pub use config::{Config, GeolocationProvider};
pub use error::LookupError;
pub use location::{Geolocator, PositionOptions};
pub use model::{Coordinates, LookupTarget, RequestState, WeatherRecord};
pub use provider::WeatherSource;
pub use session::{Session, SessionHandle, SessionSettings, View};
