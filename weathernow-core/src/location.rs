//! The "use my location" capability.
//!
//! Positions come from a pluggable [`Geolocator`]; the session treats it as
//! an external collaborator and only cares about the coordinates or the
//! failure message it yields.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{
    config::{Config, GeolocationProvider},
    error::LookupError,
    model::Coordinates,
};

pub const IP_API_URL: &str = "http://ip-api.com/json";

/// Options passed along with every position request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
        }
    }
}

impl PositionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            high_accuracy: config.geolocation.high_accuracy,
            timeout: Duration::from_secs(config.geolocation.timeout_secs),
        }
    }
}

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    /// Whether a capability exists at all in this environment.
    fn is_available(&self) -> bool {
        true
    }

    async fn current_position(&self, options: &PositionOptions)
    -> Result<Coordinates, LookupError>;
}

/// Locate the machine by its public IP address.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    endpoint: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
}

impl IpGeolocator {
    pub fn new() -> Result<Self, LookupError> {
        Self::with_endpoint(IP_API_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, LookupError> {
        Ok(Self {
            endpoint: endpoint.into(),
            http: Client::builder().build()?,
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, LookupError> {
        if options.high_accuracy {
            tracing::debug!("IP lookup is city-level; high accuracy is best effort");
        }

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("fields", "status,message,lat,lon,city")])
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::geolocation("Location request timed out")
                } else {
                    LookupError::geolocation(e.to_string())
                }
            })?;

        let body: IpApiResponse = res
            .json()
            .await
            .map_err(|e| LookupError::geolocation(e.to_string()))?;

        if body.status != "success" {
            return Err(LookupError::geolocation(body.message.unwrap_or_default()));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => {
                tracing::info!(city = ?body.city, lat, lon, "located by IP");
                Ok(Coordinates::new(lat, lon))
            }
            _ => Err(LookupError::geolocation("Position unavailable")),
        }
    }
}

/// Always answers with the configured coordinates.
#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    coords: Coordinates,
}

impl FixedGeolocator {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self, _: &PositionOptions) -> Result<Coordinates, LookupError> {
        Ok(self.coords)
    }
}

/// No capability; the session reports it as unsupported.
#[derive(Debug, Clone, Default)]
pub struct DisabledGeolocator;

#[async_trait]
impl Geolocator for DisabledGeolocator {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_position(&self, _: &PositionOptions) -> Result<Coordinates, LookupError> {
        Err(LookupError::UnsupportedCapability)
    }
}

/// Construct the geolocator selected in `config`.
pub fn geolocator_from_config(config: &Config) -> anyhow::Result<Box<dyn Geolocator>> {
    let boxed: Box<dyn Geolocator> = match config.geolocation.provider {
        GeolocationProvider::Ip => Box::new(IpGeolocator::new()?),
        GeolocationProvider::Fixed => {
            let coords = config.geolocation.fixed_coordinates().ok_or_else(|| {
                anyhow::anyhow!(
                    "Geolocation provider 'fixed' needs both latitude and longitude.\n\
                     Hint: run `weathernow configure` or edit the [geolocation] section."
                )
            })?;
            Box::new(FixedGeolocator::new(coords))
        }
        GeolocationProvider::Disabled => Box::new(DisabledGeolocator),
    };
    Ok(boxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn ip_lookup_yields_coordinates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("fields", "status,message,lat,lon,city"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "lat": 59.9139,
                "lon": 10.7522,
                "city": "Oslo"
            })))
            .mount(&server)
            .await;

        let locator = IpGeolocator::with_endpoint(server.uri()).unwrap();
        let coords = locator
            .current_position(&PositionOptions::default())
            .await
            .unwrap();
        assert_eq!(coords, Coordinates::new(59.9139, 10.7522));
    }

    #[tokio::test]
    async fn ip_lookup_failure_carries_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail",
                "message": "reserved range"
            })))
            .mount(&server)
            .await;

        let locator = IpGeolocator::with_endpoint(server.uri()).unwrap();
        let err = locator
            .current_position(&PositionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, LookupError::Geolocation("reserved range".into()));
    }

    #[tokio::test]
    async fn ip_lookup_respects_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({ "status": "success", "lat": 1.0, "lon": 2.0 })),
            )
            .mount(&server)
            .await;

        let locator = IpGeolocator::with_endpoint(server.uri()).unwrap();
        let options = PositionOptions {
            high_accuracy: true,
            timeout: Duration::from_millis(50),
        };
        let err = locator.current_position(&options).await.unwrap_err();
        assert_eq!(err.to_string(), "Location request timed out");
    }

    #[tokio::test]
    async fn disabled_geolocator_is_unavailable() {
        let locator = DisabledGeolocator;
        assert!(!locator.is_available());
        assert_eq!(
            locator
                .current_position(&PositionOptions::default())
                .await
                .unwrap_err(),
            LookupError::UnsupportedCapability
        );
    }

    #[test]
    fn fixed_provider_requires_coordinates() {
        let mut cfg = Config::default();
        cfg.geolocation.provider = GeolocationProvider::Fixed;
        let err = geolocator_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("needs both latitude and longitude"));

        cfg.geolocation.latitude = Some(1.0);
        cfg.geolocation.longitude = Some(2.0);
        assert!(geolocator_from_config(&cfg).is_ok());
    }

    #[test]
    fn position_options_follow_config() {
        let mut cfg = Config::default();
        assert_eq!(PositionOptions::from_config(&cfg), PositionOptions::default());

        cfg.geolocation.timeout_secs = 3;
        cfg.geolocation.high_accuracy = false;
        let options = PositionOptions::from_config(&cfg);
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert!(!options.high_accuracy);
    }
}
