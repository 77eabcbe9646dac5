use crate::{
    Config,
    error::LookupError,
    model::{Coordinates, LookupTarget, WeatherRecord},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Anything that can resolve a lookup target to a normalized record.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_by_city(&self, name: &str) -> Result<WeatherRecord, LookupError>;

    async fn fetch_by_coords(&self, coords: Coordinates) -> Result<WeatherRecord, LookupError>;

    async fn fetch(&self, target: &LookupTarget) -> Result<WeatherRecord, LookupError> {
        match target {
            LookupTarget::City { name } => self.fetch_by_city(name).await,
            LookupTarget::Coords { lat, lon } => {
                self.fetch_by_coords(Coordinates::new(*lat, *lon)).await
            }
        }
    }
}

/// Construct the weather source described by `config`.
pub fn source_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherSource>> {
    if !config.has_api_key() {
        tracing::warn!("no API key configured; requests will be rejected by the provider");
    }
    let client = OpenWeatherClient::new(
        config.api_key_or_empty().to_owned(),
        config.endpoints.weather_url.clone(),
    )?;
    Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WeatherSource for Recorder {
        async fn fetch_by_city(&self, name: &str) -> Result<WeatherRecord, LookupError> {
            self.calls.lock().unwrap().push(format!("city:{name}"));
            Ok(WeatherRecord::default())
        }

        async fn fetch_by_coords(&self, c: Coordinates) -> Result<WeatherRecord, LookupError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("coords:{},{}", c.latitude, c.longitude));
            Ok(WeatherRecord::default())
        }
    }

    #[tokio::test]
    async fn fetch_dispatches_on_target_kind() {
        let source = Recorder::default();
        source.fetch(&LookupTarget::city("Oslo")).await.unwrap();
        source
            .fetch(&LookupTarget::Coords { lat: 1.5, lon: -2.0 })
            .await
            .unwrap();

        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["city:Oslo".to_string(), "coords:1.5,-2".to_string()]
        );
    }

    #[test]
    fn source_from_config_builds_without_key() {
        let cfg = Config::default();
        assert!(source_from_config(&cfg).is_ok());
    }
}
