use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::LookupError,
    model::{Coordinates, WeatherRecord},
};

use super::WeatherSource;

/// OpenWeatherMap current-weather client.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    /// No request timeout is configured: a fetch runs until the server answers.
    pub fn new(api_key: String, base_url: String) -> Result<Self, LookupError> {
        let http = Client::builder().build()?;
        Ok(Self {
            api_key,
            base_url,
            http,
        })
    }

    pub fn city_url(&self, name: &str) -> String {
        format!(
            "{}?q={}&appid={}&units=metric",
            self.base_url,
            urlencoding::encode(name),
            self.api_key
        )
    }

    pub fn coords_url(&self, coords: Coordinates) -> String {
        format!(
            "{}?lat={}&lon={}&appid={}&units=metric",
            self.base_url, coords.latitude, coords.longitude, self.api_key
        )
    }

    /// Issue `url` and normalize whatever comes back.
    ///
    /// The body is decoded before the status is inspected, so a failing
    /// response can still contribute its `message`.
    pub async fn fetch_weather(&self, url: &str) -> Result<WeatherRecord, LookupError> {
        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;
        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;

        if !status.is_success() {
            tracing::debug!(%status, message = ?parsed.message, "provider rejected request");
            return Err(LookupError::api(parsed.message));
        }

        Ok(normalize(parsed))
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch_by_city(&self, name: &str) -> Result<WeatherRecord, LookupError> {
        self.fetch_weather(&self.city_url(name)).await
    }

    async fn fetch_by_coords(&self, coords: Coordinates) -> Result<WeatherRecord, LookupError> {
        self.fetch_weather(&self.coords_url(coords)).await
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCurrentResponse {
    name: Option<String>,
    dt: Option<i64>,
    sys: Option<OwSys>,
    main: Option<OwMain>,
    wind: Option<OwWind>,
    weather: Option<Vec<OwWeather>>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWeather {
    main: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

fn normalize(raw: OwCurrentResponse) -> WeatherRecord {
    let main = raw.main.unwrap_or_default();
    let condition = raw
        .weather
        .and_then(|w| w.into_iter().next())
        .unwrap_or_default();

    WeatherRecord {
        city: raw.name.unwrap_or_default(),
        country: raw.sys.and_then(|s| s.country),
        temp: main.temp.map(round_half_up),
        feels_like: main.feels_like.map(round_half_up),
        temp_min: main.temp_min.map(round_half_up),
        temp_max: main.temp_max.map(round_half_up),
        humidity: main.humidity,
        wind_speed: raw.wind.and_then(|w| w.speed),
        weather_main: condition.main,
        weather_desc: condition.description,
        icon: condition.icon,
        timestamp: raw.dt.and_then(|secs| secs.checked_mul(1000)),
    }
}

/// Halves round towards positive infinity: 21.5 -> 22, -2.5 -> -2.
fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded as i64
}
