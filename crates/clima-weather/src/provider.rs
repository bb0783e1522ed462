//! Current conditions and forecast from OpenWeatherMap.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clima_core::{TemperatureUnit, WeatherConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::LookupError;
use crate::http::{self, RetryPolicy};
use crate::types::{CurrentConditions, DisplayName, Forecast, ResolvedCity, WeatherReport};

/// Where a request points: coordinates of a resolved city, or a raw city name.
enum Target<'a> {
    Coordinates(f64, f64),
    Name(&'a str),
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    units: TemperatureUnit,
    language: String,
    retry: RetryPolicy,
}

impl WeatherProvider {
    pub fn new(config: &WeatherConfig) -> Result<Self, LookupError> {
        let client = http::build_client(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            units: config.temperature_unit,
            language: config.language.clone(),
            retry: RetryPolicy::default(),
        })
    }

    /// Provider pointed at another host, with default units and language.
    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self, LookupError> {
        let config = WeatherConfig {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            ..WeatherConfig::default()
        };
        Self::new(&config)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn units(&self) -> TemperatureUnit {
        self.units
    }

    /// Current conditions and forecast for a resolved city, labeled with its canonical name.
    ///
    /// An unlabeled city hides the provider's place name. Both requests run
    /// concurrently; if either fails the whole fetch fails.
    pub async fn fetch(&self, city: &ResolvedCity) -> Result<WeatherReport, LookupError> {
        let target = Target::Coordinates(city.latitude(), city.longitude());
        let mut report = self.fetch_target(&target).await?;
        let display_name = DisplayName::for_city(city);
        report.current.display_name = display_name.clone();
        report.forecast.display_name = display_name;
        Ok(report)
    }

    /// Weather by free-text city name, bypassing resolution.
    pub async fn fetch_by_name(&self, name: &str) -> Result<WeatherReport, LookupError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LookupError::validation("Type a city name"));
        }
        self.fetch_target(&Target::Name(name)).await
    }

    async fn fetch_target(&self, target: &Target<'_>) -> Result<WeatherReport, LookupError> {
        if self.api_key.trim().is_empty() {
            return Err(LookupError::Provider(
                "Weather API key is not configured".to_string(),
            ));
        }

        let (current, forecast) = tokio::try_join!(
            self.get::<CurrentConditions>("weather", target),
            self.get::<Forecast>("forecast", target),
        )
        .map_err(LookupError::into_provider)?;

        tracing::info!(
            "Fetched weather for '{}' ({} forecast slots)",
            current.place_name(),
            forecast.list.len()
        );
        Ok(WeatherReport {
            current,
            forecast,
            fetched_at: Utc::now(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        target: &Target<'_>,
    ) -> Result<T, LookupError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut params: Vec<(&str, String)> = match target {
            Target::Coordinates(lat, lon) => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
            Target::Name(name) => vec![("q", name.to_string())],
        };
        params.push(("units", self.units.provider_units().to_string()));
        params.push(("lang", self.language.clone()));
        params.push(("appid", self.api_key.clone()));

        tracing::debug!("Requesting {}", endpoint);
        let response =
            http::send_with_retry(&self.retry, || self.client.get(&url).query(&params).send())
                .await?;
        http::read_json(response).await
    }
}
