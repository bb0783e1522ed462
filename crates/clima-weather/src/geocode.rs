//! Forward and reverse geocoding against OpenWeatherMap's geo API.

use std::time::Duration;

use clima_core::WeatherConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::http::{self, RetryPolicy};

/// Candidates requested per lookup.
pub const GEOCODE_LIMIT: u8 = 10;

/// A named place returned by the geocoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPlace {
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub country: Option<String>,
    /// Full state name as the geocoder spells it (e.g. "São Paulo").
    pub state: Option<String>,
}

impl GeoPlace {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat
            .zip(self.lon)
            .filter(|(lat, lon)| lat.is_finite() && lon.is_finite())
    }

    pub fn in_country(&self, code: &str) -> bool {
        self.country
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(code))
    }
}

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Client,
    base_url: String,
    api_key: String,
    country_code: String,
    retry: RetryPolicy,
}

impl GeocodingClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, LookupError> {
        let mut client =
            Self::with_base_url(&config.geocoding_url, &config.api_key, &config.country_code)?;
        client.client = http::build_client(Duration::from_secs(config.request_timeout_secs))?;
        Ok(client)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        country_code: &str,
    ) -> Result<Self, LookupError> {
        Ok(Self {
            client: http::build_client(Duration::from_secs(10))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            country_code: country_code.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Places matching `name`, qualified with the service country.
    pub async fn forward(&self, name: &str) -> Result<Vec<GeoPlace>, LookupError> {
        let url = format!("{}/direct", self.base_url);
        let q = format!("{},{}", name.trim(), self.country_code);
        let limit = GEOCODE_LIMIT.to_string();

        let response = http::send_with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[
                    ("q", q.as_str()),
                    ("limit", limit.as_str()),
                    ("appid", self.api_key.as_str()),
                ])
                .send()
        })
        .await?;

        let places: Vec<GeoPlace> = http::read_json(response).await?;
        tracing::debug!("Forward geocode '{}' returned {} places", q, places.len());
        Ok(places)
    }

    /// Named places near the given coordinates.
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Vec<GeoPlace>, LookupError> {
        let url = format!("{}/reverse", self.base_url);
        let lat = latitude.to_string();
        let lon = longitude.to_string();
        let limit = GEOCODE_LIMIT.to_string();

        let response = http::send_with_retry(&self.retry, || {
            self.client
                .get(&url)
                .query(&[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("limit", limit.as_str()),
                    ("appid", self.api_key.as_str()),
                ])
                .send()
        })
        .await?;

        let places: Vec<GeoPlace> = http::read_json(response).await?;
        tracing::debug!(
            "Reverse geocode ({}, {}) returned {} places",
            latitude,
            longitude,
            places.len()
        );
        Ok(places)
    }
}
