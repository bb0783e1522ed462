//! Lookup error taxonomy shared by the resolver, provider and session.

use clima_core::{AppError, NetworkError, ReqwestErrorExt, WeatherError};
use thiserror::Error;

/// Generic text shown when an upstream failure carries no message of its own.
pub const GENERIC_PROVIDER_MESSAGE: &str = "Failed to fetch weather data";

#[derive(Debug, Error)]
pub enum LookupError {
    /// Bad user input. The message is user-facing.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resolution failed; the user may retry with different input.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Coordinates ({latitude}, {longitude}) are outside the service area")]
    OutOfServiceArea { latitude: f64, longitude: f64 },

    /// Upstream service answered with an error. Carries the provider's message when it sent one.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl LookupError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Message for the session's single error slot, via the application taxonomy.
    pub fn into_user_message(self) -> String {
        AppError::from(self).user_message()
    }

    /// Whether re-submitting the same input might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Network(_) | Self::Parse(_))
    }

    /// Collapse transport and schema failures into a provider error,
    /// keeping the provider message when one is already present.
    pub fn into_provider(self) -> Self {
        match self {
            Self::Network(e) => {
                tracing::warn!("Provider request failed: {}", e);
                Self::Provider(GENERIC_PROVIDER_MESSAGE.to_string())
            }
            Self::Parse(msg) => {
                tracing::warn!("Provider response could not be parsed: {}", msg);
                Self::Provider(GENERIC_PROVIDER_MESSAGE.to_string())
            }
            other => other,
        }
    }
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::Validation(s) => AppError::Weather(WeatherError::Validation(s)),
            LookupError::NotFound(s) => AppError::Weather(WeatherError::NotFound(s)),
            LookupError::OutOfServiceArea {
                latitude,
                longitude,
            } => AppError::Weather(WeatherError::OutOfServiceArea(format!(
                "{}, {}",
                latitude, longitude
            ))),
            LookupError::Provider(s) => AppError::Weather(WeatherError::Provider(s)),
            LookupError::Network(e) => AppError::Network(e.into_network_error()),
            LookupError::Parse(s) => AppError::Network(NetworkError::InvalidResponse(s)),
        }
    }
}
