//! Centralized error types for the Clima application.
//!
//! Every error carries a `user_message()` suitable for the single error slot
//! shown to the user, while `Display` keeps the full technical context for logs.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(e) => e.user_message().to_string(),
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Weather(e) => e.user_message(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}

/// Weather lookup errors, one variant per user-facing failure class.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Bad user input; not retryable as-is.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The place could not be resolved to a municipality.
    #[error("City not found: {0}")]
    NotFound(String),

    /// Coordinates fall outside the supported region.
    #[error("Location outside service area: {0}")]
    OutOfServiceArea(String),

    /// Upstream weather, geocoding or registry failure; carries the provider's message.
    #[error("Weather API error: {0}")]
    Provider(String),
}

impl WeatherError {
    /// Validation and provider messages are already user-facing and pass through.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Validation(msg) | WeatherError::Provider(msg) => msg.clone(),
            WeatherError::NotFound(_) => "City not found. Check the name and try again.".to_string(),
            WeatherError::OutOfServiceArea(_) => {
                "This location is outside the supported area.".to_string()
            }
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let errors = vec![
            AppError::Network(NetworkError::Timeout),
            AppError::Config(ConfigError::Invalid("test".into())),
            AppError::Weather(WeatherError::NotFound("x".into())),
            AppError::Weather(WeatherError::OutOfServiceArea("40, -70".into())),
            AppError::Other(anyhow::anyhow!("boom")),
        ];

        for err in errors {
            assert!(!err.user_message().is_empty(), "{err} has empty user message");
        }
    }

    #[test]
    fn test_app_error_conversion() {
        let err: AppError = ConfigError::Invalid("registry.base_url".into()).into();
        assert!(matches!(err, AppError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_weather_messages_pass_through() {
        let err = AppError::Weather(WeatherError::Validation("Type a city name".into()));
        assert_eq!(err.user_message(), "Type a city name");

        let err = AppError::Weather(WeatherError::Provider("city not found".into()));
        assert_eq!(err.user_message(), "city not found");
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let five = NetworkError::ServerError {
            status: 503,
            message: "down".into(),
        };
        let four = NetworkError::ServerError {
            status: 400,
            message: "bad".into(),
        };
        assert_ne!(five.user_message(), four.user_message());
    }

    #[test]
    fn test_display_keeps_detail() {
        let err = AppError::Weather(WeatherError::Provider("city not found".into()));
        assert!(err.to_string().contains("city not found"));
    }
}
