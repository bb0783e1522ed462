//! Weather lookup for Brazilian municipalities
//!
//! Loads the IBGE municipality registry for live suggestions, resolves typed
//! names and raw coordinates to registry-verified cities, and fetches current
//! conditions plus forecast from OpenWeatherMap.

pub mod error;
pub mod geocode;
pub mod http;
pub mod locality;
pub mod provider;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod states;
pub mod suggest;
pub mod text;
pub mod types;

pub use error::LookupError;
pub use geocode::{GeoPlace, GeocodingClient};
pub use http::RetryPolicy;
pub use locality::{LocalityCatalog, LocalityIndex, RegistryClient};
pub use provider::WeatherProvider;
pub use resolver::{CityResolver, CoordinateValue};
pub use selection::{Autocomplete, Key, Visibility};
pub use session::{SearchOutcome, SessionSnapshot, WeatherSession};
pub use types::*;
