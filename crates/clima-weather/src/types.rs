use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A city-level entry of the municipality registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityEntry {
    pub display_name: String,
    pub id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub state_name: Option<String>,
    pub state_abbreviation: Option<String>,
}

impl LocalityEntry {
    /// Both coordinates, when the registry supplied them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// What the autocomplete hands to its selection callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySelection {
    pub label: String,
    /// `(latitude, longitude)` when the committed candidate carried both.
    pub coordinates: Option<(f64, f64)>,
}

impl CitySelection {
    pub fn freeform(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            coordinates: None,
        }
    }
}

/// A canonical, municipality-checked place to fetch weather for.
///
/// Built only by the resolver: after registry verification, from a label the
/// caller already trusts, or deliberately unlabeled when nothing verified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCity {
    label: Option<String>,
    state_abbreviation: Option<String>,
    latitude: f64,
    longitude: f64,
}

impl ResolvedCity {
    pub(crate) fn verified(
        name: &str,
        state_abbreviation: Option<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        let label = match &state_abbreviation {
            Some(uf) => format!("{} - {}", name, uf),
            None => name.to_string(),
        };
        Self {
            label: Some(label),
            state_abbreviation,
            latitude,
            longitude,
        }
    }

    pub(crate) fn with_known_label(label: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            label: Some(label.trim().to_string()).filter(|l| !l.is_empty()),
            state_abbreviation: None,
            latitude,
            longitude,
        }
    }

    pub(crate) fn unlabeled(latitude: f64, longitude: f64) -> Self {
        Self {
            label: None,
            state_abbreviation: None,
            latitude,
            longitude,
        }
    }

    /// `"Name - UF"`, `"Name"`, or `None` when the place could not be verified.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn state_abbreviation(&self) -> Option<&str> {
        self.state_abbreviation.as_deref()
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Weather condition categories mapped from OpenWeatherMap condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_code(code: i32) -> Self {
        match code {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500 | 501 | 520 | 521 => Self::Rain,
            502..=504 | 522 | 531 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            611..=616 => Self::Sleet,
            600..=622 => Self::Snow,
            701..=781 => Self::Fog,
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// One entry of the provider's `weather` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub id: i32,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

impl ConditionSummary {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_owm_code(self.id)
    }

    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}.png", self.icon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub temp_min: f64,
    #[serde(default)]
    pub temp_max: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

/// Shown instead of the provider's name when no municipality was verified.
pub const UNVERIFIED_PLACE_NAME: &str = "Current location";

/// How a weather payload names its place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "label")]
pub enum DisplayName {
    /// The provider's own place name
    #[default]
    Provider,
    /// A registry-verified or caller-trusted label
    Resolved(String),
    /// Nothing verified; the provider's name is hidden
    Suppressed,
}

impl DisplayName {
    /// Label of a resolved city, or `Suppressed` when it is unlabeled.
    pub fn for_city(city: &ResolvedCity) -> Self {
        match city.label() {
            Some(label) => Self::Resolved(label.to_string()),
            None => Self::Suppressed,
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider)
    }

    fn resolve<'a>(&'a self, provider_name: &'a str) -> &'a str {
        match self {
            Self::Provider => provider_name,
            Self::Resolved(label) => label,
            Self::Suppressed => UNVERIFIED_PLACE_NAME,
        }
    }
}

/// Current conditions as returned by `/weather`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    #[serde(default)]
    pub name: String,
    pub coord: Option<Coord>,
    #[serde(default)]
    pub weather: Vec<ConditionSummary>,
    pub main: MainReadings,
    pub wind: Option<Wind>,
    #[serde(default)]
    pub dt: i64,
    /// Offset from UTC in seconds
    #[serde(default)]
    pub timezone: i32,
    /// How `name` is shadowed for display
    #[serde(default, skip_serializing_if = "DisplayName::is_provider")]
    pub display_name: DisplayName,
}

impl CurrentConditions {
    /// Name to show for this place; never the provider's name when suppressed.
    pub fn place_name(&self) -> &str {
        self.display_name.resolve(&self.name)
    }

    pub fn summary(&self) -> Option<&ConditionSummary> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub dt: i64,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<ConditionSummary>,
    /// Probability of precipitation, 0..1
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    #[serde(default)]
    pub name: String,
    pub coord: Option<Coord>,
    pub country: Option<String>,
    #[serde(default)]
    pub timezone: i32,
}

/// 5-day / 3-hour forecast as returned by `/forecast`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub list: Vec<ForecastEntry>,
    pub city: ForecastCity,
    #[serde(default, skip_serializing_if = "DisplayName::is_provider")]
    pub display_name: DisplayName,
}

/// One day of the outlook shown under current conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub low: f64,
    pub high: f64,
    pub condition: WeatherCondition,
    pub description: String,
    pub icon: String,
    pub precipitation_chance: u8,
}

impl Forecast {
    pub fn place_name(&self) -> &str {
        self.display_name.resolve(&self.city.name)
    }

    /// The next five days: first 3-hour slot of each local date, today excluded.
    pub fn daily_outlook(&self) -> Vec<DayForecast> {
        let offset = FixedOffset::east_opt(self.city.timezone)
            .or_else(|| FixedOffset::east_opt(0));
        let Some(offset) = offset else {
            return Vec::new();
        };

        let mut days: Vec<(NaiveDate, &ForecastEntry)> = Vec::new();
        for entry in &self.list {
            let Some(at) = DateTime::<Utc>::from_timestamp(entry.dt, 0) else {
                continue;
            };
            let date = at.with_timezone(&offset).date_naive();
            if !days.iter().any(|(d, _)| *d == date) {
                days.push((date, entry));
            }
        }

        days.into_iter()
            .skip(1)
            .take(5)
            .map(|(date, entry)| {
                let summary = entry.weather.first();
                DayForecast {
                    date,
                    low: entry.main.temp_min,
                    high: entry.main.temp_max,
                    condition: summary.map(ConditionSummary::condition).unwrap_or_default(),
                    description: summary.map(|s| s.description.clone()).unwrap_or_default(),
                    icon: summary.map(|s| s.icon.clone()).unwrap_or_default(),
                    precipitation_chance: (entry.pop.clamp(0.0, 1.0) * 100.0).round() as u8,
                }
            })
            .collect()
    }
}

/// Current conditions plus forecast for one place
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub forecast: Forecast,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owm_code_groups() {
        assert_eq!(WeatherCondition::from_owm_code(211), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_owm_code(301), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_owm_code(500), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_code(502), WeatherCondition::HeavyRain);
        assert_eq!(WeatherCondition::from_owm_code(511), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_code(612), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_code(601), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_owm_code(741), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_owm_code(800), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_code(802), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_owm_code(804), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_unknown_code_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_owm_code(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_code(-1), WeatherCondition::Clear);
    }

    #[test]
    fn test_verified_label_format() {
        let city = ResolvedCity::verified("São Paulo", Some("SP".into()), -23.55, -46.63);
        assert_eq!(city.label(), Some("São Paulo - SP"));

        let city = ResolvedCity::verified("Brasília", None, -15.79, -47.88);
        assert_eq!(city.label(), Some("Brasília"));
    }

    #[test]
    fn test_display_name_shadows_provider_name() {
        let mut current: CurrentConditions = serde_json::from_value(serde_json::json!({
            "name": "Bela Vista",
            "main": {"temp": 21.3},
            "weather": [{"id": 803, "main": "Clouds", "description": "nublado", "icon": "04d"}]
        }))
        .unwrap();
        assert_eq!(current.place_name(), "Bela Vista");

        current.display_name = DisplayName::Resolved("São Paulo - SP".into());
        assert_eq!(current.place_name(), "São Paulo - SP");
        assert_eq!(current.name, "Bela Vista");

        current.display_name = DisplayName::for_city(&ResolvedCity::unlabeled(-23.56, -46.64));
        assert_eq!(current.place_name(), UNVERIFIED_PLACE_NAME);
        assert_eq!(current.name, "Bela Vista");
        assert_eq!(current.summary().unwrap().condition(), WeatherCondition::Cloudy);
    }

    fn entry(dt: i64, min: f64, max: f64) -> serde_json::Value {
        serde_json::json!({
            "dt": dt,
            "main": {"temp": max, "temp_min": min, "temp_max": max},
            "weather": [{"id": 500, "main": "Rain", "description": "chuva leve", "icon": "10d"}],
            "pop": 0.42
        })
    }

    #[test]
    fn test_daily_outlook_skips_today_and_takes_five() {
        // 2026-01-01T12:00:00Z, then every 6h for 7 days, UTC-3
        let start = 1_767_268_800_i64;
        let list: Vec<_> = (0..28).map(|i| entry(start + i * 6 * 3600, 18.0, 27.0)).collect();
        let forecast: Forecast = serde_json::from_value(serde_json::json!({
            "list": list,
            "city": {"name": "São Paulo", "country": "BR", "timezone": -10800}
        }))
        .unwrap();

        let days = forecast.daily_outlook();
        assert_eq!(days.len(), 5);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        assert_eq!(days[4].date, NaiveDate::from_ymd_opt(2026, 1, 6).unwrap());
        assert_eq!(days[0].condition, WeatherCondition::Rain);
        assert_eq!(days[0].precipitation_chance, 42);
    }

    #[test]
    fn test_coordinates_require_both() {
        let mut entry = LocalityEntry {
            display_name: "Campinas".into(),
            id: "3509502".into(),
            latitude: Some(-22.9),
            longitude: None,
            state_name: None,
            state_abbreviation: None,
        };
        assert_eq!(entry.coordinates(), None);
        entry.longitude = Some(-47.06);
        assert_eq!(entry.coordinates(), Some((-22.9, -47.06)));
    }
}
