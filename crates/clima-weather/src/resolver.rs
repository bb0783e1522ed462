//! Turns a typed name or raw coordinates into a canonical municipality.
//!
//! Geocoders happily return neighborhoods and districts with city-sounding
//! names. Every label produced here has been confirmed against the municipality
//! registry; by-name lookups fail when that check fails, by-coordinate lookups
//! fall back to an unlabeled result instead.

use crate::error::LookupError;
use crate::geocode::{GeoPlace, GeocodingClient};
use crate::locality::{self, parse_decimal_str, RegistryClient};
use crate::states;
use crate::text::folded_words;
use crate::types::ResolvedCity;

/// Minimum trimmed length of a name lookup.
pub const MIN_NAME_CHARS: usize = 3;

/// Serviceable bounding box (mainland Brazil plus coastal islands).
pub const LAT_RANGE: (f64, f64) = (-33.75, 5.27);
pub const LON_RANGE: (f64, f64) = (-73.99, -34.79);

/// Words marking sub-city units (neighborhoods, districts, streets).
const SUBCITY_KEYWORDS: &[&str] = &[
    "bairro",
    "distrito",
    "zona",
    "vila",
    "rua",
    "avenida",
    "quadra",
    "setor",
    "neighborhood",
    "neighbourhood",
    "district",
    "zone",
    "village",
    "street",
    "avenue",
    "block",
];

/// Whether a place name looks like a sub-city administrative unit.
pub fn is_subcity_name(name: &str) -> bool {
    folded_words(name).any(|w| SUBCITY_KEYWORDS.contains(&w.as_str()))
}

/// A coordinate as the caller has it: a number, or a comma-decimal string.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateValue {
    Number(f64),
    Text(String),
}

impl CoordinateValue {
    /// Finite value, or `None` when unparsable.
    pub fn parse(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v).filter(|v| v.is_finite()),
            Self::Text(s) => parse_decimal_str(s),
        }
    }
}

impl From<f64> for CoordinateValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for CoordinateValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CoordinateValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

pub fn in_service_area(latitude: f64, longitude: f64) -> bool {
    (LAT_RANGE.0..=LAT_RANGE.1).contains(&latitude)
        && (LON_RANGE.0..=LON_RANGE.1).contains(&longitude)
}

/// What a pick rule sees besides the candidate itself.
#[derive(Debug)]
pub struct PickContext<'a> {
    /// Lower-cased, trimmed query
    pub query: &'a str,
    pub country_code: &'a str,
}

type PickRule = fn(&GeoPlace, &PickContext<'_>) -> bool;

fn exact_name_with_state(place: &GeoPlace, ctx: &PickContext<'_>) -> bool {
    place.name.trim().to_lowercase() == ctx.query && place.state.is_some()
}

fn name_starts_with_query(place: &GeoPlace, ctx: &PickContext<'_>) -> bool {
    place.name.trim().to_lowercase().starts_with(ctx.query)
}

fn same_country(place: &GeoPlace, ctx: &PickContext<'_>) -> bool {
    place.in_country(ctx.country_code)
}

/// Tie-break ladder over denylist-filtered candidates, highest priority first.
pub const PICK_LADDER: &[(&str, PickRule)] = &[
    ("exact name with state", exact_name_with_state),
    ("name starts with query", name_starts_with_query),
    ("same country", same_country),
];

/// Pick the best candidate: sub-city names are excluded, the ladder runs in order,
/// and the first raw result is the last resort. Returns the rule that matched.
pub fn pick_best<'a>(
    raw: &'a [GeoPlace],
    query: &str,
    country_code: &str,
) -> Option<(&'static str, &'a GeoPlace)> {
    let query = query.trim().to_lowercase();
    let ctx = PickContext {
        query: &query,
        country_code,
    };
    let eligible: Vec<&GeoPlace> = raw.iter().filter(|p| !is_subcity_name(&p.name)).collect();

    PICK_LADDER
        .iter()
        .find_map(|(rule, matches)| {
            eligible
                .iter()
                .find(|p| matches(p, &ctx))
                .map(|p| (*rule, *p))
        })
        .or_else(|| raw.first().map(|p| ("first raw result", p)))
}

/// Resolves names and coordinates to registry-verified cities.
#[derive(Debug, Clone)]
pub struct CityResolver {
    geocoder: GeocodingClient,
    registry: RegistryClient,
}

impl CityResolver {
    pub fn new(geocoder: GeocodingClient, registry: RegistryClient) -> Self {
        Self { geocoder, registry }
    }

    fn country_code(&self) -> &str {
        self.geocoder.country_code()
    }

    /// Resolve a typed city name.
    ///
    /// Fails with `Validation` for names under three characters and `NotFound`
    /// when no candidate survives geocoding and registry verification.
    pub async fn resolve_by_name(&self, name: &str) -> Result<ResolvedCity, LookupError> {
        let name = name.trim();
        if name.chars().count() < MIN_NAME_CHARS {
            return Err(LookupError::validation(format!(
                "Type at least {} characters",
                MIN_NAME_CHARS
            )));
        }

        let places = self.geocoder.forward(name).await?;
        let Some((rule, place)) = pick_best(&places, name, self.country_code()) else {
            return Err(LookupError::not_found(format!("no places match '{}'", name)));
        };
        tracing::debug!("Picked '{}' for '{}' via rule: {}", place.name, name, rule);

        let Some((latitude, longitude)) = place.coordinates() else {
            return Err(LookupError::not_found(format!(
                "'{}' has no coordinates",
                place.name
            )));
        };

        let state = place.state.as_deref().map(states::derive_abbreviation);
        match self.verify(&place.name, state.as_deref()).await? {
            Some((canonical, uf)) => {
                let city = ResolvedCity::verified(&canonical, uf, latitude, longitude);
                tracing::info!("Resolved '{}' to {:?}", name, city.label());
                Ok(city)
            }
            None => {
                tracing::warn!(
                    "'{}' ({:?}) is not a registered municipality",
                    place.name,
                    state
                );
                Err(LookupError::not_found(format!(
                    "possible non-municipality match: '{}'",
                    place.name
                )))
            }
        }
    }

    /// Resolve raw coordinates, optionally with a label the caller already trusts.
    ///
    /// Fails only for unparsable input (`Validation`) or coordinates outside the
    /// service area (`OutOfServiceArea`). When no nearby place verifies as a
    /// municipality the result is returned unlabeled.
    pub async fn resolve_by_coordinates(
        &self,
        latitude: impl Into<CoordinateValue>,
        longitude: impl Into<CoordinateValue>,
        known_label: Option<&str>,
    ) -> Result<ResolvedCity, LookupError> {
        let (Some(lat), Some(lon)) = (latitude.into().parse(), longitude.into().parse()) else {
            return Err(LookupError::validation("Invalid coordinates"));
        };

        if !in_service_area(lat, lon) {
            return Err(LookupError::OutOfServiceArea {
                latitude: lat,
                longitude: lon,
            });
        }

        if let Some(label) = known_label.filter(|l| !l.trim().is_empty()) {
            return Ok(ResolvedCity::with_known_label(label, lat, lon));
        }

        let places = match self.geocoder.reverse(lat, lon).await {
            Ok(places) => places,
            Err(e) => {
                tracing::warn!("Reverse geocoding failed, leaving location unlabeled: {}", e);
                return Ok(ResolvedCity::unlabeled(lat, lon));
            }
        };

        let country = self.country_code().to_string();
        for place in places.iter().filter(|p| p.in_country(&country)) {
            if let Some(city) = self.try_verify_place(place, lat, lon).await {
                return Ok(city);
            }
        }

        let query = places.first().map(|p| p.name.clone()).unwrap_or_default();
        if let Some((rule, place)) = pick_best(&places, &query, &country) {
            tracing::debug!("Best-guess place '{}' via rule: {}", place.name, rule);
            if let Some(city) = self.try_verify_place(place, lat, lon).await {
                return Ok(city);
            }
        }

        tracing::info!("No municipality verified near ({}, {}); leaving unlabeled", lat, lon);
        Ok(ResolvedCity::unlabeled(lat, lon))
    }

    /// Verification that treats registry failures as "not verified".
    async fn try_verify_place(&self, place: &GeoPlace, lat: f64, lon: f64) -> Option<ResolvedCity> {
        let state = place.state.as_deref().map(states::derive_abbreviation);
        match self.verify(&place.name, state.as_deref()).await {
            Ok(Some((canonical, uf))) => Some(ResolvedCity::verified(&canonical, uf, lat, lon)),
            Ok(None) => {
                tracing::debug!("'{}' did not verify as a municipality", place.name);
                None
            }
            Err(e) => {
                tracing::warn!("Registry lookup for '{}' failed: {}", place.name, e);
                None
            }
        }
    }

    /// Registry spelling and state of `name`, if it is a municipality.
    async fn verify(
        &self,
        name: &str,
        state_abbreviation: Option<&str>,
    ) -> Result<Option<(String, Option<String>)>, LookupError> {
        let entries = self.registry.find_by_name(name).await?;
        Ok(
            locality::verify_municipality(&entries, name, state_abbreviation).map(|entry| {
                let uf = entry
                    .state_abbreviation
                    .clone()
                    .or_else(|| state_abbreviation.map(str::to_string));
                (entry.display_name.clone(), uf)
            }),
        )
    }
}
