//! Municipality registry (IBGE) client and the session-wide locality index.

use std::sync::Arc;
use std::time::Duration;

use clima_core::RegistryConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::LookupError;
use crate::http::{self, RetryPolicy};
use crate::text::fold_key;
use crate::types::LocalityEntry;

const MUNICIPALITIES_PATH: &str = "localidades/municipios";
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Placeholder shown by a disabled city input when the index failed to load.
pub const LOAD_FAILED_PLACEHOLDER: &str = "Failed to load cities";

#[derive(Debug, Deserialize)]
struct RawMunicipality {
    id: Option<Value>,
    nome: Option<String>,
    latitude: Option<Value>,
    longitude: Option<Value>,
    microrregiao: Option<RawMicroRegion>,
    #[serde(rename = "regiao-imediata")]
    regiao_imediata: Option<RawImmediateRegion>,
}

#[derive(Debug, Deserialize)]
struct RawMicroRegion {
    mesorregiao: Option<RawMesoRegion>,
}

#[derive(Debug, Deserialize)]
struct RawMesoRegion {
    #[serde(rename = "UF")]
    uf: Option<RawState>,
}

#[derive(Debug, Deserialize)]
struct RawImmediateRegion {
    #[serde(rename = "regiao-intermediaria")]
    regiao_intermediaria: Option<RawIntermediateRegion>,
}

#[derive(Debug, Deserialize)]
struct RawIntermediateRegion {
    #[serde(rename = "UF")]
    uf: Option<RawState>,
}

#[derive(Debug, Deserialize)]
struct RawState {
    sigla: Option<String>,
    nome: Option<String>,
}

impl RawMunicipality {
    fn state(&self) -> Option<&RawState> {
        self.microrregiao
            .as_ref()
            .and_then(|m| m.mesorregiao.as_ref())
            .and_then(|m| m.uf.as_ref())
            .or_else(|| {
                self.regiao_imediata
                    .as_ref()
                    .and_then(|r| r.regiao_intermediaria.as_ref())
                    .and_then(|r| r.uf.as_ref())
            })
    }

    fn into_entry(self) -> Option<LocalityEntry> {
        let display_name = self.nome.as_deref().map(str::trim).unwrap_or_default().to_string();
        let id = match &self.id {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        if display_name.is_empty() || id.is_empty() {
            return None;
        }

        let state = self.state();
        let state_name = state.and_then(|s| non_empty(s.nome.as_deref()));
        let state_abbreviation = state.and_then(|s| non_empty(s.sigla.as_deref()));

        Some(LocalityEntry {
            display_name,
            id,
            latitude: self.latitude.as_ref().and_then(parse_decimal),
            longitude: self.longitude.as_ref().and_then(parse_decimal),
            state_name,
            state_abbreviation,
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Parse a number that may arrive as JSON number or as a comma-decimal string (`"-23,55"`).
pub fn parse_decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

pub fn parse_decimal_str(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Map raw registry records into entries: drop nameless/idless ones, sort by folded name.
fn into_sorted_entries(raw: Vec<RawMunicipality>) -> Vec<LocalityEntry> {
    let mut entries: Vec<LocalityEntry> = raw.into_iter().filter_map(RawMunicipality::into_entry).collect();
    entries.sort_by_cached_key(|e| (fold_key(&e.display_name), e.display_name.clone()));
    entries
}

/// HTTP client for the municipality registry
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, LookupError> {
        Self::with_base_url(&config.base_url)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, LookupError> {
        Ok(Self {
            client: http::build_client(Duration::from_secs(REQUEST_TIMEOUT_SECS))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, MUNICIPALITIES_PATH)
    }

    /// Every municipality, normalized and sorted alphabetically.
    pub async fn list_municipalities(&self) -> Result<Vec<LocalityEntry>, LookupError> {
        let url = self.url();
        let response = http::send_with_retry(&self.retry, || self.client.get(&url).send()).await?;
        let raw: Vec<RawMunicipality> = http::read_json(response).await?;
        Ok(into_sorted_entries(raw))
    }

    /// Municipalities the registry returns for `name`.
    pub async fn find_by_name(&self, name: &str) -> Result<Vec<LocalityEntry>, LookupError> {
        let url = self.url();
        let response = http::send_with_retry(&self.retry, || {
            self.client.get(&url).query(&[("nome", name)]).send()
        })
        .await?;
        let raw: Vec<RawMunicipality> = http::read_json(response).await?;
        Ok(into_sorted_entries(raw))
    }
}

/// Find the registry entry confirming `name` is a municipality (in `state_abbreviation`, when given).
///
/// Names compare case-insensitively and exactly; states compare by abbreviation.
pub fn verify_municipality<'a>(
    entries: &'a [LocalityEntry],
    name: &str,
    state_abbreviation: Option<&str>,
) -> Option<&'a LocalityEntry> {
    let wanted = name.trim().to_lowercase();
    entries.iter().find(|entry| {
        entry.display_name.to_lowercase() == wanted
            && state_abbreviation.map_or(true, |uf| {
                entry
                    .state_abbreviation
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(uf.trim()))
            })
    })
}

/// The session's list of valid cities, or the sentinel that disables the city input.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalityIndex {
    Ready(Vec<LocalityEntry>),
    Unavailable { reason: String },
}

impl LocalityIndex {
    pub fn entries(&self) -> &[LocalityEntry] {
        match self {
            Self::Ready(entries) => entries,
            Self::Unavailable { .. } => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Placeholder text for the city input
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Ready(_) => "Type a city",
            Self::Unavailable { .. } => LOAD_FAILED_PLACEHOLDER,
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Loads the locality index once and hands the same `Arc` to every caller.
#[derive(Debug)]
pub struct LocalityCatalog {
    registry: RegistryClient,
    index: OnceCell<Arc<LocalityIndex>>,
}

impl LocalityCatalog {
    pub fn new(registry: RegistryClient) -> Self {
        Self {
            registry,
            index: OnceCell::new(),
        }
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Fetch on first call; later calls reuse the cached result, failures included.
    pub async fn load(&self) -> Arc<LocalityIndex> {
        self.index
            .get_or_init(|| async {
                match self.registry.list_municipalities().await {
                    Ok(entries) => {
                        tracing::info!("Loaded {} municipalities", entries.len());
                        Arc::new(LocalityIndex::Ready(entries))
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load municipality list: {}", e);
                        Arc::new(LocalityIndex::Unavailable {
                            reason: e.to_string(),
                        })
                    }
                }
            })
            .await
            .clone()
    }

    /// The index if it has already been loaded.
    pub fn get(&self) -> Option<Arc<LocalityIndex>> {
        self.index.get().cloned()
    }
}
