//! UI-bound search session: one error slot, a loading flag and the latest report.
//!
//! Searches are numbered; a search that completes after a newer one has
//! started is discarded rather than overwriting fresher state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clima_core::Config;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::LookupError;
use crate::geocode::GeocodingClient;
use crate::locality::{LocalityCatalog, LocalityIndex, RegistryClient};
use crate::provider::WeatherProvider;
use crate::resolver::{CityResolver, CoordinateValue, MIN_NAME_CHARS};
use crate::selection::CLOSE_GRACE;
use crate::types::{CitySelection, ResolvedCity, WeatherReport};

pub const DEFAULT_ERROR_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct SessionState {
    error: Option<String>,
    error_timer: Option<JoinHandle<()>>,
    /// Bumped on every new error so an old timer never clears a newer message.
    error_generation: u64,
    loading: bool,
    report: Option<WeatherReport>,
    city: Option<ResolvedCity>,
}

/// Point-in-time copy of what the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub error: Option<String>,
    pub loading: bool,
    pub report: Option<WeatherReport>,
    pub city: Option<ResolvedCity>,
}

/// How a finished search affected the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The report was stored.
    Applied,
    /// The error slot was set.
    Failed,
    /// A newer search started first; the result was dropped.
    Stale,
}

pub struct WeatherSession {
    resolver: CityResolver,
    provider: WeatherProvider,
    catalog: LocalityCatalog,
    state: Arc<Mutex<SessionState>>,
    sequence: AtomicU64,
    error_ttl: Duration,
    close_grace: Duration,
}

impl WeatherSession {
    pub fn new(
        resolver: CityResolver,
        provider: WeatherProvider,
        catalog: LocalityCatalog,
        error_ttl: Duration,
    ) -> Self {
        Self {
            resolver,
            provider,
            catalog,
            state: Arc::new(Mutex::new(SessionState::default())),
            sequence: AtomicU64::new(0),
            error_ttl,
            close_grace: CLOSE_GRACE,
        }
    }

    pub fn with_close_grace(mut self, close_grace: Duration) -> Self {
        self.close_grace = close_grace;
        self
    }

    /// Build every client from application config.
    pub fn from_config(config: &Config) -> Result<Self, LookupError> {
        let registry = RegistryClient::new(&config.registry)?;
        let geocoder = GeocodingClient::new(&config.weather)?;
        let provider = WeatherProvider::new(&config.weather)?;
        Ok(Self::new(
            CityResolver::new(geocoder, registry.clone()),
            provider,
            LocalityCatalog::new(registry),
            Duration::from_secs(config.session.error_display_secs),
        )
        .with_close_grace(Duration::from_millis(
            config.session.suggestion_close_grace_ms,
        )))
    }

    pub fn resolver(&self) -> &CityResolver {
        &self.resolver
    }

    pub fn provider(&self) -> &WeatherProvider {
        &self.provider
    }

    /// How long a UI waits after a commit before calling `Autocomplete::finish_close`.
    pub fn close_grace(&self) -> Duration {
        self.close_grace
    }

    /// The locality index, loading it on first use.
    pub async fn locality_index(&self) -> Arc<LocalityIndex> {
        self.catalog.load().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            error: state.error.clone(),
            loading: state.loading,
            report: state.report.clone(),
            city: state.city.clone(),
        }
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Show `message`, replacing any current error and restarting the expiry timer.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Session error: {}", message);

        let mut state = self.state.lock();
        if let Some(timer) = state.error_timer.take() {
            timer.abort();
        }
        state.error_generation += 1;
        let generation = state.error_generation;
        state.error = Some(message);

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("No async runtime; error will not auto-clear");
            return;
        };
        let shared = Arc::clone(&self.state);
        let ttl = self.error_ttl;
        state.error_timer = Some(handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut state = shared.lock();
            if state.error_generation == generation {
                state.error = None;
                state.error_timer = None;
            }
        }));
    }

    pub fn clear_error(&self) {
        let mut state = self.state.lock();
        if let Some(timer) = state.error_timer.take() {
            timer.abort();
        }
        state.error = None;
    }

    /// Resolve a typed name and fetch its weather.
    ///
    /// A rejected name still counts as the latest search, so an earlier one
    /// still in flight is discarded.
    pub async fn search_by_name(&self, name: &str) -> SearchOutcome {
        let seq = self.begin();
        let name = name.trim();
        if name.is_empty() {
            return self.finish(seq, Err(LookupError::validation("Type a city name")));
        }
        if name.chars().count() < MIN_NAME_CHARS {
            let message = format!("Type at least {} characters", MIN_NAME_CHARS);
            return self.finish(seq, Err(LookupError::validation(message)));
        }

        let result: Result<_, LookupError> = async {
            let city = self.resolver.resolve_by_name(name).await?;
            self.fetch(city).await
        }
        .await;
        self.finish(seq, result)
    }

    /// Resolve coordinates (optionally with a trusted label) and fetch their weather.
    pub async fn search_by_coordinates(
        &self,
        latitude: impl Into<CoordinateValue>,
        longitude: impl Into<CoordinateValue>,
        known_label: Option<&str>,
    ) -> SearchOutcome {
        let seq = self.begin();
        let result: Result<_, LookupError> = async {
            let city = self
                .resolver
                .resolve_by_coordinates(latitude, longitude, known_label)
                .await?;
            self.fetch(city).await
        }
        .await;
        self.finish(seq, result)
    }

    /// Search for what the autocomplete committed.
    pub async fn search_selection(&self, selection: &CitySelection) -> SearchOutcome {
        match selection.coordinates {
            Some((lat, lon)) => {
                self.search_by_coordinates(lat, lon, Some(&selection.label))
                    .await
            }
            None => self.search_by_name(&selection.label).await,
        }
    }

    async fn fetch(&self, city: ResolvedCity) -> Result<(ResolvedCity, WeatherReport), LookupError> {
        let report = self.provider.fetch(&city).await?;
        Ok((city, report))
    }

    fn begin(&self) -> u64 {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.lock().loading = true;
        seq
    }

    fn finish(
        &self,
        seq: u64,
        result: Result<(ResolvedCity, WeatherReport), LookupError>,
    ) -> SearchOutcome {
        if self.sequence.load(Ordering::SeqCst) != seq {
            tracing::debug!("Discarding stale search #{}", seq);
            return SearchOutcome::Stale;
        }

        match result {
            Ok((city, report)) => {
                let mut state = self.state.lock();
                state.loading = false;
                state.city = Some(city);
                state.report = Some(report);
                SearchOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("Search #{} failed: {}", seq, e);
                self.state.lock().loading = false;
                self.set_error(e.into_user_message());
                SearchOutcome::Failed
            }
        }
    }
}

impl Drop for WeatherSession {
    fn drop(&mut self) {
        if let Some(timer) = self.state.lock().error_timer.take() {
            timer.abort();
        }
    }
}
