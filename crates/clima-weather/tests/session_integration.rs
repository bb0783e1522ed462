//! End-to-end session tests: autocomplete → resolver → provider against wiremock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use clima_weather::{
    Autocomplete, CityResolver, GeocodingClient, Key, LocalityCatalog, RegistryClient,
    RetryPolicy, SearchOutcome, WeatherProvider, WeatherSession, UNVERIFIED_PLACE_NAME,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session(server: &MockServer) -> WeatherSession {
    let registry = RegistryClient::with_base_url(&server.uri())
        .unwrap()
        .with_retry_policy(RetryPolicy::none());
    let geocoder = GeocodingClient::with_base_url(&server.uri(), "test-key", "BR")
        .unwrap()
        .with_retry_policy(RetryPolicy::none());
    let provider = WeatherProvider::with_base_url(&server.uri(), "test-key")
        .unwrap()
        .with_retry_policy(RetryPolicy::none());
    WeatherSession::new(
        CityResolver::new(geocoder, registry.clone()),
        provider,
        LocalityCatalog::new(registry),
        Duration::from_secs(5),
    )
}

fn municipality(id: u64, nome: &str, sigla: &str, lat: &str, lon: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "nome": nome,
        "latitude": lat,
        "longitude": lon,
        "microrregiao": {"mesorregiao": {"UF": {"sigla": sigla, "nome": sigla}}}
    })
}

async fn mount_weather(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Provider Name",
            "weather": [{"id": 800, "main": "Clear", "description": "céu limpo", "icon": "01d"}],
            "main": {"temp": 28.0, "feels_like": 30.0, "temp_min": 25.0, "temp_max": 31.0,
                     "pressure": 1012.0, "humidity": 60.0},
            "dt": 1_700_000_000,
            "timezone": -10800
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [],
            "city": {"name": "Provider Name", "country": "BR", "timezone": -10800}
        })))
        .mount(server)
        .await;
}

async fn mount_city(server: &MockServer, name: &str, uf: &str, state: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", format!("{},BR", name)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([
                    {"name": name, "lat": -8.05, "lon": -34.9, "country": "BR", "state": state}
                ]))
                .set_delay(delay),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/localidades/municipios"))
        .and(query_param("nome", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            municipality(1, name, uf, "-8,05", "-34,9")
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_by_name_applies_report() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    mount_city(&server, "Recife", "PE", "Pernambuco", Duration::ZERO).await;

    let session = session(&server);
    assert_eq!(session.search_by_name("Recife").await, SearchOutcome::Applied);

    let snapshot = session.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error, None);
    let report = snapshot.report.unwrap();
    assert_eq!(report.current.place_name(), "Recife - PE");
    assert_eq!(snapshot.city.unwrap().label(), Some("Recife - PE"));
}

#[tokio::test]
async fn test_failed_search_sets_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let session = session(&server);
    assert_eq!(session.search_by_name("Atlantida").await, SearchOutcome::Failed);
    assert!(session.error().is_some());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    mount_city(&server, "Curitiba", "PR", "Paraná", Duration::from_millis(300)).await;
    mount_city(&server, "Recife", "PE", "Pernambuco", Duration::ZERO).await;

    let session = session(&server);
    let (slow, fast) = tokio::join!(
        session.search_by_name("Curitiba"),
        session.search_by_name("Recife")
    );
    assert_eq!(slow, SearchOutcome::Stale);
    assert_eq!(fast, SearchOutcome::Applied);

    let report = session.snapshot().report.unwrap();
    assert_eq!(report.current.place_name(), "Recife - PE");
}

#[tokio::test]
async fn test_rejected_name_discards_in_flight_search() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    mount_city(&server, "Curitiba", "PR", "Paraná", Duration::from_millis(300)).await;

    let session = session(&server);
    let (slow, short) = tokio::join!(
        session.search_by_name("Curitiba"),
        session.search_by_name("Ri")
    );
    assert_eq!(slow, SearchOutcome::Stale);
    assert_eq!(short, SearchOutcome::Failed);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.report, None);
    assert_eq!(snapshot.error.as_deref(), Some("Type at least 3 characters"));
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn test_unverified_coordinates_hide_provider_name() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Bela Vista", "lat": -23.56, "lon": -46.64, "country": "BR", "state": "São Paulo"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/localidades/municipios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let session = session(&server);
    let outcome = session.search_by_coordinates(-23.56, -46.64, None).await;
    assert_eq!(outcome, SearchOutcome::Applied);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.city.unwrap().label(), None);
    let report = snapshot.report.unwrap();
    assert_eq!(report.current.place_name(), UNVERIFIED_PLACE_NAME);
    assert_eq!(report.current.name, "Provider Name");
}

#[tokio::test]
async fn test_autocomplete_selection_flows_into_search() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    Mock::given(method("GET"))
        .and(path("/localidades/municipios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            municipality(2611606, "Recife", "PE", "-8,05", "-34,9"),
            municipality(2927408, "Salvador", "BA", "-12,97", "-38,5"),
            municipality(2304400, "Fortaleza", "CE", "-3,72", "-38,54")
        ])))
        .mount(&server)
        .await;

    let session = session(&server);
    let index = session.locality_index().await;
    assert!(index.is_available());
    assert_eq!(index.len(), 3);

    let committed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&committed);
    let mut autocomplete = Autocomplete::new(index, move |s| sink.lock().unwrap().push(s.clone()));

    autocomplete.set_query("salv");
    autocomplete.handle_key(Key::ArrowDown).unwrap();
    let selection = autocomplete.handle_key(Key::Enter).unwrap().unwrap();
    assert_eq!(selection.label, "Salvador");
    assert_eq!(selection.coordinates, Some((-12.97, -38.5)));
    assert_eq!(committed.lock().unwrap().len(), 1);

    assert_eq!(session.search_selection(&selection).await, SearchOutcome::Applied);
    let report = session.snapshot().report.unwrap();
    assert_eq!(report.current.place_name(), "Salvador");
    assert_eq!(server.received_requests().await.unwrap().iter().filter(|r| r.url.path() == "/reverse").count(), 0);
}

#[tokio::test]
async fn test_registry_outage_disables_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/localidades/municipios"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server);
    let index = session.locality_index().await;
    assert!(!index.is_available());
    assert_eq!(index.placeholder(), "Failed to load cities");

    // Cached: no second request
    let again = session.locality_index().await;
    assert!(!again.is_available());
}
