//! Integration tests for WeatherProvider and ForecastService using wiremock.

use std::path::Path;
use std::time::Duration;

use barcast_weather::{
    CacheEntry, ForecastFetcher, ForecastService, LocationRecord, WeatherError, WeatherProvider,
};
use chrono::Utc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn seattle() -> LocationRecord {
    LocationRecord::new(47.61, -122.33, "Seattle", "Washington", "United States")
}

fn forecast_body(temp_f: f64) -> serde_json::Value {
    serde_json::json!({
        "location": { "name": "Seattle", "region": "Washington", "country": "USA" },
        "current": {
            "temp_c": (temp_f - 32.0) * 5.0 / 9.0,
            "temp_f": temp_f,
            "feelslike_c": 9.0,
            "feelslike_f": 48.2,
            "wind_mph": 5.6,
            "wind_kph": 9.0,
            "wind_dir": "NNW",
            "humidity": 70,
            "uv": 2.0,
            "condition": { "text": "Partly cloudy", "code": 1003 }
        },
        "forecast": { "forecastday": [{
            "date": "2026-10-19",
            "day": {
                "maxtemp_c": 14.0, "maxtemp_f": 57.2,
                "mintemp_c": 8.0, "mintemp_f": 46.4,
                "condition": { "text": "Sunny" },
                "daily_chance_of_rain": 0
            },
            "hour": []
        }]}
    })
}

fn provider(server: &MockServer, timeout: Duration) -> WeatherProvider {
    WeatherProvider::new(server.uri(), "test-key", 7, timeout).unwrap()
}

fn service(server: &MockServer, dir: &Path) -> ForecastService<WeatherProvider> {
    ForecastService::new(
        provider(server, Duration::from_secs(2)),
        dir,
        Duration::from_secs(900),
    )
}

#[tokio::test]
async fn test_fetch_forecast_sends_expected_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .and(query_param("key", "test-key"))
        .and(query_param("q", "47.61,-122.33"))
        .and(query_param("days", "7"))
        .and(query_param("aqi", "no"))
        .and(query_param("alerts", "no"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(54.0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let payload = provider(&mock_server, Duration::from_secs(2))
        .fetch_forecast(47.61, -122.33)
        .await
        .unwrap();

    assert_eq!(payload.current.temp_f, 54.0);
    assert_eq!(payload.current.condition.text, "Partly cloudy");
    assert_eq!(payload.forecast.forecastday.len(), 1);
}

#[tokio::test]
async fn test_fetch_forecast_invalid_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 2006, "message": "API key is invalid." }
        })))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server, Duration::from_secs(2))
        .fetch_forecast(47.61, -122.33)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::InvalidApiKey));
}

#[tokio::test]
async fn test_fetch_forecast_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server, Duration::from_secs(2))
        .fetch_forecast(47.61, -122.33)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::Api { status: 503, .. }), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_forecast_malformed_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "location": { "name": "Seattle" }
        })))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server, Duration::from_secs(2))
        .fetch_forecast(47.61, -122.33)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_forecast_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body(54.0))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server, Duration::from_millis(100))
        .fetch_forecast(47.61, -122.33)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn test_service_caches_fresh_forecast() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(54.0)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service(&mock_server, dir.path());

    let first = service.forecast(&seattle()).await.unwrap();
    let second = service.forecast(&seattle()).await.unwrap();

    assert_eq!(first.current.temp_f, second.current.temp_f);
    assert!(dir.path().join("weather.json").exists());
}

#[tokio::test]
async fn test_service_refetches_for_a_different_location() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(54.0)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service(&mock_server, dir.path());
    let ottawa = LocationRecord::new(45.42, -75.69, "Ottawa", "Ontario", "Canada");

    service.forecast(&seattle()).await.unwrap();
    service.forecast(&ottawa).await.unwrap();
}

#[tokio::test]
async fn test_service_serves_stale_forecast_on_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service(&mock_server, dir.path());

    // Seed an hour-old entry in the on-disk shape
    let stale = serde_json::json!({
        "latitude": 47.61,
        "longitude": -122.33,
        "payload": forecast_body(41.0)
    });
    service.cache().write_entry(&CacheEntry::with_timestamp(
        stale,
        Utc::now() - chrono::Duration::seconds(3600),
    ));

    let payload = service.forecast(&seattle()).await.unwrap();
    assert_eq!(payload.current.temp_f, 41.0);
}

#[tokio::test]
async fn test_service_without_cache_reports_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = service(&mock_server, dir.path());

    let err = service.forecast(&seattle()).await.unwrap_err();
    assert!(matches!(err, WeatherError::Api { status: 500, .. }));
}
