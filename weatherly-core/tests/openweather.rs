//! Tests for OpenWeatherClient and the interactor against a mock HTTP server.

use std::sync::Arc;

use tokio::sync::oneshot;
use weatherly_core::{
    Config, FileStore, Location, OpenWeatherClient, Units, WeatherClient, WeatherError,
    WeatherInteractor, WeatherSnapshot, store::LocalStoreExt,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn onecall_body(hours: usize) -> serde_json::Value {
    let hourly: Vec<_> = (0..hours)
        .map(|i| {
            serde_json::json!({
                "dt": 1_658_400_000 + 3600 * i as i64,
                "temp": 15.0 + i as f64,
                "feels_like": 14.0,
                "pressure": 1013,
                "humidity": 70,
                "wind_speed": 4.2,
                "pop": 0.3,
                "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }]
            })
        })
        .collect();

    serde_json::json!({
        "lat": 59.91,
        "lon": 10.75,
        "timezone": "Europe/Oslo",
        "timezone_offset": 7200,
        "current": {
            "dt": 1_658_400_000,
            "sunrise": 1_658_370_000,
            "sunset": 1_658_432_000,
            "temp": 15.2,
            "feels_like": 14.6,
            "pressure": 1013,
            "humidity": 70,
            "dew_point": 9.8,
            "uvi": 2.1,
            "clouds": 75,
            "visibility": 10000,
            "wind_speed": 4.2,
            "wind_deg": 230,
            "weather": [{ "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }]
        },
        "hourly": hourly,
        "daily": [{
            "dt": 1_658_400_000,
            "sunrise": 1_658_370_000,
            "sunset": 1_658_432_000,
            "temp": { "day": 16.0, "min": 11.0, "max": 18.5, "night": 12.0, "eve": 15.0, "morn": 11.5 },
            "humidity": 68,
            "wind_speed": 5.0,
            "pop": 0.6,
            "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }]
        }]
    })
}

fn client_for(server: &MockServer) -> OpenWeatherClient {
    let cfg = Config { api_key: Some("TEST_KEY".into()), base_url: server.uri(), ..Config::default() };
    OpenWeatherClient::from_config(&cfg).unwrap()
}

#[tokio::test]
async fn test_get_hourly_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .and(query_param("lat", "59.91"))
        .and(query_param("lon", "10.75"))
        .and(query_param("exclude", "minutely,alerts"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(onecall_body(48)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let snapshot = client_for(&mock_server).get_hourly("59.91", "10.75").await.unwrap();

    assert_eq!(snapshot.timezone, "Europe/Oslo");
    assert_eq!(snapshot.hourly.len(), 48);
    assert_eq!(snapshot.daily.len(), 1);
    assert_eq!(snapshot.daily[0].temp.max, 18.5);

    let current = snapshot.current.unwrap();
    assert_eq!(current.condition().unwrap().description, "broken clouds");
    assert_eq!(current.visibility, Some(10000));
}

#[tokio::test]
async fn test_get_hourly_sends_units() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(onecall_body(1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = OpenWeatherClient::new("KEY".into())
        .with_base_url(mock_server.uri())
        .with_units(Units::Imperial);

    assert!(client.get_hourly("1.0", "2.0").await.is_ok());
}

#[tokio::test]
async fn test_get_hourly_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"cod":401, "message": "Invalid API key. Please see https://openweathermap.org/faq#error401 for more info."}"#,
        ))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server).get_hourly("59.91", "10.75").await.unwrap_err();

    match err {
        WeatherError::Api { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_hourly_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server).get_hourly("59.91", "10.75").await.unwrap_err();
    assert!(matches!(err, WeatherError::Parse(_)));
}

#[tokio::test]
async fn test_get_hourly_connection_refused() {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server);
    drop(mock_server);

    let err = client.get_hourly("59.91", "10.75").await.unwrap_err();
    assert!(matches!(err, WeatherError::Network(_)));
}

#[tokio::test]
async fn test_update_persists_to_file_store() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/onecall"))
        .and(query_param("lat", "59.91"))
        .and(query_param("lon", "10.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(onecall_body(30)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let store = Arc::new(FileStore::open(&store_path).unwrap());
    let interactor = WeatherInteractor::new(store, Arc::new(client_for(&mock_server)));

    interactor.save(&Location::new("Oslo", 59.91, 10.0)).unwrap();

    let (tx, rx) = oneshot::channel();
    let handle = interactor
        .update_weather_data(move |result| {
            let _ = tx.send(result);
        })
        .unwrap();
    handle.await.unwrap();

    assert!(matches!(rx.await.unwrap(), Ok(true)));
    assert_eq!(interactor.hours().len(), 24);
    assert_eq!(interactor.days().len(), 1);

    let reopened = FileStore::open(&store_path).unwrap();
    let stored: WeatherSnapshot = reopened.get_object().unwrap();
    assert_eq!(stored.hourly.len(), 30);
    assert_eq!(reopened.get_object::<Location>().map(|l| l.name), Some("Oslo".to_string()));
}
