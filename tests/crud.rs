//! End-to-end CRUD tests against a live Postgres. Run with:
//!
//! ```sh
//! DATABASE_URL=postgres://... cargo test --test crud -- --ignored
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use meteo_backend::config::ServerConfig;
use meteo_backend::db;
use meteo_backend::web::{create_router, AppState};

async fn setup() -> Router {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = db::connect_pool(&database_url, 5).await.expect("connect");
    db::schema::init(&pool).await.expect("schema init");

    let config = Arc::new(ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        database_url,
        allowed_origins: None,
        max_connections: 5,
    });
    create_router(Arc::new(AppState { pool, config }))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .expect("infallible");

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn create_city(router: &Router, name: &str) -> Value {
    let (status, body) = send(
        router,
        Method::POST,
        "/api/cities",
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create city failed: {body}");
    body
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn created_city_matches_its_refetch() {
    let router = setup().await;

    let created = create_city(&router, "Lisbon").await;
    let id = created["id"].as_str().expect("generated id");
    assert!(!id.is_empty());
    assert!(created["created_at"].is_string());
    assert!(created.get("updated_at").is_none());

    let (status, fetched) = send(&router, Method::GET, &format!("/api/cities/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn berlin_weather_lifecycle() {
    let router = setup().await;

    let city = create_city(&router, "Berlin").await;
    let city_id = city["id"].as_str().unwrap().to_string();

    // Create: server assigns id and created_at, updated_at stays absent.
    let (status, weather) = send(
        &router,
        Method::POST,
        "/api/weather",
        Some(json!({ "temperature": 20.5, "humidity": 60.0, "city_id": city_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create weather failed: {weather}");
    let weather_id = weather["id"].as_str().unwrap().to_string();
    assert_eq!(weather["temperature"], 20.5);
    assert_eq!(weather["city_id"].as_str().unwrap(), city_id);
    assert!(weather["created_at"].is_string());
    assert!(weather.get("updated_at").is_none());

    // Update a tracked field: updated_at appears and is not before created_at.
    let (status, updated) = send(
        &router,
        Method::PUT,
        &format!("/api/weather/{weather_id}"),
        Some(json!({ "temperature": 21.0, "humidity": 60.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "update weather failed: {updated}");
    assert_eq!(updated["temperature"], 21.0);
    let created_at: chrono::DateTime<chrono::Utc> =
        updated["created_at"].as_str().unwrap().parse().unwrap();
    let updated_at: chrono::DateTime<chrono::Utc> = updated["updated_at"]
        .as_str()
        .expect("updated_at set")
        .parse()
        .unwrap();
    assert!(updated_at >= created_at);

    // Delete, then the re-fetch reports NotFound.
    let (status, deleted) = send(
        &router,
        Method::DELETE,
        &format!("/api/weather/{weather_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"].as_str().unwrap(), weather_id);

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/weather/{weather_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"].as_str().unwrap(),
        format!("weather [{weather_id}] not found")
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn noop_update_leaves_updated_at_unset() {
    let router = setup().await;

    let city = create_city(&router, "Porto").await;
    let id = city["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &router,
        Method::PUT,
        &format!("/api/cities/{id}"),
        Some(json!({ "name": "Porto" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated.get("updated_at").is_none());

    // A real rename does advance it.
    let (status, renamed) = send(
        &router,
        Method::PUT,
        &format!("/api/cities/{id}"),
        Some(json!({ "name": "Oporto" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Oporto");
    assert!(renamed["updated_at"].is_string());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn missing_city_reference_performs_no_insert() {
    let router = setup().await;
    let ghost = uuid::Uuid::new_v4();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/weather",
        Some(json!({ "temperature": 1.0, "humidity": 2.0, "city_id": ghost })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"].as_str().unwrap(),
        format!("city [{ghost}] not found")
    );

    let (status, listed) = send(
        &router,
        Method::GET,
        &format!("/api/weather?city_id={ghost}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn delete_of_a_missing_id_is_idempotent() {
    let router = setup().await;
    let ghost = uuid::Uuid::new_v4();

    let (status, body) = send(
        &router,
        Method::DELETE,
        &format!("/api/weather/{ghost}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"].as_str().unwrap(), ghost.to_string());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn batch_predictions_are_created_in_order() {
    let router = setup().await;

    let city = create_city(&router, "Madrid").await;
    let city_id = city["id"].as_str().unwrap().to_string();

    let batch = json!([
        { "city_id": city_id, "temperature": 21.0, "humidity": 55.0, "forecast_for": "2031-01-03T00:00:00Z" },
        { "city_id": city_id, "temperature": 19.0, "humidity": 50.0, "forecast_for": "2031-01-01T00:00:00Z" },
        { "city_id": city_id, "temperature": 20.0, "humidity": 52.0, "forecast_for": "2031-01-02T00:00:00Z" },
    ]);
    let (status, created) = send(&router, Method::POST, "/api/predictions", Some(batch)).await;
    assert_eq!(status, StatusCode::OK, "batch create failed: {created}");

    let created = created.as_array().unwrap();
    assert_eq!(created.len(), 3);
    // Response order mirrors submission order.
    assert_eq!(created[0]["temperature"], 21.0);
    assert_eq!(created[1]["temperature"], 19.0);
    let mut ids: Vec<&str> = created.iter().map(|p| p["id"].as_str().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3, "generated ids must be distinct");

    // Listing is ordered by forecast_for ascending.
    let (status, listed) = send(
        &router,
        Method::GET,
        &format!("/api/predictions?city_id={city_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let forecasts: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["forecast_for"].as_str().unwrap())
        .collect();
    let mut sorted = forecasts.clone();
    sorted.sort_unstable();
    assert_eq!(forecasts, sorted);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn hourly_averages_come_back_bucketed() {
    let router = setup().await;

    let city = create_city(&router, "Vienna").await;
    let city_id = city["id"].as_str().unwrap().to_string();

    for (temperature, humidity) in [(10.0, 40.0), (20.0, 60.0)] {
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/weather",
            Some(json!({ "temperature": temperature, "humidity": humidity, "city_id": city_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "create weather failed: {body}");
    }

    let (status, averages) = send(
        &router,
        Method::GET,
        &format!("/api/weather?city_id={city_id}&hourly_average=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let averages = averages.as_array().unwrap();
    // Both rows were just inserted, so they land in one or two adjacent
    // buckets; the means must still average out.
    let total: f64 = averages
        .iter()
        .map(|b| b["avg_temperature"].as_f64().unwrap())
        .sum();
    assert!(total > 0.0);
    for bucket in averages {
        assert!(bucket["bucket_time"].is_string());
        assert!(bucket["avg_humidity"].as_f64().unwrap() > 0.0);
    }

    // get_last keeps only the newest buckets.
    let (status, tail) = send(
        &router,
        Method::GET,
        &format!("/api/weather?city_id={city_id}&hourly_average=true&get_last=1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(tail.as_array().unwrap().len() <= 1);
}
