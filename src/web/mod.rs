use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::map_response,
    response::Response,
    routing::get,
    Json, Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::web::error::AppError;
use crate::web::routes::{city_routes, prediction_routes, weather_routes};

pub mod error;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
}

/// Parses a path parameter as a UUID. Malformed ids fail before any query
/// runs.
pub fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::InvalidId(id.to_string()))
}

async fn health_check_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// A method outside a resource's supported set is a client error here, not a
// 405.
async fn method_not_allowed_handler(method: Method) -> AppError {
    AppError::UnsupportedMethod(method.to_string())
}

// axum's `Json` writes `application/json` without a charset parameter; the
// wire format here carries an explicit utf-8 charset on every JSON response.
async fn set_json_charset(mut response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
    }
    response
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let origins: Vec<HeaderValue> = config
        .allowed_origin_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/healthcheck", get(health_check_handler))
        .nest("/weather", weather_routes::create_weather_router())
        .nest("/cities", city_routes::create_cities_router())
        .nest("/predictions", prediction_routes::create_predictions_router());

    Router::new()
        .nest("/api", api_router)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(map_response(set_json_charset))
        .layer(cors_layer(&app_state.config))
        .with_state(app_state)
}
