use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::City;
use crate::db::services::city_service;
use crate::web::{error::AppError, parse_id, AppState};

// --- Request Structs ---

#[derive(Deserialize)]
pub struct CreateCityRequest {
    name: String,
}

#[derive(Deserialize)]
pub struct UpdateCityRequest {
    name: String,
}

// --- Route Handlers ---

async fn create_city_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CreateCityRequest>, JsonRejection>,
) -> Result<Json<City>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::Decode(e.body_text()))?;

    let id = city_service::create_city(&app_state.pool, &payload.name).await?;

    // Read the row back so the response carries the server-assigned fields.
    let created = city_service::get_city_by_id(&app_state.pool, id).await?;
    Ok(Json(created))
}

async fn get_cities_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<City>>, AppError> {
    let cities = city_service::get_cities(&app_state.pool).await?;
    Ok(Json(cities))
}

async fn get_city_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<City>, AppError> {
    let id = parse_id(&id)?;
    let city = city_service::get_city_by_id(&app_state.pool, id).await?;
    Ok(Json(city))
}

async fn update_city_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCityRequest>, JsonRejection>,
) -> Result<Json<City>, AppError> {
    // The path id always wins over anything in the body.
    let id = parse_id(&id)?;
    city_service::get_city_by_id(&app_state.pool, id).await?;

    let Json(payload) = payload.map_err(|e| AppError::Decode(e.body_text()))?;
    city_service::update_city(&app_state.pool, id, &payload.name).await?;

    let updated = city_service::get_city_by_id(&app_state.pool, id).await?;
    Ok(Json(updated))
}

async fn delete_city_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&id)?;
    city_service::delete_city(&app_state.pool, id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

// --- Router ---

pub fn create_cities_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cities_handler).post(create_city_handler))
        .route(
            "/{id}",
            get(get_city_handler)
                .put(update_city_handler)
                .delete(delete_city_handler),
        )
}
