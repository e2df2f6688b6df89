use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::Prediction;
use crate::db::services::{city_service, prediction_service};
use crate::web::{error::AppError, AppState};

// --- Request Structs ---

#[derive(Deserialize)]
pub struct CreatePredictionRequest {
    city_id: Uuid,
    temperature: f64,
    humidity: f64,
    forecast_for: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct PredictionListQuery {
    city_id: Option<String>,
}

// --- Route Handlers ---

/// Accepts a batch of predictions. Elements are validated and inserted in
/// request order; a missing city reference aborts the call at that element
/// and rows already inserted for earlier elements stay persisted.
async fn create_predictions_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<Vec<CreatePredictionRequest>>, JsonRejection>,
) -> Result<Json<Vec<Prediction>>, AppError> {
    let Json(requests) = payload.map_err(|e| AppError::Decode(e.body_text()))?;

    let mut created = Vec::with_capacity(requests.len());
    for request in requests {
        if !city_service::city_exists(&app_state.pool, request.city_id).await? {
            return Err(AppError::ReferenceNotFound(format!(
                "city [{}] not found",
                request.city_id
            )));
        }

        let id = prediction_service::create_prediction(
            &app_state.pool,
            request.city_id,
            request.temperature,
            request.humidity,
            request.forecast_for,
        )
        .await?;

        // Read each row back so the response carries the server-assigned
        // fields.
        created.push(prediction_service::get_prediction_by_id(&app_state.pool, id).await?);
    }

    Ok(Json(created))
}

async fn get_predictions_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PredictionListQuery>,
) -> Result<Json<Vec<Prediction>>, AppError> {
    let raw = query
        .city_id
        .ok_or_else(|| AppError::MissingParameter("city_id is required".to_string()))?;
    let city_id = Uuid::parse_str(&raw)
        .map_err(|_| AppError::InvalidParameter(format!("city_id must be a valid uuid: {raw}")))?;

    let predictions =
        prediction_service::get_predictions_by_city_id(&app_state.pool, city_id).await?;
    Ok(Json(predictions))
}

// --- Router ---

pub fn create_predictions_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/",
        get(get_predictions_handler).post(create_predictions_handler),
    )
}
