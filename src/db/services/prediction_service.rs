use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Prediction;
use crate::web::error::AppError;

/// Inserts a new prediction and returns the id Postgres assigned to it.
pub async fn create_prediction(
    pool: &PgPool,
    city_id: Uuid,
    temperature: f64,
    humidity: f64,
    forecast_for: DateTime<Utc>,
) -> Result<Uuid, AppError> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO predictions (city_id, temperature, humidity, forecast_for)
        VALUES ($1, $2, $3, $4)
        RETURNING id",
    )
    .bind(city_id)
    .bind(temperature)
    .bind(humidity)
    .bind(forecast_for)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn get_prediction_by_id(pool: &PgPool, id: Uuid) -> Result<Prediction, AppError> {
    sqlx::query_as::<_, Prediction>(
        "SELECT id, city_id, temperature, humidity, forecast_for, created_at, updated_at
        FROM predictions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("prediction [{id}] not found")))
}

/// A city's predictions ordered by forecast time, soonest first.
pub async fn get_predictions_by_city_id(
    pool: &PgPool,
    city_id: Uuid,
) -> Result<Vec<Prediction>, AppError> {
    let predictions = sqlx::query_as::<_, Prediction>(
        "SELECT id, city_id, temperature, humidity, forecast_for, created_at, updated_at
        FROM predictions WHERE city_id = $1 ORDER BY forecast_for",
    )
    .bind(city_id)
    .fetch_all(pool)
    .await?;
    Ok(predictions)
}
