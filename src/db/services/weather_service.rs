use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::models::Weather;
use crate::web::error::AppError;

/// One hour-truncated bucket of weather readings for a city, averaged.
#[derive(FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct HourlyAverage {
    pub bucket_time: DateTime<Utc>,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
}

/// Inserts a new weather reading and returns the id Postgres assigned to it.
pub async fn create_weather(
    pool: &PgPool,
    temperature: f64,
    humidity: f64,
    city_id: Uuid,
) -> Result<Uuid, AppError> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO weather (temperature, humidity, city_id, updated_at)
        VALUES ($1, $2, $3, NULL)
        RETURNING id",
    )
    .bind(temperature)
    .bind(humidity)
    .bind(city_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn get_weather_by_id(pool: &PgPool, id: Uuid) -> Result<Weather, AppError> {
    sqlx::query_as::<_, Weather>(
        "SELECT id, temperature, humidity, city_id, created_at, updated_at
        FROM weather WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("weather [{id}] not found")))
}

pub async fn get_weathers(pool: &PgPool) -> Result<Vec<Weather>, AppError> {
    let weathers = sqlx::query_as::<_, Weather>(
        "SELECT id, temperature, humidity, city_id, created_at, updated_at FROM weather",
    )
    .fetch_all(pool)
    .await?;
    Ok(weathers)
}

pub async fn get_weathers_by_city_id(pool: &PgPool, city_id: Uuid) -> Result<Vec<Weather>, AppError> {
    let weathers = sqlx::query_as::<_, Weather>(
        "SELECT id, temperature, humidity, city_id, created_at, updated_at
        FROM weather WHERE city_id = $1",
    )
    .bind(city_id)
    .fetch_all(pool)
    .await?;
    Ok(weathers)
}

/// Groups a city's readings by hour-truncated `created_at` and averages
/// temperature and humidity per bucket, oldest bucket first.
pub async fn get_hourly_averages_by_city_id(
    pool: &PgPool,
    city_id: Uuid,
) -> Result<Vec<HourlyAverage>, AppError> {
    let averages = sqlx::query_as::<_, HourlyAverage>(
        "SELECT
            date_trunc('hour', created_at) AS bucket_time,
            AVG(temperature) AS avg_temperature,
            AVG(humidity) AS avg_humidity
        FROM weather
        WHERE city_id = $1
        GROUP BY date_trunc('hour', created_at)
        ORDER BY bucket_time ASC",
    )
    .bind(city_id)
    .fetch_all(pool)
    .await?;
    Ok(averages)
}

/// Full field replacement. `updated_at` is owned by the update trigger, so a
/// no-op replacement does not advance it.
pub async fn update_weather(
    pool: &PgPool,
    id: Uuid,
    temperature: f64,
    humidity: f64,
    city_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE weather
        SET temperature = $1, humidity = $2, city_id = $3
        WHERE id = $4",
    )
    .bind(temperature)
    .bind(humidity)
    .bind(city_id)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_weather(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM weather WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
