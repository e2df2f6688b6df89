use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::Weather;
use crate::db::services::weather_service::HourlyAverage;
use crate::db::services::{city_service, weather_service};
use crate::web::{error::AppError, parse_id, AppState};

// --- Request Structs ---

#[derive(Deserialize)]
pub struct CreateWeatherRequest {
    temperature: f64,
    humidity: f64,
    city_id: Uuid,
}

#[derive(Deserialize)]
pub struct UpdateWeatherRequest {
    temperature: f64,
    humidity: f64,
    // Absent means keep the existing city reference.
    city_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct WeatherListQuery {
    city_id: Option<String>,
    hourly_average: Option<String>,
    get_last: Option<String>,
}

// --- Route Handlers ---

async fn create_weather_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CreateWeatherRequest>, JsonRejection>,
) -> Result<Json<Weather>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::Decode(e.body_text()))?;

    // Verify the city exists first
    if !city_service::city_exists(&app_state.pool, payload.city_id).await? {
        return Err(AppError::ReferenceNotFound(format!(
            "city [{}] not found",
            payload.city_id
        )));
    }

    let id = weather_service::create_weather(
        &app_state.pool,
        payload.temperature,
        payload.humidity,
        payload.city_id,
    )
    .await?;

    // Read the row back so the response carries the server-assigned fields.
    let created = weather_service::get_weather_by_id(&app_state.pool, id).await?;
    Ok(Json(created))
}

async fn get_weather_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Weather>, AppError> {
    let id = parse_id(&id)?;
    let weather = weather_service::get_weather_by_id(&app_state.pool, id).await?;
    Ok(Json(weather))
}

async fn get_weathers_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<WeatherListQuery>,
) -> Result<Response, AppError> {
    let get_last = match query.get_last.as_deref() {
        Some(raw) => Some(raw.parse::<i32>().map_err(|_| {
            AppError::InvalidParameter("get_last must be a number".to_string())
        })?),
        None => None,
    };

    let city_id = match query.city_id.as_deref() {
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
            AppError::InvalidParameter(format!("city_id must be a valid uuid: {raw}"))
        })?),
        None => None,
    };

    if query.hourly_average.as_deref() == Some("true") {
        let city_id = city_id.ok_or_else(|| {
            AppError::MissingParameter("city_id is required for hourly averages".to_string())
        })?;

        let mut averages =
            weather_service::get_hourly_averages_by_city_id(&app_state.pool, city_id).await?;
        if let Some(last_n) = get_last {
            averages = last_n_buckets(averages, last_n);
        }
        return Ok(Json(averages).into_response());
    }

    let mut weathers = match city_id {
        Some(city_id) => weather_service::get_weathers_by_city_id(&app_state.pool, city_id).await?,
        None => weather_service::get_weathers(&app_state.pool).await?,
    };
    if let Some(last_hours) = get_last {
        weathers = within_last_hours(weathers, last_hours, Utc::now());
    }
    Ok(Json(weathers).into_response())
}

async fn update_weather_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateWeatherRequest>, JsonRejection>,
) -> Result<Json<Weather>, AppError> {
    // The path id always wins over anything in the body.
    let id = parse_id(&id)?;
    let existing = weather_service::get_weather_by_id(&app_state.pool, id).await?;

    let Json(payload) = payload.map_err(|e| AppError::Decode(e.body_text()))?;

    // Verify the city exists when the reference is being replaced
    if let Some(city_id) = payload.city_id {
        if !city_service::city_exists(&app_state.pool, city_id).await? {
            return Err(AppError::ReferenceNotFound(format!(
                "city [{city_id}] not found"
            )));
        }
    }
    let city_id = payload.city_id.unwrap_or(existing.city_id);

    weather_service::update_weather(
        &app_state.pool,
        id,
        payload.temperature,
        payload.humidity,
        city_id,
    )
    .await?;

    let updated = weather_service::get_weather_by_id(&app_state.pool, id).await?;
    Ok(Json(updated))
}

async fn delete_weather_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_id(&id)?;
    weather_service::delete_weather(&app_state.pool, id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

// --- Post-filters for get_last ---

/// Keeps only the last `n` aggregation buckets, in time order.
fn last_n_buckets(mut averages: Vec<HourlyAverage>, n: i32) -> Vec<HourlyAverage> {
    let keep = (n.max(0) as usize).min(averages.len());
    averages.split_off(averages.len() - keep)
}

/// Keeps only readings created within the last `hours` hours of `now`.
fn within_last_hours(weathers: Vec<Weather>, hours: i32, now: DateTime<Utc>) -> Vec<Weather> {
    let cutoff = now - chrono::Duration::hours(i64::from(hours));
    weathers
        .into_iter()
        .filter(|weather| weather.created_at > cutoff)
        .collect()
}

// --- Router ---

pub fn create_weather_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_weathers_handler).post(create_weather_handler))
        .route(
            "/{id}",
            get(get_weather_handler)
                .put(update_weather_handler)
                .delete(delete_weather_handler),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bucket(hour: u32) -> HourlyAverage {
        HourlyAverage {
            bucket_time: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            avg_temperature: 20.0 + f64::from(hour),
            avg_humidity: 60.0,
        }
    }

    fn reading(created_at: DateTime<Utc>) -> Weather {
        Weather {
            id: Uuid::new_v4(),
            temperature: 20.5,
            humidity: 60.0,
            city_id: Uuid::new_v4(),
            created_at,
            updated_at: None,
        }
    }

    #[test]
    fn last_n_buckets_keeps_the_tail_in_order() {
        let buckets = vec![bucket(1), bucket(2), bucket(3), bucket(4)];
        let filtered = last_n_buckets(buckets.clone(), 2);
        assert_eq!(filtered, &buckets[2..]);
    }

    #[test]
    fn last_n_buckets_clamps_to_available() {
        let buckets = vec![bucket(1), bucket(2)];
        assert_eq!(last_n_buckets(buckets.clone(), 10).len(), 2);
        assert!(last_n_buckets(buckets, 0).is_empty());
    }

    #[test]
    fn within_last_hours_drops_old_readings() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let fresh = reading(now - chrono::Duration::minutes(30));
        let stale = reading(now - chrono::Duration::hours(5));

        let filtered = within_last_hours(vec![fresh.clone(), stale], 2, now);
        assert_eq!(filtered, vec![fresh]);
    }

    #[test]
    fn within_last_hours_with_negative_window_keeps_nothing() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let fresh = reading(now - chrono::Duration::minutes(30));
        assert!(within_last_hours(vec![fresh], -1, now).is_empty());
    }
}
