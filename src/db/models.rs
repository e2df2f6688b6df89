use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A city that weather readings and predictions are attached to.
/// Corresponds to the `cities` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct City {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A single weather reading for a city.
/// Corresponds to the `weather` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Weather {
    pub id: Uuid,
    pub temperature: f64,
    pub humidity: f64,
    pub city_id: Uuid, // Foreign key to City
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A forecast for a city at some future point in time.
/// Corresponds to the `predictions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Prediction {
    pub id: Uuid,
    pub city_id: Uuid, // Foreign key to City
    pub temperature: f64,
    pub humidity: f64,
    pub forecast_for: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
