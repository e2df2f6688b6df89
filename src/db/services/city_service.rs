use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::City;
use crate::web::error::AppError;

/// Inserts a new city and returns the id Postgres assigned to it.
pub async fn create_city(pool: &PgPool, name: &str) -> Result<Uuid, AppError> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO cities (name, updated_at)
        VALUES ($1, NULL)
        RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn get_city_by_id(pool: &PgPool, id: Uuid) -> Result<City, AppError> {
    sqlx::query_as::<_, City>(
        "SELECT id, name, created_at, updated_at FROM cities WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("city [{id}] not found")))
}

pub async fn get_cities(pool: &PgPool) -> Result<Vec<City>, AppError> {
    let cities = sqlx::query_as::<_, City>(
        "SELECT id, name, created_at, updated_at FROM cities",
    )
    .fetch_all(pool)
    .await?;
    Ok(cities)
}

/// Cheaper existence probe than a full row fetch, used for reference checks.
pub async fn city_exists(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cities WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Replaces the city's name. `updated_at` is owned by the update trigger, so
/// renaming a city to its current name does not advance it.
pub async fn update_city(pool: &PgPool, id: Uuid, name: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE cities SET name = $1 WHERE id = $2")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Hard delete. Deleting an id that no longer exists is not an error here.
pub async fn delete_city(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM cities WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
