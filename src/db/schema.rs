//! Idempotent table and trigger provisioning.
//!
//! `created_at` is owned by a BEFORE INSERT trigger and `updated_at` by a
//! BEFORE UPDATE trigger that only fires when a tracked field actually
//! changed, so no-op updates leave `updated_at` NULL.

use sqlx::PgPool;

use crate::web::error::AppError;

pub async fn init(pool: &PgPool) -> Result<(), AppError> {
    create_cities_table(pool).await?;
    create_weather_table(pool).await?;
    create_predictions_table(pool).await?;
    Ok(())
}

async fn trigger_exists(pool: &PgPool, trigger: &str, table: &str) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM pg_trigger
            WHERE tgname = $1
            AND tgrelid = $2::regclass)",
    )
    .bind(trigger)
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

async fn create_cities_table(pool: &PgPool) -> Result<(), AppError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS cities (
            id UUID DEFAULT uuid_generate_v4() PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NULL
        )",
    )
    .execute(pool)
    .await?;

    if !trigger_exists(pool, "cities_updated_at_trigger", "cities").await? {
        sqlx::raw_sql(
            "CREATE OR REPLACE FUNCTION update_city_timestamp()
            RETURNS TRIGGER AS $$
            BEGIN
                IF OLD.name IS DISTINCT FROM NEW.name THEN
                    NEW.updated_at = NOW();
                END IF;
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            CREATE TRIGGER cities_updated_at_trigger
            BEFORE UPDATE ON cities
            FOR EACH ROW
            EXECUTE FUNCTION update_city_timestamp();",
        )
        .execute(pool)
        .await?;
    }

    if !trigger_exists(pool, "cities_created_at_trigger", "cities").await? {
        sqlx::raw_sql(
            "CREATE OR REPLACE FUNCTION set_city_created_at()
            RETURNS TRIGGER AS $$
            BEGIN
                NEW.created_at = NOW();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            CREATE TRIGGER cities_created_at_trigger
            BEFORE INSERT ON cities
            FOR EACH ROW
            EXECUTE FUNCTION set_city_created_at();",
        )
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn create_weather_table(pool: &PgPool) -> Result<(), AppError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS weather (
            id UUID DEFAULT uuid_generate_v4() PRIMARY KEY,
            temperature FLOAT8 NOT NULL,
            humidity FLOAT8 NOT NULL,
            city_id UUID NOT NULL,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NULL,
            FOREIGN KEY (city_id) REFERENCES cities(id)
        )",
    )
    .execute(pool)
    .await?;

    if !trigger_exists(pool, "weather_updated_at_trigger", "weather").await? {
        sqlx::raw_sql(
            "CREATE OR REPLACE FUNCTION update_weather_timestamp()
            RETURNS TRIGGER AS $$
            BEGIN
                IF OLD.temperature IS DISTINCT FROM NEW.temperature
                    OR OLD.humidity IS DISTINCT FROM NEW.humidity
                    OR OLD.city_id IS DISTINCT FROM NEW.city_id THEN
                    NEW.updated_at = NOW();
                END IF;
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            CREATE TRIGGER weather_updated_at_trigger
            BEFORE UPDATE ON weather
            FOR EACH ROW
            EXECUTE FUNCTION update_weather_timestamp();",
        )
        .execute(pool)
        .await?;
    }

    if !trigger_exists(pool, "weather_created_at_trigger", "weather").await? {
        sqlx::raw_sql(
            "CREATE OR REPLACE FUNCTION set_weather_created_at()
            RETURNS TRIGGER AS $$
            BEGIN
                NEW.created_at = NOW();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            CREATE TRIGGER weather_created_at_trigger
            BEFORE INSERT ON weather
            FOR EACH ROW
            EXECUTE FUNCTION set_weather_created_at();",
        )
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn create_predictions_table(pool: &PgPool) -> Result<(), AppError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS predictions (
            id UUID DEFAULT uuid_generate_v4() PRIMARY KEY,
            city_id UUID NOT NULL,
            temperature FLOAT8 NOT NULL,
            humidity FLOAT8 NOT NULL,
            forecast_for TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NULL,
            FOREIGN KEY (city_id) REFERENCES cities(id)
        )",
    )
    .execute(pool)
    .await?;

    if !trigger_exists(pool, "predictions_updated_at_trigger", "predictions").await? {
        sqlx::raw_sql(
            "CREATE OR REPLACE FUNCTION update_prediction_timestamp()
            RETURNS TRIGGER AS $$
            BEGIN
                IF OLD.temperature IS DISTINCT FROM NEW.temperature
                    OR OLD.humidity IS DISTINCT FROM NEW.humidity
                    OR OLD.forecast_for IS DISTINCT FROM NEW.forecast_for THEN
                    NEW.updated_at = NOW();
                END IF;
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            CREATE TRIGGER predictions_updated_at_trigger
            BEFORE UPDATE ON predictions
            FOR EACH ROW
            EXECUTE FUNCTION update_prediction_timestamp();",
        )
        .execute(pool)
        .await?;
    }

    if !trigger_exists(pool, "predictions_created_at_trigger", "predictions").await? {
        sqlx::raw_sql(
            "CREATE OR REPLACE FUNCTION set_prediction_created_at()
            RETURNS TRIGGER AS $$
            BEGIN
                NEW.created_at = NOW();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            CREATE TRIGGER predictions_created_at_trigger
            BEFORE INSERT ON predictions
            FOR EACH ROW
            EXECUTE FUNCTION set_prediction_created_at();",
        )
        .execute(pool)
        .await?;
    }

    Ok(())
}
