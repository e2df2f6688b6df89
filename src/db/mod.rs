use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod models;
pub mod schema;
pub mod services;

/// Builds the shared connection pool and installs the UUID extension the
/// tables depend on.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::query("CREATE EXTENSION IF NOT EXISTS \"uuid-ossp\"")
        .execute(&pool)
        .await?;

    Ok(pool)
}
