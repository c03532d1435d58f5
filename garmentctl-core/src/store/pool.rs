//! Database connection pool management
//!
//! One pool is created per run and closed when the run ends.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Default maximum connections for the pool.
/// Concurrent inserts in the add-garments step are the only parallel work.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Create a PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if the connection fails.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool("postgres://localhost/garments").await?;
/// ```
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS, None).await
}

/// Create a PostgreSQL connection pool with custom options.
///
/// * `max_connections` - Maximum number of connections in the pool
/// * `acquire_timeout` - Upper bound on waiting for a free connection
pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Option<Duration>,
) -> Result<PgPool, sqlx::Error> {
    let mut options = PgPoolOptions::new().max_connections(max_connections);
    if let Some(timeout) = acquire_timeout {
        options = options.acquire_timeout(timeout);
    }
    options.connect(database_url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p garmentctl-core -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_connection() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");

        let result: (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query failed");

        assert_eq!(result.0, 1);
        pool.close().await;
        assert!(pool.is_closed());
    }
}
