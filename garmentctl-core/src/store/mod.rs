//! Storage layer - the database capabilities the harness relies on
//!
//! - `GarmentRepo`: PostgreSQL via a shared sqlx pool
//! - `MemoryStore`: in-process table with the same semantics, for dry runs
//!   and tests

pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Gender, GenderCount, ModelError, NewGarment, Season};
use crate::seed::SeedError;

pub use memory::MemoryStore;
pub use pool::{create_pool, create_pool_with_options};
pub use postgres::GarmentRepo;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: garment '{description}'")]
    NotFound { description: String },

    #[error("expected exactly {expected} row(s), got {actual}")]
    RowCount { expected: u64, actual: u64 },

    #[error("invalid stored value: {0}")]
    Model(#[from] ModelError),

    #[error("script rejected: {0}")]
    Script(#[from] SeedError),

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn not_found(description: impl Into<String>) -> Self {
        Self::NotFound {
            description: description.into(),
        }
    }

    /// True when the store can no longer serve queries and the run must stop.
    pub fn is_fatal(&self) -> bool {
        match self {
            StoreError::Closed => true,
            StoreError::Sqlx(err) => matches!(
                err,
                sqlx::Error::PoolClosed
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

/// Queries the harness issues against the `garment` table.
#[async_trait]
pub trait GarmentStore: Send + Sync {
    async fn count_all(&self) -> Result<i64, StoreError>;

    async fn count_by_season(&self, season: Season) -> Result<i64, StoreError>;

    async fn count_by_season_and_gender(
        &self,
        season: Season,
        gender: Gender,
    ) -> Result<i64, StoreError>;

    async fn count_by_gender(&self, gender: Gender) -> Result<i64, StoreError>;

    /// Update the gender of the single row matching `description` whose
    /// current gender is `from`. Anything other than one updated row is an error.
    async fn change_gender(
        &self,
        description: &str,
        from: Gender,
        to: Gender,
    ) -> Result<(), StoreError>;

    /// Gender of the single row matching `description`.
    async fn gender_of(&self, description: &str) -> Result<Gender, StoreError>;

    async fn insert(&self, garment: &NewGarment) -> Result<(), StoreError>;

    /// Issue every insert concurrently and wait for all of them before returning.
    async fn insert_all(&self, garments: &[NewGarment]) -> Result<(), StoreError> {
        futures::future::try_join_all(garments.iter().map(|garment| self.insert(garment)))
            .await?;
        Ok(())
    }

    /// `GROUP BY gender ORDER BY gender ASC`
    async fn group_by_gender(&self) -> Result<Vec<GenderCount>, StoreError>;

    async fn delete_by_gender(&self, gender: Gender) -> Result<u64, StoreError>;

    async fn delete_all(&self) -> Result<u64, StoreError>;

    /// Execute a batch of statements in one round trip.
    async fn execute_script(&self, sql: &str) -> Result<(), StoreError>;

    /// Release the underlying connections.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_pool_is_fatal() {
        assert!(StoreError::Sqlx(sqlx::Error::PoolClosed).is_fatal());
        assert!(StoreError::Closed.is_fatal());
    }

    #[test]
    fn row_level_errors_are_not_fatal() {
        assert!(!StoreError::Sqlx(sqlx::Error::RowNotFound).is_fatal());
        assert!(!StoreError::not_found("Blue Jersey").is_fatal());
        assert!(!StoreError::RowCount {
            expected: 1,
            actual: 0
        }
        .is_fatal());
    }
}
