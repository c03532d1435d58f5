//! Fixture loader: restore the seed baseline before a run

use std::path::Path;

use tracing::{debug, info};

use crate::error::{HarnessError, Result};
use crate::seed::SeedScript;
use crate::store::GarmentStore;

/// Delete every garment, then replay the seed script as one batch.
///
/// Returns the row count after the reload. Any failure is fatal to the run.
pub async fn reset(store: &dyn GarmentStore, seed: &SeedScript) -> Result<i64> {
    let removed = store.delete_all().await.map_err(HarnessError::fixture)?;
    debug!(removed, "cleared garment table");

    store
        .execute_script(&seed.sql)
        .await
        .map_err(HarnessError::fixture)?;

    let total = store.count_all().await.map_err(HarnessError::fixture)?;
    info!(seed = %seed.path.display(), total, "fixture loaded");
    Ok(total)
}

/// Create the `garment` table from a schema script.
pub async fn apply_schema(store: &dyn GarmentStore, path: &Path) -> Result<()> {
    let sql = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| HarnessError::io(path, err))?;
    store
        .execute_script(&sql)
        .await
        .map_err(HarnessError::fixture)?;
    info!(schema = %path.display(), "schema applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, NewGarment, Season};
    use crate::store::MemoryStore;

    const SEED: &str = include_str!("../../sql/data.sql");

    fn seed() -> SeedScript {
        SeedScript::from_sql("sql/data.sql", SEED)
    }

    #[tokio::test]
    async fn reset_loads_thirty_rows() {
        let store = MemoryStore::new();
        assert_eq!(reset(&store, &seed()).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn reset_discards_prior_mutations() {
        let store = MemoryStore::new();
        reset(&store, &seed()).await.unwrap();

        store.delete_by_gender(Gender::Male).await.unwrap();
        store
            .insert(&NewGarment::new(
                "Blue Jersey",
                "sweater-128x128-455131.png",
                Season::Winter,
                Gender::Male,
                "499.99",
            ))
            .await
            .unwrap();

        assert_eq!(reset(&store, &seed()).await.unwrap(), 30);
        assert_eq!(store.count_by_gender(Gender::Male).await.unwrap(), 14);
    }

    #[tokio::test]
    async fn broken_seed_is_a_fixture_error() {
        let store = MemoryStore::new();
        let broken = SeedScript::from_sql("broken.sql", "insert into garment (description");

        let err = reset(&store, &broken).await.unwrap_err();
        assert!(matches!(err, HarnessError::Fixture { .. }));
    }
}
