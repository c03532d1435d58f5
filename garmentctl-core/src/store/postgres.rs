//! Garment repository backed by PostgreSQL
//!
//! Every statement is parameterized with positional placeholders.
//! Counts come back as `BIGINT` (`i64`), the native type of `count(*)`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{GarmentStore, StoreError};
use crate::model::{Gender, GenderCount, NewGarment, Season};

/// Garment repository
pub struct GarmentRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> GarmentRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &'static str, binds: &[&str]) -> Result<i64, StoreError> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let count = query.fetch_one(self.pool).await?;
        debug!(sql, ?binds, count, "count");
        Ok(count)
    }
}

#[async_trait]
impl<'a> GarmentStore for GarmentRepo<'a> {
    async fn count_all(&self) -> Result<i64, StoreError> {
        self.count("select count(*) from garment", &[]).await
    }

    async fn count_by_season(&self, season: Season) -> Result<i64, StoreError> {
        self.count(
            "select count(*) from garment where season = $1",
            &[season.as_str()],
        )
        .await
    }

    async fn count_by_season_and_gender(
        &self,
        season: Season,
        gender: Gender,
    ) -> Result<i64, StoreError> {
        self.count(
            "select count(*) from garment where season = $1 and gender = $2",
            &[season.as_str(), gender.as_str()],
        )
        .await
    }

    async fn count_by_gender(&self, gender: Gender) -> Result<i64, StoreError> {
        self.count(
            "select count(*) from garment where gender = $1",
            &[gender.as_str()],
        )
        .await
    }

    async fn change_gender(
        &self,
        description: &str,
        from: Gender,
        to: Gender,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("update garment set gender = $1 where gender = $2 and description = $3")
                .bind(to.as_str())
                .bind(from.as_str())
                .bind(description)
                .execute(self.pool)
                .await?;

        match result.rows_affected() {
            1 => Ok(()),
            actual => Err(StoreError::RowCount {
                expected: 1,
                actual,
            }),
        }
    }

    async fn gender_of(&self, description: &str) -> Result<Gender, StoreError> {
        let rows: Vec<String> =
            sqlx::query_scalar("select gender from garment where description = $1")
                .bind(description)
                .fetch_all(self.pool)
                .await?;

        match rows.as_slice() {
            [gender] => Ok(gender.parse::<Gender>()?),
            [] => Err(StoreError::not_found(description)),
            many => Err(StoreError::RowCount {
                expected: 1,
                actual: many.len() as u64,
            }),
        }
    }

    async fn insert(&self, garment: &NewGarment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            insert into garment (description, img, season, gender, price)
            values ($1, $2, $3, $4, $5::numeric)
            "#,
        )
        .bind(&garment.description)
        .bind(&garment.img)
        .bind(garment.season.as_str())
        .bind(garment.gender.as_str())
        .bind(&garment.price)
        .execute(self.pool)
        .await?;

        debug!(description = %garment.description, "inserted garment");
        Ok(())
    }

    async fn group_by_gender(&self) -> Result<Vec<GenderCount>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "select gender, count(*) from garment group by gender order by gender asc",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(gender, count)| -> Result<GenderCount, StoreError> {
                Ok(GenderCount::new(gender.parse::<Gender>()?, count))
            })
            .collect()
    }

    async fn delete_by_gender(&self, gender: Gender) -> Result<u64, StoreError> {
        let result = sqlx::query("delete from garment where gender = $1")
            .bind(gender.as_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("delete from garment")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn execute_script(&self, sql: &str) -> Result<(), StoreError> {
        sqlx::raw_sql(sql).execute(self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::create_pool;

    // Integration tests - run with DATABASE_URL set
    // cargo test -p garmentctl-core -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn change_gender_requires_matching_prior_gender() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url).await.expect("pool creation failed");
        let repo = GarmentRepo::new(&pool);

        repo.execute_script(include_str!("../../../sql/schema.sql"))
            .await
            .expect("schema failed");
        repo.delete_all().await.expect("delete failed");
        repo.insert(&NewGarment::new(
            "Grey hoodie",
            "hoodie-128x128-455124.png",
            Season::AllSeason,
            Gender::Male,
            "399.99",
        ))
        .await
        .expect("insert failed");

        let err = repo
            .change_gender("Grey hoodie", Gender::Female, Gender::Unisex)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RowCount { actual: 0, .. }));

        repo.change_gender("Grey hoodie", Gender::Male, Gender::Unisex)
            .await
            .expect("update failed");
        assert_eq!(repo.gender_of("Grey hoodie").await.unwrap(), Gender::Unisex);

        repo.close().await;
    }
}
