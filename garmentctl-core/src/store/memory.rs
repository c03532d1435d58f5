//! In-process garment table
//!
//! Mirrors the PostgreSQL semantics the harness depends on so a seed script
//! and the step pipeline can be exercised without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{GarmentStore, StoreError};
use crate::model::{Garment, Gender, GenderCount, NewGarment, Season};
use crate::seed;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Garment>,
    next_id: i32,
}

impl Table {
    fn insert(&mut self, garment: NewGarment) {
        self.next_id += 1;
        self.rows.push(garment.with_id(self.next_id));
    }

    fn count_where(&self, predicate: impl Fn(&Garment) -> bool) -> i64 {
        self.rows.iter().filter(|row| predicate(row)).count() as i64
    }

    fn delete_where(&mut self, predicate: impl Fn(&Garment) -> bool) -> u64 {
        let before = self.rows.len();
        self.rows.retain(|row| !predicate(row));
        (before - self.rows.len()) as u64
    }
}

/// In-memory `GarmentStore`
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored rows in insertion order
    pub async fn rows(&self) -> Vec<Garment> {
        self.table.lock().await.rows.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GarmentStore for MemoryStore {
    async fn count_all(&self) -> Result<i64, StoreError> {
        self.ensure_open()?;
        Ok(self.table.lock().await.count_where(|_| true))
    }

    async fn count_by_season(&self, season: Season) -> Result<i64, StoreError> {
        self.ensure_open()?;
        Ok(self
            .table
            .lock()
            .await
            .count_where(|row| row.season == season))
    }

    async fn count_by_season_and_gender(
        &self,
        season: Season,
        gender: Gender,
    ) -> Result<i64, StoreError> {
        self.ensure_open()?;
        Ok(self
            .table
            .lock()
            .await
            .count_where(|row| row.season == season && row.gender == gender))
    }

    async fn count_by_gender(&self, gender: Gender) -> Result<i64, StoreError> {
        self.ensure_open()?;
        Ok(self
            .table
            .lock()
            .await
            .count_where(|row| row.gender == gender))
    }

    async fn change_gender(
        &self,
        description: &str,
        from: Gender,
        to: Gender,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut table = self.table.lock().await;
        let mut matched: Vec<&mut Garment> = table
            .rows
            .iter_mut()
            .filter(|row| row.description == description && row.gender == from)
            .collect();

        if matched.len() != 1 {
            return Err(StoreError::RowCount {
                expected: 1,
                actual: matched.len() as u64,
            });
        }
        matched[0].gender = to;
        Ok(())
    }

    async fn gender_of(&self, description: &str) -> Result<Gender, StoreError> {
        self.ensure_open()?;
        let table = self.table.lock().await;
        let genders: Vec<Gender> = table
            .rows
            .iter()
            .filter(|row| row.description == description)
            .map(|row| row.gender)
            .collect();

        match genders.as_slice() {
            [gender] => Ok(*gender),
            [] => Err(StoreError::not_found(description)),
            many => Err(StoreError::RowCount {
                expected: 1,
                actual: many.len() as u64,
            }),
        }
    }

    async fn insert(&self, garment: &NewGarment) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.table.lock().await.insert(garment.clone());
        Ok(())
    }

    async fn group_by_gender(&self) -> Result<Vec<GenderCount>, StoreError> {
        self.ensure_open()?;
        let table = self.table.lock().await;
        let mut groups: BTreeMap<Gender, i64> = BTreeMap::new();
        for row in &table.rows {
            *groups.entry(row.gender).or_default() += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(gender, count)| GenderCount::new(gender, count))
            .collect())
    }

    async fn delete_by_gender(&self, gender: Gender) -> Result<u64, StoreError> {
        self.ensure_open()?;
        Ok(self
            .table
            .lock()
            .await
            .delete_where(|row| row.gender == gender))
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        self.ensure_open()?;
        Ok(self.table.lock().await.delete_where(|_| true))
    }

    /// Accepts the same insert-only scripts `seed::parse` understands.
    /// The batch is applied atomically: a parse failure inserts nothing.
    async fn execute_script(&self, sql: &str) -> Result<(), StoreError> {
        self.ensure_open()?;
        let rows = seed::parse(sql)?;
        let mut table = self.table.lock().await;
        for row in rows {
            table.insert(row);
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hoodie(gender: Gender) -> NewGarment {
        NewGarment::new(
            "Red hooded jacket",
            "hoodie-128x128-455124.png",
            Season::Winter,
            gender,
            "299.99",
        )
    }

    #[tokio::test]
    async fn ids_are_assigned_sequentially() {
        let store = MemoryStore::new();
        store.insert(&hoodie(Gender::Male)).await.unwrap();
        store.insert(&hoodie(Gender::Female)).await.unwrap();

        let ids: Vec<i32> = store.rows().await.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn change_gender_is_guarded_by_prior_value() {
        let store = MemoryStore::new();
        store.insert(&hoodie(Gender::Male)).await.unwrap();

        let err = store
            .change_gender("Red hooded jacket", Gender::Female, Gender::Unisex)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RowCount { actual: 0, .. }));

        store
            .change_gender("Red hooded jacket", Gender::Male, Gender::Unisex)
            .await
            .unwrap();
        assert_eq!(
            store.gender_of("Red hooded jacket").await.unwrap(),
            Gender::Unisex
        );
    }

    #[tokio::test]
    async fn gender_of_rejects_ambiguous_description() {
        let store = MemoryStore::new();
        store
            .insert_all(&[hoodie(Gender::Male), hoodie(Gender::Female)])
            .await
            .unwrap();

        let err = store.gender_of("Red hooded jacket").await.unwrap_err();
        assert!(matches!(err, StoreError::RowCount { actual: 2, .. }));
        assert!(matches!(
            store.gender_of("Blue Jersey").await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn groups_are_ordered_by_gender_and_skip_empty() {
        let store = MemoryStore::new();
        store
            .insert_all(&[
                hoodie(Gender::Unisex),
                hoodie(Gender::Female),
                hoodie(Gender::Unisex),
            ])
            .await
            .unwrap();

        let groups = store.group_by_gender().await.unwrap();
        assert_eq!(
            groups,
            vec![
                GenderCount::new(Gender::Female, 1),
                GenderCount::new(Gender::Unisex, 2),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_script_inserts_nothing() {
        let store = MemoryStore::new();
        let script = "insert into garment (description, img, season, gender, price) \
                      values ('Grey hoodie', 'hoodie.png', 'All Season', 'Male', 399.99);\n\
                      drop table garment;";

        let err = store.execute_script(script).await.unwrap_err();
        assert!(matches!(err, StoreError::Script(_)));
        assert_eq!(store.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn closed_store_refuses_queries() {
        let store = MemoryStore::new();
        store.close().await;

        let err = store.count_all().await.unwrap_err();
        assert!(err.is_fatal());
    }
}
