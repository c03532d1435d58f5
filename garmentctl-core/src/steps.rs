//! The ordered assertion chain
//!
//! Steps run strictly in declared order. Each one sees the row-count
//! snapshot left behind by the step before it, so the dependency between
//! steps is explicit rather than implied by execution order.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;

use crate::model::{Gender, GenderCount, NewGarment, Season};
use crate::report::Failure;
use crate::store::{GarmentStore, StoreError};

/// Row counts observed between steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub total: i64,
    pub by_gender: BTreeMap<Gender, i64>,
}

impl Snapshot {
    pub async fn capture(store: &dyn GarmentStore) -> Result<Self, StoreError> {
        let total = store.count_all().await?;
        let by_gender = store
            .group_by_gender()
            .await?
            .into_iter()
            .map(|group| (group.gender, group.count))
            .collect();
        Ok(Self { total, by_gender })
    }

    pub fn count_of(&self, gender: Gender) -> i64 {
        self.by_gender.get(&gender).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    NonZero,
    Exactly(i64),
}

#[derive(Debug, Clone)]
pub enum Action {
    CountAll(Expect),
    CountBySeason(Vec<(Season, i64)>),
    CountBySeasonAndGender {
        season: Season,
        gender: Gender,
        expected: i64,
    },
    ChangeGender {
        description: String,
        from: Gender,
        to: Gender,
    },
    AddGarments {
        rows: Vec<NewGarment>,
        expected: Vec<(Gender, i64)>,
    },
    GroupByGender(Vec<GenderCount>),
    RemoveGender(Gender),
}

/// One named unit of the chain
#[derive(Debug, Clone)]
pub struct Step {
    pub name: &'static str,
    pub summary: &'static str,
    pub action: Action,
}

impl Step {
    pub fn new(name: &'static str, summary: &'static str, action: Action) -> Self {
        Self {
            name,
            summary,
            action,
        }
    }

    /// Whether the step changes the table (and so needs a fresh snapshot)
    pub fn mutates(&self) -> bool {
        matches!(
            self.action,
            Action::ChangeGender { .. } | Action::AddGarments { .. } | Action::RemoveGender(_)
        )
    }

    pub async fn run(&self, store: &dyn GarmentStore, before: &Snapshot) -> Result<(), Failure> {
        match &self.action {
            Action::CountAll(Expect::NonZero) => {
                let count = store.count_all().await?;
                if count == 0 {
                    return Err(Failure::mismatch("count(*)", "non-zero", count));
                }
            }
            Action::CountAll(Expect::Exactly(expected)) => {
                expect_eq("count(*)", *expected, store.count_all().await?)?;
            }
            Action::CountBySeason(expected) => {
                for (season, count) in expected {
                    expect_eq(
                        format!("count(season = '{season}')"),
                        *count,
                        store.count_by_season(*season).await?,
                    )?;
                }
            }
            Action::CountBySeasonAndGender {
                season,
                gender,
                expected,
            } => {
                expect_eq(
                    format!("count(season = '{season}' and gender = '{gender}')"),
                    *expected,
                    store.count_by_season_and_gender(*season, *gender).await?,
                )?;
            }
            Action::ChangeGender {
                description,
                from,
                to,
            } => {
                store.change_gender(description, *from, *to).await?;
                expect_eq(
                    format!("gender of '{description}'"),
                    *to,
                    store.gender_of(description).await?,
                )?;
            }
            Action::AddGarments { rows, expected } => {
                store.insert_all(rows).await?;
                for (gender, count) in expected {
                    expect_eq(
                        format!("count(gender = '{gender}')"),
                        *count,
                        store.count_by_gender(*gender).await?,
                    )?;
                }
            }
            Action::GroupByGender(expected) => {
                let actual = store.group_by_gender().await?;
                if &actual != expected {
                    return Err(Failure::mismatch(
                        "group by gender",
                        format_groups(expected),
                        format_groups(&actual),
                    ));
                }
            }
            Action::RemoveGender(gender) => {
                let deleted = store.delete_by_gender(*gender).await?;
                expect_eq(
                    format!("rows deleted where gender = '{gender}'"),
                    before.count_of(*gender),
                    deleted as i64,
                )?;
                expect_eq(
                    format!("count(gender = '{gender}')"),
                    0,
                    store.count_by_gender(*gender).await?,
                )?;
            }
        }
        Ok(())
    }
}

fn expect_eq<T: PartialEq + Display>(
    check: impl Into<String>,
    expected: T,
    actual: T,
) -> Result<(), Failure> {
    if expected == actual {
        Ok(())
    } else {
        Err(Failure::mismatch(check, expected, actual))
    }
}

fn format_groups(groups: &[GenderCount]) -> String {
    let items: Vec<String> = groups.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// The fixed chain run after every fixture reset.
pub fn suite() -> Vec<Step> {
    vec![
        Step::new(
            "count-all",
            "the garment table exists and has rows",
            Action::CountAll(Expect::NonZero),
        ),
        Step::new(
            "count-exact",
            "the seed script loaded 30 garments",
            Action::CountAll(Expect::Exactly(30)),
        ),
        Step::new(
            "count-by-season",
            "12 Summer and 5 Winter garments",
            Action::CountBySeason(vec![(Season::Summer, 12), (Season::Winter, 5)]),
        ),
        Step::new(
            "count-by-season-and-gender",
            "3 Winter garments for Male",
            Action::CountBySeasonAndGender {
                season: Season::Winter,
                gender: Gender::Male,
                expected: 3,
            },
        ),
        Step::new(
            "change-gender",
            "a Male garment can become Unisex",
            Action::ChangeGender {
                description: "Red hooded jacket".to_owned(),
                from: Gender::Male,
                to: Gender::Unisex,
            },
        ),
        Step::new(
            "add-garments",
            "2 Male and 3 Female garments can be added",
            Action::AddGarments {
                rows: vec![
                    NewGarment::new(
                        "Golf t-shirt",
                        "collared-128x128-455119.png",
                        Season::Summer,
                        Gender::Male,
                        "147.43",
                    ),
                    NewGarment::new(
                        "Blue Jersey",
                        "sweater-128x128-455131.png",
                        Season::Winter,
                        Gender::Male,
                        "499.99",
                    ),
                    NewGarment::new(
                        "Purple Dress",
                        "tunic-128x128-455137.png",
                        Season::Summer,
                        Gender::Female,
                        "399.99",
                    ),
                    NewGarment::new(
                        "Short Skirt(Yellow)",
                        "skirt-128x128-455130.png",
                        Season::Summer,
                        Gender::Female,
                        "199.99",
                    ),
                    NewGarment::new(
                        "Short Skirt(Pink)",
                        "skirt-128x128-455130.png",
                        Season::Summer,
                        Gender::Female,
                        "199.99",
                    ),
                ],
                expected: vec![(Gender::Male, 15), (Gender::Female, 16)],
            },
        ),
        Step::new(
            "group-by-gender",
            "garments grouped and counted by gender",
            Action::GroupByGender(vec![
                GenderCount::new(Gender::Female, 16),
                GenderCount::new(Gender::Male, 15),
                GenderCount::new(Gender::Unisex, 4),
            ]),
        ),
        Step::new(
            "remove-gender",
            "all Unisex garments can be removed",
            Action::RemoveGender(Gender::Unisex),
        ),
    ]
}
