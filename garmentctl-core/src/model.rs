//! Garment table model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unrecognised enumerated column value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {column} value '{value}'")]
pub struct ModelError {
    pub column: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Summer,
    Winter,
    #[serde(rename = "All Season")]
    AllSeason,
}

impl Season {
    pub const ALL: [Season; 3] = [Season::Summer, Season::Winter, Season::AllSeason];

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Summer => "Summer",
            Season::Winter => "Winter",
            Season::AllSeason => "All Season",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::ALL
            .into_iter()
            .find(|season| season.as_str() == s)
            .ok_or_else(|| ModelError {
                column: "season",
                value: s.to_owned(),
            })
    }
}

/// Gender column values.
///
/// Variant order matches the text collation the grouped query sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Unisex,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Female, Gender::Male, Gender::Unisex];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
            Gender::Unisex => "Unisex",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|gender| gender.as_str() == s)
            .ok_or_else(|| ModelError {
                column: "gender",
                value: s.to_owned(),
            })
    }
}

/// A stored garment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Garment {
    pub id: i32,
    pub description: String,
    pub img: String,
    pub season: Season,
    pub gender: Gender,
    /// Decimal literal as text, e.g. `"147.43"`
    pub price: String,
}

/// A garment row before storage assigns its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGarment {
    pub description: String,
    pub img: String,
    pub season: Season,
    pub gender: Gender,
    pub price: String,
}

impl NewGarment {
    pub fn new(
        description: impl Into<String>,
        img: impl Into<String>,
        season: Season,
        gender: Gender,
        price: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            img: img.into(),
            season,
            gender,
            price: price.into(),
        }
    }

    pub fn with_id(self, id: i32) -> Garment {
        Garment {
            id,
            description: self.description,
            img: self.img,
            season: self.season,
            gender: self.gender,
            price: self.price,
        }
    }
}

/// One row of `GROUP BY gender`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub gender: Gender,
    pub count: i64,
}

impl GenderCount {
    pub fn new(gender: Gender, count: i64) -> Self {
        Self { gender, count }
    }
}

impl fmt::Display for GenderCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.gender, self.count)
    }
}
