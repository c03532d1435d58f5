//! Seed script loading and parsing
//!
//! The script is executed verbatim against PostgreSQL. The parser exists for
//! offline inspection (`garmentctl check`) and for the in-memory store, and
//! only understands `insert into garment (...) values (...)` statements.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::error::HarnessError;
use crate::model::{Gender, ModelError, NewGarment, Season};

static INSERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^insert\s+into\s+garment\s*\(([^)]*)\)\s*values\s*\((.*)\)$")
        .expect("valid insert regex")
});

const COLUMNS: [&str; 5] = ["description", "img", "season", "gender", "price"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("statement {index}: unsupported statement '{snippet}'")]
    Unsupported { index: usize, snippet: String },

    #[error("statement {index}: {reason}")]
    Malformed { index: usize, reason: String },

    #[error("statement {index}: {source}")]
    Value { index: usize, source: ModelError },

    #[error("unterminated string literal")]
    Unterminated,
}

/// Seed script text plus where it came from
#[derive(Debug, Clone)]
pub struct SeedScript {
    pub path: PathBuf,
    pub sql: String,
}

impl SeedScript {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let sql = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| HarnessError::io(path, err))?;
        Ok(Self::from_sql(path, sql))
    }

    pub fn from_sql(path: impl Into<PathBuf>, sql: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sql: sql.into(),
        }
    }

    pub fn rows(&self) -> Result<Vec<NewGarment>, SeedError> {
        parse(&self.sql)
    }

    pub fn summary(&self) -> Result<SeedSummary, SeedError> {
        Ok(SeedSummary::from_rows(&self.rows()?))
    }
}

/// Baseline distribution described by a seed script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub total: i64,
    pub by_season: BTreeMap<Season, i64>,
    pub by_gender: BTreeMap<Gender, i64>,
}

impl SeedSummary {
    pub fn from_rows(rows: &[NewGarment]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            summary.total += 1;
            *summary.by_season.entry(row.season).or_default() += 1;
            *summary.by_gender.entry(row.gender).or_default() += 1;
        }
        summary
    }
}

impl fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total: {}", self.total)?;
        for (season, count) in &self.by_season {
            writeln!(f, "  season {season}: {count}")?;
        }
        for (gender, count) in &self.by_gender {
            writeln!(f, "  gender {gender}: {count}")?;
        }
        Ok(())
    }
}

/// Parse every statement of a seed script into rows.
pub fn parse(sql: &str) -> Result<Vec<NewGarment>, SeedError> {
    split_statements(sql)?
        .iter()
        .enumerate()
        .map(|(i, statement)| parse_insert(i + 1, statement))
        .collect()
}

/// Split on `;` outside string literals, dropping `--` comments and blanks.
fn split_statements(sql: &str) -> Result<Vec<String>, SeedError> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_string = !in_string;
                current.push(c);
            }
            '-' if !in_string && chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
                current.push('\n');
            }
            ';' if !in_string => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if in_string {
        return Err(SeedError::Unterminated);
    }
    push_statement(&mut statements, &current);
    Ok(statements)
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_owned());
    }
}

fn parse_insert(index: usize, statement: &str) -> Result<NewGarment, SeedError> {
    let captures = INSERT_RE
        .captures(statement)
        .ok_or_else(|| SeedError::Unsupported {
            index,
            snippet: statement.chars().take(40).collect(),
        })?;

    let columns: Vec<String> = captures[1]
        .split(',')
        .map(|column| column.trim().to_lowercase())
        .collect();
    let values = split_values(&captures[2]);

    if columns.len() != values.len() {
        return Err(SeedError::Malformed {
            index,
            reason: format!("{} columns but {} values", columns.len(), values.len()),
        });
    }

    let mut by_column: BTreeMap<&str, String> = BTreeMap::new();
    for (column, value) in columns.iter().zip(values) {
        by_column.insert(column.as_str(), value);
    }

    let take = |name: &str| {
        by_column.remove(name).ok_or_else(|| SeedError::Malformed {
            index,
            reason: format!("missing column '{name}'"),
        })
    };
    let [description, img, season, gender, price] = COLUMNS.map(take);
    let value_err = |source| SeedError::Value { index, source };

    Ok(NewGarment {
        description: description?,
        img: img?,
        season: season?.parse().map_err(value_err)?,
        gender: gender?.parse().map_err(value_err)?,
        price: price?,
    })
}

/// Split a `VALUES (...)` body into literals, unquoting `'...'` strings.
fn split_values(body: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if in_string && chars.peek() == Some(&'\'') => {
                chars.next();
                current.push('\'');
            }
            '\'' => in_string = !in_string,
            ',' if !in_string => {
                values.push(current.trim().to_owned());
                current.clear();
            }
            _ if in_string => current.push(c),
            _ if c.is_whitespace() => {}
            _ => current.push(c),
        }
    }
    values.push(current.trim().to_owned());
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = include_str!("../../sql/data.sql");

    #[test]
    fn bundled_seed_matches_baseline() {
        let summary = SeedScript::from_sql("sql/data.sql", SEED).summary().unwrap();

        assert_eq!(summary.total, 30);
        assert_eq!(summary.by_season[&Season::Summer], 12);
        assert_eq!(summary.by_season[&Season::Winter], 5);
        assert_eq!(summary.by_gender[&Gender::Male], 14);
        assert_eq!(summary.by_gender[&Gender::Female], 13);
        assert_eq!(summary.by_gender[&Gender::Unisex], 3);
    }

    #[test]
    fn bundled_seed_has_three_winter_male_rows() {
        let rows = parse(SEED).unwrap();
        let winter_male = rows
            .iter()
            .filter(|row| row.season == Season::Winter && row.gender == Gender::Male)
            .count();
        assert_eq!(winter_male, 3);
    }

    #[test]
    fn parses_escaped_quotes_and_parentheses() {
        let rows = parse(
            "INSERT INTO garment (description, img, season, gender, price) \
             VALUES ('Short Skirt(Pink); it''s new', 'skirt.png', 'Summer', 'Female', 199.99);",
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "Short Skirt(Pink); it's new");
        assert_eq!(rows[0].price, "199.99");
    }

    #[test]
    fn column_order_follows_column_list() {
        let rows = parse(
            "insert into garment (price, gender, season, img, description) \
             values (10.00, 'Unisex', 'Winter', 'beanie.png', 'Knitted beanie')",
        )
        .unwrap();

        assert_eq!(rows[0].description, "Knitted beanie");
        assert_eq!(rows[0].gender, Gender::Unisex);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let rows = parse(
            "-- header; with a semicolon\n\n\
             insert into garment (description, img, season, gender, price) \
             values ('Navy chinos', 'trousers.png', 'All Season', 'Male', 349.99); -- trailing\n",
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn rejects_other_statements() {
        let err = parse("delete from garment;").unwrap_err();
        assert!(matches!(err, SeedError::Unsupported { index: 1, .. }));
    }

    #[test]
    fn rejects_unknown_gender() {
        let err = parse(
            "insert into garment (description, img, season, gender, price) \
             values ('Grey hoodie', 'hoodie.png', 'All Season', 'Other', 1.00)",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "statement 1: unknown gender value 'Other'");
    }

    #[test]
    fn rejects_value_count_mismatch() {
        let err = parse(
            "insert into garment (description, img, season, gender, price) \
             values ('Grey hoodie', 'hoodie.png', 'All Season', 'Male')",
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::Malformed { .. }));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert_eq!(
            parse("insert into garment (description) values ('oops)").unwrap_err(),
            SeedError::Unterminated
        );
    }
}
