//! SQLite database models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Catalog entry for one tracked series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub series_id: String,
    pub title: String,
    pub link: String,
    pub unit: String,
}

/// Stored observation row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub series_id: String,
    pub channel: String,
    pub frequency: String,
    pub limit: Option<u32>,
    pub date: NaiveDate,
    pub value: Option<Decimal>,
    pub display_unit: String,
}

/// Observation about to be merged, already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObservation {
    pub date: NaiveDate,
    pub value: Option<Decimal>,
    pub display_unit: String,
}

/// Joined row feeding the digest, ordered by series then date descending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRow {
    pub series_id: String,
    pub frequency: String,
    pub title: String,
    pub date: NaiveDate,
    pub value: Option<Decimal>,
    pub display_unit: String,
}

/// Minimal view of a row for retention ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionRow {
    pub id: i64,
    pub date: NaiveDate,
    pub limit: Option<u32>,
}

/// Read a nullable decimal stored as text
pub(crate) fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Decimal::from_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<Observation> {
    Ok(Observation {
        id: row.get(0)?,
        series_id: row.get(1)?,
        channel: row.get(2)?,
        frequency: row.get(3)?,
        limit: row.get(4)?,
        date: row.get(5)?,
        value: decimal_column(row, 6)?,
        display_unit: row.get(7)?,
    })
}
