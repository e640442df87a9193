//! Observation store
//!
//! Observations are keyed by (series_id, channel, obs_date). Re-ingesting a
//! key overwrites value, frequency, limit and display unit in place.

use super::models::{observation_from_row, decimal_column, DigestRow, NewObservation, Observation};
use super::series::get_series_unit;
use crate::clients::RawObservation;
use crate::error::{AppError, Result};
use crate::services::normalizer::{self, DEFAULT_SERIES_UNIT};
use crate::services::series_config::ChannelConfig;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::HashMap;

/// Series units looked up during one pipeline run
///
/// Lives on the run's stack and is dropped with it; never shared across runs.
#[derive(Debug, Default)]
pub struct UnitCache {
    units: HashMap<String, String>,
}

impl UnitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit for a series, falling back to the default when it has no catalog row
    pub fn unit_for(&mut self, conn: &Connection, series_id: &str) -> Result<String> {
        if let Some(unit) = self.units.get(series_id) {
            return Ok(unit.clone());
        }

        let unit = match get_series_unit(conn, series_id)? {
            Some(unit) => unit,
            None => {
                tracing::warn!(
                    "Series {} has no catalog unit, assuming '{}'",
                    series_id,
                    DEFAULT_SERIES_UNIT
                );
                DEFAULT_SERIES_UNIT.to_string()
            }
        };

        self.units.insert(series_id.to_string(), unit.clone());
        Ok(unit)
    }
}

/// Parse an API date
pub fn parse_observation_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::Validation(format!("Invalid observation date {:?}: {}", raw, e)))
}

/// Normalize a fetched batch with the unit of its series
pub fn normalize_batch(raw: &[RawObservation], source_unit: &str) -> Result<Vec<NewObservation>> {
    raw.iter()
        .map(|obs| {
            let normalized = normalizer::normalize_raw(&obs.value, source_unit)?;
            Ok(NewObservation {
                date: parse_observation_date(&obs.date)?,
                value: normalized.value,
                display_unit: normalized.display_unit.to_string(),
            })
        })
        .collect()
}

/// Upsert a normalized batch for one series/channel
pub fn upsert_observations(
    conn: &Connection,
    series_id: &str,
    channel_name: &str,
    channel: &ChannelConfig,
    rows: &[NewObservation],
) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO observations (series_id, channel, frequency, "limit", obs_date, value, display_unit)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(series_id, channel, obs_date) DO UPDATE SET
            value = excluded.value,
            frequency = excluded.frequency,
            "limit" = excluded."limit",
            display_unit = excluded.display_unit
        "#,
    )?;

    for row in rows {
        stmt.execute(params![
            series_id,
            channel_name,
            channel.frequency,
            channel.limit,
            row.date,
            row.value.map(|v| v.to_string()),
            row.display_unit,
        ])?;
    }

    tracing::debug!("Merged {} observations into {}/{}", rows.len(), series_id, channel_name);
    Ok(rows.len())
}

/// Normalize and merge a fetched batch for one series/channel
pub fn merge(
    conn: &Connection,
    units: &mut UnitCache,
    series_id: &str,
    channel_name: &str,
    channel: &ChannelConfig,
    raw: &[RawObservation],
) -> Result<usize> {
    if raw.is_empty() {
        return Ok(0);
    }

    let unit = units.unit_for(conn, series_id)?;
    let rows = normalize_batch(raw, &unit)?;
    upsert_observations(conn, series_id, channel_name, channel, &rows)
}

const OBSERVATION_COLUMNS: &str =
    r#"id, series_id, channel, frequency, "limit", obs_date, value, display_unit"#;

/// Observations for one series, most recent first
pub fn get_by_series(conn: &Connection, series_id: &str) -> Result<Vec<Observation>> {
    let sql = format!(
        "SELECT {} FROM observations WHERE series_id = ?1 ORDER BY obs_date DESC, channel",
        OBSERVATION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![series_id], observation_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Observations for one channel across all series, most recent first
pub fn get_by_channel(conn: &Connection, channel: &str) -> Result<Vec<Observation>> {
    let sql = format!(
        "SELECT {} FROM observations WHERE channel = ?1 ORDER BY obs_date DESC, series_id",
        OBSERVATION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![channel], observation_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Observations for one partition, most recent first
pub fn get_partition(conn: &Connection, series_id: &str, channel: &str) -> Result<Vec<Observation>> {
    let sql = format!(
        "SELECT {} FROM observations WHERE series_id = ?1 AND channel = ?2 ORDER BY obs_date DESC",
        OBSERVATION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![series_id, channel], observation_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Rows for the digest of a reporting channel, grouped by series, newest first
pub fn get_digest_rows(conn: &Connection, channel: &str) -> Result<Vec<DigestRow>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT o.series_id, o.frequency, s.title, o.obs_date, o.value, o.display_unit
        FROM observations o
        JOIN series s ON o.series_id = s.series_id
        WHERE o.channel = ?1
        ORDER BY o.series_id, o.obs_date DESC
        "#,
    )?;

    let rows = stmt
        .query_map(params![channel], |row| {
            Ok(DigestRow {
                series_id: row.get(0)?,
                frequency: row.get(1)?,
                title: row.get(2)?,
                date: row.get(3)?,
                value: decimal_column(row, 4)?,
                display_unit: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::series::upsert_series;
    use crate::db::sqlite::models::Series;
    use crate::db::sqlite::test_connection;
    use crate::services::normalizer::CANONICAL_DISPLAY_UNIT;
    use rust_decimal_macros::dec;

    fn raw(date: &str, value: &str) -> RawObservation {
        RawObservation {
            date: date.to_string(),
            value: value.to_string(),
        }
    }

    fn channel(limit: u32) -> ChannelConfig {
        ChannelConfig {
            frequency: "q".to_string(),
            limit: Some(limit),
        }
    }

    fn seed_series(conn: &Connection, series_id: &str, unit: &str) {
        upsert_series(
            conn,
            &Series {
                series_id: series_id.to_string(),
                title: format!("{} title", series_id),
                link: "https://example.com".to_string(),
                unit: unit.to_string(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_merge_is_idempotent() {
        let conn = test_connection();
        seed_series(&conn, "GDP", "Millions");
        let batch = vec![raw("2024-01-01", "1234.5"), raw("2023-10-01", ".")];

        let mut units = UnitCache::new();
        merge(&conn, &mut units, "GDP", "mail", &channel(5), &batch).unwrap();
        let first = get_partition(&conn, "GDP", "mail").unwrap();

        merge(&conn, &mut units, "GDP", "mail", &channel(5), &batch).unwrap();
        let second = get_partition(&conn, "GDP", "mail").unwrap();

        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].value, Some(dec!(12.345)));
        assert_eq!(second[1].value, None);
        assert!(second.iter().all(|o| o.display_unit == CANONICAL_DISPLAY_UNIT));
    }

    #[test]
    fn test_reingest_overwrites_in_place() {
        let conn = test_connection();
        seed_series(&conn, "GDP", "number");
        let mut units = UnitCache::new();

        merge(&conn, &mut units, "GDP", "mail", &channel(5), &[raw("2024-01-01", "1")]).unwrap();
        let before = get_partition(&conn, "GDP", "mail").unwrap();

        let revised = ChannelConfig {
            frequency: "a".to_string(),
            limit: Some(9),
        };
        merge(&conn, &mut units, "GDP", "mail", &revised, &[raw("2024-01-01", "2")]).unwrap();
        let after = get_partition(&conn, "GDP", "mail").unwrap();

        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].value, Some(dec!(2)));
        assert_eq!(after[0].frequency, "a");
        assert_eq!(after[0].limit, Some(9));
    }

    #[test]
    fn test_channels_are_separate_partitions() {
        let conn = test_connection();
        seed_series(&conn, "GDP", "number");
        let mut units = UnitCache::new();
        let batch = vec![raw("2024-01-01", "1")];

        merge(&conn, &mut units, "GDP", "mail", &channel(5), &batch).unwrap();
        merge(&conn, &mut units, "GDP", "web", &channel(5), &batch).unwrap();

        assert_eq!(get_by_series(&conn, "GDP").unwrap().len(), 2);
        assert_eq!(get_by_channel(&conn, "web").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let conn = test_connection();
        let mut units = UnitCache::new();
        assert_eq!(merge(&conn, &mut units, "NOPE", "mail", &channel(1), &[]).unwrap(), 0);
    }

    #[test]
    fn test_unit_cache_defaults_and_memoizes() {
        let conn = test_connection();
        let mut units = UnitCache::new();
        assert_eq!(units.unit_for(&conn, "NOPE").unwrap(), DEFAULT_SERIES_UNIT);

        seed_series(&conn, "GDP", "Billions");
        assert_eq!(units.unit_for(&conn, "GDP").unwrap(), "Billions");

        conn.execute("UPDATE series SET unit = 'Millions' WHERE series_id = 'GDP'", [])
            .unwrap();
        assert_eq!(units.unit_for(&conn, "GDP").unwrap(), "Billions");
    }

    #[test]
    fn test_invalid_value_fails_batch() {
        let conn = test_connection();
        seed_series(&conn, "GDP", "number");
        let mut units = UnitCache::new();

        let err = merge(
            &conn,
            &mut units,
            "GDP",
            "mail",
            &channel(5),
            &[raw("2024-01-01", "1"), raw("2023-10-01", "oops")],
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidNumericFormat { .. }));
        assert!(get_partition(&conn, "GDP", "mail").unwrap().is_empty());
    }

    #[test]
    fn test_rescale_overflow_fails_batch() {
        let conn = test_connection();
        seed_series(&conn, "GDP", "Billions");
        let mut units = UnitCache::new();

        let err = merge(
            &conn,
            &mut units,
            "GDP",
            "mail",
            &channel(5),
            &[raw("2024-01-01", "79228162514264337593543950335")],
        )
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidNumericFormat { .. }));
        assert!(get_partition(&conn, "GDP", "mail").unwrap().is_empty());
    }

    #[test]
    fn test_digest_rows_ordering() {
        let conn = test_connection();
        seed_series(&conn, "B", "number");
        seed_series(&conn, "A", "number");
        let mut units = UnitCache::new();

        merge(&conn, &mut units, "B", "mail", &channel(5), &[raw("2023-01-01", "1"), raw("2024-01-01", "2")]).unwrap();
        merge(&conn, &mut units, "A", "mail", &channel(5), &[raw("2022-01-01", "3")]).unwrap();
        merge(&conn, &mut units, "A", "web", &channel(5), &[raw("2025-01-01", "4")]).unwrap();

        let rows = get_digest_rows(&conn, "mail").unwrap();
        let keys: Vec<(String, String)> = rows
            .iter()
            .map(|r| (r.series_id.clone(), r.date.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A".to_string(), "2022-01-01".to_string()),
                ("B".to_string(), "2024-01-01".to_string()),
                ("B".to_string(), "2023-01-01".to_string()),
            ]
        );
        assert_eq!(rows[0].title, "A title");
    }
}
