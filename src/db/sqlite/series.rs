//! Series catalog
//!
//! Keeps the `series` table an exact mirror of the configuration snapshot.
//! Rows are upserted for every configured series and, when the snapshot is
//! non-empty, rows missing from it are deleted along with their observations.

use super::models::Series;
use crate::error::Result;
use crate::services::series_config::SeriesSnapshot;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

/// Outcome of one catalog reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub upserted: usize,
    pub changed: usize,
    pub deleted: usize,
}

/// Insert a series, or overwrite title/link/unit only where they differ
///
/// Returns true when a row was written.
pub fn upsert_series(conn: &Connection, series: &Series) -> Result<bool> {
    let written = conn.execute(
        r#"
        INSERT INTO series (series_id, title, link, unit)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(series_id) DO UPDATE SET
            title = excluded.title,
            link = excluded.link,
            unit = excluded.unit
        WHERE series.title IS NOT excluded.title
           OR series.link IS NOT excluded.link
           OR series.unit IS NOT excluded.unit
        "#,
        params![series.series_id, series.title, series.link, series.unit],
    )?;

    if written > 0 {
        tracing::info!("Upserted series: {} - {}", series.series_id, series.title);
    }
    Ok(written > 0)
}

/// Delete every series not listed in `keep`
///
/// An empty `keep` means the configuration could not be trusted this run,
/// so nothing is deleted.
pub fn delete_missing_series(conn: &Connection, keep: &[&str]) -> Result<usize> {
    if keep.is_empty() {
        tracing::warn!("Configured series set is empty, skipping catalog deletion");
        return Ok(0);
    }

    let placeholders = vec!["?"; keep.len()].join(",");
    let sql = format!("DELETE FROM series WHERE series_id NOT IN ({})", placeholders);

    let deleted = conn.execute(&sql, params_from_iter(keep.iter()))?;
    if deleted > 0 {
        tracing::info!("Deleted {} series no longer configured", deleted);
    }
    Ok(deleted)
}

/// Make the catalog match the snapshot exactly
pub fn reconcile(conn: &Connection, snapshot: &SeriesSnapshot) -> Result<ReconcileOutcome> {
    let mut outcome = ReconcileOutcome::default();

    for (series_id, cfg) in snapshot {
        if upsert_series(conn, &series_from_config(series_id, cfg))? {
            outcome.changed += 1;
        }
        outcome.upserted += 1;
    }

    let keep: Vec<&str> = snapshot.keys().map(String::as_str).collect();
    outcome.deleted = delete_missing_series(conn, &keep)?;

    Ok(outcome)
}

pub(crate) fn series_from_config(
    series_id: &str,
    cfg: &crate::services::series_config::SeriesConfig,
) -> Series {
    Series {
        series_id: series_id.to_string(),
        title: cfg.title.clone(),
        link: cfg.link.clone(),
        unit: cfg.unit.clone(),
    }
}

/// Look up the unit a series is reported in
pub fn get_series_unit(conn: &Connection, series_id: &str) -> Result<Option<String>> {
    let unit = conn
        .query_row(
            "SELECT unit FROM series WHERE series_id = ?1",
            params![series_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(unit)
}

/// Get one series
pub fn get_series(conn: &Connection, series_id: &str) -> Result<Option<Series>> {
    let series = conn
        .query_row(
            "SELECT series_id, title, link, unit FROM series WHERE series_id = ?1",
            params![series_id],
            |row| {
                Ok(Series {
                    series_id: row.get(0)?,
                    title: row.get(1)?,
                    link: row.get(2)?,
                    unit: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(series)
}

/// List the whole catalog ordered by id
pub fn list_series(conn: &Connection) -> Result<Vec<Series>> {
    let mut stmt = conn.prepare("SELECT series_id, title, link, unit FROM series ORDER BY series_id")?;

    let series = stmt
        .query_map([], |row| {
            Ok(Series {
                series_id: row.get(0)?,
                title: row.get(1)?,
                link: row.get(2)?,
                unit: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(series)
}
