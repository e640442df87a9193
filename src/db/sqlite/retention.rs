//! Retention enforcement
//!
//! Each (series, channel) partition keeps only its most recent `limit`
//! observations. The limit is read from every row rather than from the live
//! channel configuration, so a row ranked `n` is expired when `n` exceeds the
//! limit it was last written with. Rows without a limit never expire.

use super::models::RetentionRow;
use crate::error::Result;
use rusqlite::{params, params_from_iter, Connection};

/// Ids of rows that fall outside their own limit, ranking by date descending
pub fn select_expired(rows: &[RetentionRow]) -> Vec<i64> {
    let mut ranked: Vec<&RetentionRow> = rows.iter().collect();
    ranked.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));

    ranked
        .into_iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let rank = idx as u64 + 1;
            match row.limit {
                Some(limit) if rank > u64::from(limit) => Some(row.id),
                _ => None,
            }
        })
        .collect()
}

fn load_partition(conn: &Connection, series_id: &str, channel: &str) -> Result<Vec<RetentionRow>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT id, obs_date, "limit" FROM observations WHERE series_id = ?1 AND channel = ?2"#,
    )?;

    let rows = stmt
        .query_map(params![series_id, channel], |row| {
            Ok(RetentionRow {
                id: row.get(0)?,
                date: row.get(1)?,
                limit: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn delete_ids(conn: &Connection, ids: &[i64]) -> Result<usize> {
    let mut deleted = 0;
    // Stay well below SQLite's bound-parameter limit
    for chunk in ids.chunks(500) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!("DELETE FROM observations WHERE id IN ({})", placeholders);
        deleted += conn.execute(&sql, params_from_iter(chunk.iter()))?;
    }
    Ok(deleted)
}

/// Trim one partition to its configured limit
pub fn enforce(conn: &Connection, series_id: &str, channel: &str) -> Result<usize> {
    let rows = load_partition(conn, series_id, channel)?;
    let expired = select_expired(&rows);
    if expired.is_empty() {
        return Ok(0);
    }

    let deleted = delete_ids(conn, &expired)?;
    tracing::debug!("Expired {} observations from {}/{}", deleted, series_id, channel);
    Ok(deleted)
}

/// Trim every partition stored for a series
pub fn enforce_series(conn: &Connection, series_id: &str) -> Result<usize> {
    let channels: Vec<String> = {
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT channel FROM observations WHERE series_id = ?1 ORDER BY channel",
        )?;
        let channels = stmt
            .query_map(params![series_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        channels
    };

    let mut deleted = 0;
    for channel in &channels {
        deleted += enforce(conn, series_id, channel)?;
    }

    if deleted > 0 {
        tracing::info!("Retention removed {} observations for {}", deleted, series_id);
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::observations::get_partition;
    use crate::db::sqlite::test_connection;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(id: i64, d: &str, limit: Option<u32>) -> RetentionRow {
        RetentionRow {
            id,
            date: date(d),
            limit,
        }
    }

    fn seed(conn: &Connection, channel: &str, dates: &[&str], limit: Option<u32>) {
        conn.execute(
            "INSERT OR IGNORE INTO series (series_id, title, link) VALUES ('GDP', 'GDP', 'l')",
            [],
        )
        .unwrap();
        for d in dates {
            conn.execute(
                "INSERT INTO observations (series_id, channel, frequency, \"limit\", obs_date, value, display_unit)
                 VALUES ('GDP', ?1, 'q', ?2, ?3, '1', 'u')",
                params![channel, limit, d],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_select_expired_keeps_most_recent() {
        let rows = vec![
            row(1, "2023-01-01", Some(3)),
            row(2, "2024-01-01", Some(3)),
            row(3, "2022-01-01", Some(3)),
            row(4, "2023-07-01", Some(3)),
            row(5, "2023-04-01", Some(3)),
        ];
        let mut expired = select_expired(&rows);
        expired.sort();
        assert_eq!(expired, vec![1, 3]);
    }

    #[test]
    fn test_select_expired_uses_row_limit() {
        // Ranks 1..4; row ranked 2 carries limit 1, row ranked 3 carries limit 5
        let rows = vec![
            row(1, "2024-04-01", Some(3)),
            row(2, "2024-03-01", Some(1)),
            row(3, "2024-02-01", Some(5)),
            row(4, "2024-01-01", Some(3)),
        ];
        let mut expired = select_expired(&rows);
        expired.sort();
        assert_eq!(expired, vec![2, 4]);
    }

    #[test]
    fn test_unbounded_rows_never_expire() {
        let rows = vec![row(1, "2024-01-01", None), row(2, "2023-01-01", None)];
        assert!(select_expired(&rows).is_empty());
    }

    #[test]
    fn test_enforce_trims_partition() {
        let conn = test_connection();
        seed(
            &conn,
            "mail",
            &["2023-01-01", "2024-01-01", "2022-01-01", "2023-07-01", "2023-04-01"],
            Some(3),
        );

        assert_eq!(enforce(&conn, "GDP", "mail").unwrap(), 2);

        let remaining: Vec<String> = get_partition(&conn, "GDP", "mail")
            .unwrap()
            .into_iter()
            .map(|o| o.date.to_string())
            .collect();
        assert_eq!(remaining, vec!["2024-01-01", "2023-07-01", "2023-04-01"]);
    }

    #[test]
    fn test_enforce_series_covers_every_channel() {
        let conn = test_connection();
        seed(&conn, "mail", &["2024-01-01", "2023-01-01", "2022-01-01"], Some(1));
        seed(&conn, "web", &["2024-01-01", "2023-01-01", "2022-01-01"], Some(2));
        seed(&conn, "daily", &["2024-01-01", "2023-01-01"], None);

        assert_eq!(enforce_series(&conn, "GDP").unwrap(), 3);
        assert_eq!(get_partition(&conn, "GDP", "mail").unwrap().len(), 1);
        assert_eq!(get_partition(&conn, "GDP", "web").unwrap().len(), 2);
        assert_eq!(get_partition(&conn, "GDP", "daily").unwrap().len(), 2);
    }
}
