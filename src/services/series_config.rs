//! Series configuration snapshot
//!
//! The catalog is driven by JSON documents held in the parameter store. Each
//! document maps series ids to their display metadata and fetch channels;
//! several documents are merged into one snapshot, later documents winning.

use crate::clients::ConfigSource;
use crate::error::{AppError, Result};
use crate::services::normalizer::DEFAULT_SERIES_UNIT;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Fetch configuration for one channel of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub frequency: String,
    /// Maximum retained rows; `None` keeps everything
    #[serde(default)]
    pub limit: Option<u32>,
}

/// One configured series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesConfig {
    #[serde(alias = "title_cn")]
    pub title: String,
    pub link: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

fn default_unit() -> String {
    DEFAULT_SERIES_UNIT.to_string()
}

/// Merged configuration snapshot, ordered by series id
pub type SeriesSnapshot = BTreeMap<String, SeriesConfig>;

#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesDocument {
    Wrapped { series: HashMap<String, SeriesConfig> },
    Bare(HashMap<String, SeriesConfig>),
}

/// Parse one configuration document
pub fn parse_series_document(raw: &str) -> Result<HashMap<String, SeriesConfig>> {
    let doc: SeriesDocument = serde_json::from_str(raw)
        .map_err(|e| AppError::ConfigUnavailable(format!("Invalid series document: {}", e)))?;

    Ok(match doc {
        SeriesDocument::Wrapped { series } => series,
        SeriesDocument::Bare(series) => series,
    })
}

/// Merge documents in order; a later document replaces earlier entries with the same id
pub fn merge_documents<I>(documents: I) -> SeriesSnapshot
where
    I: IntoIterator<Item = HashMap<String, SeriesConfig>>,
{
    let mut snapshot = SeriesSnapshot::new();
    for doc in documents {
        snapshot.extend(doc);
    }
    snapshot
}

/// Read and merge every configured series document
pub async fn load_series_snapshot(
    source: &dyn ConfigSource,
    paths: &[String],
) -> Result<SeriesSnapshot> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = source.get(path).await?;
        let doc = parse_series_document(&raw)?;
        tracing::debug!("Loaded {} series from {}", doc.len(), path);
        documents.push(doc);
    }

    let snapshot = merge_documents(documents);
    tracing::info!("Series snapshot holds {} series", snapshot.len());
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRAPPED: &str = r#"{
        "series": {
            "GDP": {
                "title_cn": "国内生产总值",
                "link": "https://fred.stlouisfed.org/series/GDP",
                "unit": "Billions",
                "channels": {
                    "mail": {"frequency": "q", "limit": 2},
                    "web": {"frequency": "q", "limit": 40}
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_wrapped_document() {
        let doc = parse_series_document(WRAPPED).unwrap();
        let gdp = &doc["GDP"];
        assert_eq!(gdp.title, "国内生产总值");
        assert_eq!(gdp.unit, "Billions");
        assert_eq!(gdp.channels["mail"].limit, Some(2));
        assert_eq!(gdp.channels["web"].frequency, "q");
    }

    #[test]
    fn test_parse_bare_document_defaults() {
        let raw = r#"{"UNRATE": {"title": "Unemployment", "link": "l", "channels": {"daily": {"frequency": "m"}}}}"#;
        let doc = parse_series_document(raw).unwrap();
        let unrate = &doc["UNRATE"];
        assert_eq!(unrate.unit, DEFAULT_SERIES_UNIT);
        assert_eq!(unrate.channels["daily"].limit, None);
    }

    #[test]
    fn test_invalid_document_is_config_unavailable() {
        let err = parse_series_document("not json").unwrap_err();
        assert!(matches!(err, AppError::ConfigUnavailable(_)));
    }

    #[test]
    fn test_later_document_wins() {
        let first = parse_series_document(
            r#"{"A": {"title": "old", "link": "a"}, "B": {"title": "b", "link": "b"}}"#,
        )
        .unwrap();
        let second = parse_series_document(r#"{"A": {"title": "new", "link": "a2"}}"#).unwrap();

        let snapshot = merge_documents(vec![first, second]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["A"].title, "new");
        assert_eq!(snapshot["A"].link, "a2");
        assert_eq!(snapshot.keys().cloned().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_demo_documents_parse() {
        let snapshot = merge_documents([
            parse_series_document(include_str!("../../demos/parameters/joinquant/dev/fred/series1")).unwrap(),
            parse_series_document(include_str!("../../demos/parameters/joinquant/dev/fred/series2")).unwrap(),
        ]);

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot["M2SL"].title, "M2 Money Stock");
        assert_eq!(snapshot["GDP"].channels["web"].limit, Some(40));
    }
}
