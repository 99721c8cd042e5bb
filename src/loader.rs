use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::keywords::{default_topic_keywords, TopicKeywords};
use crate::models::EnrichedReview;

/// Validation artifact of the upstream sentiment model, rendered on the
/// Aspects page when present.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfusionMatrixData {
    pub confusion_matrix: Vec<Vec<f64>>,
    pub labels: Vec<String>,
    pub accuracy: f64,
    pub match_rate: f64,
    #[serde(default)]
    pub classification_report: BTreeMap<String, serde_json::Value>,
}

/// Session-scoped loader. Every input is read exactly once per process and
/// memoized by path; filters and pages only ever see the cached tables.
#[derive(Default)]
pub struct DataStore {
    tables: HashMap<PathBuf, Arc<Vec<EnrichedReview>>>,
    keyword_maps: HashMap<PathBuf, Arc<TopicKeywords>>,
    matrices: HashMap<PathBuf, Option<Arc<ConfusionMatrixData>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the enriched review table. A missing file is an error the caller
    /// must surface and halt on; malformed rows are skipped with a warning.
    pub fn enriched(&mut self, path: &Path) -> Result<Arc<Vec<EnrichedReview>>> {
        if let Some(cached) = self.tables.get(path) {
            debug!("Enriched table cache hit - path={}", path.display());
            return Ok(Arc::clone(cached));
        }

        let mut rdr = csv::Reader::from_path(path)
            .with_context(|| format!("Data file '{}' not found", path.display()))?;

        let mut rows: Vec<EnrichedReview> = Vec::new();
        let mut skipped = 0usize;
        for record in rdr.deserialize::<EnrichedReview>() {
            match record {
                Ok(mut row) => {
                    derive_columns(&mut row);
                    rows.push(row);
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping malformed row - error={}", e);
                }
            }
        }
        if skipped > 0 {
            warn!("Enriched load - skipped={} malformed rows", skipped);
        }
        info!("Enriched table loaded - path={}, rows={}", path.display(), rows.len());

        let table = Arc::new(rows);
        self.tables.insert(path.to_path_buf(), Arc::clone(&table));
        Ok(table)
    }

    /// Topic keyword map, falling back to the compiled-in defaults when the
    /// file is missing or unreadable.
    pub fn topic_keywords(&mut self, path: &Path) -> Arc<TopicKeywords> {
        if let Some(cached) = self.keyword_maps.get(path) {
            return Arc::clone(cached);
        }

        #[derive(Deserialize)]
        struct KeywordFile {
            #[serde(default)]
            negative_topics: Option<TopicKeywords>,
        }

        let map = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<KeywordFile>(&raw).ok())
            .and_then(|f| f.negative_topics)
            .unwrap_or_else(|| {
                warn!("topic_keywords.json missing or unreadable - using defaults");
                default_topic_keywords()
            });

        let map = Arc::new(map);
        self.keyword_maps.insert(path.to_path_buf(), Arc::clone(&map));
        map
    }

    /// Confusion-matrix report; `None` (placeholder downstream) when absent
    /// or malformed.
    pub fn confusion_matrix(&mut self, path: &Path) -> Option<Arc<ConfusionMatrixData>> {
        if let Some(cached) = self.matrices.get(path) {
            return cached.clone();
        }

        let loaded = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<ConfusionMatrixData>(&raw) {
                Ok(data) => Some(Arc::new(data)),
                Err(e) => {
                    warn!("Confusion matrix unreadable - path={}, error={}", path.display(), e);
                    None
                }
            },
            Err(_) => {
                debug!("Confusion matrix not found - path={}", path.display());
                None
            }
        };

        self.matrices.insert(path.to_path_buf(), loaded.clone());
        loaded
    }
}

/// Compute the derived columns once, at load time. Unparseable timestamps
/// coerce to None rather than failing the row.
fn derive_columns(row: &mut EnrichedReview) {
    row.timestamp = parse_timestamp(&row.at);
    if let Some(ts) = row.timestamp {
        row.month_year = Some(ts.format("%Y-%m").to_string());
        row.year = Some(ts.year());
        row.month = Some(ts.month());
        row.week = Some(ts.iso_week().week());
    }

    if row.topic_label.is_none() {
        if let Some(id) = row.dominant_topic {
            row.topic_label = Some(format!("Topic {}", id + 1));
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "reviewId,content,score,at,thumbsUpCount,reviewCreatedVersion,replyContent,repliedAt,appVersion,source,sentiment_score,ai_sentiment,ai_confidence,dominant_topic,Topic_Label";

    fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(f, "{}", row).unwrap();
        }
        path
    }

    #[test]
    fn derives_calendar_columns_and_topic_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "enriched.csv",
            &["g1,slow app,2.0,2025-03-05 09:30:00,1,6.1,,,6.1,GooglePlay,-0.4,Negative,0.91,2,"],
        );

        let mut store = DataStore::new();
        let table = store.enriched(&path).unwrap();
        let row = &table[0];
        assert_eq!(row.month_year.as_deref(), Some("2025-03"));
        assert_eq!(row.year, Some(2025));
        assert_eq!(row.month, Some(3));
        assert_eq!(row.week, Some(10));
        assert_eq!(row.topic_label.as_deref(), Some("Topic 3"));
        assert_eq!(row.score, Some(2.0));
    }

    #[test]
    fn unparseable_timestamps_coerce_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "bad_at.csv",
            &["g2,ok,4.0,not-a-date,0,,,,,GooglePlay,0.2,Positive,0.8,0,Topic 1"],
        );
        let mut store = DataStore::new();
        let table = store.enriched(&path).unwrap();
        assert!(table[0].timestamp.is_none());
        assert!(table[0].month_year.is_none());
    }

    #[test]
    fn enriched_load_is_memoized_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "memo.csv",
            &["g3,fine,5.0,2025-01-01 00:00:00,0,,,,,GooglePlay,0.8,Positive,0.99,0,Topic 1"],
        );
        let mut store = DataStore::new();
        let first = store.enriched(&path).unwrap();
        std::fs::remove_file(&path).unwrap(); // a re-read would now fail
        let second = store.enriched(&path).unwrap();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn missing_enriched_file_is_an_error() {
        let mut store = DataStore::new();
        let err = store.enriched(Path::new("/nonexistent/df_final_enriched.csv"));
        assert!(err.is_err());
    }

    #[test]
    fn keyword_map_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DataStore::new();

        let missing = dir.path().join("topic_keywords.json");
        let map = store.topic_keywords(&missing);
        assert!(map.contains_key("1"));

        let custom = dir.path().join("custom.json");
        std::fs::write(&custom, r#"{"negative_topics":{"7":["delivery","late"]}}"#).unwrap();
        let map = store.topic_keywords(&custom);
        assert_eq!(map.get("7").unwrap()[0], "delivery");
    }

    #[test]
    fn confusion_matrix_absent_or_malformed_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DataStore::new();
        assert!(store.confusion_matrix(&dir.path().join("nope.json")).is_none());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(store.confusion_matrix(&bad).is_none());

        let good = dir.path().join("cm.json");
        std::fs::write(
            &good,
            r#"{"confusion_matrix":[[40,2,1],[3,30,2],[1,4,50]],
                "labels":["Negative","Neutral","Positive"],
                "accuracy":0.89,"match_rate":0.92,
                "classification_report":{"negative":{"precision":0.9,"recall":0.93}}}"#,
        )
        .unwrap();
        let cm = store.confusion_matrix(&good).unwrap();
        assert_eq!(cm.labels.len(), 3);
        assert!((cm.accuracy - 0.89).abs() < 1e-9);
    }
}
