use chrono::NaiveDate;

use crate::models::{EnrichedReview, Sentiment};

/// The sidebar's active predicate tuple. `None` (or an empty search string)
/// is the explicit "no filter" sentinel for each field; active predicates
/// compose as a conjunction, nothing else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub search: String,
    pub version: Option<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub topic: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub rating: Option<(f64, f64)>,
}

impl FilterSpec {
    /// True when `row` independently satisfies every active predicate.
    pub fn matches(&self, row: &EnrichedReview) -> bool {
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            if !row.content.to_lowercase().contains(&needle) {
                return false;
            }
        }

        if let Some(version) = &self.version {
            if row.app_version.as_deref() != Some(version.as_str()) {
                return false;
            }
        }

        // A row missing the value for an *active* range predicate is out.
        if let Some((start, end)) = self.date_range {
            match row.timestamp {
                Some(ts) => {
                    let d = ts.date();
                    if d < start || d > end {
                        return false;
                    }
                }
                None => return false,
            }
        }

        if let Some(topic) = &self.topic {
            if row.topic_label.as_deref() != Some(topic.as_str()) {
                return false;
            }
        }

        if let Some(sentiment) = self.sentiment {
            if row.ai_sentiment != Some(sentiment) {
                return false;
            }
        }

        if let Some((lo, hi)) = self.rating {
            match row.score {
                Some(s) => {
                    if s < lo || s > hi {
                        return false;
                    }
                }
                None => return false,
            }
        }

        true
    }

    /// Recompute the filtered view from the full table. Pure: the table is
    /// never mutated and the result preserves original relative order.
    pub fn apply<'a>(&self, rows: &'a [EnrichedReview]) -> Vec<&'a EnrichedReview> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn row(id: &str, version: &str, score: Option<f64>, sentiment: Sentiment, content: &str) -> EnrichedReview {
        EnrichedReview {
            review_id: id.to_string(),
            content: content.to_string(),
            score,
            app_version: Some(version.to_string()),
            ai_sentiment: Some(sentiment),
            topic_label: Some("Topic 1".to_string()),
            timestamp: NaiveDateTime::parse_from_str("2025-06-15 10:00:00", "%Y-%m-%d %H:%M:%S").ok(),
            ..Default::default()
        }
    }

    fn table() -> Vec<EnrichedReview> {
        (0..10)
            .map(|i| {
                let version = if i % 2 == 0 { "2.1" } else { "3.0" };
                let sentiment = if i < 4 { Sentiment::Negative } else { Sentiment::Positive };
                row(&format!("r{}", i), version, Some((i % 5 + 1) as f64), sentiment, "login otp issue")
            })
            .collect()
    }

    #[test]
    fn version_filter_returns_exactly_matching_rows_in_order() {
        let rows = table();
        let spec = FilterSpec { version: Some("2.1".into()), ..Default::default() };
        let out = spec.apply(&rows);
        assert_eq!(out.len(), 5);
        let ids: Vec<&str> = out.iter().map(|r| r.review_id.as_str()).collect();
        assert_eq!(ids, ["r0", "r2", "r4", "r6", "r8"]);
    }

    #[test]
    fn conjunction_yields_rows_satisfying_every_predicate() {
        let rows = table();
        let spec = FilterSpec {
            version: Some("2.1".into()),
            sentiment: Some(Sentiment::Negative),
            rating: Some((1.0, 3.0)),
            ..Default::default()
        };
        let out = spec.apply(&rows);
        assert!(!out.is_empty());
        for r in &out {
            assert_eq!(r.app_version.as_deref(), Some("2.1"));
            assert_eq!(r.ai_sentiment, Some(Sentiment::Negative));
            let s = r.score.unwrap();
            assert!((1.0..=3.0).contains(&s));
        }
    }

    #[test]
    fn rating_range_is_inclusive_and_excludes_missing_scores() {
        let mut rows = table();
        rows.push(row("null-score", "2.1", None, Sentiment::Neutral, "tweet text"));
        let spec = FilterSpec { rating: Some((3.0, 5.0)), ..Default::default() };
        let out = spec.apply(&rows);
        assert!(out.iter().all(|r| {
            let s = r.score.unwrap();
            (3.0..=5.0).contains(&s)
        }));
        assert!(out.iter().all(|r| r.review_id != "null-score"));

        // inactive rating predicate lets null scores through
        let all = FilterSpec::default().apply(&rows);
        assert_eq!(all.len(), rows.len());
    }

    #[test]
    fn empty_search_is_a_no_op_and_matching_is_case_insensitive() {
        let rows = table();
        assert_eq!(FilterSpec::default().apply(&rows).len(), rows.len());

        let spec = FilterSpec { search: "OTP".into(), ..Default::default() };
        assert_eq!(spec.apply(&rows).len(), rows.len());

        let miss = FilterSpec { search: "refund".into(), ..Default::default() };
        assert!(miss.apply(&rows).is_empty());
    }

    #[test]
    fn date_range_is_inclusive_of_both_endpoints() {
        let rows = table();
        let day = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let spec = FilterSpec { date_range: Some((day, day)), ..Default::default() };
        assert_eq!(spec.apply(&rows).len(), rows.len());

        let before = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let spec = FilterSpec { date_range: Some((before, before)), ..Default::default() };
        assert!(spec.apply(&rows).is_empty());
    }

    #[test]
    fn applying_the_same_spec_twice_is_idempotent() {
        let rows = table();
        let spec = FilterSpec {
            search: "login".into(),
            sentiment: Some(Sentiment::Negative),
            ..Default::default()
        };
        let first: Vec<String> = spec.apply(&rows).iter().map(|r| r.review_id.clone()).collect();
        let second: Vec<String> = spec.apply(&rows).iter().map(|r| r.review_id.clone()).collect();
        assert_eq!(first, second);
        assert_eq!(rows.len(), 10); // source table untouched
    }

    #[test]
    fn result_is_always_a_subset() {
        let rows = table();
        let spec = FilterSpec { topic: Some("Topic 1".into()), ..Default::default() };
        let out = spec.apply(&rows);
        assert!(out.len() <= rows.len());
        assert!(out.iter().all(|r| rows.iter().any(|x| x.review_id == r.review_id)));
    }
}
