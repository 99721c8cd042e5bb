use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Review origin. Serialized exactly as it appears in the CSV `source` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    GooglePlay,
    AppleStore,
    Twitter,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::GooglePlay => "GooglePlay",
            Source::AppleStore => "AppleStore",
            Source::Twitter => "Twitter",
        };
        f.write_str(s)
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "GooglePlay" => Ok(Source::GooglePlay),
            "AppleStore" => Ok(Source::AppleStore),
            "Twitter" => Ok(Source::Twitter),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        };
        f.write_str(s)
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment: {other}")),
        }
    }
}

/// One harvested review in the common ten-column schema. Twitter adds the
/// `author`/`retweets`/`replies` extras; other sources leave them None and
/// the writer omits those columns entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub content: String,
    pub score: Option<i64>,
    pub at: String,
    pub thumbs_up_count: i64,
    pub review_created_version: Option<String>,
    pub reply_content: Option<String>,
    pub replied_at: Option<String>,
    pub app_version: Option<String>,
    pub source: Source,
    pub author: Option<String>,
    pub retweets: Option<i64>,
    pub replies: Option<i64>,
}

impl Review {
    /// A bare record with every optional column null, the fallback when an
    /// upstream payload is missing fields.
    pub fn empty(review_id: String, source: Source) -> Self {
        Review {
            review_id,
            content: String::new(),
            score: None,
            at: String::new(),
            thumbs_up_count: 0,
            review_created_version: None,
            reply_content: None,
            replied_at: None,
            app_version: None,
            source,
            author: None,
            retweets: None,
            replies: None,
        }
    }
}

/// One row of the enriched dataset the dashboard consumes: the common schema
/// plus the upstream sentiment/topic labels, plus columns derived once at
/// load time (never recomputed per filter application).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrichedReview {
    #[serde(rename = "reviewId", default)]
    pub review_id: String,
    #[serde(default)]
    pub content: String,
    // pandas writes nullable integer columns as floats, so 4 arrives as "4.0"
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub at: String,
    #[serde(rename = "thumbsUpCount", default)]
    pub thumbs_up_count: Option<f64>,
    #[serde(rename = "reviewCreatedVersion", default)]
    pub review_created_version: Option<String>,
    #[serde(rename = "replyContent", default)]
    pub reply_content: Option<String>,
    #[serde(rename = "repliedAt", default)]
    pub replied_at: Option<String>,
    #[serde(rename = "appVersion", default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub ai_sentiment: Option<Sentiment>,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub dominant_topic: Option<i64>,
    #[serde(rename = "Topic_Label", default)]
    pub topic_label: Option<String>,

    #[serde(skip)]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(skip)]
    pub month_year: Option<String>,
    #[serde(skip)]
    pub year: Option<i32>,
    #[serde(skip)]
    pub month: Option<u32>,
    #[serde(skip)]
    pub week: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_round_trips_through_display() {
        for s in [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral] {
            assert_eq!(s.to_string().parse::<Sentiment>().unwrap(), s);
        }
    }

    #[test]
    fn sentiment_parse_is_case_insensitive() {
        assert_eq!("NEGATIVE".parse::<Sentiment>().unwrap(), Sentiment::Negative);
        assert!("meh".parse::<Sentiment>().is_err());
    }

    #[test]
    fn source_display_matches_csv_values() {
        assert_eq!(Source::GooglePlay.to_string(), "GooglePlay");
        assert_eq!(Source::AppleStore.to_string(), "AppleStore");
        assert_eq!(Source::Twitter.to_string(), "Twitter");
    }
}
