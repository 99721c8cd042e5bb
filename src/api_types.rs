use serde::Deserialize;

/* ------------------------- Apple customer-reviews feed --------------------- */

/// `entry` arrives as an array for a full page but as a bare object when the
/// feed holds a single review.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(x) => vec![x],
            OneOrMany::Many(xs) => xs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppleFeedDoc {
    pub feed: AppleFeed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppleFeed {
    #[serde(default)]
    pub entry: Option<OneOrMany<AppleEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppleLabel {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppleEntry {
    #[serde(default)]
    pub id: Option<AppleLabel>,
    #[serde(default)]
    pub content: Option<AppleLabel>,
    #[serde(rename = "im:rating", default)]
    pub rating: Option<AppleLabel>,
    #[serde(default)]
    pub updated: Option<AppleLabel>,
    #[serde(rename = "im:version", default)]
    pub version: Option<AppleLabel>,
}

impl AppleEntry {
    pub fn label(field: &Option<AppleLabel>) -> Option<String> {
        field.as_ref().and_then(|l| l.label.clone())
    }
}

/* ----------------------------- Twitter API v2 ------------------------------ */

#[derive(Debug, Clone, Deserialize)]
pub struct TweetSearchResponse {
    #[serde(default)]
    pub data: Option<Vec<ApiTweet>>,
    #[serde(default)]
    pub includes: Option<TweetIncludes>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTweet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>, // RFC3339
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<TweetMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetMetrics {
    #[serde(default)]
    pub retweet_count: i64,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub like_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetIncludes {
    #[serde(default)]
    pub users: Vec<ApiTwitterUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTwitterUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apple_entry_tolerates_single_object() {
        let doc: AppleFeedDoc = serde_json::from_str(
            r#"{"feed":{"entry":{"id":{"label":"1"},"content":{"label":"ok"},"im:rating":{"label":"5"}}}}"#,
        )
        .unwrap();
        let entries = doc.feed.entry.unwrap().into_vec();
        assert_eq!(entries.len(), 1);
        assert_eq!(AppleEntry::label(&entries[0].rating).as_deref(), Some("5"));
    }

    #[test]
    fn apple_feed_tolerates_missing_entry() {
        let doc: AppleFeedDoc = serde_json::from_str(r#"{"feed":{}}"#).unwrap();
        assert!(doc.feed.entry.is_none());
    }

    #[test]
    fn tweet_response_parses_metrics_and_users() {
        let resp: TweetSearchResponse = serde_json::from_str(
            r#"{"data":[{"id":"9","text":"gas late","author_id":"42",
                 "created_at":"2025-12-01T10:00:00Z",
                 "public_metrics":{"retweet_count":2,"reply_count":1,"like_count":7}}],
                "includes":{"users":[{"id":"42","username":"rahul_k"}]}}"#,
        )
        .unwrap();
        let tweets = resp.data.unwrap();
        assert_eq!(tweets[0].public_metrics.as_ref().unwrap().like_count, 7);
        assert_eq!(resp.includes.unwrap().users[0].username.as_deref(), Some("rahul_k"));
    }
}
