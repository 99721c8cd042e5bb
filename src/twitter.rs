use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::api_types::TweetSearchResponse;
use crate::csv_io;
use crate::models::{Review, Source};

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const MAX_RESULTS_PER_QUERY: usize = 100;
const INTER_QUERY_DELAY_SECS: u64 = 5;
const RATE_LIMIT_BACKOFF_SECS: u64 = 60;

/// Brand search queries, mirrored from the monitoring setup.
pub const DEFAULT_QUERIES: [&str; 4] = ["@BPCLimited", "BharatGas", "HelloBPCL", "BPCL app"];

/// Read the bearer token, preferring a `.env` entry. Absence is a fatal
/// startup error reported before any network work begins.
pub fn bearer_token() -> Result<String> {
    dotenv::dotenv().ok();
    match std::env::var("TWITTER_BEARER_TOKEN") {
        Ok(t) if !t.trim().is_empty() => Ok(t),
        _ => bail!(
            "TWITTER_BEARER_TOKEN not found - add it to .env: TWITTER_BEARER_TOKEN=your_token_here"
        ),
    }
}

pub async fn run(queries: &[String], target: usize, out_dir: &str) -> Result<PathBuf> {
    let token = bearer_token()?;
    info!(
        "Twitter/X harvest started - target={}, queries={}",
        target,
        queries.join(", ")
    );

    let client = Client::builder().build()?;
    let tweets = harvest(&client, &token, queries, target).await?;

    let path = PathBuf::from(out_dir).join(format!(
        "reviews_twitter_{}_{}.csv",
        tweets.len(),
        csv_io::artifact_timestamp()
    ));
    csv_io::write_reviews(&path, &tweets, true)?;

    info!("Twitter harvest done - collected={}, path={}", tweets.len(), path.display());
    Ok(path)
}

pub async fn harvest(
    client: &Client,
    token: &str,
    queries: &[String],
    target: usize,
) -> Result<Vec<Review>> {
    let per_query = (target / queries.len().max(1)).max(1);
    let mut all: Vec<Review> = Vec::new();

    for (idx, query) in queries.iter().enumerate() {
        info!("Searching - query='{}'", query);

        match search_once(client, token, query, per_query).await {
            Ok(mut batch) => {
                if batch.is_empty() {
                    warn!("No tweets found - query='{}'", query);
                } else {
                    debug!("Query done - query='{}', found={}", query, batch.len());
                }
                all.append(&mut batch);
            }
            Err(e) => {
                // One fixed backoff-and-retry per rate-limit occurrence; any
                // other per-query error is logged and the loop continues.
                if is_rate_limited(&e) {
                    warn!("Rate limit hit - sleeping {}s before retrying", RATE_LIMIT_BACKOFF_SECS);
                    tokio::time::sleep(Duration::from_secs(RATE_LIMIT_BACKOFF_SECS)).await;
                    match search_once(client, token, query, per_query).await {
                        Ok(mut batch) => all.append(&mut batch),
                        Err(e) => warn!("Query failed after backoff - query='{}', error={:#}", query, e),
                    }
                } else {
                    warn!("Twitter API error - query='{}', error={:#}", query, e);
                }
            }
        }

        if idx < queries.len() - 1 {
            debug!("Waiting {}s before next query", INTER_QUERY_DELAY_SECS);
            tokio::time::sleep(Duration::from_secs(INTER_QUERY_DELAY_SECS)).await;
        }
    }

    if all.is_empty() {
        bail!("No tweets collected from Twitter/X across {} queries", queries.len());
    }

    let before = all.len();
    let deduped = dedup_by_id(all);
    if deduped.len() < before {
        debug!("Deduplicated - removed={}, retained={}", before - deduped.len(), deduped.len());
    }
    Ok(deduped)
}

async fn search_once(
    client: &Client,
    token: &str,
    query: &str,
    count: usize,
) -> Result<Vec<Review>> {
    let max_results = count.clamp(10, MAX_RESULTS_PER_QUERY).to_string();
    let resp = client
        .get(SEARCH_URL)
        .bearer_auth(token)
        .query(&[
            ("query", query),
            ("max_results", max_results.as_str()),
            ("tweet.fields", "created_at,public_metrics"),
            ("expansions", "author_id"),
            ("user.fields", "username"),
        ])
        .send()
        .await
        .with_context(|| format!("Request failed for query '{}'", query))?;

    if resp.status() == StatusCode::TOO_MANY_REQUESTS {
        bail!("429 Too Many Requests for query '{}'", query);
    }
    let resp = resp
        .error_for_status()
        .with_context(|| format!("HTTP error for query '{}'", query))?;

    let parsed: TweetSearchResponse = resp
        .json()
        .await
        .with_context(|| format!("Decoding JSON for query '{}'", query))?;
    Ok(reviews_from_response(parsed))
}

pub fn reviews_from_response(resp: TweetSearchResponse) -> Vec<Review> {
    let users: std::collections::HashMap<String, String> = resp
        .includes
        .map(|inc| {
            inc.users
                .into_iter()
                .filter_map(|u| u.username.map(|name| (u.id, name)))
                .collect()
        })
        .unwrap_or_default();

    resp.data
        .unwrap_or_default()
        .into_iter()
        .map(|t| {
            let metrics = t.public_metrics.unwrap_or_default();
            let author = t
                .author_id
                .as_ref()
                .and_then(|id| users.get(id).cloned())
                .unwrap_or_else(|| "Unknown".to_string());
            let mut r = Review::empty(t.id, Source::Twitter);
            r.content = t.text;
            // tweets carry no star rating; sentiment comes from enrichment
            r.score = None;
            r.at = t.created_at.unwrap_or_default();
            r.thumbs_up_count = metrics.like_count;
            r.author = Some(author);
            r.retweets = Some(metrics.retweet_count);
            r.replies = Some(metrics.reply_count);
            r
        })
        .collect()
}

fn is_rate_limited(e: &anyhow::Error) -> bool {
    format!("{:#}", e).contains("429")
}

fn dedup_by_id(reviews: Vec<Review>) -> Vec<Review> {
    let mut seen = HashSet::new();
    reviews
        .into_iter()
        .filter(|r| seen.insert(r.review_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(json: &str) -> TweetSearchResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn maps_tweets_into_the_common_schema() {
        let reviews = reviews_from_response(resp(
            r#"{"data":[{"id":"111","text":"cylinder late again","author_id":"7",
                 "created_at":"2025-12-10T09:00:00Z",
                 "public_metrics":{"retweet_count":4,"reply_count":2,"like_count":19}}],
                "includes":{"users":[{"id":"7","username":"priya"}]}}"#,
        ));
        assert_eq!(reviews.len(), 1);
        let r = &reviews[0];
        assert_eq!(r.review_id, "111");
        assert!(r.score.is_none());
        assert_eq!(r.thumbs_up_count, 19);
        assert_eq!(r.author.as_deref(), Some("priya"));
        assert_eq!(r.retweets, Some(4));
        assert_eq!(r.replies, Some(2));
    }

    #[test]
    fn unknown_author_when_user_lookup_misses() {
        let reviews = reviews_from_response(resp(
            r#"{"data":[{"id":"5","text":"ok","author_id":"99"}]}"#,
        ));
        assert_eq!(reviews[0].author.as_deref(), Some("Unknown"));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut a = Review::empty("dup".into(), Source::Twitter);
        a.content = "first".into();
        let mut b = Review::empty("dup".into(), Source::Twitter);
        b.content = "second".into();
        let out = dedup_by_id(vec![a, b, Review::empty("other".into(), Source::Twitter)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content, "first");
    }

    #[test]
    fn rate_limit_detection_matches_status_text() {
        let e = anyhow::anyhow!("429 Too Many Requests for query 'x'");
        assert!(is_rate_limited(&e));
        assert!(!is_rate_limited(&anyhow::anyhow!("boom")));
    }
}
