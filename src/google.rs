use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::csv_io;
use crate::models::{Review, Source};

// The Play Store UI has no public reviews REST API; reviews come from the
// same internal batchexecute RPC the store frontend issues.
const BATCHEXECUTE_URL: &str = "https://play.google.com/_/PlayStoreUi/data/batchexecute";
const RPC_ID: &str = "UsvDTd";
const SORT_NEWEST: u8 = 2;
const MAX_PER_FETCH: usize = 199;

/// Harvest up to `target` newest reviews for `app_id`, then write the
/// timestamped CSV into `out_dir`. Fails without writing anything if the API
/// yields zero rows.
pub async fn run(app_id: &str, lang: &str, country: &str, target: usize, out_dir: &str) -> Result<PathBuf> {
    info!("Google Play harvest started - app={}, target={}", app_id, target);

    let client = Client::builder().build()?;
    let reviews = harvest(&client, app_id, lang, country, target).await?;

    let path = PathBuf::from(out_dir)
        .join(format!("reviews_google_10k_{}.csv", csv_io::artifact_timestamp()));
    csv_io::write_reviews(&path, &reviews, false)?;

    info!("Google Play harvest done - collected={}, path={}", reviews.len(), path.display());
    Ok(path)
}

pub async fn harvest(
    client: &Client,
    app_id: &str,
    lang: &str,
    country: &str,
    target: usize,
) -> Result<Vec<Review>> {
    let mut collected: Vec<Review> = Vec::with_capacity(target);
    let mut token: Option<String> = None;

    loop {
        let batch_size = MAX_PER_FETCH.min(target - collected.len());
        let body = rpc_body(app_id, SORT_NEWEST, batch_size, token.as_deref());
        let url = format!("{}?hl={}&gl={}", BATCHEXECUTE_URL, lang, country);

        debug!("Fetching review batch - size={}, paged={}", batch_size, token.is_some());
        let resp = client
            .post(&url)
            .form(&[("f.req", body.as_str())])
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?
            .error_for_status()
            .with_context(|| format!("HTTP error for {}", url))?;

        let raw = resp.text().await.context("Reading batchexecute body")?;
        let (batch, next) = parse_batch(&raw).context("Decoding batchexecute payload")?;

        if batch.is_empty() && collected.is_empty() {
            bail!("No reviews returned from Google Play API for {}", app_id);
        }
        let got = batch.len();
        collected.extend(batch);
        debug!("Batch parsed - got={}, total={}", got, collected.len());

        token = next;
        if collected.len() >= target || token.is_none() || got == 0 {
            break;
        }
    }

    collected.truncate(target);
    if collected.len() < target {
        warn!("Store returned fewer reviews than requested - got={}, wanted={}", collected.len(), target);
    }
    Ok(collected)
}

fn rpc_body(app_id: &str, sort: u8, count: usize, token: Option<&str>) -> String {
    let token_json = match token {
        Some(t) => format!("\\\"{}\\\"", t),
        None => "null".to_string(),
    };
    format!(
        "[[[\"{rpc}\",\"[null,null,[2,{sort},[{count},null,{token}],null,[]],[\\\"{app}\\\",7]]\",null,\"generic\"]]]",
        rpc = RPC_ID,
        sort = sort,
        count = count,
        token = token_json,
        app = app_id,
    )
}

/// The envelope is an anti-XSSI-prefixed JSON array whose `[0][2]` element is
/// itself a JSON string holding `[reviews, [_, continuation_token]]`.
fn parse_batch(raw: &str) -> Result<(Vec<Review>, Option<String>)> {
    let stripped = raw.trim_start_matches(")]}'").trim_start();
    let outer: Value = serde_json::from_str(stripped).context("outer envelope")?;

    let inner_str = outer
        .get(0)
        .and_then(|v| v.get(2))
        .and_then(Value::as_str)
        .context("missing payload string at [0][2]")?;
    let inner: Value = serde_json::from_str(inner_str).context("inner payload")?;

    let reviews = inner
        .get(0)
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(review_from_row).collect())
        .unwrap_or_default();

    let token = inner
        .get(1)
        .and_then(|v| v.get(1))
        .and_then(Value::as_str)
        .map(String::from);

    Ok((reviews, token))
}

// Field positions in a review row, as rendered by the store frontend. Any
// missing position maps to null so schema drift never drops a column.
fn review_from_row(row: &Value) -> Review {
    let review_id = pluck(row, &[0])
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let mut r = Review::empty(review_id, Source::GooglePlay);

    if let Some(content) = pluck(row, &[4]).and_then(Value::as_str) {
        r.content = content.to_string();
    }
    r.score = pluck(row, &[2]).and_then(Value::as_i64);
    if let Some(secs) = pluck(row, &[5, 0]).and_then(Value::as_i64) {
        r.at = format_epoch(secs);
    }
    r.thumbs_up_count = pluck(row, &[6]).and_then(Value::as_i64).unwrap_or(0);
    r.review_created_version = pluck(row, &[10]).and_then(Value::as_str).map(String::from);
    r.reply_content = pluck(row, &[7, 1]).and_then(Value::as_str).map(String::from);
    r.replied_at = pluck(row, &[7, 2, 0]).and_then(Value::as_i64).map(format_epoch);
    r.app_version = pluck(row, &[10]).and_then(Value::as_str).map(String::from);
    r
}

fn pluck<'a>(v: &'a Value, path: &[usize]) -> Option<&'a Value> {
    let mut cur = v;
    for &i in path {
        cur = cur.get(i)?;
        if cur.is_null() {
            return None;
        }
    }
    Some(cur)
}

fn format_epoch(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(inner: &str) -> String {
        let envelope = serde_json::json!([["wrb.fr", "UsvDTd", inner, null, null, "generic"]]);
        format!(")]}}'\n\n{}", envelope)
    }

    #[test]
    fn parses_rows_and_token() {
        let inner = serde_json::json!([
            [
                [
                    "gp:abc",
                    ["Asha", null],
                    5,
                    null,
                    "works fine after update",
                    [1764600000, 0],
                    12,
                    [null, "thanks for the feedback", [1764700000, 0]],
                    null,
                    null,
                    "6.2.1"
                ]
            ],
            [null, "TOKEN123"]
        ])
        .to_string();

        let (reviews, token) = parse_batch(&wrap(&inner)).unwrap();
        assert_eq!(reviews.len(), 1);
        let r = &reviews[0];
        assert_eq!(r.review_id, "gp:abc");
        assert_eq!(r.score, Some(5));
        assert_eq!(r.content, "works fine after update");
        assert_eq!(r.thumbs_up_count, 12);
        assert_eq!(r.app_version.as_deref(), Some("6.2.1"));
        assert_eq!(r.reply_content.as_deref(), Some("thanks for the feedback"));
        assert!(r.at.starts_with("2025-"));
        assert_eq!(token.as_deref(), Some("TOKEN123"));
    }

    #[test]
    fn missing_fields_become_null_not_errors() {
        let inner = serde_json::json!([[["gp:xyz"]], [null, null]]).to_string();
        let (reviews, token) = parse_batch(&wrap(&inner)).unwrap();
        assert_eq!(reviews.len(), 1);
        let r = &reviews[0];
        assert_eq!(r.review_id, "gp:xyz");
        assert!(r.score.is_none());
        assert!(r.app_version.is_none());
        assert_eq!(r.thumbs_up_count, 0);
        assert!(token.is_none());
    }

    #[test]
    fn rpc_body_embeds_token_when_paging() {
        let first = rpc_body("com.cgt.bharatgas", SORT_NEWEST, 199, None);
        assert!(first.contains("null,null]"));
        let paged = rpc_body("com.cgt.bharatgas", SORT_NEWEST, 199, Some("TK"));
        assert!(paged.contains("TK"));
    }
}
