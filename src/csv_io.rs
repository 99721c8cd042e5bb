use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Asia::Kolkata;
use tracing::{debug, info};

use crate::models::{Review, Source};

/// The ten columns every harvester output carries, in order.
pub const COMMON_COLUMNS: [&str; 10] = [
    "reviewId",
    "content",
    "score",
    "at",
    "thumbsUpCount",
    "reviewCreatedVersion",
    "replyContent",
    "repliedAt",
    "appVersion",
    "source",
];

/// Extra columns appended by the Twitter harvester (and the synthetic
/// generator, which pads a Twitter capture).
pub const TWITTER_EXTRAS: [&str; 3] = ["author", "retweets", "replies"];

/// `YYYYMMDD_HHMM` stamp for harvester artifact names, anchored to IST so a
/// run is named for the local day it belongs to.
pub fn artifact_timestamp() -> String {
    Utc::now().with_timezone(&Kolkata).format("%Y%m%d_%H%M").to_string()
}

/// `YYYYMMDD_HHMMSS` stamp for dashboard CSV exports.
pub fn export_timestamp() -> String {
    Utc::now().with_timezone(&Kolkata).format("%Y%m%d_%H%M%S").to_string()
}

fn opt_str(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("")
}

fn opt_num<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(|n| n.to_string()).unwrap_or_default()
}

/// Write the full review set as one whole-file CSV. Nulls become empty
/// fields; the column set never shrinks below the common ten.
pub fn write_reviews(path: &Path, reviews: &[Review], with_extras: bool) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("create {}", path.display()))?;

    let mut header: Vec<&str> = COMMON_COLUMNS.to_vec();
    if with_extras {
        header.extend(TWITTER_EXTRAS);
    }
    wtr.write_record(&header)?;

    for r in reviews {
        let mut record: Vec<String> = vec![
            r.review_id.clone(),
            r.content.clone(),
            opt_num(&r.score),
            r.at.clone(),
            r.thumbs_up_count.to_string(),
            opt_str(&r.review_created_version).to_string(),
            opt_str(&r.reply_content).to_string(),
            opt_str(&r.replied_at).to_string(),
            opt_str(&r.app_version).to_string(),
            r.source.to_string(),
        ];
        if with_extras {
            record.push(opt_str(&r.author).to_string());
            record.push(opt_num(&r.retweets));
            record.push(opt_num(&r.replies));
        }
        wtr.write_record(&record)?;
    }

    wtr.flush().with_context(|| format!("flush {}", path.display()))?;
    info!("CSV written - path={}, rows={}", path.display(), reviews.len());
    Ok(())
}

/// Read a harvester CSV back into records, keyed by header name so column
/// order and optional extras do not matter.
pub fn read_reviews(path: &Path) -> Result<Vec<Review>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    let idx: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h, i))
        .collect();

    let col = |record: &csv::StringRecord, name: &str| -> Option<String> {
        idx.get(name)
            .and_then(|&i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    };

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let source = col(&record, "source")
            .and_then(|s| s.parse::<Source>().ok())
            .unwrap_or(Source::Twitter);
        out.push(Review {
            review_id: col(&record, "reviewId").unwrap_or_default(),
            content: col(&record, "content").unwrap_or_default(),
            score: col(&record, "score").and_then(|s| parse_score(&s)),
            at: col(&record, "at").unwrap_or_default(),
            thumbs_up_count: col(&record, "thumbsUpCount")
                .and_then(|s| parse_score(&s))
                .unwrap_or(0),
            review_created_version: col(&record, "reviewCreatedVersion"),
            reply_content: col(&record, "replyContent"),
            replied_at: col(&record, "repliedAt"),
            app_version: col(&record, "appVersion"),
            source,
            author: col(&record, "author"),
            retweets: col(&record, "retweets").and_then(|s| parse_score(&s)),
            replies: col(&record, "replies").and_then(|s| parse_score(&s)),
        });
    }

    debug!("CSV read - path={}, rows={}", path.display(), out.len());
    Ok(out)
}

// Accepts both "4" and the "4.0" pandas writes for nullable integers.
fn parse_score(s: &str) -> Option<i64> {
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
}
