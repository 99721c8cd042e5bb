use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api_types::{AppleEntry, AppleFeedDoc};
use crate::csv_io;
use crate::models::{Review, Source};

// Apple caps the public customer-reviews feed at ten pages of fifty.
const MAX_FEED_PAGES: u32 = 10;

/// Harvest whatever the RSS feed exposes (its native cap, not the requested
/// target) and write the timestamped CSV. Bails without output when the feed
/// is empty or unreachable.
pub async fn run(app_id: &str, country: &str, out_dir: &str) -> Result<PathBuf> {
    info!("Apple App Store harvest started - app={}, country={}", app_id, country);
    info!("Note: Apple limits free feed access to the most recent few hundred reviews");

    let client = Client::builder().build()?;
    let reviews = harvest(&client, app_id, country).await?;

    let path = PathBuf::from(out_dir).join(format!(
        "reviews_apple_{}_{}.csv",
        reviews.len(),
        csv_io::artifact_timestamp()
    ));
    csv_io::write_reviews(&path, &reviews, false)?;

    info!("Apple harvest done - collected={}, path={}", reviews.len(), path.display());
    Ok(path)
}

pub async fn harvest(client: &Client, app_id: &str, country: &str) -> Result<Vec<Review>> {
    let mut reviews = Vec::new();

    for page in 1..=MAX_FEED_PAGES {
        let url = format!(
            "https://itunes.apple.com/{}/rss/customerreviews/id/{}/sortBy=mostRecent/page={}/json",
            country, app_id, page
        );
        debug!("Fetching feed page - page={}", page);

        let resp = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?
            .error_for_status()
            .with_context(|| format!("HTTP error for {}", url))?;

        let doc: AppleFeedDoc = resp
            .json()
            .await
            .with_context(|| format!("Decoding JSON for {}", url))?;

        let entries = match doc.feed.entry {
            Some(e) => e.into_vec(),
            None => {
                debug!("Feed exhausted - page={}", page);
                break;
            }
        };
        if entries.is_empty() {
            break;
        }

        let before = reviews.len();
        for entry in &entries {
            if let Some(r) = review_from_entry(entry) {
                reviews.push(r);
            }
        }
        debug!("Feed page parsed - page={}, kept={}", page, reviews.len() - before);
    }

    if reviews.is_empty() {
        warn!("No reviews found - the Apple RSS feed may be unavailable or empty");
        bail!("Failed to fetch reviews from the Apple App Store feed for {}", app_id);
    }
    Ok(reviews)
}

/// Metadata entries (the app's own feed header) carry no review id and are
/// skipped.
fn review_from_entry(entry: &AppleEntry) -> Option<Review> {
    let id = AppleEntry::label(&entry.id)?;

    let mut r = Review::empty(id, Source::AppleStore);
    r.content = AppleEntry::label(&entry.content).unwrap_or_default();
    r.score = AppleEntry::label(&entry.rating).and_then(|s| s.parse::<i64>().ok());
    r.at = AppleEntry::label(&entry.updated).unwrap_or_default();
    r.review_created_version = AppleEntry::label(&entry.version);
    Some(r)
}
