mod api_types;
mod apple;
mod charts;
mod csv_io;
mod deep_dive;
mod docx;
mod filter;
mod google;
mod keywords;
mod loader;
mod models;
mod pages;
mod synthetic;
mod theme;
mod twitter;

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use crate::filter::FilterSpec;
use crate::models::Sentiment;
use crate::pages::DashboardContext;
use crate::theme::Theme;

/// Review Pulse - VoC harvesting and analytics pipeline
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest the newest Google Play reviews into a timestamped CSV
    HarvestGoogle {
        #[arg(long, default_value = "com.cgt.bharatgas")]
        app_id: String,
        /// Desired review count (newest first)
        #[arg(long, default_value_t = 5000)]
        count: usize,
        #[arg(long, default_value = "en")]
        lang: String,
        #[arg(long, default_value = "in")]
        country: String,
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
    /// Harvest whatever the Apple customer-reviews feed exposes
    HarvestApple {
        /// Numeric store id (HelloBPCL by default)
        #[arg(long, default_value = "594797915")]
        app_id: String,
        #[arg(long, default_value = "in")]
        country: String,
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
    /// Harvest recent tweets across the brand queries (needs TWITTER_BEARER_TOKEN)
    HarvestTwitter {
        #[arg(long, default_value_t = 50)]
        count: usize,
        /// Override the built-in search queries (repeatable)
        #[arg(long)]
        query: Vec<String>,
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
    /// Pad a harvested CSV with templated synthetic reviews
    Synth {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 5000)]
        target: usize,
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
    /// Export the dashboard bundle (page view-models + filtered CSV)
    Export {
        #[arg(long, default_value = "df_final_enriched.csv")]
        data: PathBuf,
        #[arg(long, default_value = "topic_keywords.json")]
        keywords: PathBuf,
        #[arg(long, default_value = "confusion_matrix_data.json")]
        confusion: PathBuf,
        #[arg(long, default_value = "data/competitive_master_report.json")]
        report: PathBuf,
        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,
        /// light | dark
        #[arg(long, default_value = "light")]
        theme: String,
        /// Case-insensitive substring over review content
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        /// Positive | Negative | Neutral
        #[arg(long)]
        sentiment: Option<String>,
        #[arg(long)]
        min_rating: Option<f64>,
        #[arg(long)]
        max_rating: Option<f64>,
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Convert a Markdown report to a Word document
    Convert {
        input: PathBuf,
        /// Defaults to the input path with a .docx extension
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::HarvestGoogle { app_id, count, lang, country, out_dir } => {
            google::run(&app_id, &lang, &country, count, &out_dir).await?;
        }
        Command::HarvestApple { app_id, country, out_dir } => {
            apple::run(&app_id, &country, &out_dir).await?;
        }
        Command::HarvestTwitter { count, query, out_dir } => {
            let queries: Vec<String> = if query.is_empty() {
                twitter::DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
            } else {
                query
            };
            twitter::run(&queries, count, &out_dir).await?;
        }
        Command::Synth { input, target, out_dir } => {
            synthetic::run(&input, target, &out_dir)?;
        }
        Command::Export {
            data,
            keywords,
            confusion,
            report,
            out_dir,
            theme,
            search,
            version,
            topic,
            sentiment,
            min_rating,
            max_rating,
            from,
            to,
        } => {
            let theme = parse_theme(&theme)?;
            let spec = build_filter_spec(search, version, topic, sentiment, min_rating, max_rating, from, to)?;

            let mut store = loader::DataStore::new();
            let table = store.enriched(&data)?;
            let keyword_map = store.topic_keywords(&keywords);
            let confusion_data = store.confusion_matrix(&confusion);

            // The deep-dive tab degrades to a placeholder when the report is
            // missing; the rest of the bundle still exports.
            let deep_dive_value = match deep_dive::load_report(&report) {
                Ok(r) => serde_json::to_value(deep_dive::build_view(&r, &theme.palette()))?,
                Err(e) => {
                    warn!("Deep-dive unavailable - {:#}", e);
                    json!({ "available": false, "message": format!("{:#}", e) })
                }
            };

            let ctx = DashboardContext {
                table: &table,
                filter: &spec,
                keywords: &keyword_map,
                confusion: confusion_data.as_deref(),
                theme,
            };
            pages::export_bundle(&out_dir, &ctx, &deep_dive_value)?;
        }
        Command::Convert { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension("docx"));
            docx::run(&input, &output)?;
        }
    }

    info!("Done");
    Ok(())
}

fn parse_theme(raw: &str) -> Result<Theme> {
    match raw.to_ascii_lowercase().as_str() {
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        other => bail!("unknown theme '{}' (expected light or dark)", other),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_filter_spec(
    search: String,
    version: Option<String>,
    topic: Option<String>,
    sentiment: Option<String>,
    min_rating: Option<f64>,
    max_rating: Option<f64>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<FilterSpec> {
    let sentiment = match sentiment {
        Some(raw) => Some(raw.parse::<Sentiment>().map_err(|e| anyhow::anyhow!(e))?),
        None => None,
    };

    let rating = match (min_rating, max_rating) {
        (None, None) => None,
        (lo, hi) => Some((lo.unwrap_or(1.0), hi.unwrap_or(5.0))),
    };

    let date_range = match (from, to) {
        (None, None) => None,
        (Some(start), Some(end)) => Some((start, end)),
        _ => bail!("--from and --to must be given together"),
    };

    Ok(FilterSpec { search, version, date_range, topic, sentiment, rating })
}
