// src/pages.rs
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::charts::{
    build_confusion_heatmap, build_daily_sentiment, build_density, build_gauge,
    build_keyword_comparison, build_negative_topic_trends, build_root_cause_heatmap,
    build_sentiment_pie, build_sentiment_topic_heatmap, build_topic_bar, build_violin,
    sentiment_counts, version_sort_key, BarSpec, GaugeSpec, HeatmapSpec, HistogramSpec,
    KeywordComparisonSpec, LineSpec, PieSpec, ViolinSpec,
};
use crate::csv_io;
use crate::filter::FilterSpec;
use crate::keywords::{format_topic_label, top_keywords, TopicKeywords};
use crate::loader::ConfusionMatrixData;
use crate::models::{EnrichedReview, Sentiment};
use crate::theme::Theme;

/* -------------------------------------------------------------------------- */
/* Navigation                                                                 */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Tab {
    #[default]
    InternalPulse,
    MarketBattleground,
    StrategicDeepDive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PulsePage {
    #[default]
    Overview,
    Topics,
    Sentiment,
    Aspects,
    Explorer,
}

/// Top-level tab plus the Internal Pulse page selection. Transitions happen
/// only on user input; every transition triggers a full recomputation of the
/// active page from current filter state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation {
    pub tab: Tab,
    pub page: PulsePage,
}

impl Navigation {
    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Picking a pulse page implies the Internal Pulse tab.
    pub fn select_page(&mut self, page: PulsePage) {
        self.tab = Tab::InternalPulse;
        self.page = page;
    }
}

/* -------------------------------------------------------------------------- */
/* View models                                                                */
/* -------------------------------------------------------------------------- */

// A None chart means "required column absent in the current view"; the
// frontend renders an informational placeholder in its slot.

#[derive(Debug, Clone, Serialize)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SidebarStats {
    pub total_reviews: usize,
    pub filtered_reviews: usize,
    pub coverage_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewView {
    pub metrics: Vec<MetricCard>,
    pub gauge: GaugeSpec,
    pub sentiment_pie: Option<PieSpec>,
    pub timeline: Option<LineSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicDeepDive {
    pub topic: String,
    pub display: String,
    pub reviews: usize,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub top_keywords: Vec<(String, u32)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicsView {
    pub topic_bar: Option<BarSpec>,
    pub heatmap: Option<HeatmapSpec>,
    pub deep_dives: Vec<TopicDeepDive>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentView {
    pub violin: Option<ViolinSpec>,
    pub sentiment_density: Option<HistogramSpec>,
    pub rating_density: Option<HistogramSpec>,
    pub keyword_comparison: Option<KeywordComparisonSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelIntegrity {
    pub heatmap: HeatmapSpec,
    pub accuracy: f64,
    pub match_rate: f64,
    pub per_class: Vec<ClassReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AspectsView {
    pub root_cause: Option<HeatmapSpec>,
    pub topic_trends: Option<LineSpec>,
    pub model_integrity: Option<ModelIntegrity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortKey {
    #[default]
    LatestFirst,
    OldestFirst,
    HighestRating,
    LowestRating,
    MostPositive,
    MostNegative,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewEntry {
    pub review_id: String,
    pub content: String,
    pub rating: Option<f64>,
    pub sentiment: Option<Sentiment>,
    pub confidence: f64,
    pub topic: String,
    pub version: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplorerView {
    pub total: usize,
    pub sort_by: SortKey,
    pub entries: Vec<ReviewEntry>,
    pub stats: Vec<MetricCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceBreakdown {
    pub source: String,
    pub reviews: u64,
    pub avg_rating: Option<f64>,
    pub negative: u64,
    pub neutral: u64,
    pub positive: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattlegroundView {
    pub breakdown: Vec<SourceBreakdown>,
    pub share: Option<PieSpec>,
    pub avg_rating_bar: Option<BarSpec>,
}

/* -------------------------------------------------------------------------- */
/* Composition context                                                        */
/* -------------------------------------------------------------------------- */

pub struct DashboardContext<'a> {
    pub table: &'a [EnrichedReview],
    pub filter: &'a FilterSpec,
    pub keywords: &'a TopicKeywords,
    pub confusion: Option<&'a ConfusionMatrixData>,
    pub theme: Theme,
}

impl<'a> DashboardContext<'a> {
    pub fn filtered(&self) -> Vec<&'a EnrichedReview> {
        self.filter.apply(self.table)
    }

    pub fn sidebar_stats(&self, filtered: usize) -> SidebarStats {
        let total = self.table.len();
        SidebarStats {
            total_reviews: total,
            filtered_reviews: filtered,
            coverage_pct: if total > 0 { filtered as f64 / total as f64 * 100.0 } else { 0.0 },
        }
    }

    /// Distinct app versions in the full table, numerically sorted, for the
    /// sidebar's version selector.
    pub fn version_options(&self) -> Vec<String> {
        let mut versions: Vec<String> = self
            .table
            .iter()
            .filter_map(|r| r.app_version.clone())
            .collect();
        versions.sort();
        versions.dedup();
        versions.sort_by_key(|v| version_sort_key(v));
        versions
    }
}

/* -------------------------------------------------------------------------- */
/* Page builders                                                              */
/* -------------------------------------------------------------------------- */

fn thousands(n: u64) -> String {
    let raw = n.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0u64;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

pub fn build_overview(ctx: &DashboardContext) -> OverviewView {
    let palette = ctx.theme.palette();
    let filtered = ctx.filtered();
    let total = filtered.len();

    let avg_sentiment = mean(filtered.iter().filter_map(|r| r.sentiment_score)).unwrap_or(0.0);
    let [neg, neu, pos] = sentiment_counts(&filtered);
    let pct = |n: u64| if total > 0 { n as f64 / total as f64 * 100.0 } else { 0.0 };

    let metrics = vec![
        MetricCard {
            label: "Avg Sentiment".to_string(),
            value: format!("{:.3}", avg_sentiment),
            delta: Some(if avg_sentiment > 0.0 { "Positive" } else { "Negative" }.to_string()),
        },
        MetricCard {
            label: "Negative".to_string(),
            value: thousands(neg),
            delta: Some(format!("{:.1}%", pct(neg))),
        },
        MetricCard {
            label: "Positive".to_string(),
            value: thousands(pos),
            delta: Some(format!("{:.1}%", pct(pos))),
        },
        MetricCard {
            label: "Neutral".to_string(),
            value: thousands(neu),
            delta: Some(format!("{:.1}%", pct(neu))),
        },
    ];

    OverviewView {
        metrics,
        gauge: build_gauge(avg_sentiment, "Sentiment Score", &palette),
        sentiment_pie: build_sentiment_pie(&filtered, &palette),
        timeline: build_daily_sentiment(&filtered, &palette),
    }
}

pub fn build_topics(ctx: &DashboardContext) -> TopicsView {
    let palette = ctx.theme.palette();
    let filtered = ctx.filtered();

    let mut topics: Vec<String> = filtered
        .iter()
        .filter_map(|r| r.topic_label.clone())
        .collect();
    topics.sort();
    topics.dedup();

    let deep_dives = topics
        .iter()
        .map(|topic| {
            let topic_rows: Vec<&&EnrichedReview> = filtered
                .iter()
                .filter(|r| r.topic_label.as_deref() == Some(topic.as_str()))
                .collect();
            let n = topic_rows.len().max(1);
            let pos = topic_rows
                .iter()
                .filter(|r| r.ai_sentiment == Some(Sentiment::Positive))
                .count();
            let neg = topic_rows
                .iter()
                .filter(|r| r.ai_sentiment == Some(Sentiment::Negative))
                .count();
            let texts: Vec<&str> = topic_rows.iter().map(|r| r.content.as_str()).collect();
            TopicDeepDive {
                topic: topic.clone(),
                display: format_topic_label(Some(topic), ctx.keywords),
                reviews: topic_rows.len(),
                positive_pct: pos as f64 / n as f64 * 100.0,
                negative_pct: neg as f64 / n as f64 * 100.0,
                top_keywords: top_keywords(&texts, 15),
            }
        })
        .collect();

    TopicsView {
        topic_bar: build_topic_bar(&filtered, &palette),
        heatmap: build_sentiment_topic_heatmap(&filtered, &palette),
        deep_dives,
    }
}

pub fn build_sentiment(ctx: &DashboardContext) -> SentimentView {
    let palette = ctx.theme.palette();
    let filtered = ctx.filtered();

    SentimentView {
        violin: build_violin(&filtered, "Rating Distribution by Sentiment", &palette),
        sentiment_density: build_density(
            &filtered,
            |r| r.sentiment_score,
            "Sentiment Score Density",
            &palette,
        ),
        rating_density: build_density(&filtered, |r| r.score, "Rating Density", &palette),
        keyword_comparison: build_keyword_comparison(&filtered, &palette),
    }
}

pub fn build_aspects(ctx: &DashboardContext) -> AspectsView {
    let palette = ctx.theme.palette();
    let filtered = ctx.filtered();

    let model_integrity = ctx.confusion.map(|cm| {
        let per_class = ["Negative", "Neutral", "Positive"]
            .iter()
            .filter_map(|label| {
                let entry = cm.classification_report.get(&label.to_lowercase())?;
                Some(ClassReport {
                    label: label.to_string(),
                    precision: entry.get("precision").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    recall: entry.get("recall").and_then(|v| v.as_f64()).unwrap_or(0.0),
                })
            })
            .collect();
        ModelIntegrity {
            heatmap: build_confusion_heatmap(cm, &palette),
            accuracy: cm.accuracy,
            match_rate: cm.match_rate,
            per_class,
        }
    });

    AspectsView {
        root_cause: build_root_cause_heatmap(&filtered, &palette),
        topic_trends: build_negative_topic_trends(&filtered, ctx.keywords, &palette),
        model_integrity,
    }
}

pub fn build_explorer(ctx: &DashboardContext, sort_by: SortKey, display_count: usize) -> ExplorerView {
    let filtered = ctx.filtered();
    let total = filtered.len();
    let display_count = display_count.clamp(1, 100);

    let mut sorted = filtered.clone();
    sort_reviews(&mut sorted, sort_by);

    let entries = sorted
        .iter()
        .take(display_count)
        .map(|r| ReviewEntry {
            review_id: r.review_id.clone(),
            content: r.content.clone(),
            rating: r.score,
            sentiment: r.ai_sentiment,
            confidence: r.ai_confidence.unwrap_or(0.0),
            topic: format_topic_label(r.topic_label.as_deref(), ctx.keywords),
            version: r.app_version.clone(),
            date: r.timestamp.map(|t| t.to_string()),
        })
        .collect();

    let avg_rating = mean(filtered.iter().filter_map(|r| r.score));
    let avg_sentiment = mean(filtered.iter().filter_map(|r| r.sentiment_score));
    let [neg, neu, pos] = sentiment_counts(&filtered);
    let pct = |n: u64| if total > 0 { n as f64 / total as f64 * 100.0 } else { 0.0 };
    let fmt_opt = |v: Option<f64>, digits: usize| match v {
        Some(x) => format!("{:.*}", digits, x),
        None => "N/A".to_string(),
    };

    let stats = vec![
        MetricCard { label: "Total Reviews".into(), value: thousands(total as u64), delta: None },
        MetricCard { label: "Avg Rating".into(), value: fmt_opt(avg_rating, 2), delta: None },
        MetricCard { label: "Avg Sentiment".into(), value: fmt_opt(avg_sentiment, 3), delta: None },
        MetricCard { label: "Positive %".into(), value: format!("{:.1}%", pct(pos)), delta: None },
        MetricCard { label: "Negative %".into(), value: format!("{:.1}%", pct(neg)), delta: None },
        MetricCard { label: "Neutral %".into(), value: format!("{:.1}%", pct(neu)), delta: None },
    ];

    ExplorerView { total, sort_by, entries, stats }
}

/// Stable sort of the current view; rows missing the sort value go last.
pub fn sort_reviews(rows: &mut [&EnrichedReview], key: SortKey) {
    let by_f64 = |v: Option<f64>, descending: bool| -> (bool, i64) {
        // missing-last, then the value as orderable bits
        let missing = v.is_none();
        let raw = v.unwrap_or(0.0);
        let signed = if descending { -raw } else { raw };
        (missing, (signed * 1e9) as i64)
    };

    match key {
        SortKey::LatestFirst => rows.sort_by_key(|r| (r.timestamp.is_none(), std::cmp::Reverse(r.timestamp))),
        SortKey::OldestFirst => rows.sort_by_key(|r| (r.timestamp.is_none(), r.timestamp)),
        SortKey::HighestRating => rows.sort_by_key(|r| by_f64(r.score, true)),
        SortKey::LowestRating => rows.sort_by_key(|r| by_f64(r.score, false)),
        SortKey::MostPositive => rows.sort_by_key(|r| by_f64(r.sentiment_score, true)),
        SortKey::MostNegative => rows.sort_by_key(|r| by_f64(r.sentiment_score, false)),
    }
}

pub fn build_battleground(ctx: &DashboardContext) -> BattlegroundView {
    let palette = ctx.theme.palette();
    let filtered = ctx.filtered();

    let mut breakdown: Vec<SourceBreakdown> = Vec::new();
    for source in [crate::models::Source::GooglePlay, crate::models::Source::AppleStore, crate::models::Source::Twitter] {
        let rows: Vec<&&EnrichedReview> =
            filtered.iter().filter(|r| r.source == Some(source)).collect();
        if rows.is_empty() {
            continue;
        }
        let as_refs: Vec<&EnrichedReview> = rows.iter().map(|r| **r).collect();
        let [neg, neu, pos] = sentiment_counts(&as_refs);
        breakdown.push(SourceBreakdown {
            source: source.to_string(),
            reviews: rows.len() as u64,
            avg_rating: mean(rows.iter().filter_map(|r| r.score)),
            negative: neg,
            neutral: neu,
            positive: pos,
        });
    }

    let share = if breakdown.is_empty() {
        None
    } else {
        let source_colors = [palette.accent, palette.neutral, palette.positive];
        Some(PieSpec {
            title: "Share of Voice by Source".to_string(),
            labels: breakdown.iter().map(|b| b.source.clone()).collect(),
            values: breakdown.iter().map(|b| b.reviews).collect(),
            colors: source_colors.iter().copied().take(breakdown.len()).collect(),
            style: crate::charts::chart_style(350, &palette),
        })
    };

    let rated: Vec<&SourceBreakdown> = breakdown.iter().filter(|b| b.avg_rating.is_some()).collect();
    let avg_rating_bar = if rated.is_empty() {
        None
    } else {
        Some(BarSpec {
            title: "Average Rating by Source".to_string(),
            orientation: "v",
            labels: rated.iter().map(|b| b.source.clone()).collect(),
            values: rated.iter().map(|b| b.avg_rating.unwrap_or(0.0)).collect(),
            color: palette.accent,
            style: crate::charts::chart_style(300, &palette),
        })
    };

    BattlegroundView { breakdown, share, avg_rating_bar }
}

/* -------------------------------------------------------------------------- */
/* Routing & bundle export                                                    */
/* -------------------------------------------------------------------------- */

/// Render the page the navigation currently points at. Every call is a full
/// recomputation from (table, filter, theme); nothing is cached between
/// transitions.
pub fn render(
    nav: Navigation,
    ctx: &DashboardContext,
    deep_dive: &serde_json::Value,
) -> Result<serde_json::Value> {
    let value = match nav.tab {
        Tab::MarketBattleground => serde_json::to_value(build_battleground(ctx))?,
        Tab::StrategicDeepDive => deep_dive.clone(),
        Tab::InternalPulse => match nav.page {
            PulsePage::Overview => serde_json::to_value(build_overview(ctx))?,
            PulsePage::Topics => serde_json::to_value(build_topics(ctx))?,
            PulsePage::Sentiment => serde_json::to_value(build_sentiment(ctx))?,
            PulsePage::Aspects => serde_json::to_value(build_aspects(ctx))?,
            PulsePage::Explorer => {
                serde_json::to_value(build_explorer(ctx, SortKey::default(), 10))?
            }
        },
    };
    Ok(value)
}

/// Write the full dashboard bundle: one JSON per page plus `index.json`,
/// and the filtered-data CSV export.
pub fn export_bundle(
    out_dir: &Path,
    ctx: &DashboardContext,
    deep_dive: &serde_json::Value,
) -> Result<()> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("create {:?}", out_dir))?;

    let filtered = ctx.filtered();
    let stats = ctx.sidebar_stats(filtered.len());
    debug!(
        "Export - filtered={}/{} rows ({:.1}%)",
        stats.filtered_reviews, stats.total_reviews, stats.coverage_pct
    );

    let mut nav = Navigation::default();
    for (page, file) in [
        (PulsePage::Overview, "pulse.overview.json"),
        (PulsePage::Topics, "pulse.topics.json"),
        (PulsePage::Sentiment, "pulse.sentiment.json"),
        (PulsePage::Aspects, "pulse.aspects.json"),
        (PulsePage::Explorer, "pulse.explorer.json"),
    ] {
        nav.select_page(page);
        write_json(out_dir.join(file), &render(nav, ctx, deep_dive)?)?;
    }

    nav.select_tab(Tab::MarketBattleground);
    write_json(out_dir.join("battleground.json"), &render(nav, ctx, deep_dive)?)?;

    nav.select_tab(Tab::StrategicDeepDive);
    write_json(out_dir.join("deepdive.json"), &render(nav, ctx, deep_dive)?)?;

    let csv_name = format!("bpcl_reviews_{}.csv", csv_io::export_timestamp());
    export_filtered_csv(&out_dir.join(&csv_name), &filtered)?;

    let idx = json!({
        "theme": ctx.theme,
        "stats": stats,
        "version_options": ctx.version_options(),
        "files": [
            "pulse.overview.json",
            "pulse.topics.json",
            "pulse.sentiment.json",
            "pulse.aspects.json",
            "pulse.explorer.json",
            "battleground.json",
            "deepdive.json",
            csv_name,
        ],
    });
    write_json(out_dir.join("index.json"), &idx)?;

    info!("Dashboard bundle written - dir={}", out_dir.display());
    Ok(())
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    std::fs::write(path.as_ref(), serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("write {}", path.as_ref().display()))
}

/// The filtered view in the enriched fifteen-column layout.
pub fn export_filtered_csv(path: &Path, rows: &[&EnrichedReview]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.write_record([
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
        "sentiment_score",
        "ai_sentiment",
        "ai_confidence",
        "dominant_topic",
        "Topic_Label",
    ])?;

    let num = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for r in rows {
        wtr.write_record([
            r.review_id.clone(),
            r.content.clone(),
            num(r.score),
            r.at.clone(),
            num(r.thumbs_up_count),
            r.review_created_version.clone().unwrap_or_default(),
            r.reply_content.clone().unwrap_or_default(),
            r.replied_at.clone().unwrap_or_default(),
            r.app_version.clone().unwrap_or_default(),
            r.source.map(|s| s.to_string()).unwrap_or_default(),
            num(r.sentiment_score),
            r.ai_sentiment.map(|s| s.to_string()).unwrap_or_default(),
            num(r.ai_confidence),
            r.dominant_topic.map(|t| t.to_string()).unwrap_or_default(),
            r.topic_label.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    info!("Filtered data exported - path={}, rows={}", path.display(), rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::default_topic_keywords;
    use crate::models::Source;
    use chrono::NaiveDateTime;

    fn table() -> Vec<EnrichedReview> {
        let mk = |id: &str, sentiment, score, sscore, topic: &str, source, day: u32| EnrichedReview {
            review_id: id.to_string(),
            content: format!("review {} login otp issue", id),
            ai_sentiment: Some(sentiment),
            score: Some(score),
            sentiment_score: Some(sscore),
            topic_label: Some(topic.to_string()),
            app_version: Some("2.1".to_string()),
            source: Some(source),
            timestamp: NaiveDateTime::parse_from_str(
                &format!("2025-06-{:02} 10:00:00", day),
                "%Y-%m-%d %H:%M:%S",
            )
            .ok(),
            month_year: Some("2025-06".to_string()),
            ..Default::default()
        };
        vec![
            mk("a", Sentiment::Negative, 1.0, -0.8, "Topic 1", Source::GooglePlay, 1),
            mk("b", Sentiment::Negative, 2.0, -0.4, "Topic 1", Source::GooglePlay, 2),
            mk("c", Sentiment::Positive, 5.0, 0.9, "Topic 2", Source::AppleStore, 3),
            mk("d", Sentiment::Neutral, 3.0, 0.0, "Topic 2", Source::Twitter, 4),
        ]
    }

    fn ctx<'a>(table: &'a [EnrichedReview], filter: &'a FilterSpec, kw: &'a TopicKeywords) -> DashboardContext<'a> {
        DashboardContext {
            table,
            filter,
            keywords: kw,
            confusion: None,
            theme: Theme::Light,
        }
    }

    #[test]
    fn navigation_defaults_to_overview_and_page_selection_implies_pulse() {
        let mut nav = Navigation::default();
        assert_eq!(nav.tab, Tab::InternalPulse);
        assert_eq!(nav.page, PulsePage::Overview);

        nav.select_tab(Tab::StrategicDeepDive);
        assert_eq!(nav.tab, Tab::StrategicDeepDive);

        nav.select_page(PulsePage::Explorer);
        assert_eq!(nav.tab, Tab::InternalPulse);
        assert_eq!(nav.page, PulsePage::Explorer);
    }

    #[test]
    fn overview_metrics_count_sentiments() {
        let rows = table();
        let filter = FilterSpec::default();
        let kw = default_topic_keywords();
        let view = build_overview(&ctx(&rows, &filter, &kw));
        assert_eq!(view.metrics[1].value, "2"); // negative
        assert_eq!(view.metrics[1].delta.as_deref(), Some("50.0%"));
        assert!(view.sentiment_pie.is_some());
        assert!(view.timeline.is_some());
    }

    #[test]
    fn explorer_sorting_and_clamping() {
        let rows = table();
        let filter = FilterSpec::default();
        let kw = default_topic_keywords();
        let c = ctx(&rows, &filter, &kw);

        let latest = build_explorer(&c, SortKey::LatestFirst, 2);
        assert_eq!(latest.entries.len(), 2);
        assert_eq!(latest.entries[0].review_id, "d");

        let most_negative = build_explorer(&c, SortKey::MostNegative, 10);
        assert_eq!(most_negative.entries[0].review_id, "a");

        let highest = build_explorer(&c, SortKey::HighestRating, 0); // clamps to 1
        assert_eq!(highest.entries.len(), 1);
        assert_eq!(highest.entries[0].review_id, "c");
    }

    #[test]
    fn topic_deep_dives_compute_per_topic_shares() {
        let rows = table();
        let filter = FilterSpec::default();
        let kw = default_topic_keywords();
        let view = build_topics(&ctx(&rows, &filter, &kw));
        let t1 = view.deep_dives.iter().find(|d| d.topic == "Topic 1").unwrap();
        assert_eq!(t1.reviews, 2);
        assert_eq!(t1.negative_pct, 100.0);
        assert_eq!(t1.positive_pct, 0.0);
        assert!(t1.display.starts_with("Topic 1 ("));
    }

    #[test]
    fn battleground_breaks_down_by_source() {
        let rows = table();
        let filter = FilterSpec::default();
        let kw = default_topic_keywords();
        let view = build_battleground(&ctx(&rows, &filter, &kw));
        assert_eq!(view.breakdown.len(), 3);
        let gp = view.breakdown.iter().find(|b| b.source == "GooglePlay").unwrap();
        assert_eq!(gp.reviews, 2);
        assert_eq!(gp.negative, 2);
        assert!(view.share.is_some());
    }

    #[test]
    fn bundle_export_writes_every_page_file() {
        let dir = tempfile::tempdir().unwrap();
        let rows = table();
        let filter = FilterSpec { version: Some("2.1".into()), ..Default::default() };
        let kw = default_topic_keywords();
        let c = ctx(&rows, &filter, &kw);

        export_bundle(dir.path(), &c, &serde_json::json!({"available": false})).unwrap();

        for file in [
            "pulse.overview.json",
            "pulse.topics.json",
            "pulse.sentiment.json",
            "pulse.aspects.json",
            "pulse.explorer.json",
            "battleground.json",
            "deepdive.json",
            "index.json",
        ] {
            assert!(dir.path().join(file).exists(), "missing {}", file);
        }

        let exported_csv = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name().to_string_lossy().starts_with("bpcl_reviews_"));
        assert!(exported_csv.is_some());
    }

    #[test]
    fn sidebar_stats_report_coverage() {
        let rows = table();
        let filter = FilterSpec { sentiment: Some(Sentiment::Negative), ..Default::default() };
        let kw = default_topic_keywords();
        let c = ctx(&rows, &filter, &kw);
        let stats = c.sidebar_stats(c.filtered().len());
        assert_eq!(stats.total_reviews, 4);
        assert_eq!(stats.filtered_reviews, 2);
        assert!((stats.coverage_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn thousands_separators() {
        assert_eq!(thousands(5), "5");
        assert_eq!(thousands(1234), "1,234");
        assert_eq!(thousands(1234567), "1,234,567");
    }
}
