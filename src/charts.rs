// src/charts.rs
use std::collections::{BTreeMap, BTreeSet, HashMap};

use itertools::Itertools;
use serde::Serialize;

use crate::keywords::{format_topic_label, top_keywords, TopicKeywords};
use crate::loader::ConfusionMatrixData;
use crate::models::{EnrichedReview, Sentiment};
use crate::theme::Palette;

/* -------------------------------------------------------------------------- */
/* Spec types                                                                 */
/* -------------------------------------------------------------------------- */

// Every chart is a frontend-ready value: data plus the palette-derived
// styling, nothing executable. Builders return None when a required column
// is absent; the page composer shows a placeholder instead.

#[derive(Debug, Clone, Serialize)]
pub struct ChartStyle {
    pub height: u32,
    pub plot_bg: &'static str,
    pub paper_bg: &'static str,
    pub grid: &'static str,
    pub text: &'static str,
}

pub fn chart_style(height: u32, palette: &Palette) -> ChartStyle {
    ChartStyle {
        height,
        plot_bg: palette.plot_bg,
        paper_bg: "rgba(0,0,0,0)",
        grid: palette.grid,
        text: palette.text,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramSpec {
    pub title: String,
    pub bin_edges: Vec<f64>, // nbins + 1 edges
    pub counts: Vec<u32>,
    pub color: &'static str,
    pub box_marginal: bool,
    pub style: ChartStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolinGroup {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolinSpec {
    pub title: String,
    pub groups: Vec<ViolinGroup>,
    pub show_box: bool,
    pub points: &'static str, // "outliers"
    pub style: ChartStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapSpec {
    pub title: String,
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    pub z: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<Vec<String>>>,
    pub colorscale: &'static str,
    pub color_label: String,
    pub style: ChartStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct GaugeBand {
    pub from: f64,
    pub to: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GaugeSpec {
    pub title: String,
    pub value: f64, // already rescaled to [0, 100]
    pub reference: f64,
    pub suffix: &'static str,
    pub bar_color: &'static str,
    pub bands: [GaugeBand; 3],
    pub style: ChartStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineSpec {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub markers: bool,
    pub series: Vec<LineSeries>,
    pub style: ChartStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieSpec {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<u64>,
    pub colors: Vec<&'static str>,
    pub style: ChartStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarSpec {
    pub title: String,
    pub orientation: &'static str, // "h" | "v"
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub color: &'static str,
    pub style: ChartStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordComparisonSpec {
    pub title: String,
    pub negative: Vec<(String, u32)>,
    pub positive: Vec<(String, u32)>,
    pub negative_color: &'static str,
    pub positive_color: &'static str,
    pub style: ChartStyle,
}

/* -------------------------------------------------------------------------- */
/* Density / distribution                                                     */
/* -------------------------------------------------------------------------- */

pub const DENSITY_BINS: usize = 50;

/// Equal-width histogram over a numeric column; None when the column holds
/// no values in the current view.
pub fn build_density(
    rows: &[&EnrichedReview],
    value: impl Fn(&EnrichedReview) -> Option<f64>,
    title: &str,
    palette: &Palette,
) -> Option<HistogramSpec> {
    let values: Vec<f64> = rows.iter().filter_map(|r| value(r)).collect();
    if values.is_empty() {
        return None;
    }

    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if hi > lo { (hi - lo) / DENSITY_BINS as f64 } else { 1.0 };

    let mut counts = vec![0u32; DENSITY_BINS];
    for v in &values {
        let mut idx = ((v - lo) / width) as usize;
        if idx >= DENSITY_BINS {
            idx = DENSITY_BINS - 1; // the max value lands in the last bin
        }
        counts[idx] += 1;
    }
    let bin_edges = (0..=DENSITY_BINS).map(|i| lo + width * i as f64).collect();

    Some(HistogramSpec {
        title: title.to_string(),
        bin_edges,
        counts,
        color: palette.neutral,
        box_marginal: true,
        style: chart_style(300, palette),
    })
}

/// Rating values grouped by sentiment label.
pub fn build_violin(rows: &[&EnrichedReview], title: &str, palette: &Palette) -> Option<ViolinSpec> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in rows {
        if let (Some(sentiment), Some(score)) = (r.ai_sentiment, r.score) {
            groups.entry(sentiment.to_string()).or_default().push(score);
        }
    }
    if groups.is_empty() {
        return None;
    }

    Some(ViolinSpec {
        title: title.to_string(),
        groups: groups
            .into_iter()
            .map(|(label, values)| ViolinGroup { label, values })
            .collect(),
        show_box: true,
        points: "outliers",
        style: chart_style(350, palette),
    })
}

/* -------------------------------------------------------------------------- */
/* Crosstab heatmaps                                                          */
/* -------------------------------------------------------------------------- */

const SENTIMENT_ORDER: [Sentiment; 3] =
    [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

/// Row-normalized sentiment distribution per topic: rows are topics, columns
/// sentiments, each row summing to 100.
pub fn build_sentiment_topic_heatmap(
    rows: &[&EnrichedReview],
    palette: &Palette,
) -> Option<HeatmapSpec> {
    let mut counts: BTreeMap<String, [u32; 3]> = BTreeMap::new();
    for r in rows {
        if let (Some(topic), Some(sentiment)) = (&r.topic_label, r.ai_sentiment) {
            let cell = counts.entry(topic.clone()).or_default();
            let col = SENTIMENT_ORDER.iter().position(|&s| s == sentiment).unwrap_or(0);
            cell[col] += 1;
        }
    }
    if counts.is_empty() {
        return None;
    }

    let y_labels: Vec<String> = counts.keys().cloned().collect();
    let z: Vec<Vec<f64>> = counts.values().map(|row| normalize_row(row)).collect();

    Some(HeatmapSpec {
        title: "Sentiment Distribution by Topic (%)".to_string(),
        x_labels: SENTIMENT_ORDER.iter().map(|s| s.to_string()).collect(),
        y_labels,
        z,
        annotations: None,
        colorscale: "RdYlGn",
        color_label: "% Distribution".to_string(),
        style: chart_style(350, palette),
    })
}

/// Root-cause view: negative reviews only, top-10 versions by volume,
/// version × topic share of issues.
pub fn build_root_cause_heatmap(
    rows: &[&EnrichedReview],
    palette: &Palette,
) -> Option<HeatmapSpec> {
    let negative: Vec<&&EnrichedReview> = rows
        .iter()
        .filter(|r| r.ai_sentiment == Some(Sentiment::Negative))
        .collect();
    if negative.is_empty() {
        return None;
    }

    let mut version_counts: HashMap<&str, u32> = HashMap::new();
    for r in &negative {
        if let Some(v) = r.app_version.as_deref() {
            *version_counts.entry(v).or_insert(0) += 1;
        }
    }
    let top_versions: BTreeSet<&str> = version_counts
        .iter()
        .sorted_by_key(|(_, c)| std::cmp::Reverse(**c))
        .take(10)
        .map(|(v, _)| *v)
        .collect();
    if top_versions.is_empty() {
        return None;
    }

    let mut topics: BTreeSet<String> = BTreeSet::new();
    let mut cells: HashMap<(String, String), u32> = HashMap::new();
    for r in &negative {
        let (Some(version), Some(topic)) = (r.app_version.as_deref(), &r.topic_label) else {
            continue;
        };
        if !top_versions.contains(version) {
            continue;
        }
        topics.insert(topic.clone());
        *cells.entry((version.to_string(), topic.clone())).or_insert(0) += 1;
    }
    if topics.is_empty() {
        return None;
    }

    let versions: Vec<String> = top_versions
        .iter()
        .map(|v| v.to_string())
        .sorted_by_key(|v| version_sort_key(v))
        .collect();
    let topic_list: Vec<String> = topics.into_iter().collect();

    let z: Vec<Vec<f64>> = versions
        .iter()
        .map(|v| {
            let row: Vec<u32> = topic_list
                .iter()
                .map(|t| *cells.get(&(v.clone(), t.clone())).unwrap_or(&0))
                .collect();
            normalize_row(&row)
        })
        .collect();

    Some(HeatmapSpec {
        title: "Root Cause Heatmap: Version vs Topic".to_string(),
        x_labels: topic_list,
        y_labels: versions,
        z,
        annotations: None,
        colorscale: "RdYlGn_r",
        color_label: "% of Issues".to_string(),
        style: chart_style(350, palette),
    })
}

/// Model-integrity view from the upstream validation artifact; annotations
/// carry count plus row-percentage.
pub fn build_confusion_heatmap(cm: &ConfusionMatrixData, palette: &Palette) -> HeatmapSpec {
    let annotations: Vec<Vec<String>> = cm
        .confusion_matrix
        .iter()
        .map(|row| {
            let total: f64 = row.iter().sum();
            row.iter()
                .map(|&c| {
                    let pct = if total > 0.0 { c / total * 100.0 } else { 0.0 };
                    format!("{:.0} ({:.1}%)", c, pct)
                })
                .collect()
        })
        .collect();

    HeatmapSpec {
        title: format!("Confusion Matrix | Accuracy: {:.2}%", cm.accuracy * 100.0),
        x_labels: cm.labels.iter().map(|l| format!("Predicted: {}", l)).collect(),
        y_labels: cm.labels.iter().map(|l| format!("Actual: {}", l)).collect(),
        z: cm.confusion_matrix.clone(),
        annotations: Some(annotations),
        colorscale: "Blues",
        color_label: "Count".to_string(),
        style: chart_style(400, palette),
    }
}

/* -------------------------------------------------------------------------- */
/* Gauge                                                                      */
/* -------------------------------------------------------------------------- */

/// Linear rescale from the sentiment domain [-1, 1] onto [0, 100].
pub fn rescale_sentiment(score: f64) -> f64 {
    ((score + 1.0) * 50.0).clamp(0.0, 100.0)
}

pub fn build_gauge(mean_sentiment: f64, title: &str, palette: &Palette) -> GaugeSpec {
    GaugeSpec {
        title: title.to_string(),
        value: rescale_sentiment(mean_sentiment),
        reference: 50.0,
        suffix: "%",
        bar_color: palette.accent,
        bands: [
            GaugeBand { from: 0.0, to: 33.0, color: "rgba(239, 68, 68, 0.2)" },
            GaugeBand { from: 33.0, to: 66.0, color: "rgba(250, 204, 21, 0.2)" },
            GaugeBand { from: 66.0, to: 100.0, color: "rgba(16, 185, 129, 0.2)" },
        ],
        style: chart_style(280, palette),
    }
}

/* -------------------------------------------------------------------------- */
/* Trend lines                                                                */
/* -------------------------------------------------------------------------- */

/// Daily mean sentiment over the filtered view.
pub fn build_daily_sentiment(rows: &[&EnrichedReview], palette: &Palette) -> Option<LineSpec> {
    let mut by_day: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for r in rows {
        if let (Some(ts), Some(score)) = (r.timestamp, r.sentiment_score) {
            let entry = by_day.entry(ts.date().to_string()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }
    if by_day.is_empty() {
        return None;
    }

    let (x, y): (Vec<String>, Vec<f64>) = by_day
        .into_iter()
        .map(|(day, (sum, n))| (day, sum / n as f64))
        .unzip();

    Some(LineSpec {
        title: "Daily Average Sentiment Trend".to_string(),
        x_title: "Date".to_string(),
        y_title: "Sentiment".to_string(),
        markers: true,
        series: vec![LineSeries { name: "sentiment".to_string(), x, y }],
        style: chart_style(300, palette),
    })
}

/// Monthly volume of the top-3 negative topics.
pub fn build_negative_topic_trends(
    rows: &[&EnrichedReview],
    keywords: &TopicKeywords,
    palette: &Palette,
) -> Option<LineSpec> {
    let negative: Vec<&&EnrichedReview> = rows
        .iter()
        .filter(|r| r.ai_sentiment == Some(Sentiment::Negative))
        .collect();

    let mut topic_counts: HashMap<&str, u32> = HashMap::new();
    for r in &negative {
        if let Some(t) = r.topic_label.as_deref() {
            *topic_counts.entry(t).or_insert(0) += 1;
        }
    }
    let top_topics: Vec<String> = topic_counts
        .iter()
        .sorted_by_key(|(_, c)| std::cmp::Reverse(**c))
        .take(3)
        .map(|(t, _)| t.to_string())
        .collect();
    if top_topics.is_empty() {
        return None;
    }

    let mut months: BTreeSet<String> = BTreeSet::new();
    let mut counts: HashMap<(String, String), u32> = HashMap::new();
    for r in &negative {
        let (Some(month), Some(topic)) = (&r.month_year, r.topic_label.as_deref()) else {
            continue;
        };
        if !top_topics.iter().any(|t| t == topic) {
            continue;
        }
        months.insert(month.clone());
        *counts.entry((month.clone(), topic.to_string())).or_insert(0) += 1;
    }
    if months.is_empty() {
        return None;
    }

    let month_list: Vec<String> = months.into_iter().collect();
    let series = top_topics
        .iter()
        .map(|topic| LineSeries {
            name: format_topic_label(Some(topic), keywords),
            x: month_list.clone(),
            y: month_list
                .iter()
                .map(|m| *counts.get(&(m.clone(), topic.clone())).unwrap_or(&0) as f64)
                .collect(),
        })
        .collect();

    Some(LineSpec {
        title: "Monthly Volume of Top 3 Negative Topics".to_string(),
        x_title: "Month".to_string(),
        y_title: "Number of Reviews".to_string(),
        markers: true,
        series,
        style: chart_style(350, palette),
    })
}

/* -------------------------------------------------------------------------- */
/* Breakdown charts                                                           */
/* -------------------------------------------------------------------------- */

pub fn build_sentiment_pie(rows: &[&EnrichedReview], palette: &Palette) -> Option<PieSpec> {
    let counts = sentiment_counts(rows);
    if counts.iter().all(|&c| c == 0) {
        return None;
    }

    let mut labels = Vec::new();
    let mut values = Vec::new();
    let mut colors = Vec::new();
    for (sentiment, &count) in SENTIMENT_ORDER.iter().zip(&counts) {
        if count == 0 {
            continue;
        }
        labels.push(sentiment.to_string());
        values.push(count);
        colors.push(palette.sentiment_color(*sentiment));
    }

    Some(PieSpec {
        title: "Overall Sentiment Breakdown".to_string(),
        labels,
        values,
        colors,
        style: chart_style(350, palette),
    })
}

/// Counts in `SENTIMENT_ORDER` (negative, neutral, positive).
pub fn sentiment_counts(rows: &[&EnrichedReview]) -> [u64; 3] {
    let mut counts = [0u64; 3];
    for r in rows {
        if let Some(s) = r.ai_sentiment {
            if let Some(i) = SENTIMENT_ORDER.iter().position(|&x| x == s) {
                counts[i] += 1;
            }
        }
    }
    counts
}

/// Horizontal bar of review counts per topic, most-reviewed first.
pub fn build_topic_bar(rows: &[&EnrichedReview], palette: &Palette) -> Option<BarSpec> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for r in rows {
        if let Some(t) = r.topic_label.as_deref() {
            *counts.entry(t).or_insert(0) += 1;
        }
    }
    if counts.is_empty() {
        return None;
    }

    let ranked: Vec<(&str, u32)> = counts
        .into_iter()
        .sorted_by_key(|(t, c)| (std::cmp::Reverse(*c), t.to_string()))
        .collect();

    Some(BarSpec {
        title: "Topics by Review Count".to_string(),
        orientation: "h",
        labels: ranked.iter().map(|(t, _)| t.to_string()).collect(),
        values: ranked.iter().map(|(_, c)| *c as f64).collect(),
        color: palette.accent,
        style: chart_style(300, palette),
    })
}

/// Twin top-10 keyword bars, negative vs positive. None unless both sides
/// have text to mine.
pub fn build_keyword_comparison(
    rows: &[&EnrichedReview],
    palette: &Palette,
) -> Option<KeywordComparisonSpec> {
    let texts_for = |sentiment: Sentiment| -> Vec<&str> {
        rows.iter()
            .filter(|r| r.ai_sentiment == Some(sentiment))
            .map(|r| r.content.as_str())
            .collect()
    };

    let negative = top_keywords(&texts_for(Sentiment::Negative), 10);
    let positive = top_keywords(&texts_for(Sentiment::Positive), 10);
    if negative.is_empty() || positive.is_empty() {
        return None;
    }

    Some(KeywordComparisonSpec {
        title: "Keyword Comparison: Negative vs Positive".to_string(),
        negative,
        positive,
        negative_color: palette.negative,
        positive_color: palette.positive,
        style: chart_style(350, palette),
    })
}

/* -------------------------------------------------------------------------- */
/* Helpers                                                                    */
/* -------------------------------------------------------------------------- */

fn normalize_row(row: &[u32]) -> Vec<f64> {
    let total: u32 = row.iter().sum();
    if total == 0 {
        return vec![0.0; row.len()];
    }
    row.iter().map(|&c| c as f64 / total as f64 * 100.0).collect()
}

/// Numeric-aware ordering for dotted version strings; non-numeric segments
/// sort as zero, matching the sidebar's version list.
pub fn version_sort_key(version: &str) -> Vec<i64> {
    version
        .split('.')
        .map(|part| part.parse::<i64>().unwrap_or(0))
        .collect()
}
