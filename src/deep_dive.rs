// src/deep_dive.rs
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::theme::Palette;

/* -------------------------------------------------------------------------- */
/* Report wire types                                                          */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterReport {
    #[serde(default)]
    pub feature_war: Section<FeatureAspect>,
    #[serde(default)]
    pub personas: Section<PersonaRow>,
    #[serde(default)]
    pub empathy_gap: Section<SupportRow>,
    #[serde(default)]
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Section<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Section { data: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportMetadata {
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureAspect {
    #[serde(rename = "Aspect")]
    pub aspect: String,
    #[serde(rename = "Delta")]
    pub delta: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaRow {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Persona")]
    pub persona: String,
    #[serde(rename = "Avg_Rating")]
    pub avg_rating: f64,
    #[serde(rename = "Share_of_Voice_%")]
    pub share_of_voice_pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupportRow {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Response_Rate_%")]
    pub response_rate_pct: f64,
    #[serde(rename = "Median_Time_Mins")]
    pub median_time_mins: f64,
    #[serde(rename = "Support_Type")]
    pub support_type: String,
    #[serde(rename = "Total_Reviews")]
    pub total_reviews: f64,
}

/* -------------------------------------------------------------------------- */
/* View models                                                                */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Serialize)]
pub struct DivergingBarSpec {
    pub title: String,
    pub aspects: Vec<String>,
    pub deltas: Vec<f64>,
    pub colors: Vec<&'static str>,
    pub center_line: f64,
    pub x_title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureWarView {
    pub chart: DivergingBarSpec,
    pub bpcl_wins: usize,
    pub iocl_wins: usize,
    pub total_aspects: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonaEntry {
    pub brand: String,
    pub persona: String,
    pub avg_rating: f64,
    pub share_of_voice_pct: f64,
    /// Background band for the rating cell.
    pub rating_band: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonasView {
    pub rows: Vec<PersonaEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SupportVerdict {
    Superior,
    Mixed,
    Behind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub metric: String,
    pub bpcl: String,
    pub iocl: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmpathyGapView {
    pub response_rate_pct: f64,
    pub response_rate_delta: f64,
    pub median_time_mins: f64,
    pub support_type: String,
    pub verdict: SupportVerdict,
    pub comparison: Vec<ComparisonRow>,
    pub insights: Vec<String>,
}

/// The full tab. A `None` section renders as a warning in its slot while the
/// other sections still show.
#[derive(Debug, Clone, Serialize)]
pub struct DeepDiveView {
    pub last_updated: String,
    pub feature_war: Option<FeatureWarView>,
    pub personas: Option<PersonasView>,
    pub empathy_gap: Option<EmpathyGapView>,
    pub warnings: Vec<String>,
}

/* -------------------------------------------------------------------------- */
/* Loading & composition                                                      */
/* -------------------------------------------------------------------------- */

pub fn load_report(path: &Path) -> Result<MasterReport> {
    let raw = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Report file not found: {} (run the deep-dive analysis notebook to generate it)",
            path.display()
        )
    })?;
    let report: MasterReport =
        serde_json::from_str(&raw).with_context(|| format!("Error reading {}", path.display()))?;
    info!("Deep-dive report loaded - path={}", path.display());
    Ok(report)
}

pub fn build_view(report: &MasterReport, palette: &Palette) -> DeepDiveView {
    let mut warnings = Vec::new();

    let feature_war = build_feature_war(&report.feature_war.data, palette);
    if feature_war.is_none() {
        warn!("No Feature War data available");
        warnings.push("No Feature War data available".to_string());
    }

    let personas = build_personas(&report.personas.data);
    if personas.is_none() {
        warn!("No Persona data available");
        warnings.push("No Persona data available".to_string());
    }

    let empathy_gap = build_empathy_gap(&report.empathy_gap.data);
    if empathy_gap.is_none() {
        warn!("No Empathy Gap data available");
        warnings.push("No Empathy Gap data available".to_string());
    }

    DeepDiveView {
        last_updated: report
            .metadata
            .last_updated
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        feature_war,
        personas,
        empathy_gap,
        warnings,
    }
}

/// Diverging bars: positive deltas are our wins (green), negative the
/// rival's (red), zero neutral gray.
fn build_feature_war(data: &[FeatureAspect], palette: &Palette) -> Option<FeatureWarView> {
    if data.is_empty() {
        return None;
    }

    let colors: Vec<&'static str> = data
        .iter()
        .map(|a| {
            if a.delta > 0.0 {
                palette.positive
            } else if a.delta < 0.0 {
                palette.negative
            } else {
                "#95a5a6"
            }
        })
        .collect();

    let bpcl_wins = data.iter().filter(|a| a.delta > 0.0).count();
    let iocl_wins = data.iter().filter(|a| a.delta < 0.0).count();

    Some(FeatureWarView {
        chart: DivergingBarSpec {
            title: "BPCL vs IOCL: Competitive Feature Gap".to_string(),
            aspects: data.iter().map(|a| a.aspect.clone()).collect(),
            deltas: data.iter().map(|a| a.delta).collect(),
            colors,
            center_line: 0.0,
            x_title: "Delta (BPCL - IOCL)".to_string(),
        },
        bpcl_wins,
        iocl_wins,
        total_aspects: data.len(),
    })
}

fn rating_band(rating: f64) -> &'static str {
    if rating >= 4.5 {
        "#d4edda"
    } else if rating >= 4.0 {
        "#c3e6cb"
    } else if rating >= 3.5 {
        "#fff3cd"
    } else {
        "#f8d7da"
    }
}

fn build_personas(data: &[PersonaRow]) -> Option<PersonasView> {
    if data.is_empty() {
        return None;
    }
    Some(PersonasView {
        rows: data
            .iter()
            .map(|p| PersonaEntry {
                brand: p.brand.clone(),
                persona: p.persona.clone(),
                avg_rating: p.avg_rating,
                share_of_voice_pct: p.share_of_voice_pct,
                rating_band: rating_band(p.avg_rating),
            })
            .collect(),
    })
}

fn is_bot(support_type: &str) -> bool {
    support_type.contains('🤖') || support_type.to_lowercase().contains("bot")
}

fn build_empathy_gap(data: &[SupportRow]) -> Option<EmpathyGapView> {
    let bpcl = data.iter().find(|r| r.brand == "BPCL")?;
    let iocl = data.iter().find(|r| r.brand == "IOCL")?;

    let delta_rr = bpcl.response_rate_pct - iocl.response_rate_pct;
    let rr_advantage = bpcl.response_rate_pct > iocl.response_rate_pct;
    let time_advantage = bpcl.median_time_mins < iocl.median_time_mins;

    let verdict = if rr_advantage && time_advantage {
        SupportVerdict::Superior
    } else if rr_advantage || time_advantage {
        SupportVerdict::Mixed
    } else {
        SupportVerdict::Behind
    };

    let comparison = vec![
        ComparisonRow {
            metric: "Response Rate".to_string(),
            bpcl: format!("{:.1}%", bpcl.response_rate_pct),
            iocl: format!("{:.1}%", iocl.response_rate_pct),
        },
        ComparisonRow {
            metric: "Median Time (min)".to_string(),
            bpcl: format!("{:.1}", bpcl.median_time_mins),
            iocl: format!("{:.1}", iocl.median_time_mins),
        },
        ComparisonRow {
            metric: "Support Type".to_string(),
            bpcl: bpcl.support_type.clone(),
            iocl: iocl.support_type.clone(),
        },
        ComparisonRow {
            metric: "Total Reviews".to_string(),
            bpcl: format!("{}", bpcl.total_reviews as i64),
            iocl: format!("{}", iocl.total_reviews as i64),
        },
    ];

    let mut insights = Vec::new();
    if is_bot(&bpcl.support_type) {
        insights.push("BPCL uses automated responses (< 10 min)".to_string());
    } else {
        insights.push(format!("BPCL has human agents ({:.1} min avg)", bpcl.median_time_mins));
    }
    if rr_advantage {
        insights.push(format!("BPCL replies to {:+.1}% more reviews", delta_rr));
    } else {
        insights.push(format!("IOCL replies to {:.1}% more reviews", delta_rr.abs()));
    }
    match (is_bot(&bpcl.support_type), is_bot(&iocl.support_type)) {
        (false, true) => insights.push("BPCL employs human touch vs IOCL automation".to_string()),
        (true, false) => insights.push("IOCL employs human touch vs BPCL automation".to_string()),
        _ => {}
    }

    Some(EmpathyGapView {
        response_rate_pct: bpcl.response_rate_pct,
        response_rate_delta: delta_rr,
        median_time_mins: bpcl.median_time_mins,
        support_type: if is_bot(&bpcl.support_type) { "Bot" } else { "Human" }.to_string(),
        verdict,
        comparison,
        insights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;

    fn report(json: &str) -> MasterReport {
        serde_json::from_str(json).unwrap()
    }

    const FULL: &str = r#"{
        "feature_war": {"data": [
            {"Aspect": "Delivery Speed", "Delta": 0.42},
            {"Aspect": "App Stability", "Delta": -0.15},
            {"Aspect": "Pricing", "Delta": 0.0}
        ]},
        "personas": {"data": [
            {"Brand": "BPCL", "Persona": "Commuter", "Avg_Rating": 4.6, "Share_of_Voice_%": 38.0},
            {"Brand": "IOCL", "Persona": "Commuter", "Avg_Rating": 3.2, "Share_of_Voice_%": 41.5}
        ]},
        "empathy_gap": {"data": [
            {"Brand": "BPCL", "Response_Rate_%": 62.0, "Median_Time_Mins": 8.0,
             "Support_Type": "🤖 Bot", "Total_Reviews": 9000},
            {"Brand": "IOCL", "Response_Rate_%": 40.0, "Median_Time_Mins": 240.0,
             "Support_Type": "Human", "Total_Reviews": 8000}
        ]},
        "metadata": {"last_updated": "2025-12-20"}
    }"#;

    #[test]
    fn full_report_renders_all_three_sections() {
        let view = build_view(&report(FULL), &Theme::Light.palette());
        assert!(view.warnings.is_empty());
        assert_eq!(view.last_updated, "2025-12-20");

        let fw = view.feature_war.unwrap();
        assert_eq!(fw.bpcl_wins, 1);
        assert_eq!(fw.iocl_wins, 1);
        assert_eq!(fw.total_aspects, 3);
        assert_eq!(fw.chart.colors[2], "#95a5a6"); // zero delta stays neutral

        let eg = view.empathy_gap.unwrap();
        assert_eq!(eg.verdict, SupportVerdict::Superior);
        assert_eq!(eg.support_type, "Bot");
        assert!((eg.response_rate_delta - 22.0).abs() < 1e-9);
        assert!(eg.insights.iter().any(|i| i.contains("+22.0%")));
    }

    #[test]
    fn missing_sections_warn_without_sinking_the_rest() {
        let view = build_view(
            &report(r#"{"personas": {"data": [
                {"Brand":"BPCL","Persona":"Family","Avg_Rating":4.1,"Share_of_Voice_%":20.0}
            ]}}"#),
            &Theme::Light.palette(),
        );
        assert!(view.feature_war.is_none());
        assert!(view.empathy_gap.is_none());
        assert_eq!(view.warnings.len(), 2);
        let personas = view.personas.unwrap();
        assert_eq!(personas.rows[0].rating_band, "#c3e6cb");
        assert_eq!(view.last_updated, "Unknown");
    }

    #[test]
    fn empathy_gap_needs_both_brands() {
        let partial = report(
            r#"{"empathy_gap": {"data": [
                {"Brand":"BPCL","Response_Rate_%":50.0,"Median_Time_Mins":10.0,
                 "Support_Type":"Human","Total_Reviews":100}
            ]}}"#,
        );
        assert!(build_empathy_gap(&partial.empathy_gap.data).is_none());
    }

    #[test]
    fn verdict_degrades_with_the_metrics() {
        let mk = |rr: f64, time: f64| {
            vec![
                SupportRow {
                    brand: "BPCL".into(),
                    response_rate_pct: rr,
                    median_time_mins: time,
                    support_type: "Human".into(),
                    total_reviews: 10.0,
                },
                SupportRow {
                    brand: "IOCL".into(),
                    response_rate_pct: 50.0,
                    median_time_mins: 60.0,
                    support_type: "Human".into(),
                    total_reviews: 10.0,
                },
            ]
        };
        assert_eq!(build_empathy_gap(&mk(60.0, 30.0)).unwrap().verdict, SupportVerdict::Superior);
        assert_eq!(build_empathy_gap(&mk(40.0, 30.0)).unwrap().verdict, SupportVerdict::Mixed);
        assert_eq!(build_empathy_gap(&mk(40.0, 90.0)).unwrap().verdict, SupportVerdict::Behind);
    }

    #[test]
    fn missing_file_reports_a_hint() {
        let err = load_report(Path::new("/nonexistent/competitive_master_report.json"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Report file not found"));
    }
}
