use serde::Serialize;

/// Session theme. An explicit value threaded into every chart builder; no
/// ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                bg: "#0E1117",
                secondary_bg: "#161B22",
                text: "#C9D1D9",
                plot_bg: "rgba(22, 27, 34, 0.7)",
                grid: "rgba(48, 54, 61, 0.5)",
                positive: "#3FB950",
                negative: "#F85149",
                neutral: "#79C0FF",
                accent: "#3b82f6",
            },
            Theme::Light => Palette {
                bg: "#FFFFFF",
                secondary_bg: "#F0F2F6",
                text: "#262730",
                plot_bg: "rgba(255, 255, 255, 0.7)",
                grid: "rgba(200, 200, 200, 0.3)",
                positive: "#10b981",
                negative: "#ef4444",
                neutral: "#f59e0b",
                accent: "#3b82f6",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub bg: &'static str,
    pub secondary_bg: &'static str,
    pub text: &'static str,
    pub plot_bg: &'static str,
    pub grid: &'static str,
    pub positive: &'static str,
    pub negative: &'static str,
    pub neutral: &'static str,
    pub accent: &'static str,
}

impl Palette {
    pub fn sentiment_color(&self, sentiment: crate::models::Sentiment) -> &'static str {
        use crate::models::Sentiment;
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }
}
