//! Derived display state for the result area.

use crate::prediction::PredictionResult;

/// Banner shown under the gauge. Keyed off the server's thresholded verdict
/// only, never off the probability magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    HighRisk,
    LowRisk,
}

impl Verdict {
    #[must_use]
    pub const fn from_threshold(flag: bool) -> Self {
        if flag { Self::HighRisk } else { Self::LowRisk }
    }

    #[must_use]
    pub const fn banner(self) -> &'static str {
        match self {
            Self::HighRisk => "High risk of heart disease",
            Self::LowRisk => "Low risk – no heart disease",
        }
    }

    /// Banner text color.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::HighRisk => "#e63946",
            Self::LowRisk => "#28a745",
        }
    }
}

/// Everything the result area renders for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    /// Needle rotation: 180° at p1 = 0, 0° at p1 = 1.
    pub gauge_angle_deg: f64,
    /// Whole-percent label inside the gauge, e.g. `"70%"`.
    pub gauge_label: String,
    pub bar_width_percent: f64,
    /// One-decimal detail labels, e.g. `"70.0%"`.
    pub p1_label: String,
    pub p0_label: String,
    pub verdict: Verdict,
    /// Pretty-printed response body.
    pub raw_json: String,
}

impl ResultView {
    #[must_use]
    pub fn from_prediction(result: &PredictionResult) -> Self {
        let p0 = result.probabilities.p0;
        let p1 = result.probabilities.p1;
        Self {
            gauge_angle_deg: gauge_angle(p1),
            gauge_label: format!("{}%", round_percent(p1)),
            bar_width_percent: p1 * 100.0,
            p1_label: format!("{}%", fixed_one(p1 * 100.0)),
            p0_label: format!("{}%", fixed_one(p0 * 100.0)),
            verdict: Verdict::from_threshold(result.thresholded_verdict),
            raw_json: serde_json::to_string_pretty(&result.raw)
                .unwrap_or_else(|_| result.raw.to_string()),
        }
    }
}

#[must_use]
pub fn gauge_angle(p1: f64) -> f64 {
    180.0 - p1 * 180.0
}

/// `p` as a whole percentage, halves rounded up.
#[must_use]
pub fn round_percent(p: f64) -> i64 {
    (p * 100.0 + 0.5).floor() as i64
}

/// `value` with one decimal, halves rounded up (`2.25` is `"2.3"`).
#[must_use]
pub fn fixed_one(value: f64) -> String {
    format!("{:.1}", (value * 10.0 + 0.5).floor() / 10.0)
}

/// Headline of the result area.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultStatus {
    #[default]
    Idle,
    /// A predict request is in flight.
    Analyzing,
    /// The current view reflects the last applied prediction.
    Ready,
    /// The latest request failed; holds the text shown to the user.
    Failed(String),
}

impl ResultStatus {
    /// Status line text; `None` when the verdict banner is shown instead.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Analyzing => Some("Analyzing…"),
            Self::Ready => None,
            Self::Failed(message) => Some(message),
        }
    }
}

/// State of the result area.
///
/// A failure only changes [`status`](Self::status); the gauge, bars and raw
/// JSON of the previous prediction stay as they were.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultPanel {
    status: ResultStatus,
    view: Option<ResultView>,
    raw_visible: bool,
}

impl ResultPanel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_analyzing(&mut self) {
        self.status = ResultStatus::Analyzing;
    }

    pub fn show_result(&mut self, result: &PredictionResult) {
        self.view = Some(ResultView::from_prediction(result));
        self.status = ResultStatus::Ready;
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.status = ResultStatus::Failed(message.into());
    }

    /// Flip the raw JSON panel. Independent of whether a result exists.
    pub fn toggle_raw(&mut self) -> bool {
        self.raw_visible = !self.raw_visible;
        self.raw_visible
    }

    #[must_use]
    pub fn status(&self) -> &ResultStatus {
        &self.status
    }

    #[must_use]
    pub fn view(&self) -> Option<&ResultView> {
        self.view.as_ref()
    }

    /// Whether the probability bar is visible.
    #[must_use]
    pub fn bar_visible(&self) -> bool {
        self.view.is_some()
    }

    #[must_use]
    pub fn raw_visible(&self) -> bool {
        self.raw_visible
    }
}
