//! Per-field risk banding.
//!
//! Each feature value maps to one of three visual bands. Four features have
//! clinical thresholds; every other feature (including categorical codes such
//! as `sex`, `cp`, `ca`, `thal`) falls through to a uniform 33/66 split. That
//! split carries no clinical meaning for categorical codes and is kept as-is
//! pending product review.

use serde::{Deserialize, Serialize};

use crate::fields::{FIELD_COUNT, FeatureName};
use crate::snapshot::FormFields;

/// Visual classification of a single field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Safe,
    Warning,
    Danger,
    /// Field text is empty or not a finite number; no class is applied.
    #[default]
    Unclassified,
}

impl RiskBand {
    /// CSS class applied to the input element, if any.
    #[must_use]
    pub const fn css_class(self) -> Option<&'static str> {
        match self {
            Self::Safe => Some("safe"),
            Self::Warning => Some("warning"),
            Self::Danger => Some("danger"),
            Self::Unclassified => None,
        }
    }
}

/// Parse raw field text into a finite number.
///
/// Surrounding whitespace is ignored. Empty text and non-finite results
/// (`inf`, `NaN`) are treated as unparseable so that an empty field stays
/// distinct from an explicit zero.
#[must_use]
pub fn parse_feature(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Classify the raw text of `name`.
#[must_use]
pub fn classify(name: FeatureName, raw: &str) -> RiskBand {
    parse_feature(raw).map_or(RiskBand::Unclassified, |value| {
        classify_value(name, value)
    })
}

/// Classify an already-parsed value of `name`.
#[must_use]
pub fn classify_value(name: FeatureName, value: f64) -> RiskBand {
    if !value.is_finite() {
        return RiskBand::Unclassified;
    }
    match name {
        FeatureName::Chol => {
            if value < 200.0 {
                RiskBand::Safe
            } else if value < 240.0 {
                RiskBand::Warning
            } else {
                RiskBand::Danger
            }
        }
        FeatureName::Age => {
            if value < 45.0 {
                RiskBand::Safe
            } else if value <= 60.0 {
                RiskBand::Warning
            } else {
                RiskBand::Danger
            }
        }
        // Higher peak heart rate is the healthy direction.
        FeatureName::Thalach => {
            if value > 150.0 {
                RiskBand::Safe
            } else if value >= 120.0 {
                RiskBand::Warning
            } else {
                RiskBand::Danger
            }
        }
        FeatureName::Oldpeak => {
            if value < 1.0 {
                RiskBand::Safe
            } else if value < 2.0 {
                RiskBand::Warning
            } else {
                RiskBand::Danger
            }
        }
        _ => {
            if value < 33.0 {
                RiskBand::Safe
            } else if value < 66.0 {
                RiskBand::Warning
            } else {
                RiskBand::Danger
            }
        }
    }
}

/// Classify every feature field of `fields`, in registry order.
#[must_use]
pub fn classify_all(fields: &FormFields) -> [RiskBand; FIELD_COUNT] {
    FeatureName::ALL.map(|name| classify(name, fields.feature(name)))
}
