//! Canonical feature registry.
//!
//! The order of [`FeatureName::ALL`] is the wire contract: it fixes the
//! field layout of the panel, the index of each entry in the persisted
//! `inputs` array, and the position of each value in the feature vector
//! sent to the predict and report endpoints. Reordering the variants is a
//! breaking change for stored snapshots and for the remote model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of clinical features collected by the panel.
pub const FIELD_COUNT: usize = 13;

/// One clinical input of the panel, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureName {
    Age,
    Sex,
    Cp,
    Trestbps,
    Chol,
    Fbs,
    Restecg,
    Thalach,
    Exang,
    Oldpeak,
    Slope,
    Ca,
    Thal,
}

impl FeatureName {
    /// All features in canonical order.
    pub const ALL: [Self; FIELD_COUNT] = [
        Self::Age,
        Self::Sex,
        Self::Cp,
        Self::Trestbps,
        Self::Chol,
        Self::Fbs,
        Self::Restecg,
        Self::Thalach,
        Self::Exang,
        Self::Oldpeak,
        Self::Slope,
        Self::Ca,
        Self::Thal,
    ];

    /// Position of this feature in the registry.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Feature at `index`, if in range.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Identifier used for the field id and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Sex => "sex",
            Self::Cp => "cp",
            Self::Trestbps => "trestbps",
            Self::Chol => "chol",
            Self::Fbs => "fbs",
            Self::Restecg => "restecg",
            Self::Thalach => "thalach",
            Self::Exang => "exang",
            Self::Oldpeak => "oldpeak",
            Self::Slope => "slope",
            Self::Ca => "ca",
            Self::Thal => "thal",
        }
    }

    /// Identifiers of all features, in canonical order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::ALL.into_iter().map(Self::as_str)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a registered feature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for FeatureName {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

/// Canned feature vectors offered by the autofill buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Patient without heart disease.
    SampleNo,
    /// Patient with heart disease.
    SampleYes,
}

impl Preset {
    pub const SAMPLE_NO: [f64; FIELD_COUNT] = [
        62.0, 0.0, 0.0, 140.0, 268.0, 0.0, 0.0, 160.0, 0.0, 3.6, 0.0, 2.0, 2.0,
    ];
    pub const SAMPLE_YES: [f64; FIELD_COUNT] = [
        63.0, 1.0, 3.0, 145.0, 233.0, 1.0, 0.0, 150.0, 0.0, 2.3, 0.0, 0.0, 1.0,
    ];

    #[must_use]
    pub const fn values(self) -> &'static [f64; FIELD_COUNT] {
        match self {
            Self::SampleNo => &Self::SAMPLE_NO,
            Self::SampleYes => &Self::SAMPLE_YES,
        }
    }
}

/// Something on the panel that can hold keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Feature(FeatureName),
    Submit,
}

/// Where focus moves when Enter is pressed on `current`.
///
/// Feature fields advance in registry order; the last field hands focus to
/// the submit control, which keeps it.
#[must_use]
pub fn focus_after(current: FocusTarget) -> FocusTarget {
    match current {
        FocusTarget::Feature(name) => FeatureName::from_index(name.index() + 1)
            .map_or(FocusTarget::Submit, FocusTarget::Feature),
        FocusTarget::Submit => FocusTarget::Submit,
    }
}
