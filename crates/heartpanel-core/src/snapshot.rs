//! Form state values: live field text, the persisted snapshot, and the
//! numeric feature vector sent to the remote endpoints.

use serde::{Deserialize, Serialize};

use crate::classify::parse_feature;
use crate::fields::{FIELD_COUNT, FeatureName};

/// Raw text currently held by every input on the panel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormFields {
    features: [String; FIELD_COUNT],
    pub patient_name: String,
    pub notes: String,
}

impl FormFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw text of one feature field.
    #[must_use]
    pub fn feature(&self, name: FeatureName) -> &str {
        &self.features[name.index()]
    }

    pub fn set_feature(&mut self, name: FeatureName, text: impl Into<String>) {
        self.features[name.index()] = text.into();
    }

    /// Raw text of all feature fields, in registry order.
    #[must_use]
    pub fn features(&self) -> &[String; FIELD_COUNT] {
        &self.features
    }

    /// Overwrite every feature field with the textual form of `values`.
    pub fn fill(&mut self, values: &[f64; FIELD_COUNT]) {
        for (slot, value) in self.features.iter_mut().zip(values) {
            *slot = value.to_string();
        }
    }

    /// Empty every field, including patient name and notes.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Complete persisted representation of the panel.
///
/// Serialized as `{ "inputs": [string|null; 13], "patient": string|null,
/// "notes": string|null }`. Missing keys deserialize to their empty value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSnapshot {
    pub inputs: Vec<Option<String>>,
    pub patient: Option<String>,
    pub notes: Option<String>,
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

impl FormSnapshot {
    /// Capture the whole form. Empty text is stored as `null`.
    #[must_use]
    pub fn capture(fields: &FormFields) -> Self {
        Self {
            inputs: fields.features().iter().map(|t| non_empty(t)).collect(),
            patient: non_empty(&fields.patient_name),
            notes: non_empty(&fields.notes),
        }
    }

    /// Write stored values back into `fields`.
    ///
    /// Only non-empty stored entries are restored; `null` and `""` both leave
    /// the target field untouched. Entries past the registry size are
    /// ignored. Returns the number of feature fields restored.
    pub fn restore_into(&self, fields: &mut FormFields) -> usize {
        let mut restored = 0;
        for (name, stored) in FeatureName::ALL.iter().zip(&self.inputs) {
            if let Some(text) = stored.as_deref().filter(|t| !t.is_empty()) {
                fields.set_feature(*name, text);
                restored += 1;
            }
        }
        if let Some(patient) = self.patient.as_deref().filter(|t| !t.is_empty()) {
            fields.patient_name = patient.to_string();
        }
        if let Some(notes) = self.notes.as_deref().filter(|t| !t.is_empty()) {
            fields.notes = notes.to_string();
        }
        restored
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.iter().all(Option::is_none) && self.patient.is_none() && self.notes.is_none()
    }
}

/// Ordered numeric encoding of the thirteen features.
///
/// `None` marks an empty or unparseable field; it is sent as JSON `null`
/// and left for the remote service to reject.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector([Option<f64>; FIELD_COUNT]);

impl FeatureVector {
    #[must_use]
    pub const fn new(values: [Option<f64>; FIELD_COUNT]) -> Self {
        Self(values)
    }

    /// Parse the current text of every feature field.
    #[must_use]
    pub fn from_fields(fields: &FormFields) -> Self {
        Self(FeatureName::ALL.map(|name| parse_feature(fields.feature(name))))
    }

    #[must_use]
    pub fn from_values(values: &[f64; FIELD_COUNT]) -> Self {
        Self(values.map(|v| v.is_finite().then_some(v)))
    }

    #[must_use]
    pub fn get(&self, name: FeatureName) -> Option<f64> {
        self.0[name.index()]
    }

    #[must_use]
    pub fn values(&self) -> &[Option<f64>; FIELD_COUNT] {
        &self.0
    }

    /// Number of fields without a usable number.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_none()).count()
    }

    #[must_use]
    pub fn to_named_pairs(&self) -> Vec<(FeatureName, Option<f64>)> {
        FeatureName::ALL.iter().copied().zip(self.0).collect()
    }
}
