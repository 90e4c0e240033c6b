//! Report generation contract.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cancellation::CancellationToken;
use crate::error::{RemoteFailure, ReportError};
use crate::presenter::round_percent;
use crate::snapshot::{FeatureVector, FormFields};

/// Body of the report request.
///
/// Built from the fields as they are when the user confirms, not as they
/// were when the last prediction was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    pub features: FeatureVector,
    pub patient_name: String,
    pub notes: String,
}

impl ReportRequest {
    #[must_use]
    pub fn from_fields(fields: &FormFields) -> Self {
        Self {
            features: FeatureVector::from_fields(fields),
            patient_name: fields.patient_name.clone(),
            notes: fields.notes.clone(),
        }
    }
}

/// Opaque document returned by the report endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryDocument {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl BinaryDocument {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub trait ReportService {
    fn generate_report(
        &self,
        request: &ReportRequest,
        cancel: &CancellationToken,
    ) -> Result<BinaryDocument, RemoteFailure>;
}

/// Summary shown in the confirmation dialog before a report is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfirmation {
    /// Patient name, or `"Patient"` when the field is empty.
    pub patient_label: String,
    /// Rounded class-1 probability of the last prediction.
    pub risk_percent: i64,
}

impl ReportConfirmation {
    #[must_use]
    pub fn new(patient_name: &str, p1: f64) -> Self {
        let patient_label = if patient_name.is_empty() {
            "Patient".to_string()
        } else {
            patient_name.to_string()
        };
        Self {
            patient_label,
            risk_percent: round_percent(p1),
        }
    }

    #[must_use]
    pub fn risk_label(&self) -> String {
        format!("Risk: {}%", self.risk_percent)
    }
}

/// A generated report, ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDownload {
    pub filename: String,
    pub document: BinaryDocument,
}

impl ReportDownload {
    /// Write the document into `dir` under its download name.
    pub fn save_into(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.document.bytes).map_err(|source| ReportError::Save {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = self.document.len(), "report saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FeatureName;

    #[test]
    fn request_wire_shape() {
        let mut fields = FormFields::new();
        fields.set_feature(FeatureName::Age, "63");
        fields.patient_name = "Ada".into();
        let json = serde_json::to_value(ReportRequest::from_fields(&fields)).unwrap();
        assert_eq!(json["features"][0], 63.0);
        assert!(json["features"][1].is_null());
        assert_eq!(json["patient_name"], "Ada");
        assert_eq!(json["notes"], "");
    }

    #[test]
    fn confirmation_defaults_patient_label() {
        let confirm = ReportConfirmation::new("", 0.456);
        assert_eq!(confirm.patient_label, "Patient");
        assert_eq!(confirm.risk_label(), "Risk: 46%");
        assert_eq!(ReportConfirmation::new("Ada", 0.1).patient_label, "Ada");
    }

    #[test]
    fn download_saves_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let download = ReportDownload {
            filename: "heart_report.pdf".into(),
            document: BinaryDocument {
                bytes: b"%PDF-1.4 fake".to_vec(),
                content_type: Some("application/pdf".into()),
            },
        };
        let path = download.save_into(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "heart_report.pdf");
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4 fake");
    }

    #[test]
    fn save_into_missing_dir_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let download = ReportDownload {
            filename: "heart_report.pdf".into(),
            document: BinaryDocument {
                bytes: vec![1, 2, 3],
                content_type: None,
            },
        };
        let err = download.save_into(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, ReportError::Save { .. }));
    }
}
