//! Form state controller: the single source of truth for the panel.
//!
//! # Invariant
//!
//! After every state-affecting event the persisted snapshot and the per-field
//! risk bands are both recomputed from the same [`FormFields`]. There is no
//! debounce: each edit runs a full save + reclassify pass.
//!
//! # Events
//!
//! | Event                               | Effect                              |
//! |-------------------------------------|-------------------------------------|
//! | [`load`](FormStateController::load) | restore non-empty stored values, classify |
//! | `set_feature` / `set_patient_name` / `set_notes` | mutate one field, sync |
//! | [`fill`](FormStateController::fill) / [`clear`](FormStateController::clear) | replace all fields, sync once |
//! | [`begin_prediction`](FormStateController::begin_prediction) | dispatch ticket, show "Analyzing…" |
//! | [`finish_prediction`](FormStateController::finish_prediction) | apply, reject as stale, or show error |
//! | [`prepare_report`](FormStateController::prepare_report) | gate on a prior prediction |
//! | [`confirm_report`](FormStateController::confirm_report) | send current fields, return download |

use crate::cancellation::{CancellationSource, CancellationToken};
use crate::classify::{RiskBand, classify_all};
use crate::config::{DEFAULT_REPORT_FILENAME, PanelConfig};
use crate::error::{RemoteFailure, ReportError};
use crate::fields::{FIELD_COUNT, FeatureName, Preset};
use crate::prediction::{
    PredictTicket, PredictionRecord, PredictionResult, PredictionService, PredictionSlot,
    SlotUpdate,
};
use crate::presenter::ResultPanel;
use crate::report::{
    BinaryDocument, ReportConfirmation, ReportDownload, ReportRequest, ReportService,
};
use crate::snapshot::{FeatureVector, FormFields, FormSnapshot};
use crate::storage::{PersistenceStore, StorageBackend};

/// Handle for one dispatched report request.
///
/// Only the most recently issued ticket may complete the report flow.
#[derive(Debug)]
pub struct ReportTicket {
    pub request: ReportRequest,
    seq: u64,
    token: CancellationToken,
}

impl ReportTicket {
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug)]
pub struct FormStateController {
    fields: FormFields,
    bands: [RiskBand; FIELD_COUNT],
    store: PersistenceStore,
    slot: PredictionSlot,
    panel: ResultPanel,
    report_in_flight: Option<CancellationSource>,
    report_seq: u64,
    report_filename: String,
    last_save_error: Option<String>,
}

impl FormStateController {
    /// Controller over empty fields. Nothing is read from `store` yet.
    #[must_use]
    pub fn new(store: PersistenceStore) -> Self {
        Self {
            fields: FormFields::new(),
            bands: [RiskBand::Unclassified; FIELD_COUNT],
            store,
            slot: PredictionSlot::new(),
            panel: ResultPanel::new(),
            report_in_flight: None,
            report_seq: 0,
            report_filename: DEFAULT_REPORT_FILENAME.to_string(),
            last_save_error: None,
        }
    }

    /// Page-load path: build the controller and restore the stored snapshot.
    #[must_use]
    pub fn load(store: PersistenceStore) -> Self {
        let mut controller = Self::new(store);
        controller.restore();
        controller
    }

    /// Page-load path with storage key and report filename from `config`.
    pub fn from_config(backend: impl StorageBackend + 'static, config: &PanelConfig) -> Self {
        let store = PersistenceStore::new(backend, config.storage.key.clone());
        let mut controller = Self::load(store);
        controller.report_filename = config.report.filename.clone();
        controller
    }

    /// Restore non-empty stored values into the fields, then classify once.
    ///
    /// Does not write back to storage. Returns the number of feature fields
    /// restored.
    pub fn restore(&mut self) -> usize {
        let snapshot = self.store.load();
        let restored = snapshot.restore_into(&mut self.fields);
        self.bands = classify_all(&self.fields);
        tracing::debug!(key = self.store.key(), restored, "form restored");
        restored
    }

    // ------------------------------------------------------------------
    // Field events
    // ------------------------------------------------------------------

    pub fn set_feature(&mut self, name: FeatureName, text: impl Into<String>) {
        self.fields.set_feature(name, text);
        self.sync();
    }

    pub fn set_patient_name(&mut self, text: impl Into<String>) {
        self.fields.patient_name = text.into();
        self.sync();
    }

    pub fn set_notes(&mut self, text: impl Into<String>) {
        self.fields.notes = text.into();
        self.sync();
    }

    /// Replace every feature field with `values` as one logical edit.
    /// Patient name and notes are left alone.
    pub fn fill(&mut self, values: &[f64; FIELD_COUNT]) {
        self.fields.fill(values);
        self.sync();
    }

    pub fn fill_preset(&mut self, preset: Preset) {
        self.fill(preset.values());
    }

    /// Empty every field, including patient name and notes, as one edit.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.sync();
    }

    /// Save the current snapshot and reclassify every feature.
    ///
    /// A failed save is logged and remembered; classification still runs and
    /// the form stays editable.
    pub fn sync(&mut self) {
        let snapshot = FormSnapshot::capture(&self.fields);
        match self.store.save(&snapshot) {
            Ok(()) => self.last_save_error = None,
            Err(error) => {
                tracing::warn!(key = self.store.key(), %error, "snapshot save failed");
                self.last_save_error = Some(error.to_string());
            }
        }
        self.bands = classify_all(&self.fields);
    }

    // ------------------------------------------------------------------
    // Prediction
    // ------------------------------------------------------------------

    /// Capture the current feature vector and dispatch a predict ticket.
    pub fn begin_prediction(&mut self) -> PredictTicket {
        let features = FeatureVector::from_fields(&self.fields);
        self.panel.show_analyzing();
        let ticket = self.slot.dispatch(features);
        tracing::debug!(
            seq = ticket.seq(),
            missing = features.missing_count(),
            "predict dispatched"
        );
        ticket
    }

    /// Apply the outcome of a predict request.
    pub fn finish_prediction(
        &mut self,
        ticket: PredictTicket,
        outcome: Result<PredictionResult, RemoteFailure>,
    ) -> SlotUpdate {
        let update = self.slot.complete(ticket, outcome);
        match &update {
            SlotUpdate::Applied { seq } => {
                if let Some(record) = self.slot.last() {
                    self.panel.show_result(&record.result);
                    tracing::info!(
                        seq,
                        p1 = record.result.probabilities.p1,
                        verdict = record.result.thresholded_verdict,
                        "prediction applied"
                    );
                }
            }
            SlotUpdate::Failed { seq, failure } => {
                tracing::warn!(seq, %failure, "prediction failed");
                self.panel.show_error(failure.to_string());
            }
            SlotUpdate::Stale { seq, latest } => {
                tracing::warn!(seq, latest, "discarding stale prediction response");
            }
        }
        update
    }

    /// Dispatch, call `service`, and apply the outcome in one step.
    pub fn submit_prediction(&mut self, service: &dyn PredictionService) -> SlotUpdate {
        let ticket = self.begin_prediction();
        let outcome = service.predict(ticket.features(), ticket.token());
        self.finish_prediction(ticket, outcome)
    }

    // ------------------------------------------------------------------
    // Report
    // ------------------------------------------------------------------

    /// Confirmation summary; fails when no prediction has been applied.
    pub fn prepare_report(&self) -> Result<ReportConfirmation, ReportError> {
        let record = self.slot.last().ok_or(ReportError::NoPrediction)?;
        Ok(ReportConfirmation::new(
            &self.fields.patient_name,
            record.result.probabilities.p1,
        ))
    }

    /// Build a report request from the fields as they are now.
    pub fn begin_report(&mut self) -> Result<ReportTicket, ReportError> {
        if self.slot.last().is_none() {
            tracing::warn!("report requested before any prediction");
            return Err(ReportError::NoPrediction);
        }
        if let Some(previous) = self.report_in_flight.take() {
            previous.cancel();
        }
        self.report_seq += 1;
        let source = CancellationSource::new();
        let ticket = ReportTicket {
            request: ReportRequest::from_fields(&self.fields),
            seq: self.report_seq,
            token: source.token(),
        };
        self.report_in_flight = Some(source);
        tracing::debug!(
            seq = ticket.seq,
            missing = ticket.request.features.missing_count(),
            "report dispatched"
        );
        Ok(ticket)
    }

    /// Turn a report response into a download, or show its failure.
    ///
    /// Outcomes for a ticket replaced by a later `begin_report` are dropped
    /// with [`ReportError::Superseded`]; the panel and the newer in-flight
    /// request are left alone.
    pub fn finish_report(
        &mut self,
        ticket: ReportTicket,
        outcome: Result<BinaryDocument, RemoteFailure>,
    ) -> Result<ReportDownload, ReportError> {
        if ticket.seq != self.report_seq {
            tracing::warn!(
                seq = ticket.seq,
                latest = self.report_seq,
                "discarding stale report response"
            );
            return Err(ReportError::Superseded {
                seq: ticket.seq,
                latest: self.report_seq,
            });
        }
        self.report_in_flight = None;
        match outcome {
            Ok(document) => {
                tracing::info!(bytes = document.len(), "report received");
                Ok(ReportDownload {
                    filename: self.report_filename.clone(),
                    document,
                })
            }
            Err(failure) => {
                tracing::warn!(%failure, "report failed");
                self.panel.show_error(failure.to_string());
                Err(failure.into())
            }
        }
    }

    /// Gate, send the current fields to `service`, and return the download.
    pub fn confirm_report(
        &mut self,
        service: &dyn ReportService,
    ) -> Result<ReportDownload, ReportError> {
        let ticket = self.begin_report()?;
        let outcome = service.generate_report(&ticket.request, ticket.token());
        self.finish_report(ticket, outcome)
    }

    /// Cancel every in-flight request.
    pub fn cancel_pending(&mut self) {
        if let Some(source) = self.report_in_flight.take() {
            source.cancel();
        }
        self.slot.cancel_in_flight();
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    #[must_use]
    pub fn bands(&self) -> &[RiskBand; FIELD_COUNT] {
        &self.bands
    }

    #[must_use]
    pub fn band(&self, name: FeatureName) -> RiskBand {
        self.bands[name.index()]
    }

    #[must_use]
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector::from_fields(&self.fields)
    }

    /// Snapshot of the current fields, as it would be persisted.
    #[must_use]
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::capture(&self.fields)
    }

    #[must_use]
    pub fn panel(&self) -> &ResultPanel {
        &self.panel
    }

    /// Flip the raw JSON panel; returns the new visibility.
    pub fn toggle_raw(&mut self) -> bool {
        self.panel.toggle_raw()
    }

    #[must_use]
    pub fn last_prediction(&self) -> Option<&PredictionRecord> {
        self.slot.last()
    }

    #[must_use]
    pub fn is_predicting(&self) -> bool {
        self.slot.is_pending()
    }

    #[must_use]
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    #[must_use]
    pub fn report_filename(&self) -> &str {
        &self.report_filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageResult;
    use crate::storage::{DEFAULT_STORAGE_KEY, MemoryStorage};

    struct BrokenStorage;

    impl StorageBackend for BrokenStorage {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, key: &str, _value: &str) -> StorageResult<()> {
            Err(crate::error::StorageError::InvalidKey {
                key: key.to_string(),
            })
        }

        fn remove(&mut self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn each_edit_saves_and_reclassifies() {
        let handle = MemoryStorage::new();
        let mut controller =
            FormStateController::load(PersistenceStore::with_default_key(handle.clone()));
        assert_eq!(controller.band(FeatureName::Chol), RiskBand::Unclassified);

        controller.set_feature(FeatureName::Chol, "2");
        assert_eq!(controller.band(FeatureName::Chol), RiskBand::Safe);
        controller.set_feature(FeatureName::Chol, "24");
        assert_eq!(controller.band(FeatureName::Chol), RiskBand::Safe);
        controller.set_feature(FeatureName::Chol, "245");
        assert_eq!(controller.band(FeatureName::Chol), RiskBand::Danger);

        let stored = handle.raw(DEFAULT_STORAGE_KEY).unwrap();
        assert!(stored.contains("\"245\""));
    }

    #[test]
    fn patient_and_notes_are_persisted() {
        let handle = MemoryStorage::new();
        let mut controller =
            FormStateController::load(PersistenceStore::with_default_key(handle.clone()));
        controller.set_patient_name("Ada");
        controller.set_notes("smoker");

        let reloaded = FormStateController::load(PersistenceStore::with_default_key(handle));
        assert_eq!(reloaded.fields().patient_name, "Ada");
        assert_eq!(reloaded.fields().notes, "smoker");
    }

    #[test]
    fn clear_empties_everything_and_persists_nulls() {
        let handle = MemoryStorage::new();
        let mut controller =
            FormStateController::load(PersistenceStore::with_default_key(handle.clone()));
        controller.fill_preset(Preset::SampleYes);
        controller.set_patient_name("Ada");
        controller.clear();

        assert_eq!(controller.fields(), &FormFields::new());
        assert!(
            controller
                .bands()
                .iter()
                .all(|band| *band == RiskBand::Unclassified)
        );
        assert!(controller.snapshot().is_empty());
        let stored: FormSnapshot =
            serde_json::from_str(&handle.raw(DEFAULT_STORAGE_KEY).unwrap()).unwrap();
        assert!(stored.is_empty());
        assert_eq!(stored.inputs.len(), FIELD_COUNT);
    }

    #[test]
    fn save_failure_does_not_block_classification() {
        let mut controller =
            FormStateController::load(PersistenceStore::with_default_key(BrokenStorage));
        controller.set_feature(FeatureName::Age, "70");
        assert_eq!(controller.band(FeatureName::Age), RiskBand::Danger);
        assert!(controller.last_save_error().is_some());
        assert_eq!(controller.fields().feature(FeatureName::Age), "70");
    }

    #[test]
    fn report_is_blocked_without_prediction() {
        let mut controller =
            FormStateController::load(PersistenceStore::with_default_key(MemoryStorage::new()));
        assert!(matches!(
            controller.prepare_report(),
            Err(ReportError::NoPrediction)
        ));
        assert!(matches!(
            controller.begin_report(),
            Err(ReportError::NoPrediction)
        ));
    }

    #[test]
    fn cancel_pending_cancels_prediction_token() {
        let mut controller =
            FormStateController::load(PersistenceStore::with_default_key(MemoryStorage::new()));
        let ticket = controller.begin_prediction();
        assert!(controller.is_predicting());
        controller.cancel_pending();
        assert!(ticket.token().is_cancelled());

        let update = controller.finish_prediction(ticket, Err(RemoteFailure::Cancelled));
        assert!(matches!(update, SlotUpdate::Failed { .. }));
        assert_eq!(controller.panel().status().text(), Some("request cancelled"));
    }

    #[test]
    fn cancel_pending_cancels_report_token() {
        let mut controller =
            FormStateController::load(PersistenceStore::with_default_key(MemoryStorage::new()));
        let ticket = controller.begin_prediction();
        let result = PredictionResult::from_json(serde_json::json!({
            "probabilities": [0.4, 0.6],
            "prediction_by_threshold": true,
        }))
        .unwrap();
        controller.finish_prediction(ticket, Ok(result));

        let report = controller.begin_report().unwrap();
        assert_eq!(report.seq(), 1);
        controller.cancel_pending();
        assert!(report.token().is_cancelled());
    }

    #[test]
    fn config_sets_key_and_filename() {
        let handle = MemoryStorage::new();
        let mut config = PanelConfig::default();
        config.storage.key = "heart_inputs_v9".into();
        config.report.filename = "risk.pdf".into();

        let mut controller = FormStateController::from_config(handle.clone(), &config);
        controller.set_feature(FeatureName::Age, "50");
        assert!(handle.raw("heart_inputs_v9").is_some());
        assert!(handle.raw(DEFAULT_STORAGE_KEY).is_none());
        assert_eq!(controller.report_filename(), "risk.pdf");
    }
}
