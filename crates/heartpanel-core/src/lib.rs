#![forbid(unsafe_code)]

//! State engine for the heart-disease risk input panel.
//!
//! # Role
//!
//! The panel collects thirteen clinical feature values, keeps them in a
//! durable local slot, bands each value into a visual risk class, submits
//! the vector to a remote predict endpoint, renders the returned
//! probability, and requests a downloadable report. This crate owns all of
//! that state; it performs no I/O of its own beyond the
//! [`StorageBackend`](storage::StorageBackend) it is given, and reaches the
//! network only through the [`PredictionService`](prediction::PredictionService)
//! and [`ReportService`](report::ReportService) traits (see `heartpanel-http`
//! for the HTTP implementations).
//!
//! # Flow
//!
//! ```text
//! fields ─▶ FormStateController ──(every edit)──▶ classify_all + PersistenceStore::save
//!                 │
//!                 ├─ begin_prediction ─▶ PredictionService ─▶ finish_prediction ─▶ ResultPanel
//!                 │
//!                 └─ prepare_report / confirm_report ─▶ ReportService ─▶ ReportDownload
//! ```
//!
//! # Example
//!
//! ```
//! use heartpanel_core::{FeatureName, FormStateController, MemoryStorage, PersistenceStore, RiskBand};
//!
//! let store = PersistenceStore::with_default_key(MemoryStorage::new());
//! let mut panel = FormStateController::load(store);
//! panel.set_feature(FeatureName::Chol, "233");
//! assert_eq!(panel.band(FeatureName::Chol), RiskBand::Warning);
//! ```

pub mod cancellation;
pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod fields;
pub mod prediction;
pub mod presenter;
pub mod report;
pub mod snapshot;
pub mod storage;

pub use cancellation::{CancellationSource, CancellationToken};
pub use classify::{RiskBand, classify, classify_all, classify_value, parse_feature};
pub use config::{PanelConfig, ReportConfig, ServiceConfig, StorageConfig};
pub use controller::{FormStateController, ReportTicket};
pub use error::{
    ConfigError, NO_PREDICTION_NOTICE, RemoteFailure, ReportError, StorageError, StorageResult,
};
pub use fields::{FIELD_COUNT, FeatureName, FocusTarget, Preset, focus_after};
pub use prediction::{
    ClassProbabilities, PredictTicket, PredictionRecord, PredictionResult, PredictionService,
    PredictionSlot, SlotUpdate,
};
pub use presenter::{ResultPanel, ResultStatus, ResultView, Verdict};
pub use report::{
    BinaryDocument, ReportConfirmation, ReportDownload, ReportRequest, ReportService,
};
pub use snapshot::{FeatureVector, FormFields, FormSnapshot};
pub use storage::{
    DEFAULT_STORAGE_KEY, FileStorage, MemoryStorage, PersistenceStore, StorageBackend,
};
