#![forbid(unsafe_code)]

//! Blocking HTTP clients for the heart-risk predict and report endpoints.
//!
//! [`PredictionClient`] and [`ReportClient`] implement the service traits
//! of `heartpanel-core` over one shared [`HttpTransport`]. Request-time
//! failures come back as [`RemoteFailure`](heartpanel_core::RemoteFailure),
//! so the controller handles a refused connection and a `400` the same way.
//!
//! ```no_run
//! use heartpanel_core::{FormStateController, MemoryStorage, PanelConfig, Preset};
//! use heartpanel_http::{HttpTransport, PredictionClient};
//!
//! let config = PanelConfig::default();
//! let transport = HttpTransport::new(&config.service)?;
//! let predictor = PredictionClient::new(transport);
//!
//! let mut panel = FormStateController::from_config(MemoryStorage::new(), &config);
//! panel.fill_preset(Preset::SampleYes);
//! panel.submit_prediction(&predictor);
//! # Ok::<(), heartpanel_http::HttpError>(())
//! ```

pub mod error;
pub mod predict;
pub mod report;
pub mod transport;

pub use error::{HttpError, Result};
pub use predict::PredictionClient;
pub use report::ReportClient;
pub use transport::HttpTransport;
