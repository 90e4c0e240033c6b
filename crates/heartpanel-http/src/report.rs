//! Client for the report endpoint.

use heartpanel_core::{
    BinaryDocument, CancellationToken, RemoteFailure, ReportRequest, ReportService,
};
use reqwest::header::CONTENT_TYPE;

use crate::transport::{HttpTransport, transport_failure};

/// `POST /report` with `{"features", "patient_name", "notes"}`.
///
/// The response body is passed through untouched; the content type is
/// recorded but not enforced.
#[derive(Debug, Clone)]
pub struct ReportClient {
    transport: HttpTransport,
}

impl ReportClient {
    #[must_use]
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

impl ReportService for ReportClient {
    fn generate_report(
        &self,
        request: &ReportRequest,
        cancel: &CancellationToken,
    ) -> Result<BinaryDocument, RemoteFailure> {
        let url = self.transport.report_url();
        tracing::debug!(
            %url,
            missing = request.features.missing_count(),
            has_patient = !request.patient_name.is_empty(),
            "sending report request"
        );

        let response = self.transport.post_json(url, request, cancel)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let bytes = response.bytes().map_err(transport_failure)?;

        if cancel.is_cancelled() {
            tracing::debug!(%url, "report response dropped after cancellation");
            return Err(RemoteFailure::Cancelled);
        }
        Ok(BinaryDocument {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
