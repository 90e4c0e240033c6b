//! Client for the predict endpoint.

use heartpanel_core::{
    CancellationToken, FeatureVector, PredictionResult, PredictionService, RemoteFailure,
};
use serde::Serialize;

use crate::transport::{HttpTransport, transport_failure};

#[derive(Debug, Serialize)]
struct PredictBody<'a> {
    features: &'a FeatureVector,
}

/// `POST /predict` with `{"features": [...]}`.
///
/// Missing values go out as `null`; validating them is the server's job.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    transport: HttpTransport,
}

impl PredictionClient {
    #[must_use]
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }
}

impl PredictionService for PredictionClient {
    fn predict(
        &self,
        features: &FeatureVector,
        cancel: &CancellationToken,
    ) -> Result<PredictionResult, RemoteFailure> {
        let url = self.transport.predict_url();
        tracing::debug!(%url, missing = features.missing_count(), "sending predict request");

        let response = self
            .transport
            .post_json(url, &PredictBody { features }, cancel)?;
        let body = response.text().map_err(transport_failure)?;

        if cancel.is_cancelled() {
            tracing::debug!(%url, "predict response dropped after cancellation");
            return Err(RemoteFailure::Cancelled);
        }
        PredictionResult::from_json_str(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heartpanel_core::{CancellationSource, ServiceConfig};

    #[test]
    fn body_serializes_features_in_order_with_nulls() {
        let mut values = [Some(1.0); 13];
        values[0] = Some(63.0);
        values[4] = None;
        let vector = FeatureVector::new(values);
        let json = serde_json::to_value(PredictBody { features: &vector }).unwrap();
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 13);
        assert_eq!(features[0], serde_json::json!(63.0));
        assert!(features[4].is_null());
    }

    #[test]
    fn cancelled_token_short_circuits_before_connecting() {
        let config = ServiceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..ServiceConfig::default()
        };
        let client = PredictionClient::new(HttpTransport::new(&config).unwrap());
        let source = CancellationSource::new();
        source.cancel();
        let outcome = client.predict(&FeatureVector::default(), &source.token());
        assert_eq!(outcome.unwrap_err(), RemoteFailure::Cancelled);
    }
}
