//! Shared blocking client and response classification.

use heartpanel_core::{CancellationToken, RemoteFailure, ServiceConfig};
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::{HttpError, Result};

/// One blocking client plus the resolved endpoint URLs.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    predict_url: Url,
    report_url: Url,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let predict_url = parse_endpoint(&config.predict_url())?;
        let report_url = parse_endpoint(&config.report_url())?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        tracing::debug!(
            predict = %predict_url,
            report = %report_url,
            timeout_ms = config.request_timeout_ms,
            "http transport ready"
        );
        Ok(Self {
            client,
            predict_url,
            report_url,
        })
    }

    #[must_use]
    pub fn predict_url(&self) -> &Url {
        &self.predict_url
    }

    #[must_use]
    pub fn report_url(&self) -> &Url {
        &self.report_url
    }

    /// POST `body` as JSON and return the response if it is a success.
    ///
    /// Checks `cancel` before sending. Sends exactly once.
    pub(crate) fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &B,
        cancel: &CancellationToken,
    ) -> std::result::Result<Response, RemoteFailure> {
        if cancel.is_cancelled() {
            tracing::debug!(%url, "request cancelled before send");
            return Err(RemoteFailure::Cancelled);
        }

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .map_err(transport_failure)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().unwrap_or_default();
        let failure = RemoteFailure::server(
            status.as_u16(),
            server_message(status.as_u16(), &text),
        );
        tracing::warn!(%url, status = status.as_u16(), %failure, "endpoint rejected request");
        Err(failure)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| HttpError::invalid_url(raw, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HttpError::invalid_url(
            raw,
            format!("unsupported scheme {other:?}"),
        )),
    }
}

/// Map a request-time client error into the shared failure vocabulary.
pub(crate) fn transport_failure(error: reqwest::Error) -> RemoteFailure {
    if error.is_timeout() {
        RemoteFailure::Timeout
    } else {
        RemoteFailure::Transport(error.to_string())
    }
}

/// The body's `error` string verbatim, or a generic message naming the status.
pub(crate) fn server_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| format!("server returned HTTP {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_uses_error_field_verbatim() {
        assert_eq!(
            server_message(400, r#"{"error": "Expected 13 features"}"#),
            "Expected 13 features"
        );
    }

    #[test]
    fn server_message_falls_back_on_missing_error() {
        assert_eq!(server_message(500, ""), "server returned HTTP 500");
        assert_eq!(
            server_message(502, "<html>bad gateway</html>"),
            "server returned HTTP 502"
        );
        assert_eq!(server_message(400, r#"{"error": 7}"#), "server returned HTTP 400");
    }

    #[test]
    fn transport_resolves_default_endpoints() {
        let transport = HttpTransport::new(&ServiceConfig::default()).unwrap();
        assert_eq!(
            transport.predict_url().as_str(),
            "http://127.0.0.1:5000/predict"
        );
        assert_eq!(
            transport.report_url().as_str(),
            "http://127.0.0.1:5000/report"
        );
    }

    #[test]
    fn transport_rejects_bad_base_url() {
        let config = ServiceConfig {
            base_url: "not a url".to_string(),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(HttpError::InvalidUrl { .. })
        ));

        let config = ServiceConfig {
            base_url: "ftp://models.local".to_string(),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(HttpError::InvalidUrl { .. })
        ));
    }
}
