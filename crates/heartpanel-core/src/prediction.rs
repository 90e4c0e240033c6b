//! Prediction results and the single "last prediction" slot.
//!
//! # Ordering
//!
//! Requests are not serialized: the user may submit again while an earlier
//! request is still in flight, and responses may arrive in any order. Every
//! dispatch therefore takes a [`PredictTicket`] carrying a monotonically
//! increasing sequence number. On completion the slot accepts the outcome
//! only if no newer ticket has been dispatched since; older outcomes are
//! reported as [`SlotUpdate::Stale`] and dropped. The last-dispatched request
//! wins regardless of arrival order.
//!
//! Dispatching a new ticket also cancels the previous ticket's token so a
//! service that has not yet sent can skip the round trip.
//!
//! The slot is owned by the controller and mutated through `&mut self`, so
//! there is exactly one writer per turn of the host event loop.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cancellation::{CancellationSource, CancellationToken};
use crate::error::RemoteFailure;
use crate::fields::FeatureName;
use crate::snapshot::FeatureVector;

/// Probability of each class: 0 = no disease, 1 = disease.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub p0: f64,
    pub p1: f64,
}

impl ClassProbabilities {
    #[must_use]
    pub fn get(&self, class: u8) -> Option<f64> {
        match class {
            0 => Some(self.p0),
            1 => Some(self.p1),
            _ => None,
        }
    }
}

/// Decoded success payload of the predict endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub probabilities: ClassProbabilities,
    /// The server's thresholded decision. Authoritative for the verdict,
    /// whatever the probabilities say.
    pub thresholded_verdict: bool,
    pub threshold_used: Option<f64>,
    pub model_raw: Option<i64>,
    pub feature_order: Option<Vec<String>>,
    /// Response body as received, for the raw JSON panel.
    pub raw: Value,
}

#[derive(Deserialize)]
struct WirePrediction {
    probabilities: WireProbabilities,
    prediction_by_threshold: WireFlag,
    #[serde(default)]
    threshold_used: Option<f64>,
    #[serde(default)]
    prediction_model_raw: Option<i64>,
    #[serde(default)]
    feature_order: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireProbabilities {
    List(Vec<f64>),
    Map(HashMap<String, f64>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireFlag {
    Bool(bool),
    Code(i64),
}

fn checked_probability(value: Option<f64>, class: u8) -> Result<f64, RemoteFailure> {
    match value {
        Some(p) if (0.0..=1.0).contains(&p) => Ok(p),
        Some(p) => Err(RemoteFailure::malformed(format!(
            "probability for class {class} out of range: {p}"
        ))),
        None => Err(RemoteFailure::malformed(format!(
            "missing probability for class {class}"
        ))),
    }
}

impl PredictionResult {
    /// Decode a predict response body.
    ///
    /// `probabilities` may be a `{"0": p0, "1": p1}` object or a `[p0, p1]`
    /// list; `prediction_by_threshold` may be a boolean or `0`/`1`.
    pub fn from_json(raw: Value) -> Result<Self, RemoteFailure> {
        let wire: WirePrediction = serde_json::from_value(raw.clone())
            .map_err(|e| RemoteFailure::malformed(e.to_string()))?;

        let (p0, p1) = match wire.probabilities {
            WireProbabilities::List(list) => {
                if list.len() != 2 {
                    return Err(RemoteFailure::malformed(format!(
                        "expected 2 class probabilities, got {}",
                        list.len()
                    )));
                }
                (Some(list[0]), Some(list[1]))
            }
            WireProbabilities::Map(map) => (map.get("0").copied(), map.get("1").copied()),
        };
        let probabilities = ClassProbabilities {
            p0: checked_probability(p0, 0)?,
            p1: checked_probability(p1, 1)?,
        };

        let thresholded_verdict = match wire.prediction_by_threshold {
            WireFlag::Bool(flag) => flag,
            WireFlag::Code(0) => false,
            WireFlag::Code(1) => true,
            WireFlag::Code(other) => {
                return Err(RemoteFailure::malformed(format!(
                    "prediction_by_threshold must be 0 or 1, got {other}"
                )));
            }
        };

        let result = Self {
            probabilities,
            thresholded_verdict,
            threshold_used: wire.threshold_used,
            model_raw: wire.prediction_model_raw,
            feature_order: wire.feature_order,
            raw,
        };
        if !result.feature_order_matches() {
            tracing::warn!(
                server = ?result.feature_order,
                "server feature order differs from the local registry"
            );
        }
        Ok(result)
    }

    pub fn from_json_str(body: &str) -> Result<Self, RemoteFailure> {
        let raw: Value =
            serde_json::from_str(body).map_err(|e| RemoteFailure::malformed(e.to_string()))?;
        Self::from_json(raw)
    }

    /// `true` unless the server reported a feature order different from ours.
    #[must_use]
    pub fn feature_order_matches(&self) -> bool {
        self.feature_order
            .as_ref()
            .is_none_or(|order| order.iter().map(String::as_str).eq(FeatureName::names()))
    }
}

/// Remote model behind the predict endpoint.
pub trait PredictionService {
    fn predict(
        &self,
        features: &FeatureVector,
        cancel: &CancellationToken,
    ) -> Result<PredictionResult, RemoteFailure>;
}

/// Handle for one dispatched predict request.
#[derive(Debug)]
pub struct PredictTicket {
    seq: u64,
    features: FeatureVector,
    token: CancellationToken,
}

impl PredictTicket {
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Feature vector captured when the request was dispatched.
    #[must_use]
    pub fn features(&self) -> &FeatureVector {
        &self.features
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// A prediction accepted into the slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub seq: u64,
    pub features: FeatureVector,
    pub result: PredictionResult,
}

/// Outcome of [`PredictionSlot::complete`].
#[derive(Debug, Clone, PartialEq)]
pub enum SlotUpdate {
    /// The result replaced the last prediction.
    Applied { seq: u64 },
    /// The latest request failed; the last prediction is unchanged.
    Failed { seq: u64, failure: RemoteFailure },
    /// A newer request was dispatched; this outcome was dropped.
    Stale { seq: u64, latest: u64 },
}

#[derive(Debug, Default)]
pub struct PredictionSlot {
    latest_dispatched: u64,
    in_flight: Option<CancellationSource>,
    last: Option<PredictionRecord>,
}

impl PredictionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new request, superseding any in flight.
    pub fn dispatch(&mut self, features: FeatureVector) -> PredictTicket {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        self.latest_dispatched += 1;
        let source = CancellationSource::new();
        let ticket = PredictTicket {
            seq: self.latest_dispatched,
            features,
            token: source.token(),
        };
        self.in_flight = Some(source);
        ticket
    }

    /// Apply the outcome of `ticket`'s request if it is still the latest.
    pub fn complete(
        &mut self,
        ticket: PredictTicket,
        outcome: Result<PredictionResult, RemoteFailure>,
    ) -> SlotUpdate {
        let seq = ticket.seq;
        if seq != self.latest_dispatched {
            return SlotUpdate::Stale {
                seq,
                latest: self.latest_dispatched,
            };
        }
        self.in_flight = None;
        match outcome {
            Ok(result) => {
                self.last = Some(PredictionRecord {
                    seq,
                    features: ticket.features,
                    result,
                });
                SlotUpdate::Applied { seq }
            }
            Err(failure) => SlotUpdate::Failed { seq, failure },
        }
    }

    /// Cancel the token of the in-flight request, if any.
    ///
    /// The ticket stays current: its eventual outcome (normally
    /// [`RemoteFailure::Cancelled`]) is still applied by [`complete`](Self::complete).
    pub fn cancel_in_flight(&mut self) -> bool {
        match &self.in_flight {
            Some(source) => {
                source.cancel();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn last(&self) -> Option<&PredictionRecord> {
        self.last.as_ref()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn latest_dispatched(&self) -> u64 {
        self.latest_dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(p1: f64, verdict: bool) -> PredictionResult {
        PredictionResult::from_json(json!({
            "probabilities": {"0": 1.0 - p1, "1": p1},
            "prediction_by_threshold": verdict,
        }))
        .unwrap()
    }

    #[test]
    fn decodes_mapping_form() {
        let decoded = result(0.7, true);
        assert!((decoded.probabilities.p1 - 0.7).abs() < 1e-12);
        assert!(decoded.thresholded_verdict);
        assert_eq!(decoded.threshold_used, None);
        assert!(decoded.feature_order_matches());
    }

    #[test]
    fn decodes_list_form_with_integer_verdict() {
        let decoded = PredictionResult::from_json(json!({
            "prediction_model_raw": 0,
            "prediction_by_threshold": 1,
            "probabilities": [0.55, 0.45],
            "feature_order": FeatureName::names().collect::<Vec<_>>(),
            "threshold_used": 0.4,
        }))
        .unwrap();
        assert_eq!(decoded.probabilities.get(0), Some(0.55));
        assert_eq!(decoded.probabilities.get(1), Some(0.45));
        assert_eq!(decoded.probabilities.get(2), None);
        assert!(decoded.thresholded_verdict);
        assert_eq!(decoded.threshold_used, Some(0.4));
        assert_eq!(decoded.model_raw, Some(0));
        assert!(decoded.feature_order_matches());
    }

    #[test]
    fn detects_foreign_feature_order() {
        let decoded = PredictionResult::from_json(json!({
            "probabilities": [0.5, 0.5],
            "prediction_by_threshold": false,
            "feature_order": ["sex", "age"],
        }))
        .unwrap();
        assert!(!decoded.feature_order_matches());
    }

    #[test]
    fn rejects_malformed_payloads() {
        let cases = [
            json!({"prediction_by_threshold": true}),
            json!({"probabilities": [0.5], "prediction_by_threshold": true}),
            json!({"probabilities": {"1": 0.5}, "prediction_by_threshold": true}),
            json!({"probabilities": [0.5, 1.5], "prediction_by_threshold": true}),
            json!({"probabilities": [0.5, 0.5], "prediction_by_threshold": 2}),
            json!({"probabilities": [0.5, 0.5], "prediction_by_threshold": "yes"}),
        ];
        for case in cases {
            let err = PredictionResult::from_json(case.clone()).unwrap_err();
            assert!(
                matches!(err, RemoteFailure::MalformedResponse(_)),
                "{case} -> {err:?}"
            );
        }
        assert!(PredictionResult::from_json_str("<html>").is_err());
    }

    #[test]
    fn latest_dispatch_wins_even_when_it_arrives_first() {
        let mut slot = PredictionSlot::new();
        let first = slot.dispatch(FeatureVector::default());
        let second = slot.dispatch(FeatureVector::default());
        assert!(first.token().is_cancelled());
        assert!(!second.token().is_cancelled());

        assert_eq!(
            slot.complete(second, Ok(result(0.2, false))),
            SlotUpdate::Applied { seq: 2 }
        );
        assert_eq!(
            slot.complete(first, Ok(result(0.9, true))),
            SlotUpdate::Stale { seq: 1, latest: 2 }
        );
        let last = slot.last().unwrap();
        assert_eq!(last.seq, 2);
        assert!(!last.result.thresholded_verdict);
        assert!(!slot.is_pending());
    }

    #[test]
    fn failure_keeps_previous_prediction() {
        let mut slot = PredictionSlot::new();
        let ok = slot.dispatch(FeatureVector::default());
        slot.complete(ok, Ok(result(0.3, false)));

        let failing = slot.dispatch(FeatureVector::default());
        assert!(slot.is_pending());
        let update = slot.complete(failing, Err(RemoteFailure::Timeout));
        assert_eq!(
            update,
            SlotUpdate::Failed {
                seq: 2,
                failure: RemoteFailure::Timeout
            }
        );
        assert_eq!(slot.last().unwrap().seq, 1);
        assert!(!slot.is_pending());
    }
}
