//! Serving-time scoring.
//!
//! The model pair is loaded from the store exactly once, at startup, and
//! never reloaded. A store missing either artifact fails construction,
//! so a process that starts is always ready to answer. Individual
//! requests can fail; the loaded pair cannot be corrupted by them, and
//! `score` takes `&self` so concurrent callers share it freely.

use crate::decision;
use crate::error::{PipelineError, PipelineResult};
use crate::gbdt::Gbdt;
use crate::inference;
use crate::schema::FeatureSchema;
use crate::store::{ModelStore, KEY_CLASSIFIER, KEY_REGRESSOR};
use serde::{Deserialize, Serialize};

/// A scoring request. The field names are the serving contract.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    #[serde(rename = "Recency")]
    pub recency:   f64,
    #[serde(rename = "Frequency")]
    pub frequency: f64,
    #[serde(rename = "Monetary")]
    pub monetary:  f64,
}

impl ScoreRequest {
    /// Parse the serving payload. Anything short of three numeric
    /// fields is a malformed request, never a crash.
    pub fn from_json(raw: &str) -> PipelineResult<Self> {
        serde_json::from_str(raw).map_err(|e| PipelineError::MalformedRequest {
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResponse {
    pub probability_to_convert: f64,
    pub estimated_days_to_buy:  f64,
    pub recommended_action:     String,
}

#[derive(Debug)]
pub struct Scorer {
    classifier: Gbdt,
    regressor:  Gbdt,
}

impl Scorer {
    /// Load both artifacts and verify their embedded schemas.
    /// Startup is the only place this can fail.
    pub fn load(store: &ModelStore) -> PipelineResult<Self> {
        let classifier = store.load_model(KEY_CLASSIFIER)?;
        let regressor = store.load_model(KEY_REGRESSOR)?;
        let schema = FeatureSchema::rfm();
        schema.ensure_matches(classifier.schema())?;
        schema.ensure_matches(regressor.schema())?;
        log::info!(
            "scorer: loaded classifier ({} trees) and regressor ({} trees)",
            classifier.tree_count(),
            regressor.tree_count()
        );
        Ok(Self {
            classifier,
            regressor,
        })
    }

    /// Score one request: predict, decide, round. The decision rules see
    /// the raw prediction; rounding applies to the response only.
    pub fn score(&self, request: &ScoreRequest) -> PipelineResult<ScoreResponse> {
        let prediction = inference::predict(
            &self.classifier,
            &self.regressor,
            request.recency,
            request.frequency,
            request.monetary,
        )?;
        let decision = decision::decide(prediction.probability, prediction.days, request.monetary);
        Ok(ScoreResponse {
            probability_to_convert: round_to(prediction.probability, 4),
            estimated_days_to_buy:  round_to(prediction.days, 1),
            recommended_action:     decision.message,
        })
    }

    /// One request in, one response line out.
    pub fn score_json(&self, raw: &str) -> PipelineResult<String> {
        let request = ScoreRequest::from_json(raw)?;
        let response = self.score(&request)?;
        Ok(serde_json::to_string(&response)?)
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}
