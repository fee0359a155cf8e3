//! The training pipeline — end-to-end batch orchestration.
//!
//! STAGE ORDER (fixed, documented, never reordered):
//!   1. Load and clean raw transactions
//!   2. Derive the cutoff from the dataset's max date and the horizon
//!   3. Build RFM features over the history window
//!   4. Build conversion targets over the future window
//!   5. Assemble the training table (left join, sentinel fill)
//!   6. Fit and evaluate both models on one shared split
//!   7. Persist the run row, the metrics, and both artifacts
//!
//! RULES:
//!   - Any stage failure aborts the whole run.
//!   - Nothing is persisted until both fits and the evaluation are done,
//!     so the store never holds half a model pair.
//!   - All randomness flows through SplitRng.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::features::build_features;
use crate::loader::load_transactions;
use crate::store::{ModelStore, KEY_CLASSIFIER, KEY_REGRESSOR};
use crate::table::build_training_table;
use crate::targets::build_targets;
use crate::trainer::{train, EvalMetrics};
use crate::types::RunId;
use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// What a completed training run looked like.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub run_id:       RunId,
    pub cutoff:       NaiveDateTime,
    pub transactions: usize,
    pub customers:    usize,
    pub metrics:      EvalMetrics,
}

/// Run the whole pipeline against one raw source file.
/// Returns the report the runner prints as its summary.
pub fn run_training(
    config: &PipelineConfig,
    source_path: &str,
    store: &ModelStore,
) -> PipelineResult<TrainReport> {
    let transactions = load_transactions(source_path)?;
    let max_date = transactions
        .iter()
        .map(|t| t.invoiced_at)
        .max()
        .ok_or_else(|| PipelineError::DegenerateTrainingSet {
            reason: "no transactions survived cleaning".to_string(),
        })?;
    let cutoff = max_date - Duration::days(config.horizon_days);
    log::info!(
        "pipeline: cutoff {cutoff} ({} days before {max_date})",
        config.horizon_days
    );

    let features = build_features(&transactions, cutoff);
    let targets = build_targets(&transactions, cutoff);
    let table = build_training_table(&features, &targets);
    let bundle = train(&table, config)?;

    let run_id: RunId = Uuid::new_v4().to_string();
    store.insert_run(
        &run_id,
        config.seed,
        PIPELINE_VERSION,
        source_path,
        cutoff,
        config.horizon_days,
    )?;
    store.save_model(KEY_CLASSIFIER, &bundle.classifier, &run_id)?;
    store.save_model(KEY_REGRESSOR, &bundle.regressor, &run_id)?;
    store.record_metrics(&run_id, &bundle.metrics)?;
    log::info!("pipeline: run {run_id} persisted");

    Ok(TrainReport {
        run_id,
        cutoff,
        transactions: transactions.len(),
        customers: table.len(),
        metrics: bundle.metrics,
    })
}
