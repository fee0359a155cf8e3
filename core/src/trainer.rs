//! Dual-model training.
//!
//! One seeded, shared train/test split feeds both fits:
//!   1. Classifier — Logistic objective over every training row
//!   2. Regressor — SquaredError objective over training-row converters only
//!
//! The regressor never sees a sentinel row. Fitting it on sentinel days
//! would teach it to answer ~999 for everyone, so the converter mask is a
//! correctness requirement, not a tuning choice.
//!
//! Evaluation: classification accuracy on the held-out rows at the 0.5
//! threshold, MAE in days on held-out converters. A test partition with no
//! converters skips the MAE (warned, never fatal); a training partition
//! with no converters aborts before anything is fitted.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::gbdt::{Gbdt, Objective};
use crate::rng::{SplitRng, SPLIT_STREAM};
use crate::schema::FeatureSchema;
use crate::table::TrainingRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub train_rows:       usize,
    pub test_rows:        usize,
    pub train_converters: usize,
    pub test_converters:  usize,
    pub accuracy:         f64,
    pub mae_days:         Option<f64>,
}

#[derive(Debug)]
pub struct TrainedBundle {
    pub classifier: Gbdt,
    pub regressor:  Gbdt,
    pub metrics:    EvalMetrics,
}

/// Reproducible row-level split: shuffle 0..n with the seeded stream and
/// hold out ceil(n * fraction) rows for testing. Both models reuse the
/// same assignment, so a row is never train for one and test for the
/// other.
pub fn split_indices(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = SplitRng::new(seed, SPLIT_STREAM);
    rng.shuffle(&mut indices);
    let n_test = ((n as f64) * fraction).ceil() as usize;
    let test = indices[..n_test.min(n)].to_vec();
    let train = indices[n_test.min(n)..].to_vec();
    (train, test)
}

pub fn train(table: &[TrainingRow], config: &PipelineConfig) -> PipelineResult<TrainedBundle> {
    if table.is_empty() {
        return Err(PipelineError::DegenerateTrainingSet {
            reason: "training table is empty".to_string(),
        });
    }

    let schema = FeatureSchema::rfm();
    let vectors: Vec<Vec<f64>> = table
        .iter()
        .map(|row| schema.vector(&row.named_features()))
        .collect::<PipelineResult<_>>()?;

    let (train_idx, test_idx) = split_indices(table.len(), config.test_fraction, config.seed);
    if train_idx.is_empty() {
        return Err(PipelineError::DegenerateTrainingSet {
            reason: format!(
                "no rows left to train on with test_fraction {}",
                config.test_fraction
            ),
        });
    }
    if test_idx.is_empty() {
        return Err(PipelineError::DegenerateTrainingSet {
            reason: format!(
                "no rows held out with test_fraction {}",
                config.test_fraction
            ),
        });
    }

    let converter_train_idx: Vec<usize> = train_idx
        .iter()
        .copied()
        .filter(|&i| table[i].will_convert)
        .collect();
    if converter_train_idx.is_empty() {
        return Err(PipelineError::DegenerateTrainingSet {
            reason: "no converters in the training partition".to_string(),
        });
    }

    log::info!(
        "trainer: split {} train / {} test rows (seed {})",
        train_idx.len(),
        test_idx.len(),
        config.seed
    );

    let clf_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| vectors[i].clone()).collect();
    let clf_labels: Vec<f64> = train_idx
        .iter()
        .map(|&i| if table[i].will_convert { 1.0 } else { 0.0 })
        .collect();
    let classifier = Gbdt::fit(
        Objective::Logistic,
        schema.clone(),
        &clf_rows,
        &clf_labels,
        &config.boost,
    );

    let reg_rows: Vec<Vec<f64>> = converter_train_idx
        .iter()
        .map(|&i| vectors[i].clone())
        .collect();
    let reg_labels: Vec<f64> = converter_train_idx
        .iter()
        .map(|&i| f64::from(table[i].days_to_next_purchase))
        .collect();
    let regressor = Gbdt::fit(
        Objective::SquaredError,
        schema.clone(),
        &reg_rows,
        &reg_labels,
        &config.boost,
    );

    let mut correct = 0_usize;
    for &i in &test_idx {
        let predicted = classifier.predict(&vectors[i]) > 0.5;
        if predicted == table[i].will_convert {
            correct += 1;
        }
    }
    let accuracy = correct as f64 / test_idx.len() as f64;

    let converter_test_idx: Vec<usize> = test_idx
        .iter()
        .copied()
        .filter(|&i| table[i].will_convert)
        .collect();
    let mae_days = if converter_test_idx.is_empty() {
        log::warn!("trainer: no converters held out, skipping regression evaluation");
        None
    } else {
        let total: f64 = converter_test_idx
            .iter()
            .map(|&i| {
                (regressor.predict(&vectors[i]) - f64::from(table[i].days_to_next_purchase)).abs()
            })
            .sum();
        Some(total / converter_test_idx.len() as f64)
    };

    let metrics = EvalMetrics {
        train_rows:       train_idx.len(),
        test_rows:        test_idx.len(),
        train_converters: converter_train_idx.len(),
        test_converters:  converter_test_idx.len(),
        accuracy,
        mae_days,
    };
    match metrics.mae_days {
        Some(mae) => log::info!(
            "trainer: accuracy={:.4} mae_days={:.2} ({} trees per model)",
            metrics.accuracy,
            mae,
            classifier.tree_count()
        ),
        None => log::info!(
            "trainer: accuracy={:.4} mae_days=skipped ({} trees per model)",
            metrics.accuracy,
            classifier.tree_count()
        ),
    }

    Ok(TrainedBundle {
        classifier,
        regressor,
        metrics,
    })
}
