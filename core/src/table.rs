//! Training table assembly.
//!
//! Left join from the feature table to the target table on customer id.
//! Every customer in the history window yields exactly one row; customers
//! with no post-cutoff purchase are filled with the sentinel target. Rows
//! come out sorted by customer id so the seeded split sees the same order
//! on every run and platform.

use crate::features::FeatureRecord;
use crate::schema::{COL_FREQUENCY, COL_MONETARY, COL_RECENCY};
use crate::targets::TargetRecord;
use crate::types::CustomerId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub customer_id:           CustomerId,
    pub recency:               i64,
    pub frequency:             u32,
    pub monetary:              f64,
    pub avg_basket_size:       f64,
    pub will_convert:          bool,
    pub days_to_next_purchase: u32,
}

impl TrainingRow {
    /// Model inputs as named values, consumed through a FeatureSchema.
    /// AvgBasketSize stays a reporting column, never a model input.
    pub fn named_features(&self) -> [(&'static str, f64); 3] {
        [
            (COL_RECENCY, self.recency as f64),
            (COL_FREQUENCY, f64::from(self.frequency)),
            (COL_MONETARY, self.monetary),
        ]
    }
}

pub fn build_training_table(
    features: &BTreeMap<CustomerId, FeatureRecord>,
    targets: &BTreeMap<CustomerId, TargetRecord>,
) -> Vec<TrainingRow> {
    let rows: Vec<TrainingRow> = features
        .iter()
        .map(|(customer_id, f)| {
            let target = targets
                .get(customer_id)
                .copied()
                .unwrap_or_else(TargetRecord::sentinel);
            TrainingRow {
                customer_id:           customer_id.clone(),
                recency:               f.recency,
                frequency:             f.frequency,
                monetary:              f.monetary,
                avg_basket_size:       f.avg_basket_size,
                will_convert:          target.will_convert,
                days_to_next_purchase: target.days_to_next_purchase,
            }
        })
        .collect();

    let converters = rows.iter().filter(|r| r.will_convert).count();
    log::info!("table: {} rows, {converters} converters", rows.len());
    rows
}
