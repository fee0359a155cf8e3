//! RFM feature construction.
//!
//! Aggregates cleaned transactions into one record per customer, as of a
//! cutoff date:
//!   1. Recency — days between the cutoff and the customer's latest purchase
//!   2. Frequency — count of distinct invoices, not invoice lines
//!   3. Monetary — summed line revenue
//!   4. AvgBasketSize — mean per-line quantity
//!
//! Only transactions at or before the cutoff participate. A customer whose
//! first purchase falls after the cutoff gets no feature record at all.

use crate::loader::Transaction;
use crate::types::CustomerId;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub recency:         i64,
    pub frequency:       u32,
    pub monetary:        f64,
    pub avg_basket_size: f64,
}

struct Accumulator {
    last_purchase: NaiveDateTime,
    invoices:      BTreeSet<String>,
    monetary:      f64,
    quantity_sum:  i64,
    line_count:    u32,
}

/// Compute the per-customer feature table for the history window.
/// Recomputed wholesale each run, never updated incrementally.
pub fn build_features(
    transactions: &[Transaction],
    cutoff: NaiveDateTime,
) -> BTreeMap<CustomerId, FeatureRecord> {
    let mut by_customer: BTreeMap<CustomerId, Accumulator> = BTreeMap::new();

    for t in transactions.iter().filter(|t| t.invoiced_at <= cutoff) {
        let acc = by_customer
            .entry(t.customer_id.clone())
            .or_insert_with(|| Accumulator {
                last_purchase: t.invoiced_at,
                invoices:      BTreeSet::new(),
                monetary:      0.0,
                quantity_sum:  0,
                line_count:    0,
            });
        if t.invoiced_at > acc.last_purchase {
            acc.last_purchase = t.invoiced_at;
        }
        acc.invoices.insert(t.invoice_id.clone());
        acc.monetary += t.line_revenue;
        acc.quantity_sum += t.quantity;
        acc.line_count += 1;
    }

    let features: BTreeMap<CustomerId, FeatureRecord> = by_customer
        .into_iter()
        .map(|(customer_id, acc)| {
            let record = FeatureRecord {
                recency:         (cutoff - acc.last_purchase).num_days(),
                frequency:       acc.invoices.len() as u32,
                monetary:        acc.monetary,
                avg_basket_size: acc.quantity_sum as f64 / acc.line_count as f64,
            };
            (customer_id, record)
        })
        .collect();

    log::info!("features: {} customers in the history window", features.len());
    features
}
