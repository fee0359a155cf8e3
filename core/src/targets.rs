//! Conversion target construction.
//!
//! Looks strictly after the cutoff and answers, per customer: did they
//! purchase again, and if so how many days out? Customers with no
//! post-cutoff activity are filled in at join time with the sentinel.
//!
//! The future window is bounded by the data itself, not by the horizon.
//! The horizon's only job is deriving the cutoff upstream, so a purchase
//! landing past cutoff + horizon still counts as a conversion.

use crate::loader::Transaction;
use crate::types::{CustomerId, SENTINEL_DAYS};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRecord {
    pub will_convert:          bool,
    pub days_to_next_purchase: u32,
}

impl TargetRecord {
    /// A customer observed purchasing `days` after the cutoff.
    pub fn converted(days: u32) -> Self {
        Self {
            will_convert:          true,
            days_to_next_purchase: days,
        }
    }

    /// A customer never seen again after the cutoff.
    pub fn sentinel() -> Self {
        Self {
            will_convert:          false,
            days_to_next_purchase: SENTINEL_DAYS,
        }
    }
}

/// Build targets for every customer with at least one post-cutoff purchase.
/// Days are measured to the earliest such purchase, truncated to whole days
/// (a purchase later the same day counts as day zero).
pub fn build_targets(
    transactions: &[Transaction],
    cutoff: NaiveDateTime,
) -> BTreeMap<CustomerId, TargetRecord> {
    let mut earliest_future: BTreeMap<CustomerId, NaiveDateTime> = BTreeMap::new();

    for t in transactions.iter().filter(|t| t.invoiced_at > cutoff) {
        earliest_future
            .entry(t.customer_id.clone())
            .and_modify(|first| {
                if t.invoiced_at < *first {
                    *first = t.invoiced_at;
                }
            })
            .or_insert(t.invoiced_at);
    }

    let targets: BTreeMap<CustomerId, TargetRecord> = earliest_future
        .into_iter()
        .map(|(customer_id, first)| {
            let days = (first - cutoff).num_days().max(0) as u32;
            (customer_id, TargetRecord::converted(days))
        })
        .collect();

    log::info!(
        "targets: {} customers purchased again after the cutoff",
        targets.len()
    );
    targets
}
