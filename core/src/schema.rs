//! Named feature-column contract shared by training and serving.
//!
//! Both models embed the schema they were fitted against, and serving
//! refuses a model whose embedded schema differs from its own. Feature
//! vectors are assembled by column name, so reordering a struct field or
//! a request key can never silently re-map a feature.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

pub const COL_RECENCY: &str = "recency";
pub const COL_FREQUENCY: &str = "frequency";
pub const COL_MONETARY: &str = "monetary";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// The canonical serving schema: the three RFM columns, in order.
    pub fn rfm() -> Self {
        Self {
            columns: vec![
                COL_RECENCY.to_string(),
                COL_FREQUENCY.to_string(),
                COL_MONETARY.to_string(),
            ],
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Fail unless `other` matches this schema exactly, names and order.
    pub fn ensure_matches(&self, other: &FeatureSchema) -> PipelineResult<()> {
        if self == other {
            Ok(())
        } else {
            Err(PipelineError::SchemaMismatch {
                expected: self.columns.join(", "),
                found:    other.columns.join(", "),
            })
        }
    }

    /// Assemble the model-input vector from named values.
    /// A missing column fails instead of silently zero-filling.
    pub fn vector(&self, values: &[(&str, f64)]) -> PipelineResult<Vec<f64>> {
        self.columns
            .iter()
            .map(|col| {
                values
                    .iter()
                    .find(|entry| entry.0 == col.as_str())
                    .map(|entry| entry.1)
                    .ok_or_else(|| PipelineError::SchemaMismatch {
                        expected: self.columns.join(", "),
                        found:    join_names(values),
                    })
            })
            .collect()
    }
}

fn join_names(values: &[(&str, f64)]) -> String {
    values
        .iter()
        .map(|entry| entry.0)
        .collect::<Vec<_>>()
        .join(", ")
}
