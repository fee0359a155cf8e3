//! Single-customer prediction.
//!
//! Pure function of the two loaded models and the customer's RFM values.
//! The feature vector is assembled through the shared schema, and both
//! models must embed that schema or prediction refuses to run.
//!
//! No bounds are applied to the day estimate. A regressor extrapolating
//! outside its training range may answer with an implausible or negative
//! number of days; downstream consumers see exactly what the model said.

use crate::error::PipelineResult;
use crate::gbdt::Gbdt;
use crate::schema::{FeatureSchema, COL_FREQUENCY, COL_MONETARY, COL_RECENCY};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub days:        f64,
}

/// Score one customer. `probability` is the classifier's positive-class
/// probability, `days` the regressor's point estimate.
pub fn predict(
    classifier: &Gbdt,
    regressor: &Gbdt,
    recency: f64,
    frequency: f64,
    monetary: f64,
) -> PipelineResult<Prediction> {
    let schema = FeatureSchema::rfm();
    schema.ensure_matches(classifier.schema())?;
    schema.ensure_matches(regressor.schema())?;

    let vector = schema.vector(&[
        (COL_RECENCY, recency),
        (COL_FREQUENCY, frequency),
        (COL_MONETARY, monetary),
    ])?;

    Ok(Prediction {
        probability: classifier.predict(&vector),
        days:        regressor.predict(&vector),
    })
}
