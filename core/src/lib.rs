//! NextBuy core — conversion prediction from retail transaction history.
//!
//! An offline pipeline turns an invoice-level transaction log into RFM
//! features and conversion targets around a cutoff date, fits a boosted
//! classifier (will they buy again?) and a boosted regressor (in how
//! many days?), and persists both to SQLite. The serving layer loads the
//! pair once at startup and maps every scored customer to one of five
//! marketing actions.

pub mod config;
pub mod decision;
pub mod error;
pub mod features;
pub mod gbdt;
pub mod inference;
pub mod loader;
pub mod pipeline;
pub mod rng;
pub mod schema;
pub mod scoring;
pub mod store;
pub mod table;
pub mod targets;
pub mod trainer;
pub mod types;
