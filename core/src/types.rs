//! Shared primitive types used across the entire pipeline.

/// A stable, unique identifier for a customer.
pub type CustomerId = String;

/// The canonical training-run identifier.
pub type RunId = String;

/// Placeholder for "no purchase observed after the cutoff".
/// Compared against, never fed to date arithmetic.
pub const SENTINEL_DAYS: u32 = 999;
