//! Estimation result modules
//!
//! - Result types (candidates and their ranking)
//! - Metadata describing how an estimation was run
//! - Confidence scoring

pub mod confidence;
pub mod metadata;
pub mod result;
