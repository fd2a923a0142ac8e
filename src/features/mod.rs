//! Feature extraction modules
//!
//! This module contains the signal analysis stages:
//! - Onset strength extraction
//! - Periodicity analysis and candidate resolution (BPM detection)

pub mod onset;
pub mod period;
