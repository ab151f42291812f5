//! Wire messages and correlation.

pub mod correlation;
pub mod envelope;
