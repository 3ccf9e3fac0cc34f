//! Output rendering for the sub-partner dashboard.

pub mod generator;

pub use generator::*;
