//! Stats module - order statistics for cleaning

mod calculator;

pub use calculator::{StatsCalculator, QUARTILE_PROBS};
