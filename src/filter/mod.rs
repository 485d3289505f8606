//! Filtering primitives for ALDEx2 result tables.

pub mod differences;

pub use differences::{
    extract_differences, extract_differences_with_stats, significance_column,
    DifferenceFilterResult, DifferenceThresholds, SIGNIFICANCE_COLUMNS,
};
