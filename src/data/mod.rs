//! Data structures for ALDEx2 analysis.

mod count_matrix;
mod metadata;
mod result;

pub use count_matrix::CountMatrix;
pub use metadata::{Metadata, MetadataColumn, Variable, VariableType};
pub use result::{
    ResultsSummary, ResultsTable, DIFFERENCE_COLUMN, EFFECT_COLUMN, FEATURE_INDEX,
};
pub(crate) use result::{max_abs_ignoring_nan, min_ignoring_nan};
