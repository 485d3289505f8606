//! Composable ALDEx2 Differential Abundance Analysis
//!
//! This library runs the ALDEx2 differential abundance method, implemented
//! as an external R script, on a microbiome count table and extracts the
//! features that differ between two conditions.
//!
//! # Overview
//!
//! - **data**: Core data structures (CountMatrix, Metadata, MetadataColumn, ResultsTable)
//! - **aldex2**: Engine invocation (temporary inputs, subprocess, output parsing)
//! - **filter**: Threshold-based extraction of differentially abundant features
//! - **pipeline**: YAML-configurable composition of the two
//!
//! # Example
//!
//! ```no_run
//! use composable_aldex2::prelude::*;
//!
//! let counts = CountMatrix::from_tsv("counts.tsv").unwrap();
//! let metadata = Metadata::from_tsv("metadata.tsv").unwrap();
//! let condition = metadata.categorical_column("body-site").unwrap();
//!
//! let results = aldex2(&counts, &condition, &Aldex2Config::default()).unwrap();
//! let differences = extract_differences(&results, &DifferenceThresholds::default()).unwrap();
//! println!("{} of {} features differ", differences.len(), results.len());
//! ```

pub mod aldex2;
pub mod data;
pub mod error;
pub mod filter;
pub mod pipeline;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::aldex2::{aldex2, Aldex2Config, EngineCommand, DEFAULT_ENGINE};
    pub use crate::data::{
        CountMatrix, Metadata, MetadataColumn, ResultsSummary, ResultsTable, Variable,
        VariableType, DIFFERENCE_COLUMN, EFFECT_COLUMN, FEATURE_INDEX,
    };
    pub use crate::error::{DaaError, Result};
    pub use crate::filter::{
        extract_differences, extract_differences_with_stats, significance_column,
        DifferenceFilterResult, DifferenceThresholds, SIGNIFICANCE_COLUMNS,
    };
    pub use crate::pipeline::{
        run_aldex2_differences, Pipeline, PipelineConfig, PipelineOutput, PipelineStep,
    };
}
