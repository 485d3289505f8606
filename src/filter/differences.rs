//! Extraction of differentially abundant features from ALDEx2 results.

use crate::data::{
    max_abs_ignoring_nan, min_ignoring_nan, ResultsTable, DIFFERENCE_COLUMN, EFFECT_COLUMN,
};
use crate::error::{DaaError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Test variant → Benjamini-Hochberg corrected p-value column.
pub const SIGNIFICANCE_COLUMNS: &[(&str, &str)] = &[("welch", "we.eBH"), ("wilcoxon", "wi.eBH")];

/// Look up the significance column for a test variant.
pub fn significance_column(test: &str) -> Result<&'static str> {
    SIGNIFICANCE_COLUMNS
        .iter()
        .find(|(name, _)| *name == test)
        .map(|(_, column)| *column)
        .ok_or_else(|| DaaError::UnknownTest(test.to_string()))
}

/// Thresholds for [`extract_differences`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferenceThresholds {
    /// Upper bound (inclusive) on the corrected p-value.
    pub sig_threshold: f64,
    /// Lower bound (exclusive) on `|effect|`.
    pub effect_threshold: f64,
    /// Lower bound (exclusive) on `|diff.btw|`.
    pub difference_threshold: f64,
    /// Test whose corrected p-value is used: `welch` or `wilcoxon`.
    pub test: String,
}

impl Default for DifferenceThresholds {
    fn default() -> Self {
        Self {
            sig_threshold: 0.1,
            effect_threshold: 1.0,
            difference_threshold: 1.0,
            test: "welch".to_string(),
        }
    }
}

impl DifferenceThresholds {
    /// Create thresholds for the given test variant.
    pub fn new(
        sig_threshold: f64,
        effect_threshold: f64,
        difference_threshold: f64,
        test: &str,
    ) -> Self {
        Self {
            sig_threshold,
            effect_threshold,
            difference_threshold,
            test: test.to_string(),
        }
    }
}

/// Keep features that are significant with a large enough effect and
/// median difference.
///
/// A row is kept when its corrected p-value is `<= sig_threshold`,
/// `|effect| > effect_threshold` and `|diff.btw| > difference_threshold`.
/// Row order and columns are preserved; an empty table is a valid result.
///
/// Thresholds that no feature could possibly pass are rejected up front with
/// [`DaaError::ThresholdInfeasible`]: a significance threshold below the
/// smallest observed p-value, or an effect/difference threshold above the
/// largest observed absolute value. NaN cells are ignored for these checks
/// and never pass the filter.
pub fn extract_differences(
    results: &ResultsTable,
    thresholds: &DifferenceThresholds,
) -> Result<ResultsTable> {
    let sig_column = significance_column(&thresholds.test)?;
    let significance = results.column(sig_column)?;
    let effect = results.column(EFFECT_COLUMN)?;
    let difference = results.column(DIFFERENCE_COLUMN)?;

    if let Some(min_sig) = min_ignoring_nan(&significance) {
        if thresholds.sig_threshold < min_sig {
            return Err(DaaError::ThresholdInfeasible(format!(
                "significance threshold {} is lower than the minimum {} ({}) \
                 (--sig-threshold). Select a higher threshold.",
                thresholds.sig_threshold, sig_column, min_sig
            )));
        }
    }

    if let Some(max_effect) = max_abs_ignoring_nan(&effect) {
        if thresholds.effect_threshold > max_effect {
            return Err(DaaError::ThresholdInfeasible(format!(
                "effect threshold {} exceeds the maximum absolute effect size ({}) \
                 (--effect-threshold). Choose a lower threshold, or be aware that \
                 there will be no features in the output.",
                thresholds.effect_threshold, max_effect
            )));
        }
    }

    if let Some(max_difference) = max_abs_ignoring_nan(&difference) {
        if thresholds.difference_threshold > max_difference {
            return Err(DaaError::ThresholdInfeasible(format!(
                "difference threshold {} exceeds the maximum absolute difference ({}) \
                 (--difference-threshold). Choose a lower threshold, or be aware that \
                 there will be no features in the output.",
                thresholds.difference_threshold, max_difference
            )));
        }
    }

    // NaN comparisons are false, so rows with missing statistics drop out
    let keep_indices: Vec<usize> = (0..results.len())
        .into_par_iter()
        .filter(|&row| {
            significance[row] <= thresholds.sig_threshold
                && effect[row].abs() > thresholds.effect_threshold
                && difference[row].abs() > thresholds.difference_threshold
        })
        .collect();

    log::debug!(
        "{} of {} features pass {} <= {}, |effect| > {}, |diff.btw| > {}",
        keep_indices.len(),
        results.len(),
        sig_column,
        thresholds.sig_threshold,
        thresholds.effect_threshold,
        thresholds.difference_threshold
    );

    results.subset_rows(&keep_indices)
}

/// Result of difference extraction with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferenceFilterResult {
    /// Number of features before filtering.
    pub n_before: usize,
    /// Number of features after filtering.
    pub n_after: usize,
    /// Number of features removed.
    pub n_removed: usize,
    /// Proportion of features retained.
    pub retention_rate: f64,
}

impl std::fmt::Display for DifferenceFilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Difference Extraction Result")?;
        writeln!(f, "  Features before:  {}", self.n_before)?;
        writeln!(f, "  Features after:   {}", self.n_after)?;
        writeln!(f, "  Features removed: {}", self.n_removed)?;
        writeln!(f, "  Feature retention: {:.1}%", self.retention_rate * 100.0)?;
        Ok(())
    }
}

/// Extract differences with statistics about what was filtered.
pub fn extract_differences_with_stats(
    results: &ResultsTable,
    thresholds: &DifferenceThresholds,
) -> Result<(ResultsTable, DifferenceFilterResult)> {
    let n_before = results.len();
    let filtered = extract_differences(results, thresholds)?;
    let n_after = filtered.len();

    let stats = DifferenceFilterResult {
        n_before,
        n_after,
        n_removed: n_before - n_after,
        retention_rate: if n_before > 0 {
            n_after as f64 / n_before as f64
        } else {
            0.0
        },
    };

    Ok((filtered, stats))
}
