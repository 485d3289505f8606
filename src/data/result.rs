//! Result table produced by ALDEx2.

use crate::error::{DaaError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Label given to the feature index, whatever the engine emitted.
pub const FEATURE_INDEX: &str = "featureid";

/// Effect size column.
pub const EFFECT_COLUMN: &str = "effect";

/// Median difference between conditions.
pub const DIFFERENCE_COLUMN: &str = "diff.btw";

/// Per-feature statistics, one row per feature and one named column per
/// statistic.
///
/// Values are stored row-major. Cells the engine reported as `NA` hold NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    feature_ids: Vec<String>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl ResultsTable {
    /// Create a table, checking that every row has one value per column.
    pub fn new(
        feature_ids: Vec<String>,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if feature_ids.len() != values.len() {
            return Err(DaaError::DimensionMismatch {
                expected: feature_ids.len(),
                actual: values.len(),
            });
        }
        if let Some(row) = values.iter().find(|row| row.len() != columns.len()) {
            return Err(DaaError::DimensionMismatch {
                expected: columns.len(),
                actual: row.len(),
            });
        }
        Ok(Self {
            feature_ids,
            columns,
            values,
        })
    }

    /// Parse the comma-separated summary written by the ALDEx2 engine.
    ///
    /// R writes row names either with a blank leading header cell or with
    /// no header cell at all; both layouts are accepted.
    pub fn from_engine_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_delimited(path, b',')
    }

    /// Load a table previously written with [`ResultsTable::to_tsv`].
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_delimited(path, b'\t')
    }

    fn read_delimited<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut records = reader.records();
        let header = records
            .next()
            .ok_or_else(|| DaaError::EmptyData("Empty results file".to_string()))??;
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in records {
            let record = record?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            rows.push(record);
        }

        // A filter that keeps nothing still writes its header.
        let Some(first) = rows.first() else {
            let columns = header.get(1..).unwrap_or_default().to_vec();
            return Self::new(Vec::new(), columns, Vec::new());
        };
        let columns: Vec<String> = if header.len() + 1 == first.len() {
            header
        } else if header.len() == first.len() {
            header[1..].to_vec()
        } else {
            return Err(DaaError::DimensionMismatch {
                expected: header.len(),
                actual: first.len(),
            });
        };

        let mut feature_ids = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (row_idx, record) in rows.iter().enumerate() {
            if record.len() != columns.len() + 1 {
                return Err(DaaError::DimensionMismatch {
                    expected: columns.len() + 1,
                    actual: record.len(),
                });
            }
            feature_ids.push(record[0].to_string());
            let row = record
                .iter()
                .skip(1)
                .zip(&columns)
                .map(|(raw, column)| {
                    parse_statistic(raw).ok_or_else(|| DaaError::InvalidStatistic {
                        value: raw.to_string(),
                        row: row_idx,
                        column: column.clone(),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            values.push(row);
        }

        Self::new(feature_ids, columns, values)
    }

    /// Write the table as TSV with a `featureid` index column.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "{}", FEATURE_INDEX)?;
        for column in &self.columns {
            write!(writer, "\t{}", column)?;
        }
        writeln!(writer)?;

        for (feature_id, row) in self.feature_ids.iter().zip(&self.values) {
            write!(writer, "{}", feature_id)?;
            for value in row {
                write!(writer, "\t{}", value)?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.feature_ids.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.feature_ids.is_empty()
    }

    /// Feature identifiers in row order.
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Statistic column names.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column, or [`DaaError::MissingColumn`].
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DaaError::MissingColumn(column.to_string()))
    }

    /// All values of one column, in row order.
    pub fn column(&self, column: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(column)?;
        Ok(self.values.iter().map(|row| row[idx]).collect())
    }

    /// Value at (row, column index).
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }

    /// Value for a feature by ID and column name.
    pub fn get(&self, feature_id: &str, column: &str) -> Option<f64> {
        let col = self.column_index(column).ok()?;
        let row = self.feature_ids.iter().position(|f| f == feature_id)?;
        Some(self.values[row][col])
    }

    /// New table with only the given rows, in the given order.
    pub fn subset_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut feature_ids = Vec::with_capacity(indices.len());
        let mut values = Vec::with_capacity(indices.len());
        for &idx in indices {
            if idx >= self.len() {
                return Err(DaaError::InvalidParameter(format!(
                    "Row index {} out of bounds",
                    idx
                )));
            }
            feature_ids.push(self.feature_ids[idx].clone());
            values.push(self.values[idx].clone());
        }
        Self::new(feature_ids, self.columns.clone(), values)
    }

    /// Row indices sorted ascending by a column, NaN last.
    pub fn sorted_by(&self, column: &str) -> Result<Vec<usize>> {
        let col = self.column_index(column)?;
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| nan_last(self.values[a][col], self.values[b][col]));
        Ok(order)
    }

    /// Summarize the table using `significance_column` for the counts of
    /// significant features.
    pub fn summary(&self, significance_column: &str) -> Result<ResultsSummary> {
        let significance = self.column(significance_column)?;
        let effect = self.column(EFFECT_COLUMN)?;
        let difference = self.column(DIFFERENCE_COLUMN)?;

        Ok(ResultsSummary {
            total: self.len(),
            n_columns: self.columns.len(),
            significance_column: significance_column.to_string(),
            min_significance: min_ignoring_nan(&significance),
            max_abs_effect: max_abs_ignoring_nan(&effect),
            max_abs_difference: max_abs_ignoring_nan(&difference),
            significant_05: significance.iter().filter(|&&q| q < 0.05).count(),
            significant_10: significance.iter().filter(|&&q| q < 0.10).count(),
        })
    }
}

fn parse_statistic(raw: &str) -> Option<f64> {
    match raw.trim() {
        "" | "NA" | "NaN" | "nan" => Some(f64::NAN),
        "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Smallest non-NaN value, `None` if there is none.
pub(crate) fn min_ignoring_nan(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
}

/// Largest non-NaN absolute value, `None` if there is none.
pub(crate) fn max_abs_ignoring_nan(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .map(|v| v.abs())
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

/// Summary statistics for a results table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub total: usize,
    pub n_columns: usize,
    pub significance_column: String,
    pub min_significance: Option<f64>,
    pub max_abs_effect: Option<f64>,
    pub max_abs_difference: Option<f64>,
    pub significant_05: usize,
    pub significant_10: usize,
}

impl std::fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: Option<f64>| v.map_or("NA".to_string(), |v| format!("{:.4}", v));
        writeln!(f, "Features:            {}", self.total)?;
        writeln!(f, "Statistic columns:   {}", self.n_columns)?;
        writeln!(
            f,
            "Minimum {}:     {}",
            self.significance_column,
            show(self.min_significance)
        )?;
        writeln!(f, "Maximum |effect|:    {}", show(self.max_abs_effect))?;
        writeln!(f, "Maximum |diff.btw|:  {}", show(self.max_abs_difference))?;
        writeln!(f, "Significant at < 0.05: {}", self.significant_05)?;
        writeln!(f, "Significant at < 0.10: {}", self.significant_10)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn sample_table() -> ResultsTable {
        ResultsTable::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["diff.btw".into(), "effect".into(), "we.eBH".into()],
            vec![
                vec![1.5, 0.5, 0.20],
                vec![-2.0, -0.3, f64::NAN],
                vec![3.0, 0.8, 0.01],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_engine_csv_without_index_label() {
        let file = write_file(
            "rab.all,diff.btw,effect,we.ep,we.eBH\n\
             otu1,1.2,2.5,-1.1,0.001,0.01\n\
             otu2,0.3,NA,0.2,0.5,0.8\n",
        );
        let table = ResultsTable::from_engine_csv(file.path()).unwrap();

        assert_eq!(table.feature_ids(), &["otu1", "otu2"]);
        assert_eq!(
            table.column_names(),
            &["rab.all", "diff.btw", "effect", "we.ep", "we.eBH"]
        );
        assert_relative_eq!(table.get("otu1", "effect").unwrap(), -1.1);
        assert!(table.get("otu2", "diff.btw").unwrap().is_nan());
    }

    #[test]
    fn test_engine_csv_with_blank_index_label() {
        let file = write_file(
            "\"\",\"diff.btw\",\"effect\"\n\
             \"otu1\",1.2,2.5\n",
        );
        let table = ResultsTable::from_engine_csv(file.path()).unwrap();
        assert_eq!(table.column_names(), &["diff.btw", "effect"]);
        assert_relative_eq!(table.value(0, 1), 2.5);
    }

    #[test]
    fn test_engine_csv_rejects_text_statistic() {
        let file = write_file("diff.btw,effect\notu1,1.0,high\n");
        let err = ResultsTable::from_engine_csv(file.path()).unwrap_err();
        assert!(matches!(err, DaaError::InvalidStatistic { row: 0, .. }));
    }

    #[test]
    fn test_engine_csv_ragged_rows() {
        let file = write_file("diff.btw,effect\notu1,1.0,2.0\notu2,1.0\n");
        let err = ResultsTable::from_engine_csv(file.path()).unwrap_err();
        assert!(matches!(err, DaaError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_header_only_file_is_empty_table() {
        let file = write_file("featureid\tdiff.btw\teffect\twe.eBH\n");
        let table = ResultsTable::from_tsv(file.path()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_names(), &["diff.btw", "effect", "we.eBH"]);
    }

    #[test]
    fn test_tsv_roundtrip_normalizes_index() {
        let table = sample_table();
        let file = NamedTempFile::new().unwrap();
        table.to_tsv(file.path()).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.starts_with("featureid\tdiff.btw\teffect\twe.eBH\n"));

        let loaded = ResultsTable::from_tsv(file.path()).unwrap();
        assert_eq!(loaded.feature_ids(), table.feature_ids());
        assert_eq!(loaded.column_names(), table.column_names());
        assert!(loaded.get("b", "we.eBH").unwrap().is_nan());
        assert_relative_eq!(loaded.get("c", "effect").unwrap(), 0.8);
    }

    #[test]
    fn test_missing_column() {
        let table = sample_table();
        assert!(matches!(
            table.column("wi.eBH"),
            Err(DaaError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_subset_rows_preserves_columns() {
        let table = sample_table();
        let subset = table.subset_rows(&[2, 0]).unwrap();
        assert_eq!(subset.feature_ids(), &["c", "a"]);
        assert_eq!(subset.column_names(), table.column_names());
        assert!(table.subset_rows(&[5]).is_err());
    }

    #[test]
    fn test_sorted_by_puts_nan_last() {
        let table = sample_table();
        assert_eq!(table.sorted_by("we.eBH").unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn test_summary() {
        let summary = sample_table().summary("we.eBH").unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.significant_05, 1);
        assert_eq!(summary.significant_10, 1);
        assert_relative_eq!(summary.min_significance.unwrap(), 0.01);
        assert_relative_eq!(summary.max_abs_effect.unwrap(), 0.8);
        assert_relative_eq!(summary.max_abs_difference.unwrap(), 3.0);
    }

    #[test]
    fn test_nan_helpers() {
        assert_eq!(min_ignoring_nan(&[f64::NAN, f64::NAN]), None);
        assert_eq!(max_abs_ignoring_nan(&[f64::NAN, -4.0, 2.0]), Some(4.0));
    }
}
