//! Sample metadata handling for differential abundance analysis.

use crate::error::{DaaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A variable value that can be categorical or continuous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }
}

/// Type hint for columns when loading metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

/// Sample metadata containing variables for each sample.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Sample IDs in order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    /// Trimmed cell text per sample, in column order.
    raw: HashMap<String, Vec<String>>,
}

impl Metadata {
    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by variable values
    ///
    /// Columns are inferred as continuous if all values parse as numbers,
    /// otherwise categorical. The cell text is kept as well, so
    /// [`Metadata::categorical_column`] sees labels exactly as written.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_tsv_with_types(path, &HashMap::new())
    }

    /// Load metadata from a TSV file, forcing the given column types.
    ///
    /// Hinted columns skip inference.
    pub fn from_tsv_with_types<P: AsRef<Path>>(
        path: P,
        types: &HashMap<String, VariableType>,
    ) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| DaaError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(DaaError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();

        // First pass: collect all values to infer types
        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            // QIIME-style type directives
            if line.starts_with("#q2:types") {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields[0].to_string();
            let values: Vec<String> = fields[1..].iter().map(|s| s.trim().to_string()).collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(DaaError::EmptyData("No samples in metadata".to_string()));
        }

        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            if let Some(&hint) = types.get(col_name) {
                column_types.insert(col_name.clone(), hint);
                continue;
            }
            let all_numeric = raw_data.iter().all(|(_, values)| {
                if col_idx >= values.len() {
                    return true;
                }
                let v = values[col_idx].trim();
                is_missing_token(v) || v.parse::<f64>().is_ok()
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::new();
        let mut data = HashMap::new();
        let mut raw_cells = HashMap::new();

        for (sample_id, values) in raw_data {
            if data.contains_key(&sample_id) {
                return Err(DaaError::SampleMismatch(format!(
                    "Sample '{}' appears more than once in metadata",
                    sample_id
                )));
            }
            sample_ids.push(sample_id.clone());
            let mut sample_data = HashMap::new();

            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = match values.get(col_idx).map(|v| v.as_str()) {
                    None => Variable::Missing,
                    Some(raw) if is_missing_token(raw) => Variable::Missing,
                    Some(raw) => match column_types.get(col_name) {
                        Some(VariableType::Continuous) => raw
                            .parse::<f64>()
                            .map(Variable::Continuous)
                            .unwrap_or(Variable::Missing),
                        Some(VariableType::Categorical) | None => {
                            Variable::Categorical(raw.to_string())
                        }
                    },
                };
                sample_data.insert(col_name.clone(), var);
            }
            data.insert(sample_id.clone(), sample_data);
            raw_cells.insert(sample_id, values);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
            raw: raw_cells,
        })
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Extract one column as a categorical [`MetadataColumn`].
    ///
    /// Labels are the cell text as written, whatever type the column was
    /// inferred as, so `1` and `01` stay distinct groups. Cells that load as
    /// missing become `None`.
    pub fn categorical_column(&self, column: &str) -> Result<MetadataColumn> {
        let col_idx = self
            .column_names
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DaaError::MissingColumn(column.to_string()))?;
        let values = self
            .sample_ids
            .iter()
            .map(|sid| match self.get(sid, column) {
                Some(var) if !var.is_missing() => {
                    self.raw.get(sid).and_then(|cells| cells.get(col_idx)).cloned()
                }
                _ => None,
            })
            .collect();
        MetadataColumn::new(column, self.sample_ids.clone(), values)
    }
}

fn is_missing_token(raw: &str) -> bool {
    raw.is_empty() || raw == "NA" || raw == "na"
}

/// A single categorical metadata column: one condition label per sample.
///
/// The order of `sample_ids` is significant. ALDEx2 assigns condition
/// groups positionally, so the column handed to the engine must follow the
/// count table's sample order (see [`MetadataColumn::align_to`]).
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataColumn {
    name: String,
    sample_ids: Vec<String>,
    values: Vec<Option<String>>,
}

impl MetadataColumn {
    /// Create a column from parallel sample IDs and labels.
    pub fn new(
        name: &str,
        sample_ids: Vec<String>,
        values: Vec<Option<String>>,
    ) -> Result<Self> {
        if sample_ids.len() != values.len() {
            return Err(DaaError::DimensionMismatch {
                expected: sample_ids.len(),
                actual: values.len(),
            });
        }
        let mut seen = HashSet::new();
        for sid in &sample_ids {
            if !seen.insert(sid.as_str()) {
                return Err(DaaError::SampleMismatch(format!(
                    "Sample '{}' appears more than once in column '{}'",
                    sid, name
                )));
            }
        }
        Ok(Self {
            name: name.to_string(),
            sample_ids,
            values,
        })
    }

    /// Convenience constructor from `(sample_id, label)` pairs.
    pub fn from_pairs<S: AsRef<str>, L: AsRef<str>>(name: &str, pairs: &[(S, L)]) -> Result<Self> {
        let sample_ids = pairs.iter().map(|(s, _)| s.as_ref().to_string()).collect();
        let values = pairs
            .iter()
            .map(|(_, l)| Some(l.as_ref().to_string()))
            .collect();
        Self::new(name, sample_ids, values)
    }

    /// Column name (the condition passed to the engine).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sample IDs in column order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Labels in column order.
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.sample_ids.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.sample_ids.is_empty()
    }

    /// Label for a sample, `None` when the sample is absent or the value missing.
    pub fn get(&self, sample_id: &str) -> Option<&str> {
        self.sample_ids
            .iter()
            .position(|s| s == sample_id)
            .and_then(|idx| self.values[idx].as_deref())
    }

    /// Sorted unique non-missing labels.
    pub fn levels(&self) -> Vec<String> {
        let mut levels: Vec<String> = self
            .values
            .iter()
            .flatten()
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        levels.sort();
        levels
    }

    /// Reorder and subset the column to exactly `sample_ids`.
    ///
    /// Fails with [`DaaError::SampleMismatch`] listing every requested sample
    /// that the column does not contain.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        let index: HashMap<&str, usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let missing: Vec<&str> = sample_ids
            .iter()
            .filter(|sid| !index.contains_key(sid.as_str()))
            .map(|sid| sid.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(DaaError::SampleMismatch(format!(
                "{} sample(s) in the table are missing from column '{}': {}",
                missing.len(),
                self.name,
                missing.join(", ")
            )));
        }

        let values = sample_ids
            .iter()
            .map(|sid| self.values[index[sid.as_str()]].clone())
            .collect();
        Ok(Self {
            name: self.name.clone(),
            sample_ids: sample_ids.to_vec(),
            values,
        })
    }

    /// Write the column as a two-column TSV (`sample_id`, column name).
    ///
    /// Missing labels are written as empty cells.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "sample_id\t{}", self.name)?;
        for (sid, value) in self.sample_ids.iter().zip(&self.values) {
            writeln!(writer, "{}\t{}", sid, value.as_deref().unwrap_or(""))?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tgroup\tage\tsite").unwrap();
        writeln!(file, "S1\tcontrol\t25\t01").unwrap();
        writeln!(file, "S2\ttreatment\t30\t02").unwrap();
        writeln!(file, "S3\tcontrol\t35\t01").unwrap();
        writeln!(file, "S4\ttreatment\t28\t02").unwrap();
        file.flush().unwrap();
        file
    }

    fn column(pairs: &[(&str, &str)]) -> MetadataColumn {
        MetadataColumn::from_pairs("group", pairs).unwrap()
    }

    #[test]
    fn test_load_metadata() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.n_samples(), 4);
        assert_eq!(meta.sample_ids(), &["S1", "S2", "S3", "S4"]);
        assert_eq!(meta.column_names(), &["group", "age", "site"]);
        assert_eq!(
            meta.get("S1", "group"),
            Some(&Variable::Categorical("control".to_string()))
        );
        assert_eq!(meta.get("S2", "age"), Some(&Variable::Continuous(30.0)));
    }

    #[test]
    fn test_type_hints_skip_inference() {
        let file = create_test_tsv();
        let mut types = HashMap::new();
        types.insert("site".to_string(), VariableType::Categorical);
        let meta = Metadata::from_tsv_with_types(file.path(), &types).unwrap();

        assert_eq!(
            meta.get("S1", "site"),
            Some(&Variable::Categorical("01".to_string()))
        );
        let site = meta.categorical_column("site").unwrap();
        assert_eq!(site.levels(), vec!["01", "02"]);
    }

    #[test]
    fn test_numeric_labels_kept_verbatim() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tbatch").unwrap();
        writeln!(file, "S1\t1").unwrap();
        writeln!(file, "S2\t01").unwrap();
        writeln!(file, "S3\t2").unwrap();
        writeln!(file, "S4\tNA").unwrap();
        file.flush().unwrap();

        let meta = Metadata::from_tsv(file.path()).unwrap();
        assert_eq!(meta.get("S2", "batch"), Some(&Variable::Continuous(1.0)));

        let batch = meta.categorical_column("batch").unwrap();
        assert_eq!(
            batch.values(),
            &[
                Some("1".to_string()),
                Some("01".to_string()),
                Some("2".to_string()),
                None
            ]
        );
        assert_eq!(batch.levels(), vec!["01", "1", "2"]);
    }

    #[test]
    fn test_missing_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tgroup\tage").unwrap();
        writeln!(file, "S1\tcontrol\t25").unwrap();
        writeln!(file, "S2\ttreatment\tNA").unwrap();
        writeln!(file, "S3\t\t30").unwrap();
        file.flush().unwrap();

        let meta = Metadata::from_tsv(file.path()).unwrap();
        assert!(meta.get("S2", "age").unwrap().is_missing());
        assert!(meta.get("S3", "group").unwrap().is_missing());

        let group = meta.categorical_column("group").unwrap();
        assert_eq!(group.values()[2], None);
    }

    #[test]
    fn test_unknown_column() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();
        assert!(matches!(
            meta.categorical_column("bogus"),
            Err(DaaError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_align_reorders_to_table() {
        let col = column(&[("S1", "a"), ("S2", "b"), ("S3", "a"), ("S4", "b")]);
        let order: Vec<String> = ["S4", "S1", "S3"].iter().map(|s| s.to_string()).collect();

        let aligned = col.align_to(&order).unwrap();
        assert_eq!(aligned.sample_ids(), &["S4", "S1", "S3"]);
        assert_eq!(
            aligned.values(),
            &[Some("b".to_string()), Some("a".to_string()), Some("a".to_string())]
        );
        assert_eq!(aligned.name(), "group");
    }

    #[test]
    fn test_align_reports_all_missing_samples() {
        let col = column(&[("S1", "a"), ("S2", "b")]);
        let order: Vec<String> = ["S1", "S2", "S3", "S4"].iter().map(|s| s.to_string()).collect();

        match col.align_to(&order) {
            Err(DaaError::SampleMismatch(msg)) => {
                assert!(msg.contains("S3"));
                assert!(msg.contains("S4"));
                assert!(!msg.contains("S1,"));
            }
            other => panic!("expected SampleMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_samples_rejected() {
        let result = MetadataColumn::from_pairs("group", &[("S1", "a"), ("S1", "b")]);
        assert!(matches!(result, Err(DaaError::SampleMismatch(_))));
    }

    #[test]
    fn test_column_tsv() {
        let col = MetadataColumn::new(
            "body-site",
            vec!["S1".into(), "S2".into()],
            vec![Some("gut".into()), None],
        )
        .unwrap();
        let file = NamedTempFile::new().unwrap();
        col.to_tsv(file.path()).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "sample_id\tbody-site\nS1\tgut\nS2\t\n");
    }
}
