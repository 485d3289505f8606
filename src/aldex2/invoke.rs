//! One ALDEx2 run: marshal inputs, execute, parse.

use super::command::{run_command, EngineCommand};
use super::config::Aldex2Config;
use crate::data::{CountMatrix, MetadataColumn, ResultsTable};
use crate::error::{DaaError, Result};

const TABLE_FILE: &str = "table.tsv";
const CONDITION_FILE: &str = "conditions.tsv";
const SUMMARY_FILE: &str = "summary.csv";

/// Run ALDEx2 on `counts`, grouping samples by `condition`.
///
/// The condition column is realigned to the table's sample order before it
/// is written, because the engine assigns groups by position. Every sample
/// in the table must have an entry in the column; extra entries are dropped.
///
/// Inputs and output live in a temporary directory that is removed when this
/// function returns, on success or failure.
///
/// # Errors
/// - [`DaaError::EmptyData`] if the table has no features or samples
/// - [`DaaError::SampleMismatch`] if the column lacks table samples
/// - [`DaaError::InvalidParameter`] for a zero `mc_samples`
/// - [`DaaError::EngineSpawn`] / [`DaaError::EngineFailed`] from the engine
/// - parse errors from reading the engine's summary
pub fn aldex2(
    counts: &CountMatrix,
    condition: &MetadataColumn,
    config: &Aldex2Config,
) -> Result<ResultsTable> {
    if counts.is_empty() {
        return Err(DaaError::EmptyData(
            "Count table has no features or samples".to_string(),
        ));
    }
    config.validate()?;

    let aligned = condition.align_to(counts.sample_ids())?;
    log::info!(
        "running ALDEx2 on {} features x {} samples, condition '{}' with levels {:?}",
        counts.n_features(),
        counts.n_samples(),
        aligned.name(),
        aligned.levels()
    );
    log::debug!("library sizes: {:?}", counts.col_sums());

    let temp_dir = tempfile::Builder::new().prefix("aldex2-").tempdir()?;
    let table_path = temp_dir.path().join(TABLE_FILE);
    let condition_path = temp_dir.path().join(CONDITION_FILE);
    let summary_path = temp_dir.path().join(SUMMARY_FILE);
    log::debug!("engine inputs in {}", temp_dir.path().display());

    counts.to_sample_tsv(&table_path)?;
    aligned.to_tsv(&condition_path)?;

    let command = EngineCommand::new(
        config,
        &table_path,
        &condition_path,
        aligned.name(),
        &summary_path,
    );
    run_command(&command, config.verbose)?;

    let results = ResultsTable::from_engine_csv(&summary_path)?;
    if results.len() != counts.n_features() {
        log::warn!(
            "engine reported {} features but the table has {}",
            results.len(),
            counts.n_features()
        );
    }
    log::info!(
        "ALDEx2 returned {} features with columns {:?}",
        results.len(),
        results.column_names()
    );

    Ok(results)
}
