//! Pipeline runner for composing and executing analysis steps.

use crate::aldex2::{aldex2, Aldex2Config};
use crate::data::{CountMatrix, MetadataColumn, ResultsTable};
use crate::error::{DaaError, Result};
use crate::filter::{extract_differences, DifferenceThresholds};
use serde::{Deserialize, Serialize};

/// A step in the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Run the ALDEx2 engine. Must be the first step.
    Aldex2(Aldex2Config),
    /// Keep features passing significance, effect and difference thresholds.
    ExtractDifferences(DifferenceThresholds),
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(DaaError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(DaaError::from)
    }
}

/// Output of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Full ALDEx2 results, one row per feature.
    pub results: ResultsTable,
    /// Output of the last extraction step, if the pipeline has one.
    pub differences: Option<ResultsTable>,
}

/// Builder for constructing and running analysis pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Add an ALDEx2 run.
    pub fn aldex2(mut self, config: Aldex2Config) -> Self {
        self.steps.push(PipelineStep::Aldex2(config));
        self
    }

    /// Add difference extraction on the previous step's output.
    pub fn extract_differences(mut self, thresholds: DifferenceThresholds) -> Self {
        self.steps.push(PipelineStep::ExtractDifferences(thresholds));
        self
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            steps: self.steps.clone(),
        }
    }

    /// Check step ordering without running anything.
    pub fn validate(&self) -> Result<()> {
        match self.steps.first() {
            Some(PipelineStep::Aldex2(_)) => {}
            Some(_) => {
                return Err(pipeline_error(
                    "Pipeline must start with an Aldex2 step".to_string(),
                ))
            }
            None => return Err(pipeline_error("Pipeline has no steps".to_string())),
        }
        let n_runs = self
            .steps
            .iter()
            .filter(|s| matches!(s, PipelineStep::Aldex2(_)))
            .count();
        if n_runs > 1 {
            return Err(pipeline_error(format!(
                "Pipeline must contain exactly one Aldex2 step, found {}",
                n_runs
            )));
        }
        Ok(())
    }

    /// Run the pipeline on data.
    pub fn run(&self, counts: &CountMatrix, condition: &MetadataColumn) -> Result<PipelineOutput> {
        self.validate()?;
        log::info!("running pipeline '{}' ({} steps)", self.name, self.steps.len());

        let mut results: Option<ResultsTable> = None;
        let mut differences: Option<ResultsTable> = None;

        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PipelineStep::Aldex2(config) => {
                    let table = aldex2(counts, condition, config)
                        .map_err(|e| step_error(i, step, e))?;
                    results = Some(table);
                }
                PipelineStep::ExtractDifferences(thresholds) => {
                    let input = differences.as_ref().or(results.as_ref()).ok_or_else(|| {
                        pipeline_error("No results available to filter".to_string())
                    })?;
                    let filtered = extract_differences(input, thresholds)
                        .map_err(|e| step_error(i, step, e))?;
                    differences = Some(filtered);
                }
            }
        }

        let results = results
            .ok_or_else(|| pipeline_error("Pipeline produced no results".to_string()))?;
        Ok(PipelineOutput {
            results,
            differences,
        })
    }
}

fn step_error(index: usize, step: &PipelineStep, error: DaaError) -> DaaError {
    DaaError::Pipeline {
        message: format!("Step {} ({:?}) failed: {}", index + 1, step, error),
        source: Some(Box::new(error)),
    }
}

fn pipeline_error(message: String) -> DaaError {
    DaaError::Pipeline {
        message,
        source: None,
    }
}

/// Run ALDEx2 and extract differences in one call.
pub fn run_aldex2_differences(
    counts: &CountMatrix,
    condition: &MetadataColumn,
    config: Aldex2Config,
    thresholds: DifferenceThresholds,
) -> Result<PipelineOutput> {
    Pipeline::new()
        .name("ALDEx2")
        .aldex2(config)
        .extract_differences(thresholds)
        .run(counts, condition)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_counts() -> CountMatrix {
        CountMatrix::from_rows(
            &[vec![10, 12, 30, 31], vec![5, 4, 1, 0]],
            vec!["feat_0".into(), "feat_1".into()],
            vec!["S0".into(), "S1".into(), "S2".into(), "S3".into()],
        )
        .unwrap()
    }

    fn create_test_condition() -> MetadataColumn {
        MetadataColumn::from_pairs(
            "group",
            &[("S0", "control"), ("S1", "control"), ("S2", "treatment"), ("S3", "treatment")],
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new()
            .name("test")
            .aldex2(Aldex2Config::default().mc_samples(64))
            .extract_differences(DifferenceThresholds::default());

        let config = pipeline.to_config(Some("Test pipeline"));
        assert_eq!(config.steps.len(), 2);
        assert_eq!(config.name, "test");
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_yaml() {
        let pipeline = Pipeline::new()
            .name("example")
            .aldex2(Aldex2Config::default().mc_samples(256).denom("iqlr"))
            .extract_differences(DifferenceThresholds::new(0.05, 0.8, 1.0, "wilcoxon"));

        let config = pipeline.to_config(Some("Example ALDEx2 pipeline"));
        let yaml = config.to_yaml().unwrap();

        let parsed = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.name, "example");
        assert_eq!(parsed.description.as_deref(), Some("Example ALDEx2 pipeline"));
        assert_eq!(parsed.steps.len(), 2);
        match &parsed.steps[0] {
            PipelineStep::Aldex2(c) => {
                assert_eq!(c.mc_samples, 256);
                assert_eq!(c.denom, "iqlr");
            }
            other => panic!("unexpected first step {:?}", other),
        }
        match &parsed.steps[1] {
            PipelineStep::ExtractDifferences(t) => assert_eq!(t.test, "wilcoxon"),
            other => panic!("unexpected second step {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_must_start_with_aldex2() {
        let result = Pipeline::new()
            .extract_differences(DifferenceThresholds::default())
            .run(&create_test_counts(), &create_test_condition());
        assert!(matches!(result, Err(DaaError::Pipeline { .. })));
    }

    #[test]
    fn test_pipeline_rejects_two_runs() {
        let pipeline = Pipeline::new()
            .aldex2(Aldex2Config::default())
            .aldex2(Aldex2Config::default());
        assert!(pipeline.validate().is_err());
        assert!(Pipeline::new().validate().is_err());
    }

    #[test]
    fn test_step_error_keeps_root_cause() {
        let condition = MetadataColumn::from_pairs("group", &[("S0", "a")]).unwrap();
        let err = Pipeline::new()
            .aldex2(Aldex2Config::default().verbose(false))
            .run(&create_test_counts(), &condition)
            .unwrap_err();

        assert!(err.to_string().contains("Step 1"));
        assert!(matches!(err.root(), DaaError::SampleMismatch(_)));
    }
}
