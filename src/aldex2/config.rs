//! Engine configuration.

use crate::error::{DaaError, Result};
use serde::{Deserialize, Serialize};

/// Script invoked when no other program is configured. Resolved via `PATH`.
pub const DEFAULT_ENGINE: &str = "run_aldex2.R";

/// Parameters for one ALDEx2 run.
///
/// `test` and `denom` are passed through to the engine untouched; an
/// unsupported value surfaces as an engine failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Aldex2Config {
    /// Number of Monte-Carlo Dirichlet instances.
    pub mc_samples: u32,
    /// Test variant (`t` for Welch/Wilcoxon, `kw` for Kruskal-Wallis/glm).
    pub test: String,
    /// Denominator used for the log-ratio transform (`all`, `iqlr`, `zero`, ...).
    pub denom: String,
    /// Program to execute.
    pub program: String,
    /// Arguments placed before the positional ones, e.g. the script path
    /// when `program` is `Rscript`.
    pub program_args: Vec<String>,
    /// Print the command line before running it.
    pub verbose: bool,
}

impl Default for Aldex2Config {
    fn default() -> Self {
        Self {
            mc_samples: 128,
            test: "t".to_string(),
            denom: "all".to_string(),
            program: DEFAULT_ENGINE.to_string(),
            program_args: Vec::new(),
            verbose: true,
        }
    }
}

impl Aldex2Config {
    /// Set the number of Monte-Carlo samples.
    pub fn mc_samples(mut self, mc_samples: u32) -> Self {
        self.mc_samples = mc_samples;
        self
    }

    /// Set the test variant.
    pub fn test(mut self, test: &str) -> Self {
        self.test = test.to_string();
        self
    }

    /// Set the denominator variant.
    pub fn denom(mut self, denom: &str) -> Self {
        self.denom = denom.to_string();
        self
    }

    /// Set the program and its leading arguments.
    pub fn program(mut self, program: &str, program_args: &[&str]) -> Self {
        self.program = program.to_string();
        self.program_args = program_args.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Enable or disable the command banner.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check the parameters that can be checked without the engine.
    pub fn validate(&self) -> Result<()> {
        if self.mc_samples == 0 {
            return Err(DaaError::InvalidParameter(
                "mc_samples must be a positive integer".to_string(),
            ));
        }
        if self.program.trim().is_empty() {
            return Err(DaaError::InvalidParameter(
                "engine program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
