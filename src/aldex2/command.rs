//! Building and running the engine command line.

use super::config::Aldex2Config;
use crate::error::{DaaError, Result};
use std::fmt;
use std::path::Path;
use std::process::Command;

/// A fully assembled engine invocation.
///
/// The positional order is fixed: table, metadata, condition name,
/// Monte-Carlo samples, test, denominator, output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    program: String,
    args: Vec<String>,
}

impl EngineCommand {
    /// Assemble the command for one run.
    pub fn new(
        config: &Aldex2Config,
        table_path: &Path,
        metadata_path: &Path,
        condition: &str,
        output_path: &Path,
    ) -> Self {
        let mut args = config.program_args.clone();
        args.extend([
            table_path.display().to_string(),
            metadata_path.display().to_string(),
            condition.to_string(),
            config.mc_samples.to_string(),
            config.test.clone(),
            config.denom.clone(),
            output_path.display().to_string(),
        ]);
        Self {
            program: config.program.clone(),
            args,
        }
    }

    /// Program to execute.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Run the command to completion.
///
/// Standard output and error are inherited so engine progress appears live.
/// A non-zero exit becomes [`DaaError::EngineFailed`] carrying the code.
pub fn run_command(command: &EngineCommand, verbose: bool) -> Result<()> {
    if verbose {
        eprintln!(
            "Running external command line application. This may print messages to stdout and/or stderr."
        );
        eprintln!(
            "The command being run is below. It cannot be manually re-run as it depends on temporary files that will no longer exist."
        );
        eprintln!();
        eprintln!("Command: {}", command);
        eprintln!();
    }
    log::debug!("spawning {:?}", command);

    let status = Command::new(&command.program)
        .args(&command.args)
        .status()
        .map_err(|source| DaaError::EngineSpawn {
            program: command.program.clone(),
            source,
        })?;

    if !status.success() {
        log::debug!("engine exited with {}", status);
        return Err(DaaError::EngineFailed {
            code: status.code(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_positional_order() {
        let config = Aldex2Config::default().mc_samples(16).test("kw").denom("iqlr");
        let command = EngineCommand::new(
            &config,
            &PathBuf::from("/tmp/x/table.tsv"),
            &PathBuf::from("/tmp/x/conditions.tsv"),
            "body-site",
            &PathBuf::from("/tmp/x/summary.csv"),
        );

        assert_eq!(command.program(), "run_aldex2.R");
        assert_eq!(
            command.args(),
            &[
                "/tmp/x/table.tsv",
                "/tmp/x/conditions.tsv",
                "body-site",
                "16",
                "kw",
                "iqlr",
                "/tmp/x/summary.csv",
            ]
        );
    }

    #[test]
    fn test_program_args_come_first() {
        let config = Aldex2Config::default().program("Rscript", &["scripts/run_aldex2.R"]);
        let command = EngineCommand::new(
            &config,
            Path::new("t.tsv"),
            Path::new("m.tsv"),
            "group",
            Path::new("o.csv"),
        );
        assert_eq!(command.args()[0], "scripts/run_aldex2.R");
        assert_eq!(command.args()[1], "t.tsv");
        assert_eq!(
            command.to_string(),
            "Rscript scripts/run_aldex2.R t.tsv m.tsv group 128 t all o.csv"
        );
    }

    #[test]
    fn test_missing_program() {
        let config = Aldex2Config::default().program("definitely-not-an-aldex2-engine", &[]);
        let command = EngineCommand::new(
            &config,
            Path::new("t.tsv"),
            Path::new("m.tsv"),
            "group",
            Path::new("o.csv"),
        );
        let err = run_command(&command, false).unwrap_err();
        assert!(matches!(err, DaaError::EngineSpawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_code() {
        let command = EngineCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 3".to_string()],
        };
        let err = run_command(&command, false).unwrap_err();
        assert!(matches!(err, DaaError::EngineFailed { code: Some(3) }));
    }
}
