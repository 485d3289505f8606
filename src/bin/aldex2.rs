//! ALDEx2 - Differential Abundance Analysis CLI
//!
//! Command-line interface for running ALDEx2 and extracting differences.

use clap::{Parser, Subcommand};
use composable_aldex2::aldex2::{aldex2, Aldex2Config};
use composable_aldex2::data::{
    CountMatrix, Metadata, MetadataColumn, ResultsTable, DIFFERENCE_COLUMN, EFFECT_COLUMN,
};
use composable_aldex2::error::{DaaError, Result};
use composable_aldex2::filter::{
    extract_differences_with_stats, significance_column, DifferenceThresholds,
};
use composable_aldex2::pipeline::{Pipeline, PipelineConfig};
use std::path::PathBuf;

/// ALDEx2 differential abundance analysis
#[derive(Parser)]
#[command(name = "aldex2")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run ALDEx2 on a count table
    Run {
        /// Path to count matrix TSV (features as rows)
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Categorical metadata column defining the two conditions
        #[arg(short = 'g', long)]
        condition: String,

        /// Output path for results TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Number of Monte-Carlo Dirichlet instances
        #[arg(long, default_value = "128")]
        mc_samples: u32,

        /// Test variant passed to ALDEx2 (t or kw)
        #[arg(long, default_value = "t")]
        test: String,

        /// Denominator passed to ALDEx2 (all, iqlr, zero, lvha)
        #[arg(long, default_value = "all")]
        denom: String,

        /// ALDEx2 engine program
        #[arg(long, default_value = composable_aldex2::aldex2::DEFAULT_ENGINE)]
        program: String,

        /// Argument placed before the positional ones, e.g. the script path
        /// when `--program Rscript` (repeatable)
        #[arg(long = "program-arg", allow_hyphen_values = true)]
        program_args: Vec<String>,

        /// Do not print the engine command line
        #[arg(short, long)]
        quiet: bool,
    },

    /// Extract differentially abundant features from ALDEx2 results
    Extract {
        /// Path to ALDEx2 results TSV
        #[arg(short, long)]
        results: PathBuf,

        /// Output path for filtered results TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum corrected p-value
        #[arg(long, default_value = "0.1")]
        sig_threshold: f64,

        /// Minimum absolute effect size (exclusive)
        #[arg(long, default_value = "1.0")]
        effect_threshold: f64,

        /// Minimum absolute median difference (exclusive)
        #[arg(long, default_value = "1.0")]
        difference_threshold: f64,

        /// Test whose corrected p-value is used: welch or wilcoxon
        #[arg(long, default_value = "welch")]
        test: String,
    },

    /// Run a pipeline from a YAML configuration file
    Pipeline {
        /// Path to pipeline configuration YAML
        #[arg(long)]
        config: PathBuf,

        /// Path to count matrix TSV (features as rows)
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Categorical metadata column defining the two conditions
        #[arg(short = 'g', long)]
        condition: String,

        /// Output path for full results TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for extracted differences TSV
        #[arg(short, long)]
        differences: Option<PathBuf>,
    },

    /// Summarize an ALDEx2 results table
    Summary {
        /// Path to ALDEx2 results TSV
        #[arg(short, long)]
        results: PathBuf,

        /// Test whose corrected p-value is summarized: welch or wilcoxon
        #[arg(long, default_value = "welch")]
        test: String,

        /// Output format: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate an example pipeline configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            counts,
            metadata,
            condition,
            output,
            mc_samples,
            test,
            denom,
            program,
            program_args,
            quiet,
        } => {
            let config = Aldex2Config {
                mc_samples,
                test,
                denom,
                program,
                program_args,
                verbose: !quiet,
            };
            cmd_run(&counts, &metadata, &condition, &output, &config)
        }

        Commands::Extract {
            results,
            output,
            sig_threshold,
            effect_threshold,
            difference_threshold,
            test,
        } => cmd_extract(
            &results,
            &output,
            &DifferenceThresholds::new(sig_threshold, effect_threshold, difference_threshold, &test),
        ),

        Commands::Pipeline {
            config,
            counts,
            metadata,
            condition,
            output,
            differences,
        } => cmd_pipeline(
            &config,
            &counts,
            &metadata,
            &condition,
            &output,
            differences.as_ref(),
        ),

        Commands::Summary {
            results,
            test,
            format,
        } => cmd_summary(&results, &test, &format),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let DaaError::EngineFailed { .. } = e.root() {
            eprintln!("An error was encountered while running ALDEx2 in R, please inspect stdout and stderr to learn more.");
        }
        std::process::exit(1);
    }
}

/// Load the count table and the condition column.
fn load_inputs(
    counts_path: &PathBuf,
    metadata_path: &PathBuf,
    condition: &str,
) -> Result<(CountMatrix, MetadataColumn)> {
    eprintln!("Loading data...");
    let counts = CountMatrix::from_tsv(counts_path)?;
    let metadata = Metadata::from_tsv(metadata_path)?;
    let column = metadata.categorical_column(condition)?;

    eprintln!(
        "Loaded {} features x {} samples",
        counts.n_features(),
        counts.n_samples()
    );
    Ok((counts, column))
}

/// Run ALDEx2 and write the full results
fn cmd_run(
    counts_path: &PathBuf,
    metadata_path: &PathBuf,
    condition: &str,
    output_path: &PathBuf,
    config: &Aldex2Config,
) -> Result<()> {
    let (counts, column) = load_inputs(counts_path, metadata_path, condition)?;

    eprintln!("Running ALDEx2...");
    eprintln!("  Condition:  {} ({})", condition, column.levels().join(" vs "));
    eprintln!("  MC samples: {}", config.mc_samples);
    eprintln!("  Test:       {}", config.test);
    eprintln!("  Denom:      {}", config.denom);
    let results = aldex2(&counts, &column, config)?;

    eprintln!("Writing results to {:?}...", output_path);
    results.to_tsv(output_path)?;
    eprintln!("Done! {} features tested", results.len());

    Ok(())
}

/// Filter an existing results table
fn cmd_extract(
    results_path: &PathBuf,
    output_path: &PathBuf,
    thresholds: &DifferenceThresholds,
) -> Result<()> {
    eprintln!("Loading results...");
    let results = ResultsTable::from_tsv(results_path)?;

    let (filtered, stats) = extract_differences_with_stats(&results, thresholds)?;
    print!("{}", stats);

    eprintln!("Writing differences to {:?}...", output_path);
    filtered.to_tsv(output_path)?;
    print_top_hits(&filtered, &thresholds.test)?;

    Ok(())
}

/// Run a pipeline from configuration
fn cmd_pipeline(
    config_path: &PathBuf,
    counts_path: &PathBuf,
    metadata_path: &PathBuf,
    condition: &str,
    output_path: &PathBuf,
    differences_path: Option<&PathBuf>,
) -> Result<()> {
    eprintln!("Loading pipeline configuration from {:?}...", config_path);
    let config_str = std::fs::read_to_string(config_path)?;
    let config = PipelineConfig::from_yaml(&config_str)?;

    let (counts, column) = load_inputs(counts_path, metadata_path, condition)?;

    eprintln!("Running pipeline '{}'...", config.name);
    let output = Pipeline::from_config(&config).run(&counts, &column)?;

    eprintln!("Writing results to {:?}...", output_path);
    output.results.to_tsv(output_path)?;
    eprintln!("Done! {} features tested", output.results.len());

    match (&output.differences, differences_path) {
        (Some(differences), Some(path)) => {
            eprintln!("Writing differences to {:?}...", path);
            differences.to_tsv(path)?;
            eprintln!("  {} features pass the thresholds", differences.len());
        }
        (Some(differences), None) => {
            eprintln!(
                "  {} features pass the thresholds (use --differences to save them)",
                differences.len()
            );
        }
        (None, Some(_)) => {
            eprintln!("Pipeline has no ExtractDifferences step; nothing written to --differences");
        }
        (None, None) => {}
    }

    Ok(())
}

/// Summarize a results table
fn cmd_summary(results_path: &PathBuf, test: &str, format: &str) -> Result<()> {
    let results = ResultsTable::from_tsv(results_path)?;
    let summary = results.summary(significance_column(test)?)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        "yaml" => println!("{}", serde_yaml::to_string(&summary)?),
        "text" => {
            println!("ALDEx2 Results");
            println!("==============");
            println!();
            print!("{}", summary);
        }
        other => {
            return Err(DaaError::InvalidParameter(format!(
                "Unknown format '{}' (expected text, json or yaml)",
                other
            )))
        }
    }

    Ok(())
}

/// Print the best features by corrected p-value
fn print_top_hits(results: &ResultsTable, test: &str) -> Result<()> {
    let sig_column = significance_column(test)?;
    let order = results.sorted_by(sig_column)?;
    if order.is_empty() {
        return Ok(());
    }
    let sig = results.column_index(sig_column)?;
    let effect = results.column_index(EFFECT_COLUMN)?;
    let diff = results.column_index(DIFFERENCE_COLUMN)?;

    eprintln!("\nTop 5 hits:");
    for &row in order.iter().take(5) {
        eprintln!(
            "  {}: effect={:.3}, diff.btw={:.3}, {}={:.4}",
            results.feature_ids()[row],
            results.value(row, effect),
            results.value(row, diff),
            sig_column,
            results.value(row, sig)
        );
    }
    Ok(())
}

/// Generate example config
fn cmd_example(output_path: &PathBuf) -> Result<()> {
    let pipeline = Pipeline::new()
        .name("example-aldex2")
        .aldex2(Aldex2Config::default())
        .extract_differences(DifferenceThresholds::default());

    let config = pipeline.to_config(Some(
        "ALDEx2 with Welch's t-test, then extraction of significant differences",
    ));
    let yaml = config.to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example pipeline to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_collects_program_args() {
        let cli = Cli::try_parse_from([
            "aldex2",
            "run",
            "-c",
            "counts.tsv",
            "-m",
            "metadata.tsv",
            "-g",
            "body-site",
            "-o",
            "out.tsv",
            "--program",
            "Rscript",
            "--program-arg",
            "--vanilla",
            "--program-arg",
            "scripts/run_aldex2.R",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                program,
                program_args,
                ..
            } => {
                assert_eq!(program, "Rscript");
                assert_eq!(program_args, vec!["--vanilla", "scripts/run_aldex2.R"]);
            }
            _ => panic!("expected the run subcommand"),
        }
    }

    #[test]
    fn test_run_program_args_default_empty() {
        let cli = Cli::try_parse_from([
            "aldex2", "run", "-c", "c.tsv", "-m", "m.tsv", "-g", "g", "-o", "o.tsv",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                program,
                program_args,
                ..
            } => {
                assert_eq!(program, "run_aldex2.R");
                assert!(program_args.is_empty());
            }
            _ => panic!("expected the run subcommand"),
        }
    }
}
