//! Trialscope CLI - Command-line interface for the aggregation engine
//!
//! Commands:
//! - analyze: Aggregate trial rows into a report (batch mode)
//! - validate: Validate trial rows and report per-row failures
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use trialscope::adapter::{RawTrialRow, TrialRowAdapter};
use trialscope::engine::{AggregationEngine, Bucketing, DEFAULT_BIN_SIZE};
use trialscope::report::ReportEncoder;
use trialscope::{AnalysisError, ENGINE_VERSION};

/// Trialscope - Signal-detection aggregation engine for behavioral trials
#[derive(Parser)]
#[command(name = "trialscope")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Aggregate behavioral trial records into signal-detection metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate trial rows into a report (batch mode)
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Bucketing strategy
        #[arg(long, default_value = "session")]
        bucketing: BucketingArg,

        /// Trials per bin (bin bucketing only)
        #[arg(long, default_value_t = DEFAULT_BIN_SIZE)]
        bin_size: u32,

        /// Run id recorded in the report (random when omitted)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Validate trial rows and report per-row failures
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one trial row per line)
    Ndjson,
    /// JSON array of trial rows
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum BucketingArg {
    /// One group per (subject, date, session)
    Session,
    /// One pooled group per subject
    Pooled,
    /// Fixed-size bins of each subject's date-sorted trials
    Bin,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input trial-row schema
    Input,
    /// Output report schema
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), TrialscopeCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            bucketing,
            bin_size,
            run_id,
        } => cmd_analyze(
            &input,
            &output,
            input_format,
            output_format,
            bucketing,
            bin_size,
            run_id,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema { schema_type } => {
            cmd_schema(schema_type);
            Ok(())
        }
    }
}

fn cmd_analyze(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    bucketing: BucketingArg,
    bin_size: u32,
    run_id: Option<String>,
) -> Result<(), TrialscopeCliError> {
    let bucketing = match bucketing {
        BucketingArg::Session => Bucketing::BySession,
        BucketingArg::Pooled => Bucketing::Pooled,
        BucketingArg::Bin => Bucketing::ByBin { bin_size },
    };

    let input_data = read_input(input)?;

    let trials = match input_format {
        InputFormat::Ndjson => TrialRowAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => TrialRowAdapter::parse_array(&input_data)?,
    };

    if trials.is_empty() {
        // Valid edge case, not a failure: emit an empty report and tell the
        // operator there is nothing to display.
        eprintln!("trialscope: no trials in input, nothing to display");
    }

    let aggregation = AggregationEngine::aggregate(&trials, bucketing)?;

    let encoder = match run_id {
        Some(id) => ReportEncoder::with_run_id(id),
        None => ReportEncoder::new(),
    };
    let report = encoder.encode(&aggregation, bucketing);

    let output_data = match output_format {
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), TrialscopeCliError> {
    let input_data = read_input(input)?;

    // Rows must at least be well-formed JSON objects; field-level failures
    // are collected per row below.
    let rows: Vec<RawTrialRow> = match input_format {
        InputFormat::Ndjson => {
            let mut rows = Vec::new();
            for (line_no, line) in input_data.lines().enumerate() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let row: RawTrialRow = serde_json::from_str(trimmed).map_err(|e| {
                    AnalysisError::ParseError(format!("line {}: {}", line_no + 1, e))
                })?;
                rows.push(row);
            }
            rows
        }
        InputFormat::Json => serde_json::from_str(&input_data).map_err(AnalysisError::from)?,
    };

    let total_rows = rows.len();
    let errors = TrialRowAdapter::validate_rows(rows);

    let report = ValidationReport {
        total_rows,
        valid_rows: total_rows - errors.len(),
        invalid_rows: errors.len(),
        errors: errors
            .iter()
            .map(|e| ValidationErrorDetail {
                index: e.index,
                error: e.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Invalid rows: {}", report.invalid_rows);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Row {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_rows > 0 {
        Err(TrialscopeCliError::ValidationFailed(report.invalid_rows))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: trial rows (ndjson or JSON array)");
            println!();
            println!("One object per trial with four fields:");
            println!();
            println!("  subject_id  string; aliases: subject, dog_name");
            println!("  date        \"YYYY-MM-DD\", or DDMMYY as used by the source sheets");
            println!("              (number or string; leading zero may be dropped)");
            println!("  session_id  number or string; aliases: session, num_session");
            println!("  outcome     hit | miss | fa | fp | cr (case-insensitive);");
            println!("              alias: score");
            println!();
            println!("Any other outcome token fails the run.");
        }
        SchemaType::Output => {
            println!("Output Schema: analysis report (version 1.0.0)");
            println!();
            println!("- report_version, producer {{ name, version, run_id }}");
            println!("- computed_at_utc, bucketing, x_axis_label");
            println!("- subjects: per-subject summary series containing:");
            println!("  - rows: {{ key, counts, hit_rate, fa_rate, d_prime }}");
            println!("    (rates clamped to [0.01, 0.99])");
            println!("  - date_markers: first row index of each date (session runs)");
            println!("- score_distribution: per-(subject, outcome) count totals");
        }
    }
}

// Helper functions

fn read_input(input: &PathBuf) -> Result<String, TrialscopeCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("trialscope: reading trial rows from terminal input (end with EOF)");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

// Error types

#[derive(Debug)]
enum TrialscopeCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for TrialscopeCliError {
    fn from(e: io::Error) -> Self {
        TrialscopeCliError::Io(e)
    }
}

impl From<AnalysisError> for TrialscopeCliError {
    fn from(e: AnalysisError) -> Self {
        TrialscopeCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for TrialscopeCliError {
    fn from(e: serde_json::Error) -> Self {
        TrialscopeCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TrialscopeCliError> for CliError {
    fn from(e: TrialscopeCliError) -> Self {
        match e {
            TrialscopeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TrialscopeCliError::Analysis(AnalysisError::InvalidOutcome(v)) => CliError {
                code: "INVALID_OUTCOME".to_string(),
                message: format!("Invalid outcome value: {}", v),
                hint: Some("Outcomes must be one of hit, miss, fa/fp, cr".to_string()),
            },
            TrialscopeCliError::Analysis(AnalysisError::InvalidBinSize(n)) => CliError {
                code: "INVALID_BIN_SIZE".to_string(),
                message: format!("Invalid bin size: {}", n),
                hint: Some("Pass --bin-size with a value of at least 1".to_string()),
            },
            TrialscopeCliError::Analysis(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'trialscope validate' for per-row details".to_string()),
            },
            TrialscopeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TrialscopeCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}
