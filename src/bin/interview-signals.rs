//! interview-signals CLI - score recorded interview sessions
//!
//! Commands:
//! - score: Replay recorded landmarks and print the session report
//! - validate: Check recorded landmark records
//! - config: Print the default analyzer configuration
//! - doctor: Diagnose installation and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use interview_signals::config::AnalyzerConfig;
use interview_signals::encoder::{ReportEncoder, ScorePayload, REPORT_SCHEMA_VERSION};
use interview_signals::replay::{parse_ndjson, replay_record, validate_ndjson, ReplaySource};
use interview_signals::{AnalysisError, InterviewSession, ENGINE_VERSION, PRODUCER_NAME};

/// Nonverbal behavior scoring for recorded interviews
#[derive(Parser)]
#[command(name = "interview-signals")]
#[command(author = "HireLens")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score posture, eye contact and smiling from landmark recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a landmark recording and print the session report
    Score {
        /// Input NDJSON file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,

        /// Analyzer configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Answer quality score (0-100) from an external evaluator
        #[arg(long)]
        answer_quality: Option<f64>,

        /// Sentiment score (0-100) from an external evaluator
        #[arg(long)]
        sentiment: Option<f64>,

        /// Directory for annotated frames (records with images only)
        #[arg(long)]
        annotate_dir: Option<PathBuf>,

        /// Base directory for relative image paths (defaults to the input's directory)
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },

    /// Check landmark records without scoring them
    Validate {
        /// Input NDJSON file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default analyzer configuration as JSON
    Config,

    /// Diagnose installation and configuration
    Doctor {
        /// Check an analyzer configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON payload
    Json,
    /// Pretty-printed JSON payload
    JsonPretty,
    /// Plain-text results report
    Text,
}

fn main() -> ExitCode {
    env_logger::init();
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

fn run(cli: Cli) -> Result<(), SignalsCliError> {
    match cli.command {
        Commands::Score {
            input,
            output,
            format,
            config,
            answer_quality,
            sentiment,
            annotate_dir,
            base_dir,
        } => cmd_score(ScoreOptions {
            input,
            output,
            format,
            config,
            answer_quality,
            sentiment,
            annotate_dir,
            base_dir,
        }),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Config => cmd_config(),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

struct ScoreOptions {
    input: PathBuf,
    output: PathBuf,
    format: OutputFormat,
    config: Option<PathBuf>,
    answer_quality: Option<f64>,
    sentiment: Option<f64>,
    annotate_dir: Option<PathBuf>,
    base_dir: Option<PathBuf>,
}

fn cmd_score(options: ScoreOptions) -> Result<(), SignalsCliError> {
    for (name, value) in [
        ("answer-quality", options.answer_quality),
        ("sentiment", options.sentiment),
    ] {
        if let Some(v) = value {
            if !(0.0..=100.0).contains(&v) {
                return Err(SignalsCliError::OutOfRange(name.to_string(), v));
            }
        }
    }

    let config = match &options.config {
        Some(path) => AnalyzerConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalyzerConfig::default(),
    };

    let input_data = read_input(&options.input)?;
    let records = parse_ndjson(&input_data)?;
    if records.is_empty() {
        return Err(SignalsCliError::NoFrames);
    }

    let base_dir = options
        .base_dir
        .clone()
        .or_else(|| input_dir(&options.input));

    if let Some(dir) = &options.annotate_dir {
        fs::create_dir_all(dir)?;
    }

    let mut session = InterviewSession::with_config(ReplaySource::new(), config)
        .with_annotations(options.annotate_dir.is_some());

    for record in records {
        let frame_index = record.frame_index;
        let report = replay_record(&mut session, record, base_dir.as_deref())?;
        log::debug!("Frame {frame_index}: {}", report.summary());

        if let (Some(dir), Some(annotated)) = (&options.annotate_dir, &report.annotated) {
            let path = dir.join(format!("frame_{frame_index:06}.png"));
            annotated.save(&path).map_err(AnalysisError::from)?;
        }
    }

    let report = session.report_with(options.answer_quality, options.sentiment);
    let payload = ReportEncoder::new().encode(&session, &report);
    let output_data = format_output(&payload, &options.format)?;

    if options.output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(&options.output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), SignalsCliError> {
    let input_data = read_input(input)?;
    let (valid, problems) = validate_ndjson(&input_data);

    let report = ValidationReport {
        total_records: valid + problems.len(),
        valid_records: valid,
        invalid_records: problems.len(),
        errors: problems
            .iter()
            .map(|(line, error)| ValidationErrorDetail {
                line: *line,
                error: error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Line {}: {}", err.line, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(SignalsCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_config() -> Result<(), SignalsCliError> {
    println!("{}", AnalyzerConfig::default().to_json()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), SignalsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "report_schema".to_string(),
        status: CheckStatus::Ok,
        message: format!("Report schema: {}", REPORT_SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match AnalyzerConfig::from_json(&content) {
                    Ok(parsed) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (posture window {}, eye contact window {})",
                            parsed.posture.window_size, parsed.eye_contact.window_size
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for `score --input -`)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Interview Signals Doctor Report");
        println!("===============================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(SignalsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, SignalsCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn input_dir(input: &Path) -> Option<PathBuf> {
    if input.to_string_lossy() == "-" {
        return None;
    }
    input.parent().map(Path::to_path_buf)
}

fn format_output(payload: &ScorePayload, format: &OutputFormat) -> Result<String, SignalsCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(payload)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(payload)? + "\n"),
        OutputFormat::Text => Ok(payload.render_text()),
    }
}

// Error types

#[derive(Debug)]
enum SignalsCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    NoFrames,
    OutOfRange(String, f64),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for SignalsCliError {
    fn from(e: io::Error) -> Self {
        SignalsCliError::Io(e)
    }
}

impl From<AnalysisError> for SignalsCliError {
    fn from(e: AnalysisError) -> Self {
        SignalsCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for SignalsCliError {
    fn from(e: serde_json::Error) -> Self {
        SignalsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SignalsCliError> for CliError {
    fn from(e: SignalsCliError) -> Self {
        match e {
            SignalsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SignalsCliError::Analysis(e) => {
                let (code, hint) = match &e {
                    AnalysisError::ParseError(_) | AnalysisError::InvalidLandmarks(_) => (
                        "PARSE_ERROR",
                        "Run 'interview-signals validate' for details",
                    ),
                    AnalysisError::InvalidConfig(_) => (
                        "CONFIG_ERROR",
                        "Run 'interview-signals config' to see the expected layout",
                    ),
                    AnalysisError::ImageError(_) => (
                        "IMAGE_ERROR",
                        "Check image paths or pass --base-dir",
                    ),
                    _ => ("ANALYSIS_ERROR", "Check the input recording"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            SignalsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SignalsCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frame records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            SignalsCliError::OutOfRange(name, value) => CliError {
                code: "OUT_OF_RANGE".to_string(),
                message: format!("--{} must be between 0 and 100, got {}", name, value),
                hint: None,
            },
            SignalsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            SignalsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    line: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
