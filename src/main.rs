//! CLI entry point for the LMS grading tool.
//!
//! Provides subcommands for grading a single score, recording submissions and
//! grades against the JSON stores, and reporting or exporting a gradebook.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use lms_grading::{
    config::Settings,
    grading::grade::{GradeScale, grade_for_percentage},
    grading::score::{ScorePolicy, compute_percentage},
    grading::types::{Assignment, Submission},
    output::{export_gradebook, print_json},
    parser::parse_submissions,
    service::GradingService,
    store::JsonFileStore,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type FileService = GradingService<JsonFileStore<Assignment>, JsonFileStore<Submission>>;

#[derive(Parser)]
#[command(name = "lms_grading")]
#[command(about = "Grade submissions and summarize gradebooks", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that take precedence over the environment.
#[derive(Args)]
struct Overrides {
    /// Directory holding assignments.json and submissions.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Built-in grade scale: eleven-tier or six-tier
    #[arg(long, global = true)]
    scale: Option<GradeScale>,

    /// JSON band table file (overrides --scale)
    #[arg(long, global = true)]
    bands: Option<String>,

    /// What to do with out-of-range scores: clamp or reject
    #[arg(long, global = true)]
    policy: Option<ScorePolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single score into a percentage and letter grade
    Grade {
        /// Raw score
        #[arg(allow_hyphen_values = true)]
        score: f64,

        /// Maximum score for the assignment
        #[arg(short, long)]
        total_marks: f64,
    },
    /// Create or replace an assignment
    SeedAssignment {
        #[arg(value_name = "ASSIGNMENT_ID")]
        id: String,

        #[arg(short, long)]
        total_marks: f64,

        /// Due date, RFC 3339 (e.g. 2025-04-10T17:00:00Z)
        #[arg(short, long)]
        due: DateTime<Utc>,

        #[arg(long)]
        title: Option<String>,
    },
    /// Record a learner's submission
    Submit {
        #[arg(value_name = "SUBMISSION_ID")]
        id: String,

        #[arg(short, long)]
        assignment: String,

        #[arg(short, long)]
        learner: String,

        /// Submission time, RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Grade a submission
    RecordGrade {
        #[arg(value_name = "SUBMISSION_ID")]
        id: String,

        #[arg(short, long, allow_hyphen_values = true)]
        score: f64,

        #[arg(short, long)]
        feedback: Option<String>,
    },
    /// Reverse a grade
    Ungrade {
        #[arg(value_name = "SUBMISSION_ID")]
        id: String,
    },
    /// Show status counts and score statistics for an assignment
    Summary {
        #[arg(value_name = "ASSIGNMENT_ID")]
        assignment: String,
    },
    /// Per-question accuracy for a quiz
    QuizAccuracy {
        #[arg(value_name = "ASSIGNMENT_ID")]
        assignment: String,
    },
    /// Export an assignment's gradebook as CSV
    Export {
        #[arg(value_name = "ASSIGNMENT_ID")]
        assignment: String,

        /// CSV file to write
        #[arg(short, long, default_value = "gradebook.csv")]
        output: String,

        /// Gzip compress the CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Import submissions from a CSV or JSON file
    Import {
        #[arg(value_name = "FILE")]
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/lms_grading.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("lms_grading.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = apply_overrides(Settings::from_env()?, cli.overrides);

    match cli.command {
        Commands::Grade { score, total_marks } => {
            let table = settings.band_table()?;
            let score = settings.policy.apply(score, total_marks)?;
            let percentage = compute_percentage(score, total_marks)?;
            let letter = grade_for_percentage(percentage, &table);

            info!(
                score,
                total_marks,
                percentage = %format!("{percentage:.1}"),
                letter,
                "Grade"
            );
        }
        Commands::SeedAssignment {
            id,
            total_marks,
            due,
            title,
        } => {
            let mut assignment = Assignment::new(id, total_marks, due)?;
            if let Some(title) = title {
                assignment = assignment.with_title(title);
            }
            build_service(&settings)?.add_assignment(assignment).await?;
        }
        Commands::Submit {
            id,
            assignment,
            learner,
            at,
        } => {
            let submitted_at = at.unwrap_or_else(Utc::now);
            let submission = build_service(&settings)?
                .submit(&id, &assignment, &learner, submitted_at, Vec::new())
                .await?;
            print_json(&submission)?;
        }
        Commands::RecordGrade {
            id,
            score,
            feedback,
        } => {
            let outcome = build_service(&settings)?
                .record_grade(&id, score, feedback)
                .await?;
            print_json(&outcome)?;
        }
        Commands::Ungrade { id } => {
            let submission = build_service(&settings)?.ungrade(&id).await?;
            print_json(&submission)?;
        }
        Commands::Summary { assignment } => {
            let summary = build_service(&settings)?.summary(&assignment).await?;
            print_json(&summary)?;
        }
        Commands::QuizAccuracy { assignment } => {
            let report = build_service(&settings)?.quiz_accuracy(&assignment).await?;
            print_json(&report)?;
        }
        Commands::Export {
            assignment,
            output,
            gzip,
        } => {
            let rows = build_service(&settings)?.gradebook(&assignment).await?;
            let written = export_gradebook(&output, &rows, gzip)?;
            info!(path = %written, rows = rows.len(), "Gradebook exported");
        }
        Commands::Import { input } => {
            let bytes = tokio::fs::read(&input).await?;
            let submissions = parse_submissions(&input, &bytes)?;
            let report = build_service(&settings)?
                .import_submissions(submissions)
                .await?;
            print_json(&report)?;
        }
    }

    Ok(())
}

fn apply_overrides(mut settings: Settings, overrides: Overrides) -> Settings {
    if let Some(dir) = overrides.data_dir {
        settings.data_dir = dir;
    }
    if let Some(scale) = overrides.scale {
        settings.scale = scale;
        // an explicit scale beats a band file picked up from the environment
        settings.bands_path = None;
    }
    if overrides.bands.is_some() {
        settings.bands_path = overrides.bands;
    }
    if let Some(policy) = overrides.policy {
        settings.policy = policy;
    }
    settings
}

/// Wires the JSON stores under the configured data directory.
fn build_service(settings: &Settings) -> Result<FileService> {
    info!(
        data_dir = %settings.data_dir.display(),
        scale = %settings.scale,
        policy = %settings.policy,
        "Opening grading stores"
    );
    Ok(GradingService::new(
        JsonFileStore::in_dir(&settings.data_dir),
        JsonFileStore::in_dir(&settings.data_dir),
        settings.band_table()?,
        settings.policy,
    ))
}
