use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::info;

use judge::{
    Classification, DirectoryStore, Evaluation, Judge, JudgeConfig, JsonlSink, Language,
    LanguageTable, Problem, ProblemStore, SubmissionRecord, SubmissionSink,
};

#[derive(Parser)]
#[command(name = "judge", version, about, long_about = None)]
struct Args {
    /// Submission language (cpp, c, python3)
    #[arg(long, short = 'l')]
    language: Language,

    /// Source file to evaluate
    source: PathBuf,

    /// Problem name, i.e. a directory under the problems directory
    #[arg(long, short = 'p')]
    problem: String,

    #[arg(long, default_value = "problems")]
    problems_dir: PathBuf,

    /// Working directory for build artifacts (default: a fresh temporary directory)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    #[arg(long, short = 'u', default_value = "anonymous")]
    user: String,

    /// Print the evaluation as JSON instead of a summary
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Append the submission to this JSONL file
    #[arg(long)]
    record: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("judge=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = JudgeConfig::from_env().context("Invalid judge configuration")?;
    let languages = LanguageTable::load(config.languages_path.as_deref())
        .context("Failed to load language table")?;
    info!("Enabled languages: {:?}", languages.languages());

    let store = DirectoryStore::new(&args.problems_dir);
    let problem = store
        .problem(&args.problem)
        .await
        .with_context(|| format!("Failed to load problem {}", args.problem))?;

    // Kept alive until the evaluation is recorded
    let temp_dir;
    let work_dir = match &args.work_dir {
        Some(dir) => std::path::absolute(dir)
            .with_context(|| format!("Invalid working directory {}", dir.display()))?,
        None => {
            temp_dir = tempfile::tempdir().context("Failed to create working directory")?;
            temp_dir.path().to_path_buf()
        }
    };
    let source = std::path::absolute(&args.source)
        .with_context(|| format!("Invalid source path {}", args.source.display()))?;

    let judge = Judge::new(config, languages);
    let (submitted_at, evaluation) =
        evaluate_submission(&judge, args.language, &source, &work_dir, &problem)
            .await
            .with_context(|| format!("Failed to evaluate {}", source.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print_summary(&evaluation);
    }

    let accepted = evaluation.classification == Classification::Accepted;

    if let Some(path) = &args.record {
        let record = SubmissionRecord::new(
            &args.user,
            &args.problem,
            args.language,
            &source,
            &work_dir,
            submitted_at,
            evaluation,
        );
        let id = JsonlSink::new(path)
            .record_submission(&record)
            .await
            .with_context(|| format!("Failed to record submission to {}", path.display()))?;
        info!("Submission recorded with id {}", id);
    }

    Ok(if accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Evaluate, stamping the submission with the time it was handed to the judge
async fn evaluate_submission(
    judge: &Judge,
    language: Language,
    source: &Path,
    work_dir: &Path,
    problem: &Problem,
) -> judge::Result<(DateTime<Utc>, Evaluation)> {
    let submitted_at = Utc::now();
    let evaluation = judge.evaluate(language, source, work_dir, problem).await?;
    Ok((submitted_at, evaluation))
}

fn print_summary(evaluation: &Evaluation) {
    for result in &evaluation.results {
        println!("[{}] {}", result.classification, result.name);
        for line in result.message.lines() {
            println!("    {}", line);
        }
    }
    println!(
        "{}: {}/{} passed",
        evaluation.classification,
        evaluation.passed(),
        evaluation.results.len()
    );
}
