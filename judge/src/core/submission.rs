//! Per-test results, evaluation output and the persisted submission record

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::problem::TestCase;
use super::verdict::{classify, Classification};
use crate::checker::Highlight;
use crate::languages::Language;

/// Name of the single result reported when the build stage fails
pub const BUILD_STAGE: &str = "compilation";

pub type SubmissionId = u64;

/// Outcome of one test case (or of the build stage)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub classification: Classification,
    /// Input fed to the program, echoed back for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Compiler error, runtime error, or flattened diff
    pub message: String,
    pub accepted: bool,
    /// Structured diff for `Denied` results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<Highlight>,
}

impl TestResult {
    pub fn accepted(test: &TestCase) -> Self {
        Self {
            name: test.name.clone(),
            classification: Classification::Accepted,
            input: Some(test.input.clone()),
            message: String::new(),
            accepted: true,
            diff: Vec::new(),
        }
    }

    pub fn denied(test: &TestCase, message: String, diff: Vec<Highlight>) -> Self {
        Self {
            name: test.name.clone(),
            classification: Classification::Denied,
            input: Some(test.input.clone()),
            message,
            accepted: false,
            diff,
        }
    }

    pub fn error(test: &TestCase, message: impl Into<String>) -> Self {
        Self {
            name: test.name.clone(),
            classification: Classification::Error,
            input: Some(test.input.clone()),
            message: message.into(),
            accepted: false,
            diff: Vec::new(),
        }
    }

    /// Result standing in for the whole suite when the build fails
    pub fn build_failure(diagnostic: impl Into<String>) -> Self {
        Self {
            name: BUILD_STAGE.to_string(),
            classification: Classification::Error,
            input: None,
            message: diagnostic.into(),
            accepted: false,
            diff: Vec::new(),
        }
    }
}

/// Aggregate classification plus the ordered per-test results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub classification: Classification,
    pub results: Vec<TestResult>,
}

impl Evaluation {
    pub fn from_results(results: Vec<TestResult>) -> Self {
        let classification = classify(results.iter().map(|r| r.classification));
        Self {
            classification,
            results,
        }
    }

    pub fn build_failed(diagnostic: impl Into<String>) -> Self {
        Self {
            classification: Classification::Error,
            results: vec![TestResult::build_failure(diagnostic)],
        }
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.accepted).count()
    }
}

/// What the caller persists once an evaluation completes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub user: String,
    pub problem: String,
    pub language: Language,
    pub source_path: PathBuf,
    pub work_dir: PathBuf,
    pub submitted_at: DateTime<Utc>,
    pub classification: Classification,
    pub results: Vec<TestResult>,
}

impl SubmissionRecord {
    pub fn new(
        user: impl Into<String>,
        problem: impl Into<String>,
        language: Language,
        source_path: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        submitted_at: DateTime<Utc>,
        evaluation: Evaluation,
    ) -> Self {
        Self {
            user: user.into(),
            problem: problem.into(),
            language,
            source_path: source_path.into(),
            work_dir: work_dir.into(),
            submitted_at,
            classification: evaluation.classification,
            results: evaluation.results,
        }
    }
}
