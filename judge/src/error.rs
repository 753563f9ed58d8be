//! Error types for the evaluation engine
//!
//! Only infrastructure and configuration problems are errors. Everything a
//! submission can do wrong (bad code, slow code, wrong answer) is reported as
//! a graded result instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// Language name that does not map to any known variant
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Language is known but has no toolchain in the active language table
    #[error("language {0} is not enabled in the language table")]
    LanguageDisabled(String),

    #[error("invalid language table: {0}")]
    LanguageTable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("problem {0} has no graded test cases")]
    NoGradedTests(String),

    #[error("failed to load problem {name}: {reason}")]
    ProblemLoad { name: String, reason: String },

    #[error("source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("working directory not usable: {}", .0.display())]
    WorkDir(PathBuf),

    /// The toolchain itself (compiler, not the submission) could not be started
    #[error("toolchain {program} could not be launched: {source}")]
    Toolchain {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = JudgeError> = std::result::Result<T, E>;
