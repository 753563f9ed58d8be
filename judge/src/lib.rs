//! Submission evaluation engine
//!
//! Builds a submitted source file with its language toolchain, runs it
//! against a problem's graded test cases under a wall-clock limit, and grades
//! each run as accepted, denied (wrong output, with a line diff) or error.

pub mod checker;
pub mod compiler;
pub mod config;
pub mod core;
pub mod error;
pub mod executor;
pub mod judger;
pub mod languages;
pub mod runner;
pub mod storage;

pub use config::JudgeConfig;
pub use crate::core::{
    Classification, Evaluation, Problem, SubmissionId, SubmissionRecord, TestCase, TestKind,
    TestResult,
};
pub use error::{JudgeError, Result};
pub use judger::Judge;
pub use languages::{Language, LanguageTable};
pub use storage::{DirectoryStore, JsonlSink, ProblemStore, SubmissionSink};
