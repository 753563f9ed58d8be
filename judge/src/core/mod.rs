//! Core data model shared by every stage of the pipeline

pub mod problem;
pub mod submission;
pub mod verdict;

pub use problem::{Problem, TestCase, TestKind};
pub use submission::{Evaluation, SubmissionId, SubmissionRecord, TestResult};
pub use verdict::{classify, Classification};
