//! Problem and test case snapshot read by the engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a test case is shown to users or used for grading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Shown to users before submission, never graded
    Example,
    #[default]
    Test,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::Example => write!(f, "example"),
            TestKind::Test => write!(f, "test"),
        }
    }
}

/// One (input, expected output) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    /// Expected program output
    #[serde(rename = "output")]
    pub expected: String,
    #[serde(rename = "type", default)]
    pub kind: TestKind,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<String>,
        expected: impl Into<String>,
        kind: TestKind,
    ) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected: expected.into(),
            kind,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.kind == TestKind::Test
    }
}

/// Immutable snapshot of a problem for the duration of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub title: String,
    /// Base time limit per test in milliseconds, before language adjustment
    #[serde(default)]
    pub time_limit_ms: Option<u32>,
    /// Test cases in their stored order
    pub tests: Vec<TestCase>,
}

impl Problem {
    pub fn new(title: impl Into<String>, tests: Vec<TestCase>) -> Self {
        Self {
            title: title.into(),
            time_limit_ms: None,
            tests,
        }
    }

    pub fn with_time_limit_ms(mut self, time_limit_ms: u32) -> Self {
        self.time_limit_ms = Some(time_limit_ms);
        self
    }

    /// Graded test cases, in stored order
    pub fn graded_tests(&self) -> impl Iterator<Item = &TestCase> {
        self.tests.iter().filter(|t| t.is_graded())
    }

    /// Test cases of the given kind (or all of them), in stored order
    pub fn tests_of_kind(&self, kind: Option<TestKind>) -> Vec<TestCase> {
        self.tests
            .iter()
            .filter(|t| kind.map_or(true, |k| t.kind == k))
            .cloned()
            .collect()
    }
}
