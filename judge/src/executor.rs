//! Test executor - runs a built submission against one test case
//!
//! Decision order (first match wins):
//! 1. Timed out
//! 2. Could not be launched
//! 3. Nonzero exit or killed by a signal
//! 4. Output matches
//! 5. Output differs

use std::time::Duration;

use tracing::debug;

use crate::checker::{compare_output, flatten, highlight, Comparison};
use crate::core::{TestCase, TestResult};
use crate::error::Result;
use crate::runner::{CommandSpec, RunError, RunStatus, Runner};

pub const TIME_LIMIT_MESSAGE: &str = "time limit exceeded";

/// Run `run_cmd` on one test case and grade the outcome
///
/// Launch failures are graded as `Error` for this test only. A pipe failure
/// while talking to a running process is an infrastructure error.
pub async fn execute(
    runner: &dyn Runner,
    run_cmd: &CommandSpec,
    test: &TestCase,
    timeout: Duration,
) -> Result<TestResult> {
    let outcome = match runner.run(run_cmd, test.input.as_bytes(), timeout).await {
        Ok(outcome) => outcome,
        Err(e @ RunError::Launch { .. }) => {
            debug!("{}: {}", test.name, e);
            return Ok(TestResult::error(test, e.to_string()));
        }
        Err(RunError::Io(e)) => return Err(e.into()),
    };

    let failure = match outcome.status {
        RunStatus::TimedOut => return Ok(TestResult::error(test, TIME_LIMIT_MESSAGE)),
        RunStatus::Exited(0) => None,
        RunStatus::Exited(code) => Some(format!("exited with code {}", code)),
        RunStatus::Signaled(signal) => Some(format!("terminated by signal {}", signal)),
    };
    if let Some(fallback) = failure {
        let stderr = outcome.stderr_lossy();
        let message = if stderr.is_empty() { fallback } else { stderr };
        return Ok(TestResult::error(test, message));
    }

    match compare_output(&outcome.stdout_lossy(), &test.expected) {
        Comparison::Match => Ok(TestResult::accepted(test)),
        Comparison::Mismatch(diff) => {
            Ok(TestResult::denied(test, flatten(&diff), highlight(&diff)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::ColorHint;
    use crate::core::{Classification, TestKind};
    use crate::runner::{MockRunner, RunOutcome};

    const LIMIT: Duration = Duration::from_secs(1);

    fn sum_test() -> TestCase {
        TestCase::new("test 1", "5\n5", "10", TestKind::Test)
    }

    fn runner_returning(
        status: RunStatus,
        stdout: &'static str,
        stderr: &'static str,
    ) -> MockRunner {
        let mut runner = MockRunner::new();
        runner.expect_run().times(1).returning(move |_, _, _| {
            Ok(RunOutcome {
                stdout: stdout.as_bytes().to_vec(),
                stderr: stderr.as_bytes().to_vec(),
                status,
            })
        });
        runner
    }

    async fn run(runner: MockRunner) -> TestResult {
        execute(&runner, &CommandSpec::new("./main"), &sum_test(), LIMIT)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_input_and_limit_are_forwarded() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|cmd, stdin, timeout| {
                cmd.program == "./main" && stdin == &b"5\n5"[..] && *timeout == LIMIT
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(RunOutcome {
                    stdout: b"10\n".to_vec(),
                    stderr: Vec::new(),
                    status: RunStatus::Exited(0),
                })
            });

        let result = run(runner).await;
        assert_eq!(result.classification, Classification::Accepted);
        assert!(result.accepted);
        assert!(result.message.is_empty());
        assert_eq!(result.input.as_deref(), Some("5\n5"));
    }

    #[tokio::test]
    async fn test_wrong_answer_is_denied_with_diff() {
        let result = run(runner_returning(RunStatus::Exited(0), "11\n", "")).await;

        assert_eq!(result.classification, Classification::Denied);
        assert!(!result.accepted);
        assert_eq!(result.message, "- 10\n+ 11");
        let hints: Vec<_> = result.diff.iter().map(|h| h.hint).collect();
        assert_eq!(hints, vec![ColorHint::Red, ColorHint::Green]);
    }

    #[tokio::test]
    async fn test_timeout_wins_over_output() {
        // Partial output that happens to be correct still times out
        let result = run(runner_returning(RunStatus::TimedOut, "10\n", "")).await;

        assert_eq!(result.classification, Classification::Error);
        assert_eq!(result.message, TIME_LIMIT_MESSAGE);
    }

    #[tokio::test]
    async fn test_crash_reports_stderr_or_fallback() {
        let result = run(runner_returning(RunStatus::Exited(1), "10\n", "Traceback: boom\n")).await;
        assert_eq!(result.classification, Classification::Error);
        assert_eq!(result.message, "Traceback: boom\n");

        let result = run(runner_returning(RunStatus::Signaled(11), "", "")).await;
        assert_eq!(result.message, "terminated by signal 11");

        let result = run(runner_returning(RunStatus::Exited(2), "", "")).await;
        assert_eq!(result.message, "exited with code 2");
    }

    #[tokio::test]
    async fn test_stderr_on_success_is_ignored() {
        let result = run(runner_returning(RunStatus::Exited(0), "10", "debug output\n")).await;
        assert_eq!(result.classification, Classification::Accepted);
    }

    #[tokio::test]
    async fn test_launch_failure_is_graded() {
        let mut runner = MockRunner::new();
        runner.expect_run().returning(|cmd, _, _| {
            Err(RunError::Launch {
                program: cmd.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        });

        let result = run(runner).await;
        assert_eq!(result.classification, Classification::Error);
        assert!(result.message.starts_with("failed to launch ./main"));
    }

    #[tokio::test]
    async fn test_pipe_failure_is_infrastructure_error() {
        let mut runner = MockRunner::new();
        runner.expect_run().returning(|_, _, _| {
            Err(RunError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )))
        });

        let result = execute(&runner, &CommandSpec::new("./main"), &sum_test(), LIMIT).await;
        assert!(matches!(result, Err(crate::error::JudgeError::Io(_))));
    }
}
