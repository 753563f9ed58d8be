//! Compiler module - Submission build stage
//!
//! Compiled languages invoke their toolchain once per submission and leave
//! the artifact in the working directory. Interpreted languages skip the
//! build and go straight to a run command.
//!
//! Any output on the compiler's stderr fails the build, even when the exit
//! code is zero. Warnings-only builds are therefore rejected.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{JudgeError, Result};
use crate::languages::{Language, LanguageTable, ARTIFACT_NAME};
use crate::runner::{CommandSpec, RunError, RunOutcome, RunStatus, Runner};

/// Result of the build stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Submission is runnable with this command
    Ready(CommandSpec),
    /// Compiler diagnostic shown to the user
    Failed(String),
}

/// Builds submissions using the toolchains from a language table
pub struct Compiler {
    runner: Arc<dyn Runner>,
    languages: Arc<LanguageTable>,
    timeout: Duration,
}

impl Compiler {
    pub fn new(runner: Arc<dyn Runner>, languages: Arc<LanguageTable>, timeout: Duration) -> Self {
        Self {
            runner,
            languages,
            timeout,
        }
    }

    /// Build `source_path` for `language`, placing any artifact under `work_dir`
    pub async fn build(
        &self,
        language: Language,
        source_path: &Path,
        work_dir: &Path,
    ) -> Result<BuildOutcome> {
        let toolchain = self.languages.toolchain(language)?;
        let run_cmd = toolchain.run_command(source_path, work_dir);

        let Some(compile_cmd) = toolchain.compile_command(source_path, work_dir) else {
            debug!("{} needs no build step", language);
            return Ok(BuildOutcome::Ready(run_cmd));
        };

        info!(
            "Compiling {} as {} with {:?}",
            source_path.display(),
            language,
            compile_cmd.to_vec()
        );

        let outcome = match self.runner.run(&compile_cmd, &[], self.timeout).await {
            Ok(outcome) => outcome,
            Err(RunError::Launch { program, source }) => {
                return Err(JudgeError::Toolchain { program, source })
            }
            Err(RunError::Io(e)) => return Err(e.into()),
        };

        let artifact = work_dir.join(ARTIFACT_NAME);
        let artifact_exists = tokio::fs::try_exists(&artifact).await.unwrap_or(false);

        let result = interpret(outcome, artifact_exists, run_cmd);
        if let BuildOutcome::Failed(ref message) = result {
            info!(
                "Compilation failed for {}: {}",
                source_path.display(),
                message.lines().next().unwrap_or_default()
            );
        }
        Ok(result)
    }
}

fn interpret(outcome: RunOutcome, artifact_exists: bool, run_cmd: CommandSpec) -> BuildOutcome {
    let stderr = outcome.stderr_lossy();

    match outcome.status {
        RunStatus::TimedOut => BuildOutcome::Failed("Compilation timed out".to_string()),
        _ if !stderr.is_empty() => BuildOutcome::Failed(stderr),
        RunStatus::Exited(0) if artifact_exists => BuildOutcome::Ready(run_cmd),
        RunStatus::Exited(0) => {
            BuildOutcome::Failed("Compiler produced no executable".to_string())
        }
        RunStatus::Exited(code) => {
            let stdout = outcome.stdout_lossy();
            BuildOutcome::Failed(if stdout.is_empty() {
                format!("Compilation failed with exit code {}", code)
            } else {
                stdout
            })
        }
        RunStatus::Signaled(signal) => {
            BuildOutcome::Failed(format!("Compiler terminated by signal {}", signal))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockRunner;
    use std::path::PathBuf;

    const COMPILE_TIMEOUT: Duration = Duration::from_secs(30);

    fn outcome(status: RunStatus, stdout: &str, stderr: &str) -> RunOutcome {
        RunOutcome {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            status,
        }
    }

    fn compiler(runner: MockRunner) -> Compiler {
        Compiler::new(
            Arc::new(runner),
            Arc::new(LanguageTable::builtin().unwrap()),
            COMPILE_TIMEOUT,
        )
    }

    /// Working directory that already contains a build artifact
    fn work_dir_with_artifact() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ARTIFACT_NAME), b"\x7fELF").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_interpreted_language_skips_build() {
        // No expectations: any call to the runner panics
        let compiler = compiler(MockRunner::new());
        let source = PathBuf::from("/subs/1/solution.py");

        let outcome = compiler
            .build(Language::Python3, &source, Path::new("/subs/1"))
            .await
            .unwrap();

        let BuildOutcome::Ready(cmd) = outcome else {
            panic!("expected ready");
        };
        assert_eq!(cmd.to_vec(), vec!["python3", "/subs/1/solution.py"]);
    }

    #[tokio::test]
    async fn test_clean_compile_is_ready() {
        let dir = work_dir_with_artifact();
        let expected_dir = dir.path().to_path_buf();

        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(move |cmd, stdin, timeout| {
                cmd.program == "g++"
                    && cmd.work_dir.as_deref() == Some(expected_dir.as_path())
                    && stdin.is_empty()
                    && *timeout == COMPILE_TIMEOUT
            })
            .times(1)
            .returning(|_, _, _| Ok(outcome(RunStatus::Exited(0), "", "")));

        let source = dir.path().join("solution.cpp");
        let outcome = compiler(runner)
            .build(Language::Cpp, &source, dir.path())
            .await
            .unwrap();

        let BuildOutcome::Ready(cmd) = outcome else {
            panic!("expected ready");
        };
        assert_eq!(
            PathBuf::from(&cmd.program),
            dir.path().join(ARTIFACT_NAME)
        );
    }

    #[tokio::test]
    async fn test_warnings_only_fail_the_build() {
        let dir = work_dir_with_artifact();
        let mut runner = MockRunner::new();
        runner.expect_run().times(1).returning(|_, _, _| {
            Ok(outcome(
                RunStatus::Exited(0),
                "",
                "solution.cpp:3:9: warning: unused variable 'x'\n",
            ))
        });

        let outcome = compiler(runner)
            .build(Language::Cpp, &dir.path().join("solution.cpp"), dir.path())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BuildOutcome::Failed("solution.cpp:3:9: warning: unused variable 'x'\n".into())
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| Ok(outcome(RunStatus::Exited(1), "", "")));

        let outcome = compiler(runner)
            .build(Language::C, &dir.path().join("a.c"), dir.path())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BuildOutcome::Failed("Compilation failed with exit code 1".into())
        );
    }

    #[tokio::test]
    async fn test_timeout_and_missing_artifact_fail() {
        let dir = tempfile::tempdir().unwrap();

        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| Ok(outcome(RunStatus::TimedOut, "", "")));
        let built = compiler(runner)
            .build(Language::Cpp, &dir.path().join("a.cpp"), dir.path())
            .await
            .unwrap();
        assert_eq!(built, BuildOutcome::Failed("Compilation timed out".into()));

        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| Ok(outcome(RunStatus::Exited(0), "", "")));
        let built = compiler(runner)
            .build(Language::Cpp, &dir.path().join("a.cpp"), dir.path())
            .await
            .unwrap();
        assert_eq!(
            built,
            BuildOutcome::Failed("Compiler produced no executable".into())
        );
    }

    #[tokio::test]
    async fn test_missing_compiler_is_infrastructure_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockRunner::new();
        runner.expect_run().returning(|cmd, _, _| {
            Err(RunError::Launch {
                program: cmd.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });

        let result = compiler(runner)
            .build(Language::Cpp, &dir.path().join("a.cpp"), dir.path())
            .await;

        assert!(matches!(result, Err(JudgeError::Toolchain { .. })));
    }

    #[tokio::test]
    async fn test_disabled_language_is_configuration_error() {
        let table = LanguageTable::from_toml_str("[python3]\nrun_command = \"python3 {source}\"\n")
            .unwrap();
        let compiler = Compiler::new(Arc::new(MockRunner::new()), Arc::new(table), COMPILE_TIMEOUT);

        let result = compiler
            .build(Language::Cpp, Path::new("/x/a.cpp"), Path::new("/x"))
            .await;

        assert!(matches!(result, Err(JudgeError::LanguageDisabled(_))));
    }
}
