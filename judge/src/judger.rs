//! Judger module - evaluates one submission against one problem
//!
//! Builds the submission once, then runs every graded test case in stored
//! order. Example cases are never run. All inputs are validated before any
//! process is spawned.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::compiler::{BuildOutcome, Compiler};
use crate::config::JudgeConfig;
use crate::core::{Evaluation, Problem};
use crate::error::{JudgeError, Result};
use crate::executor;
use crate::languages::{Language, LanguageTable};
use crate::runner::{ProcessRunner, Runner};

/// Evaluation engine
///
/// Holds no mutable state, so one `Judge` can serve concurrent evaluations
/// as long as each uses its own working directory.
pub struct Judge {
    runner: Arc<dyn Runner>,
    compiler: Compiler,
    languages: Arc<LanguageTable>,
    config: JudgeConfig,
}

impl Judge {
    /// Judge backed by local processes
    pub fn new(config: JudgeConfig, languages: LanguageTable) -> Self {
        let runner = Arc::new(ProcessRunner::new(config.max_output_bytes));
        Self::with_runner(config, languages, runner)
    }

    pub fn with_runner(
        config: JudgeConfig,
        languages: LanguageTable,
        runner: Arc<dyn Runner>,
    ) -> Self {
        let languages = Arc::new(languages);
        let compiler = Compiler::new(runner.clone(), languages.clone(), config.compile_timeout);
        Self {
            runner,
            compiler,
            languages,
            config,
        }
    }

    /// Evaluate `source_path` against the graded tests of `problem`
    pub async fn evaluate(
        &self,
        language: Language,
        source_path: &Path,
        work_dir: &Path,
        problem: &Problem,
    ) -> Result<Evaluation> {
        let toolchain = self.languages.toolchain(language)?;
        if problem.graded_tests().next().is_none() {
            return Err(JudgeError::NoGradedTests(problem.title.clone()));
        }
        // Commands run inside work_dir, so relative paths would resolve twice
        let source_path = tokio::fs::canonicalize(source_path)
            .await
            .map_err(|_| JudgeError::SourceMissing(source_path.to_path_buf()))?;
        let work_dir = tokio::fs::canonicalize(work_dir)
            .await
            .map_err(|_| JudgeError::WorkDir(work_dir.to_path_buf()))?;
        if !is_dir(&work_dir).await {
            return Err(JudgeError::WorkDir(work_dir));
        }

        info!(
            "Evaluating {} ({}) against {}",
            source_path.display(),
            language,
            problem.title
        );

        let run_cmd = match self.compiler.build(language, &source_path, &work_dir).await? {
            BuildOutcome::Ready(cmd) => cmd,
            BuildOutcome::Failed(diagnostic) => {
                info!("Build failed, skipping {} test(s)", problem.graded_tests().count());
                return Ok(Evaluation::build_failed(diagnostic));
            }
        };

        let base_ms = problem
            .time_limit_ms
            .unwrap_or(self.config.default_time_limit_ms);
        let time_limit = Duration::from_millis(toolchain.calculate_time_limit(base_ms) as u64);
        debug!("Per-test time limit: {:?}", time_limit);

        let mut results = Vec::new();
        for test in problem.graded_tests() {
            let result = executor::execute(self.runner.as_ref(), &run_cmd, test, time_limit).await?;
            debug!("{}: {}", test.name, result.classification);
            results.push(result);
        }

        let evaluation = Evaluation::from_results(results);
        info!(
            "Evaluation summary: problem={}, classification={}, passed={}/{}",
            problem.title,
            evaluation.classification,
            evaluation.passed(),
            evaluation.results.len()
        );
        Ok(evaluation)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
