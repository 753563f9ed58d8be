//! Runner module - Execution abstraction layer
//!
//! A runner spawns one process, feeds it stdin, captures stdout/stderr and
//! enforces a wall-clock timeout. `ProcessRunner` is the local
//! implementation; the trait exists so the build and test stages can be
//! driven without real processes.
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Know about languages or compilation

pub mod process;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        Self::new(program).with_args(iter.cloned())
    }

    /// Convert to a vector of strings (program + args)
    pub fn to_vec(&self) -> Vec<String> {
        let mut v = vec![self.program.clone()];
        v.extend(self.args.iter().cloned());
        v
    }
}

/// How the process ended (raw, no verdict interpretation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Program exited normally with given exit code
    Exited(i32),
    /// Killed by signal
    Signaled(i32),
    /// Wall-clock limit hit; the process group was killed
    TimedOut,
}

/// Outcome of running a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Stdout content (possibly partial on timeout)
    pub stdout: Vec<u8>,
    /// Stderr content (possibly partial on timeout)
    pub stderr: Vec<u8>,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn timed_out(&self) -> bool {
        self.status == RunStatus::TimedOut
    }

    /// Exit code when the program exited on its own
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            RunStatus::Exited(code) => Some(code),
            _ => None,
        }
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    /// The program could not be started at all (missing binary, permissions)
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// Failure talking to a process that did start
    #[error("process I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Runner trait for executing programs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run `cmd` to completion or until `timeout` elapses, feeding it `stdin`
    async fn run(
        &self,
        cmd: &CommandSpec,
        stdin: &[u8],
        timeout: Duration,
    ) -> Result<RunOutcome, RunError>;
}

pub use process::ProcessRunner;
