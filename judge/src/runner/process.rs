//! Local process runner
//!
//! Runs the command directly on the host in a fresh process group. On timeout
//! the whole group is killed. After a normal exit the group is killed as well,
//! so nothing the program forked outlives the call.

use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CommandSpec, RunError, RunOutcome, RunStatus, Runner};

/// How long to wait for output pipes to close once the process group is gone
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Runner that executes programs directly on the host
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Cap for each captured stream; the rest is read and discarded
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    /// Run a program, feeding `stdin` and capturing both output streams
    pub async fn execute(
        &self,
        cmd: &CommandSpec,
        stdin: &[u8],
        limit: Duration,
    ) -> Result<RunOutcome, RunError> {
        debug!("Running {:?} with timeout {:?}", cmd.to_vec(), limit);

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| RunError::Launch {
            program: cmd.program.clone(),
            source,
        })?;
        let mut group = GroupGuard { pid: child.id() };

        let writer = spawn_writer(child.stdin.take(), stdin.to_vec());
        let stdout = spawn_reader(child.stdout.take(), self.max_output_bytes);
        let stderr = spawn_reader(child.stderr.take(), self.max_output_bytes);

        let waited = tokio::time::timeout(limit, child.wait()).await;

        // Leader is done or over time; take down everything it spawned
        group.kill();

        let status = match waited {
            Ok(status) => exit_status(status?),
            Err(_) => {
                warn!(
                    "{} exceeded {:?}, process group killed",
                    cmd.program, limit
                );
                let _ = child.start_kill();
                child.wait().await?;
                RunStatus::TimedOut
            }
        };

        writer.abort();
        let stdout = collect(stdout, "stdout").await;
        let stderr = collect(stderr, "stderr").await;

        debug!(
            "{} finished: status={:?}, stdout={}B, stderr={}B",
            cmd.program,
            status,
            stdout.len(),
            stderr.len()
        );

        Ok(RunOutcome {
            stdout,
            stderr,
            status,
        })
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(16 * 1024 * 1024)
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(
        &self,
        cmd: &CommandSpec,
        stdin: &[u8],
        timeout: Duration,
    ) -> Result<RunOutcome, RunError> {
        self.execute(cmd, stdin, timeout).await
    }
}

/// Kills the process group when dropped, so a cancelled run leaves nothing behind
struct GroupGuard {
    pid: Option<u32>,
}

impl GroupGuard {
    fn kill(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_process_group(pid);
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Write the whole input then close stdin; a child that stops reading early is fine
fn spawn_writer(pipe: Option<ChildStdin>, input: Vec<u8>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(mut pipe) = pipe else {
            return;
        };
        if let Err(e) = pipe.write_all(&input).await {
            if e.kind() != io::ErrorKind::BrokenPipe {
                debug!("Failed to write stdin: {}", e);
            }
        }
    })
}

fn spawn_reader<R>(pipe: Option<R>, limit: usize) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let Some(mut pipe) = pipe else {
            return Ok(buf);
        };
        (&mut pipe).take(limit as u64).read_to_end(&mut buf).await?;
        // Keep draining so the child never blocks on a full pipe
        tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
        Ok(buf)
    })
}

async fn collect(mut handle: JoinHandle<io::Result<Vec<u8>>>, stream: &str) -> Vec<u8> {
    match tokio::time::timeout(DRAIN_GRACE, &mut handle).await {
        Ok(Ok(Ok(buf))) => buf,
        Ok(Ok(Err(e))) => {
            warn!("Failed to read {}: {}", stream, e);
            Vec::new()
        }
        Ok(Err(e)) => {
            warn!("{} reader task failed: {}", stream, e);
            Vec::new()
        }
        Err(_) => {
            // Something outside the process group still holds the pipe
            warn!("{} still open after process exit, discarding", stream);
            handle.abort();
            Vec::new()
        }
    }
}

fn exit_status(status: ExitStatus) -> RunStatus {
    if let Some(code) = status.code() {
        return RunStatus::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return RunStatus::Signaled(signal);
        }
    }
    RunStatus::Exited(-1)
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill process group {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
