use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, timeout};

use crate::core::{
    errors::RunError,
    language::CommandSpec,
    traits::runner::{RunOutput, Runner, SpawnObserver},
};

#[derive(Clone, Debug, Default)]
pub struct NativeRunner;

impl NativeRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Runner for NativeRunner {
    #[tracing::instrument(skip(self, stdin, observer), fields(program = %command.program.display()))]
    async fn run(
        &self,
        command: &CommandSpec,
        stdin: &str,
        limit: Duration,
        observer: &mut dyn SpawnObserver,
    ) -> Result<RunOutput, RunError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| RunError::FailedToLaunch {
            program: command.program.display().to_string(),
            msg: e.to_string(),
        })?;
        if let Some(pid) = child.id() {
            tracing::debug!(pid, "Process spawned");
            observer.on_spawn(pid);
        }

        let stdin_task = feed(child.stdin.take(), stdin.to_string());
        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());
        let abort_all = || {
            stdin_task.abort();
            stdout_task.abort();
            stderr_task.abort();
        };

        let status = match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                abort_all();
                return Err(RunError::Internal {
                    msg: format!("Failed to wait for process: {}", e),
                });
            }
            Err(_) => {
                tracing::debug!(?limit, "Process timed out, killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out process");
                }
                abort_all();
                return Err(RunError::TimedOut { limit });
            }
        };
        let wall_time = started.elapsed();

        // Descendants may keep the pipes open after the child exits, so the
        // drain gets whatever is left of the same bound.
        let stdout_abort = stdout_task.abort_handle();
        let stderr_abort = stderr_task.abort_handle();
        let drained = timeout(
            limit.saturating_sub(started.elapsed()),
            futures::future::join(stdout_task, stderr_task),
        )
        .await;
        let (stdout, stderr) = match drained {
            Ok(pair) => pair,
            Err(_) => {
                stdout_abort.abort();
                stderr_abort.abort();
                return Err(RunError::TimedOut { limit });
            }
        };

        Ok(RunOutput {
            exit_code: status.code(),
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
            wall_time,
        })
    }
}

fn feed(handle: Option<ChildStdin>, input: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(mut handle) = handle else {
            return;
        };
        if !input.is_empty() {
            match handle.write_all(input.as_bytes()).await {
                Ok(()) => {}
                // The program exited or closed stdin without reading it.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => tracing::warn!(error = %e, "Failed to write to stdin"),
            }
        }
        // Dropping the handle closes the pipe and signals EOF.
    })
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

fn collect(
    joined: Result<io::Result<Vec<u8>>, tokio::task::JoinError>,
) -> Result<String, RunError> {
    let bytes = joined
        .map_err(|e| RunError::Internal {
            msg: format!("Output reader failed: {}", e),
        })?
        .map_err(|e| RunError::Internal {
            msg: format!("Failed to read process output: {}", e),
        })?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}
