use std::time::Duration;

use crate::core::{errors::RunError, language::CommandSpec};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub wall_time: Duration,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub trait SpawnObserver: Send {
    fn on_spawn(&mut self, pid: u32);
}

impl SpawnObserver for () {
    fn on_spawn(&mut self, _pid: u32) {}
}

#[async_trait::async_trait]
pub trait Runner: std::fmt::Debug + Send + Sync {
    /// Spawns `command`, writes `stdin` to it and waits at most `limit` for
    /// it to exit. On expiry the child is killed and `RunError::TimedOut` is
    /// returned; no partial output is kept.
    async fn run(
        &self,
        command: &CommandSpec,
        stdin: &str,
        limit: Duration,
        observer: &mut dyn SpawnObserver,
    ) -> Result<RunOutput, RunError>;
}
