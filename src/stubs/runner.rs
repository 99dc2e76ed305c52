use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::{
    errors::RunError,
    language::CommandSpec,
    traits::runner::{RunOutput, Runner, SpawnObserver},
};

const STUB_PID: u32 = 4242;

pub fn output(exit_code: i32, stdout: &str, stderr: &str, wall_time: Duration) -> RunOutput {
    RunOutput {
        exit_code: Some(exit_code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        wall_time,
    }
}

#[derive(Debug)]
pub struct RunnerStub {
    results: Mutex<VecDeque<Result<RunOutput, RunError>>>,
    calls: Mutex<Vec<CommandSpec>>,
    delay: Duration,
}

impl RunnerStub {
    pub fn new(results: Vec<Result<RunOutput, RunError>>, delay: Duration) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
            delay,
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Runner for RunnerStub {
    #[tracing::instrument(skip(self, observer))]
    async fn run(
        &self,
        command: &CommandSpec,
        stdin: &str,
        limit: Duration,
        observer: &mut dyn SpawnObserver,
    ) -> Result<RunOutput, RunError> {
        tracing::debug!(
            "Start execution: command={:?}, stdin={:?}, limit={:?}",
            command,
            stdin,
            limit
        );
        self.calls.lock().unwrap().push(command.clone());
        observer.on_spawn(STUB_PID);
        tokio::time::sleep(self.delay).await;

        let result = self.results.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(RunError::Internal {
                msg: "runner stub has no result left".to_string(),
            })
        });
        tracing::debug!("Execution result: {:?}", result);
        result
    }
}
