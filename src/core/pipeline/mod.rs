use std::sync::Arc;
use std::time::Duration;

use crate::{
    constants::{COMPILE_TIMEOUT, EXECUTION_TIMEOUT, MAX_COMPARE_RUNS},
    core::{
        domain::{ComparisonResult, ExecutionRequest, ExecutionResult, RunArtifact},
        errors::{PipelineError, ValidationError},
        language::{LanguageStrategy, Toolchain, strategy_for},
        traits::{measurer::MeasurerFactory, runner::Runner},
    },
    native::artifacts::ArtifactManager,
};

pub mod compiling;
pub mod running;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub compile: Duration,
    pub execution: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            compile: COMPILE_TIMEOUT,
            execution: EXECUTION_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Pipeline {
    artifacts: ArtifactManager,
    toolchain: Arc<Toolchain>,
    runner: Arc<dyn Runner>,
    measurers: Arc<dyn MeasurerFactory>,
    timeouts: Timeouts,
}

impl Pipeline {
    pub fn new(
        artifacts: ArtifactManager,
        toolchain: Toolchain,
        runner: Arc<dyn Runner>,
        measurers: Arc<dyn MeasurerFactory>,
    ) -> Self {
        Self {
            artifacts,
            toolchain: Arc::new(toolchain),
            runner,
            measurers,
            timeouts: Timeouts::default(),
        }
    }

    #[cfg(test)]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[tracing::instrument(skip_all, fields(language = %request.language()))]
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, PipelineError> {
        let strategy = strategy_for(request.language());
        let artifact = self.artifacts.prepare(strategy, request.code()).await?;

        let result = self
            .execute_prepared(strategy, &artifact, request.stdin())
            .await;
        artifact.release().await;

        match &result {
            Ok(result) => tracing::info!(
                status = result.status.as_str(),
                execution_time_ms = result.execution_time_ms,
                total_kwh = result.energy.total_kwh,
                "Run completed"
            ),
            Err(e) => tracing::info!(error = %e, "Run failed"),
        }
        result
    }

    async fn execute_prepared(
        &self,
        strategy: &LanguageStrategy,
        artifact: &RunArtifact,
        stdin: &str,
    ) -> Result<ExecutionResult, PipelineError> {
        let plan = strategy.build_commands(artifact, &self.toolchain);
        tracing::debug!(
            dir = %artifact.dir.display(),
            requires_compile = strategy.requires_compile(),
            "Build plan ready"
        );

        if let Some(command) = &plan.compile {
            compiling::compile(self.runner.as_ref(), command, self.timeouts.compile).await?;
        }

        running::run_measured(
            self.runner.as_ref(),
            self.measurers.as_ref(),
            strategy,
            &plan.run,
            stdin,
            self.timeouts.execution,
        )
        .await
    }

    /// Executes the same request `runs` times in sequence and averages the
    /// results. The first failing iteration aborts the comparison.
    #[tracing::instrument(skip_all, fields(language = %request.language(), runs = runs))]
    pub async fn compare(
        &self,
        request: &ExecutionRequest,
        runs: usize,
    ) -> Result<ComparisonResult, PipelineError> {
        if !(1..=MAX_COMPARE_RUNS).contains(&runs) {
            return Err(ValidationError::InvalidRunCount {
                given: runs,
                max: MAX_COMPARE_RUNS,
            }
            .into());
        }

        let mut results = Vec::with_capacity(runs);
        for iteration in 1..=runs {
            tracing::debug!(iteration, "Starting comparison run");
            results.push(self.execute(request).await?);
        }

        ComparisonResult::from_runs(results).ok_or_else(|| PipelineError::Process {
            msg: "comparison produced no runs".to_string(),
        })
    }
}
