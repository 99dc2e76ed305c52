use std::time::{Duration, Instant};

use chrono::Utc;

use crate::{
    constants::TIME_MS_PRECISION,
    core::{
        domain::{ExecutionResult, ExecutionStatus, Measurement, round_to},
        errors::PipelineError,
        language::{CommandSpec, LanguageStrategy},
        traits::{
            measurer::MeasurerFactory,
            runner::{RunOutput, Runner},
        },
    },
};

/// Runs `command` inside a measurement session. The measurer is stopped on
/// every path once it started; a run failure takes precedence over a
/// measurement failure.
#[tracing::instrument(skip_all, fields(language = %strategy.language))]
pub async fn run_measured(
    runner: &dyn Runner,
    measurers: &dyn MeasurerFactory,
    strategy: &LanguageStrategy,
    command: &CommandSpec,
    stdin: &str,
    limit: Duration,
) -> Result<ExecutionResult, PipelineError> {
    let mut measurer = measurers.create(strategy);
    measurer.start().await?;

    let started = Instant::now();
    let run = runner.run(command, stdin, limit, &mut measurer).await;
    let wall_time = match &run {
        Ok(output) => output.wall_time,
        Err(_) => started.elapsed(),
    };
    let measurement = measurer.stop(wall_time).await;

    let output = match run {
        Ok(output) => output,
        Err(e) => {
            if let Err(measure_err) = &measurement {
                tracing::warn!(error = %measure_err, "Measurement failed after a failed run");
            }
            return Err(e.into());
        }
    };

    Ok(assemble(output, measurement?))
}

fn assemble(output: RunOutput, measurement: Measurement) -> ExecutionResult {
    let success = output.success();
    ExecutionResult {
        status: if success {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Error
        },
        stdout: output.stdout,
        stderr: (!success).then_some(output.stderr),
        exit_code: output.exit_code,
        execution_time_ms: round_to(
            output.wall_time.as_secs_f64() * 1000.0,
            TIME_MS_PRECISION,
        ),
        energy: measurement.energy,
        measurement_method: measurement.method,
        hardware: measurement.hardware,
        measured_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{
        constants::GRID_INTENSITY_KG_PER_KWH,
        core::{
            domain::{EnergyReport, Language},
            errors::RunError,
            language::strategy_for,
        },
        stubs::{
            measurer::MeasurerStubFactory,
            runner::{RunnerStub, output},
        },
    };

    fn node() -> CommandSpec {
        CommandSpec {
            program: PathBuf::from("node"),
            args: vec!["main.js".to_string()],
            cwd: std::env::temp_dir(),
        }
    }

    #[tokio::test]
    async fn test_successful_run() {
        let runner = RunnerStub::new(
            vec![Ok(output(0, "Hello, World!\n", "", Duration::from_millis(1234)))],
            Duration::ZERO,
        );
        let measurers = MeasurerStubFactory::new(10.0);
        let counters = measurers.counters();

        let result = run_measured(
            &runner,
            &measurers,
            strategy_for(Language::JavaScript),
            &node(),
            "",
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.stdout, "Hello, World!\n");
        assert_eq!(result.stderr, None);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.execution_time_ms, 1234.0);
        assert_eq!(
            result.energy,
            EnergyReport::from_joules(12.34, GRID_INTENSITY_KG_PER_KWH)
        );
        assert_eq!(
            (counters.started(), counters.attached(), counters.stopped()),
            (1, 1, 1)
        );
    }

    #[tokio::test]
    async fn test_failing_program_is_a_result() {
        let runner = RunnerStub::new(
            vec![Ok(output(1, "", "TypeError: x is not a function\n", Duration::from_millis(40)))],
            Duration::ZERO,
        );

        let result = run_measured(
            &runner,
            &MeasurerStubFactory::new(10.0),
            strategy_for(Language::JavaScript),
            &node(),
            "",
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(result.status, ExecutionStatus::Error);
        assert_eq!(
            result.stderr.as_deref(),
            Some("TypeError: x is not a function\n")
        );
        assert_eq!(result.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_timeout_stops_measurer() {
        let runner = RunnerStub::new(
            vec![Err(RunError::TimedOut {
                limit: Duration::from_secs(10),
            })],
            Duration::ZERO,
        );
        let measurers = MeasurerStubFactory::new(10.0);
        let counters = measurers.counters();

        let err = run_measured(
            &runner,
            &measurers,
            strategy_for(Language::Python),
            &node(),
            "",
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Timeout { .. }));
        assert_eq!(counters.stopped(), 1);
    }

    #[tokio::test]
    async fn test_run_error_wins_over_measure_error() {
        let runner = RunnerStub::new(
            vec![Err(RunError::FailedToLaunch {
                program: "node".to_string(),
                msg: "No such file or directory".to_string(),
            })],
            Duration::ZERO,
        );

        let err = run_measured(
            &runner,
            &MeasurerStubFactory::new(10.0).failing_on_stop(),
            strategy_for(Language::JavaScript),
            &node(),
            "",
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("failed to launch node"));
    }

    #[tokio::test]
    async fn test_measure_error_after_successful_run() {
        let runner = RunnerStub::new(
            vec![Ok(output(0, "ok", "", Duration::from_millis(5)))],
            Duration::ZERO,
        );

        let err = run_measured(
            &runner,
            &MeasurerStubFactory::new(10.0).failing_on_stop(),
            strategy_for(Language::JavaScript),
            &node(),
            "",
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Process { .. }));
        assert_eq!(err.status_code(), 500);
    }
}
