use std::path::Path;
use std::time::Duration;

use crate::core::{errors::PipelineError, language::CommandSpec, traits::runner::Runner};

#[tracing::instrument(skip(runner), fields(program = %command.program.display()))]
pub async fn compile(
    runner: &dyn Runner,
    command: &CommandSpec,
    limit: Duration,
) -> Result<(), PipelineError> {
    tracing::debug!("Start compiling");
    let output = runner.run(command, "", limit, &mut ()).await?;
    tracing::debug!(exit_code = ?output.exit_code, "Compilation finished");

    if output.success() {
        return Ok(());
    }
    let diagnostics = if output.stderr.trim().is_empty() {
        output.stdout
    } else {
        output.stderr
    };
    Err(PipelineError::Compilation {
        stderr: strip_run_dir(&diagnostics, &command.cwd),
    })
}

/// Compilers print absolute source paths; callers only know the file name.
fn strip_run_dir(diagnostics: &str, run_dir: &Path) -> String {
    let prefix = format!("{}/", run_dir.display());
    diagnostics.replace(&prefix, "")
}
