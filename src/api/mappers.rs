use serde::Serialize;

use crate::{
    api::models::{
        CompareResponse, CompilationFailedResponse, EnergyBody, Envelope, FailureResponse,
        HardwareBody, MeasureRequest, MeasureResponse,
    },
    core::{
        domain::{
            ComparisonResult, EnergyReport, ExecutionRequest, ExecutionResult, HardwareNotes,
            Language,
        },
        errors::{PipelineError, ValidationError, supported_languages},
    },
};

const STATUS_ERROR: &str = "error";

impl TryFrom<MeasureRequest> for ExecutionRequest {
    type Error = ValidationError;

    fn try_from(req: MeasureRequest) -> Result<Self, ValidationError> {
        let language = req
            .language
            .unwrap_or_else(|| Language::Python.as_str().to_string());
        ExecutionRequest::new(req.code.unwrap_or_default(), &language, req.stdin)
    }
}

impl From<EnergyReport> for EnergyBody {
    fn from(report: EnergyReport) -> Self {
        Self {
            total_kwh: report.total_kwh,
            total_wh: report.total_wh,
            total_mj: report.total_mj,
            co2_emissions_kg: report.co2_kg,
            co2_emissions_g: report.co2_g,
        }
    }
}

impl From<HardwareNotes> for HardwareBody {
    fn from(notes: HardwareNotes) -> Self {
        Self {
            cpu_energy: notes.cpu_energy,
            gpu_energy: notes.gpu_energy,
            ram_energy: notes.ram_energy,
        }
    }
}

impl From<ExecutionResult> for MeasureResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            status: result.status.as_str(),
            output: result.stdout,
            error: result.stderr,
            execution_time: result.execution_time_ms,
            energy: result.energy.into(),
            hardware: result.hardware.into(),
            measurement_method: result.measurement_method.as_str(),
            exit_code: result.exit_code,
            measured_at: result.measured_at,
        }
    }
}

impl From<ComparisonResult> for CompareResponse {
    fn from(comparison: ComparisonResult) -> Self {
        Self {
            runs: comparison.runs.into_iter().map(Into::into).collect(),
            average_execution_time: comparison.average_execution_time_ms,
            average_energy: comparison.average_energy.into(),
        }
    }
}

impl Envelope {
    pub fn new<T: Serialize>(status_code: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status_code, body },
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                Self {
                    status_code: 500,
                    body: serde_json::json!({
                        "status": STATUS_ERROR,
                        "error": format!("Failed to serialize response: {e}"),
                    }),
                }
            }
        }
    }

    pub fn ok<T: Serialize>(body: &T) -> Self {
        Self::new(200, body)
    }
}

impl From<PipelineError> for Envelope {
    fn from(err: PipelineError) -> Self {
        let status_code = err.status_code();
        match &err {
            PipelineError::Compilation { .. } => Envelope::new(
                status_code,
                &CompilationFailedResponse {
                    status: STATUS_ERROR,
                    output: String::new(),
                    error: err.to_string(),
                    execution_time: 0.0,
                },
            ),
            PipelineError::Validation(ValidationError::UnsupportedLanguage { .. }) => {
                Envelope::new(
                    status_code,
                    &FailureResponse {
                        status: STATUS_ERROR,
                        error: err.to_string(),
                        supported: Some(supported_languages()),
                    },
                )
            }
            _ => Envelope::new(
                status_code,
                &FailureResponse {
                    status: STATUS_ERROR,
                    error: err.to_string(),
                    supported: None,
                },
            ),
        }
    }
}
