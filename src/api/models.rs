use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasureRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stdin: Option<String>,
    /// Present selects compare mode.
    #[serde(default)]
    pub runs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyBody {
    pub total_kwh: f64,
    pub total_wh: f64,
    pub total_mj: f64,
    pub co2_emissions_kg: f64,
    pub co2_emissions_g: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardwareBody {
    pub cpu_energy: String,
    pub gpu_energy: String,
    pub ram_energy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureResponse {
    pub status: &'static str,
    pub output: String,
    pub error: Option<String>,
    #[serde(rename = "executionTime")]
    pub execution_time: f64,
    pub energy: EnergyBody,
    pub hardware: HardwareBody,
    pub measurement_method: &'static str,
    pub exit_code: Option<i32>,
    pub measured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilationFailedResponse {
    pub status: &'static str,
    pub output: String,
    pub error: String,
    #[serde(rename = "executionTime")]
    pub execution_time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureResponse {
    pub status: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported: Option<Vec<&'static str>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareResponse {
    pub runs: Vec<MeasureResponse>,
    #[serde(rename = "averageExecutionTime")]
    pub average_execution_time: f64,
    pub average_energy: EnergyBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub status_code: u16,
    pub body: serde_json::Value,
}
