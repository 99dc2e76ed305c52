use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::{
    constants::{MAX_CODE_BYTES, TIME_MS_PRECISION},
    core::errors::ValidationError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    Cpp,
    Java,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Cpp,
        Language::Java,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.as_str() == tag)
            .ok_or_else(|| ValidationError::UnsupportedLanguage {
                given: tag.to_string(),
            })
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionRequest {
    code: String,
    language: Language,
    stdin: String,
}

impl ExecutionRequest {
    pub fn new(
        code: impl Into<String>,
        language: &str,
        stdin: Option<String>,
    ) -> Result<Self, ValidationError> {
        let language = language.parse()?;
        let code = code.into();

        if code.is_empty() {
            return Err(ValidationError::MissingCode);
        }
        if code.len() > MAX_CODE_BYTES {
            return Err(ValidationError::CodeTooLarge {
                limit: MAX_CODE_BYTES,
            });
        }

        Ok(Self {
            code,
            language,
            stdin: stdin.unwrap_or_default(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn stdin(&self) -> &str {
        &self.stdin
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunArtifact {
    pub dir: PathBuf,
    pub source_path: PathBuf,
    pub binary_path: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

impl ResourceSample {
    pub const fn new(cpu_percent: f64, memory_mb: f64) -> Self {
        Self {
            cpu_percent,
            memory_mb,
        }
    }

    pub fn mean(samples: &[ResourceSample]) -> Option<ResourceSample> {
        if samples.is_empty() {
            return None;
        }
        let count = samples.len() as f64;
        let (cpu, memory) = samples.iter().fold((0.0, 0.0), |(cpu, memory), sample| {
            (cpu + sample.cpu_percent, memory + sample.memory_mb)
        });
        Some(ResourceSample::new(cpu / count, memory / count))
    }
}

/// Energy and emissions of one run. `total_mj` carries joules; see
/// `EnergyReport::from_joules`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyReport {
    pub total_kwh: f64,
    pub total_wh: f64,
    pub total_mj: f64,
    pub co2_kg: f64,
    pub co2_g: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementMethod {
    SystemMetrics,
    HardwareTracked,
}

impl MeasurementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementMethod::SystemMetrics => "system-metrics",
            MeasurementMethod::HardwareTracked => "hardware-tracked",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HardwareNotes {
    pub cpu_energy: String,
    pub gpu_energy: String,
    pub ram_energy: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub energy: EnergyReport,
    pub method: MeasurementMethod,
    pub hardware: HardwareNotes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub stdout: String,
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
    pub execution_time_ms: f64,
    pub energy: EnergyReport,
    pub measurement_method: MeasurementMethod,
    pub hardware: HardwareNotes,
    pub measured_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct ComparisonResult {
    pub runs: Vec<ExecutionResult>,
    pub average_execution_time_ms: f64,
    pub average_energy: EnergyReport,
}

impl ComparisonResult {
    pub fn from_runs(runs: Vec<ExecutionResult>) -> Option<Self> {
        if runs.is_empty() {
            return None;
        }
        let total_ms: f64 = runs.iter().map(|run| run.execution_time_ms).sum();
        let energies: Vec<EnergyReport> = runs.iter().map(|run| run.energy).collect();

        Some(Self {
            average_execution_time_ms: round_to(total_ms / runs.len() as f64, TIME_MS_PRECISION),
            average_energy: EnergyReport::mean(&energies),
            runs,
        })
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
