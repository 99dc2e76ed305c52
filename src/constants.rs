use std::time::Duration;

pub const RESPONSE_TX_ERR: &str = "Failed to send response to writer";

pub const EXECUTION_TIMEOUT: Duration = Duration::from_secs(10);
pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(10);

pub const MAX_CODE_BYTES: usize = 100_000;
pub const MAX_COMPARE_RUNS: usize = 10;

// Heuristic power model. Reference figures, not calibrated measurements.
pub const CPU_TDP_WATTS: f64 = 65.0;
pub const RAM_REFERENCE_WATTS: f64 = 3.0;
pub const RAM_REFERENCE_MB: f64 = 8192.0;
/// Global-average grid intensity, kg CO2 per kWh.
pub const GRID_INTENSITY_KG_PER_KWH: f64 = 0.475;

pub const JOULES_PER_KWH: f64 = 3_600_000.0;

pub const KWH_PRECISION: i32 = 8;
pub const WH_PRECISION: i32 = 6;
pub const MJ_PRECISION: i32 = 2;
pub const CO2_KG_PRECISION: i32 = 8;
pub const CO2_G_PRECISION: i32 = 6;
pub const TIME_MS_PRECISION: i32 = 2;
