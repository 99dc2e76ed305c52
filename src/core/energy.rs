use crate::{
    constants::{
        CO2_G_PRECISION, CO2_KG_PRECISION, CPU_TDP_WATTS, GRID_INTENSITY_KG_PER_KWH,
        JOULES_PER_KWH, KWH_PRECISION, MJ_PRECISION, RAM_REFERENCE_MB, RAM_REFERENCE_WATTS,
        WH_PRECISION,
    },
    core::domain::{EnergyReport, round_to},
};

impl EnergyReport {
    /// `total_mj` is filled with joules for wire compatibility with existing
    /// consumers of the field.
    pub fn from_joules(joules: f64, grid_intensity_kg_per_kwh: f64) -> Self {
        let kwh = joules.max(0.0) / JOULES_PER_KWH;
        Self::from_kwh(kwh, kwh * grid_intensity_kg_per_kwh.max(0.0))
    }

    pub fn from_kwh(kwh: f64, co2_kg: f64) -> Self {
        let kwh = kwh.max(0.0);
        let co2_kg = co2_kg.max(0.0);

        Self {
            total_kwh: round_to(kwh, KWH_PRECISION),
            total_wh: round_to(kwh * 1000.0, WH_PRECISION),
            total_mj: round_to(kwh * JOULES_PER_KWH, MJ_PRECISION),
            co2_kg: round_to(co2_kg, CO2_KG_PRECISION),
            co2_g: round_to(co2_kg * 1000.0, CO2_G_PRECISION),
        }
    }

    pub fn mean(reports: &[EnergyReport]) -> Self {
        if reports.is_empty() {
            return Self::default();
        }
        let count = reports.len() as f64;
        let avg = |field: fn(&EnergyReport) -> f64, places: i32| {
            round_to(reports.iter().map(field).sum::<f64>() / count, places)
        };

        Self {
            total_kwh: avg(|r| r.total_kwh, KWH_PRECISION),
            total_wh: avg(|r| r.total_wh, WH_PRECISION),
            total_mj: avg(|r| r.total_mj, MJ_PRECISION),
            co2_kg: avg(|r| r.co2_kg, CO2_KG_PRECISION),
            co2_g: avg(|r| r.co2_g, CO2_G_PRECISION),
        }
    }
}

pub fn estimate_from_metrics(cpu_percent: f64, memory_mb: f64, duration_secs: f64) -> EnergyReport {
    let cpu_power_watts = (cpu_percent.max(0.0) / 100.0) * CPU_TDP_WATTS;
    let ram_power_watts = (memory_mb.max(0.0) / RAM_REFERENCE_MB) * RAM_REFERENCE_WATTS;
    let total_joules = (cpu_power_watts + ram_power_watts) * duration_secs.max(0.0);

    EnergyReport::from_joules(total_joules, GRID_INTENSITY_KG_PER_KWH)
}
