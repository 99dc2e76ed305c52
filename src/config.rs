use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{
    constants::GRID_INTENSITY_KG_PER_KWH,
    core::language::Toolchain,
    native::rapl::DEFAULT_POWERCAP_ROOT,
};

pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;
/// Half of the reference TDP, charged when no RAPL counter is readable.
pub const DEFAULT_FALLBACK_WATTS: f64 = 32.5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub work_dir: PathBuf,
    pub toolchain: Toolchain,
    pub sample_interval: Duration,
    pub rapl_root: PathBuf,
    pub grid_intensity_kg_per_kwh: f64,
    pub fallback_watts: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);
        let defaults = Toolchain::default();

        let config = Self {
            work_dir: path(
                "ENERGY_RUNNER_WORK_DIR",
                std::env::temp_dir().join("energy-runner"),
            ),
            toolchain: Toolchain {
                python: path("PYTHON_PATH", defaults.python),
                node: path("NODE_PATH", defaults.node),
                gnucpp: path("GNUCPP_PATH", defaults.gnucpp),
                javac: path("JAVAC_PATH", defaults.javac),
                java: path("JAVA_PATH", defaults.java),
            },
            sample_interval: Duration::from_millis(parse(
                &lookup,
                "ENERGY_RUNNER_SAMPLE_INTERVAL_MS",
                DEFAULT_SAMPLE_INTERVAL_MS,
            )?),
            rapl_root: path("ENERGY_RUNNER_RAPL_ROOT", DEFAULT_POWERCAP_ROOT.into()),
            grid_intensity_kg_per_kwh: parse(
                &lookup,
                "ENERGY_RUNNER_GRID_INTENSITY",
                GRID_INTENSITY_KG_PER_KWH,
            )?,
            fallback_watts: parse(&lookup, "ENERGY_RUNNER_FALLBACK_WATTS", DEFAULT_FALLBACK_WATTS)?,
        };

        if config.sample_interval.is_zero() {
            return Err(invalid(
                "ENERGY_RUNNER_SAMPLE_INTERVAL_MS",
                "0",
                "must be positive",
            ));
        }
        for (key, value) in [
            ("ENERGY_RUNNER_GRID_INTENSITY", config.grid_intensity_kg_per_kwh),
            ("ENERGY_RUNNER_FALLBACK_WATTS", config.fallback_watts),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, &value.to_string(), "must be a non-negative number"));
            }
        }

        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
