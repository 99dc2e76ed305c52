use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::{constants::JOULES_PER_KWH, core::errors::MeasureError};

pub const DEFAULT_POWERCAP_ROOT: &str = "/sys/class/powercap";

#[derive(Clone, Debug, PartialEq, Eq)]
struct RaplZone {
    energy_path: PathBuf,
    /// Counter wraps to zero past this value. Zero when unknown.
    max_range_uj: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerSource {
    Rapl,
    ConstantPower,
}

#[derive(Debug)]
pub struct TrackerSession {
    zones: Vec<(RaplZone, u64)>,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl TrackerSession {
    pub fn source(&self) -> TrackerSource {
        if self.zones.is_empty() {
            TrackerSource::ConstantPower
        } else {
            TrackerSource::Rapl
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerReading {
    pub kwh: f64,
    pub co2_kg: f64,
    pub source: TrackerSource,
}

#[derive(Clone, Debug)]
pub struct EnergyTracker {
    root: PathBuf,
    fallback_watts: f64,
    grid_intensity_kg_per_kwh: f64,
}

impl EnergyTracker {
    pub fn new<T: AsRef<Path>>(root: T, fallback_watts: f64, grid_intensity_kg_per_kwh: f64) -> Self {
        Self {
            root: root.as_ref().into(),
            fallback_watts,
            grid_intensity_kg_per_kwh,
        }
    }

    pub fn fallback_watts(&self) -> f64 {
        self.fallback_watts
    }

    pub fn start(&self) -> Result<TrackerSession, MeasureError> {
        let mut zones = Vec::new();
        for zone in self.discover() {
            let start = read_counter(&zone.energy_path).map_err(|source| MeasureError::Counter {
                path: zone.energy_path.clone(),
                source,
            })?;
            zones.push((zone, start));
        }
        if zones.is_empty() {
            tracing::debug!(root = %self.root.display(), "No readable RAPL zone, tracking constant power");
        }

        Ok(TrackerSession {
            zones,
            started: Instant::now(),
            started_at: Utc::now(),
        })
    }

    pub fn stop(&self, session: TrackerSession) -> Result<TrackerReading, MeasureError> {
        let elapsed = session.started.elapsed();
        let source = session.source();

        let joules = match source {
            TrackerSource::ConstantPower => self.fallback_watts * elapsed.as_secs_f64(),
            TrackerSource::Rapl => {
                let mut total_uj = 0u64;
                for (zone, start) in &session.zones {
                    let end = read_counter(&zone.energy_path).map_err(|source| {
                        MeasureError::Counter {
                            path: zone.energy_path.clone(),
                            source,
                        }
                    })?;
                    total_uj = total_uj.saturating_add(counter_delta(*start, end, zone.max_range_uj));
                }
                total_uj as f64 / 1_000_000.0
            }
        };

        tracing::debug!(
            started_at = %session.started_at,
            ?elapsed,
            joules,
            ?source,
            "Energy tracker stopped"
        );

        let kwh = joules.max(0.0) / JOULES_PER_KWH;
        Ok(TrackerReading {
            kwh,
            co2_kg: kwh * self.grid_intensity_kg_per_kwh,
            source,
        })
    }

    fn discover(&self) -> Vec<RaplZone> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut zones: Vec<RaplZone> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                // Subzones (intel-rapl:0:0) are already counted by their package.
                let index = name.strip_prefix("intel-rapl:")?;
                if index.contains(':') {
                    return None;
                }
                let dir = entry.path();
                let energy_path = dir.join("energy_uj");
                read_counter(&energy_path).ok()?;
                Some(RaplZone {
                    max_range_uj: read_counter(&dir.join("max_energy_range_uj")).unwrap_or(0),
                    energy_path,
                })
            })
            .collect();
        zones.sort_by(|a, b| a.energy_path.cmp(&b.energy_path));
        zones
    }
}

fn read_counter(path: &Path) -> io::Result<u64> {
    std::fs::read_to_string(path)?
        .trim()
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn counter_delta(start: u64, end: u64, max_range_uj: u64) -> u64 {
    if end >= start {
        end - start
    } else if max_range_uj > start {
        max_range_uj - start + end
    } else {
        end
    }
}
