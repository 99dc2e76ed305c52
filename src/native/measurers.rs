use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    domain::{EnergyReport, HardwareNotes, Measurement, MeasurementMethod, ResourceSample},
    energy::estimate_from_metrics,
    errors::MeasureError,
    language::{LanguageStrategy, MeasurementStrategy},
    traits::{
        measurer::{EnergyMeasurer, MeasurerFactory},
        probe::ProcessProbe,
    },
};
use crate::native::{
    rapl::{EnergyTracker, TrackerSession, TrackerSource},
    sampler::SamplerHandle,
};

const GPU_NOT_TRACKED: &str = "not tracked";

#[derive(Debug)]
pub struct HeuristicMeasurer {
    probe: Arc<dyn ProcessProbe>,
    interval: Duration,
    fallback: ResourceSample,
    ram_note: &'static str,
    started: bool,
    sampler: Option<SamplerHandle>,
}

impl HeuristicMeasurer {
    pub fn new(
        probe: Arc<dyn ProcessProbe>,
        interval: Duration,
        fallback: ResourceSample,
        ram_note: &'static str,
    ) -> Self {
        Self {
            probe,
            interval,
            fallback,
            ram_note,
            started: false,
            sampler: None,
        }
    }
}

#[async_trait::async_trait]
impl EnergyMeasurer for HeuristicMeasurer {
    fn method(&self) -> MeasurementMethod {
        MeasurementMethod::SystemMetrics
    }

    async fn start(&mut self) -> Result<(), MeasureError> {
        self.started = true;
        Ok(())
    }

    fn attach(&mut self, pid: u32) {
        if self.sampler.is_none() {
            self.sampler = Some(SamplerHandle::spawn(pid, self.probe.clone(), self.interval));
        }
    }

    async fn stop(&mut self, wall_time: Duration) -> Result<Measurement, MeasureError> {
        if !std::mem::take(&mut self.started) {
            return Err(MeasureError::NotStarted);
        }
        let samples = match self.sampler.take() {
            Some(sampler) => sampler.finish().await?,
            None => Vec::new(),
        };

        let (usage, hardware) = match ResourceSample::mean(&samples) {
            Some(mean) => (
                mean,
                HardwareNotes {
                    cpu_energy: "estimated from process metrics".to_string(),
                    gpu_energy: GPU_NOT_TRACKED.to_string(),
                    ram_energy: self.ram_note.to_string(),
                },
            ),
            None => {
                tracing::debug!(fallback = ?self.fallback, "No samples collected, using language defaults");
                (
                    self.fallback,
                    HardwareNotes {
                        cpu_energy: format!(
                            "estimated from language default ({}% CPU, process not sampled)",
                            self.fallback.cpu_percent
                        ),
                        gpu_energy: GPU_NOT_TRACKED.to_string(),
                        ram_energy: format!(
                            "{} from language default ({} MB)",
                            self.ram_note, self.fallback.memory_mb
                        ),
                    },
                )
            }
        };

        tracing::debug!(
            samples = samples.len(),
            cpu_percent = usage.cpu_percent,
            memory_mb = usage.memory_mb,
            ?wall_time,
            "Heuristic estimate"
        );

        Ok(Measurement {
            energy: estimate_from_metrics(
                usage.cpu_percent,
                usage.memory_mb,
                wall_time.as_secs_f64(),
            ),
            method: self.method(),
            hardware,
        })
    }
}

#[derive(Debug)]
pub struct HardwareMeasurer {
    tracker: EnergyTracker,
    ram_note: &'static str,
    session: Option<TrackerSession>,
}

impl HardwareMeasurer {
    pub fn new(tracker: EnergyTracker, ram_note: &'static str) -> Self {
        Self {
            tracker,
            ram_note,
            session: None,
        }
    }
}

#[async_trait::async_trait]
impl EnergyMeasurer for HardwareMeasurer {
    fn method(&self) -> MeasurementMethod {
        MeasurementMethod::HardwareTracked
    }

    async fn start(&mut self) -> Result<(), MeasureError> {
        self.session = Some(self.tracker.start()?);
        Ok(())
    }

    fn attach(&mut self, _pid: u32) {}

    async fn stop(&mut self, _wall_time: Duration) -> Result<Measurement, MeasureError> {
        let session = self.session.take().ok_or(MeasureError::NotStarted)?;
        let reading = self.tracker.stop(session)?;

        let cpu_energy = match reading.source {
            TrackerSource::Rapl => "tracked via RAPL".to_string(),
            TrackerSource::ConstantPower => format!(
                "estimated from {} W constant power (RAPL unavailable)",
                self.tracker.fallback_watts()
            ),
        };

        Ok(Measurement {
            energy: EnergyReport::from_kwh(reading.kwh, reading.co2_kg),
            method: self.method(),
            hardware: HardwareNotes {
                cpu_energy,
                gpu_energy: GPU_NOT_TRACKED.to_string(),
                ram_energy: self.ram_note.to_string(),
            },
        })
    }
}

#[derive(Clone, Debug)]
pub struct SystemMeasurerFactory {
    probe: Arc<dyn ProcessProbe>,
    sample_interval: Duration,
    tracker: EnergyTracker,
}

impl SystemMeasurerFactory {
    pub fn new(
        probe: Arc<dyn ProcessProbe>,
        sample_interval: Duration,
        tracker: EnergyTracker,
    ) -> Self {
        Self {
            probe,
            sample_interval,
            tracker,
        }
    }
}

impl MeasurerFactory for SystemMeasurerFactory {
    fn create(&self, strategy: &LanguageStrategy) -> Box<dyn EnergyMeasurer> {
        match strategy.measurement {
            MeasurementStrategy::Heuristic => Box::new(HeuristicMeasurer::new(
                self.probe.clone(),
                self.sample_interval,
                strategy.fallback.unwrap_or_default(),
                strategy.ram_note,
            )),
            MeasurementStrategy::HardwareTracked => {
                Box::new(HardwareMeasurer::new(self.tracker.clone(), strategy.ram_note))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        domain::Language, language::strategy_for, traits::probe::{MockProcessProbe, ProcessStat},
    };

    fn silent_probe() -> Arc<dyn ProcessProbe> {
        let mut probe = MockProcessProbe::new();
        probe.expect_read().return_const(None);
        Arc::new(probe)
    }

    fn tracker_without_rapl() -> EnergyTracker {
        EnergyTracker::new("/nonexistent/powercap", 32.5, 0.475)
    }

    #[tokio::test]
    async fn test_heuristic_falls_back_to_language_defaults() {
        let strategy = strategy_for(Language::Cpp);
        let mut measurer = HeuristicMeasurer::new(
            silent_probe(),
            Duration::from_millis(100),
            strategy.fallback.unwrap(),
            strategy.ram_note,
        );

        measurer.start().await.unwrap();
        measurer.attach(42);
        let measurement = measurer.stop(Duration::from_secs(2)).await.unwrap();

        assert_eq!(measurement.method, MeasurementMethod::SystemMetrics);
        assert_eq!(measurement.energy, estimate_from_metrics(8.0, 10.0, 2.0));
        assert!(measurement.hardware.cpu_energy.contains("language default"));
        assert_eq!(measurement.hardware.gpu_energy, "not tracked");
    }

    #[tokio::test(start_paused = true)]
    async fn test_heuristic_uses_sampled_usage() {
        let mut probe = MockProcessProbe::new();
        let mut reads = 0u64;
        probe.expect_read().returning(move |_| {
            reads += 1;
            // 50 ms of CPU per 100 ms interval, 4 GiB resident
            Some(ProcessStat {
                cpu_time: Duration::from_millis(50 * reads),
                rss_bytes: 4096 * 1024 * 1024,
            })
        });

        let mut measurer = HeuristicMeasurer::new(
            Arc::new(probe),
            Duration::from_millis(100),
            ResourceSample::new(10.0, 80.0),
            "estimated",
        );
        measurer.start().await.unwrap();
        measurer.attach(42);
        tokio::time::sleep(Duration::from_millis(350)).await;
        let measurement = measurer.stop(Duration::from_secs(2)).await.unwrap();

        assert_eq!(measurement.hardware.cpu_energy, "estimated from process metrics");
        assert_eq!(measurement.hardware.ram_energy, "estimated");
        assert!(measurement.energy.total_kwh > 0.0);
    }

    #[tokio::test]
    async fn test_stop_without_start_fails() {
        let mut heuristic = HeuristicMeasurer::new(
            silent_probe(),
            Duration::from_millis(100),
            ResourceSample::default(),
            "estimated",
        );
        assert!(matches!(
            heuristic.stop(Duration::ZERO).await,
            Err(MeasureError::NotStarted)
        ));

        let mut hardware = HardwareMeasurer::new(tracker_without_rapl(), "estimated");
        assert!(matches!(
            hardware.stop(Duration::ZERO).await,
            Err(MeasureError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_hardware_measurer_reports_tracker_source() {
        let mut measurer = HardwareMeasurer::new(tracker_without_rapl(), "estimated");

        measurer.start().await.unwrap();
        let measurement = measurer.stop(Duration::from_millis(5)).await.unwrap();

        assert_eq!(measurement.method, MeasurementMethod::HardwareTracked);
        assert!(measurement.hardware.cpu_energy.contains("32.5 W"));
        assert_eq!(measurement.hardware.ram_energy, "estimated");
        assert!(measurement.energy.total_kwh >= 0.0);
    }

    #[tokio::test]
    async fn test_factory_follows_language_strategy() {
        let factory = SystemMeasurerFactory::new(
            silent_probe(),
            Duration::from_millis(100),
            tracker_without_rapl(),
        );

        for language in Language::ALL {
            let expected = if language == Language::Python {
                MeasurementMethod::HardwareTracked
            } else {
                MeasurementMethod::SystemMetrics
            };
            assert_eq!(factory.create(strategy_for(language)).method(), expected);
        }
    }
}
