use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{
    constants::GRID_INTENSITY_KG_PER_KWH,
    core::{
        domain::{EnergyReport, HardwareNotes, Measurement, MeasurementMethod},
        errors::MeasureError,
        language::LanguageStrategy,
        traits::measurer::{EnergyMeasurer, MeasurerFactory},
    },
};

#[derive(Debug, Default)]
pub struct MeasurerCounters {
    created: AtomicUsize,
    started: AtomicUsize,
    attached: AtomicUsize,
    stopped: AtomicUsize,
}

impl MeasurerCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MeasurerStubFactory {
    counters: Arc<MeasurerCounters>,
    watts: f64,
    fail_stop: bool,
}

impl MeasurerStubFactory {
    pub fn new(watts: f64) -> Self {
        Self {
            counters: Arc::default(),
            watts,
            fail_stop: false,
        }
    }

    pub fn failing_on_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn counters(&self) -> Arc<MeasurerCounters> {
        self.counters.clone()
    }
}

impl MeasurerFactory for MeasurerStubFactory {
    fn create(&self, strategy: &LanguageStrategy) -> Box<dyn EnergyMeasurer> {
        tracing::debug!("Creating measurer stub for {}", strategy.language);
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Box::new(MeasurerStub {
            counters: self.counters.clone(),
            watts: self.watts,
            fail_stop: self.fail_stop,
        })
    }
}

#[derive(Debug)]
struct MeasurerStub {
    counters: Arc<MeasurerCounters>,
    watts: f64,
    fail_stop: bool,
}

#[async_trait::async_trait]
impl EnergyMeasurer for MeasurerStub {
    fn method(&self) -> MeasurementMethod {
        MeasurementMethod::SystemMetrics
    }

    async fn start(&mut self) -> Result<(), MeasureError> {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn attach(&mut self, _pid: u32) {
        self.counters.attached.fetch_add(1, Ordering::SeqCst);
    }

    async fn stop(&mut self, wall_time: Duration) -> Result<Measurement, MeasureError> {
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(MeasureError::Sampler {
                msg: "measurer stub failure".to_string(),
            });
        }

        Ok(Measurement {
            energy: EnergyReport::from_joules(
                self.watts * wall_time.as_secs_f64(),
                GRID_INTENSITY_KG_PER_KWH,
            ),
            method: self.method(),
            hardware: HardwareNotes {
                cpu_energy: "stub".to_string(),
                gpu_energy: "not tracked".to_string(),
                ram_energy: "stub".to_string(),
            },
        })
    }
}
