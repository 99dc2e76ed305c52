use std::time::Duration;

use crate::core::{
    domain::{Measurement, MeasurementMethod},
    errors::MeasureError,
    language::LanguageStrategy,
    traits::runner::SpawnObserver,
};

/// `start` is called before the child is spawned, `attach` right after, and
/// `stop` after the child exited or was killed. `stop` is called on every
/// path once `start` succeeded, including timeouts.
#[async_trait::async_trait]
pub trait EnergyMeasurer: std::fmt::Debug + Send {
    fn method(&self) -> MeasurementMethod;

    async fn start(&mut self) -> Result<(), MeasureError>;

    fn attach(&mut self, pid: u32);

    async fn stop(&mut self, wall_time: Duration) -> Result<Measurement, MeasureError>;
}

impl SpawnObserver for Box<dyn EnergyMeasurer> {
    fn on_spawn(&mut self, pid: u32) {
        self.attach(pid);
    }
}

pub trait MeasurerFactory: std::fmt::Debug + Send + Sync {
    fn create(&self, strategy: &LanguageStrategy) -> Box<dyn EnergyMeasurer>;
}
