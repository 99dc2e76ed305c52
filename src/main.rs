use std::panic;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::pipeline::Pipeline;
use crate::native::{
    artifacts::ArtifactManager, measurers::SystemMeasurerFactory, rapl::EnergyTracker,
    runner::NativeRunner, sampler::ProcfsProbe,
};

mod api;
mod config;
mod constants;
mod core;
mod native;

#[cfg(test)]
mod stubs;

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let config = Config::from_env()?;
    tracing::info!(?config, "Starting energy runner");
    let pipeline = build_pipeline(&config);

    api::serve(pipeline, tokio::io::stdin(), &mut tokio::io::stdout()).await?;
    tracing::info!("Input closed, shutting down");

    Ok(())
}

fn build_pipeline(config: &Config) -> Pipeline {
    let tracker = EnergyTracker::new(
        &config.rapl_root,
        config.fallback_watts,
        config.grid_intensity_kg_per_kwh,
    );
    let measurers = SystemMeasurerFactory::new(
        Arc::new(ProcfsProbe::new()),
        config.sample_interval,
        tracker,
    );

    Pipeline::new(
        ArtifactManager::new(&config.work_dir),
        config.toolchain.clone(),
        Arc::new(NativeRunner::new()),
        Arc::new(measurers),
    )
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
