pub mod artifacts;
pub mod measurers;
pub mod rapl;
pub mod runner;
pub mod sampler;
