pub mod measurer;
pub mod runner;
