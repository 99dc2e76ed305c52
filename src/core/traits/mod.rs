pub mod measurer;
pub mod probe;
pub mod runner;
