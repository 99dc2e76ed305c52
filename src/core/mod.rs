pub mod domain;
pub mod energy;
pub mod errors;
pub mod language;
pub mod pipeline;
pub mod traits;
