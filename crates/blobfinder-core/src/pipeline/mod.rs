pub mod config;
pub mod orchestrator;
pub mod types;

pub use orchestrator::{run, run_with_progress};
pub use types::{CorrelationResults, PeakResult};
