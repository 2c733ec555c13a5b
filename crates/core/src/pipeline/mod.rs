pub mod runner;

pub use runner::{ExecutionError, PipelineRunner, TenzirCommand, VALID_PIPELINE};
