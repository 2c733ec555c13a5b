// Core functionality for the Tenzir MCP server: pipeline execution,
// OCSF schema lookups and bundled documentation access

pub mod docs;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
