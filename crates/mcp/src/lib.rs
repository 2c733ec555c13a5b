// MCP (Model Context Protocol) server exposing Tenzir tooling to agent clients

pub mod config;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::{build_registry, McpConfig};
pub use server::McpServer;
