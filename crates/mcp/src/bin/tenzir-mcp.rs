// Standalone MCP server binary

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tenzir_mcp::{build_registry, McpConfig, McpServer};

#[derive(Parser, Debug)]
#[command(name = "tenzir-mcp")]
#[command(about = "MCP server for running TQL pipelines and looking up Tenzir docs and OCSF", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "TENZIR_MCP_CONFIG", default_value = "tenzir-mcp.toml")]
    config: PathBuf,

    /// Directory that relative data paths are resolved against
    #[arg(short, long, env = "TENZIR_MCP_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Tenzir executable, overrides `tenzir.program`
    #[arg(long, env = "TENZIR_BINARY")]
    tenzir_binary: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenzir_mcp=info,tenzir_mcp_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let args = Args::parse();

    tracing::info!("Tenzir MCP server starting...");
    tracing::info!("Data directory: {}", args.data_dir.display());

    let mut config = McpConfig::load(&args.config, args.data_dir)?;
    if let Some(program) = args.tenzir_binary {
        config.tenzir.program = program;
    }
    tracing::info!("Using tenzir executable {}", config.tenzir.program.display());

    let registry = build_registry(&config)?;
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(registry);
    server.start().await?;

    Ok(())
}
