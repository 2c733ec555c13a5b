use crate::tools::*;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tenzir_mcp_core::docs::{DocResolver, FilesystemDocStore};
use tenzir_mcp_core::pipeline::{PipelineRunner, TenzirCommand};
use tenzir_mcp_core::schema::{FilesystemSchemaSource, SchemaStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Timeout for `execute_tql_pipeline` when the caller gives none
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: f64,

    #[serde(default)]
    pub tenzir: TenzirConfig,

    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenzirConfig {
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Arguments placed before the tenzir flags, e.g. for a wrapper script
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    #[serde(default = "default_docs_prefix")]
    pub docs_prefix: String,

    #[serde(default = "default_ocsf_dir")]
    pub ocsf_dir: PathBuf,
}

fn default_timeout_secs() -> f64 {
    tenzir_mcp_core::DEFAULT_TIMEOUT.as_secs_f64()
}

fn default_program() -> PathBuf {
    PathBuf::from("tenzir")
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("data/docs")
}

fn default_docs_prefix() -> String {
    tenzir_mcp_core::docs::DEFAULT_DOCS_PREFIX.to_string()
}

fn default_ocsf_dir() -> PathBuf {
    PathBuf::from("data/ocsf")
}

impl Default for TenzirConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            docs_prefix: default_docs_prefix(),
            ocsf_dir: default_ocsf_dir(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            default_timeout_secs: default_timeout_secs(),
            tenzir: TenzirConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl McpConfig {
    pub fn load(config_path: &Path, data_dir: PathBuf) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")?
        } else {
            tracing::info!(
                "Configuration file {} not found, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.data_dir = data_dir;
        config.default_timeout()?;

        Ok(config)
    }

    pub fn default_timeout(&self) -> Result<Duration> {
        let secs = self.default_timeout_secs;
        if !secs.is_finite() || secs <= 0.0 {
            anyhow::bail!("default_timeout_secs must be a positive number, got {}", secs);
        }
        Duration::try_from_secs_f64(secs).context("default_timeout_secs is out of range")
    }

    /// Get the documentation bundle path
    pub fn docs_path(&self) -> PathBuf {
        self.data_dir.join(&self.data.docs_dir)
    }

    /// Get the OCSF schema directory
    pub fn ocsf_path(&self) -> PathBuf {
        self.data_dir.join(&self.data.ocsf_dir)
    }

    pub fn tenzir_command(&self) -> TenzirCommand {
        TenzirCommand::new(&self.tenzir.program).with_args(self.tenzir.args.iter().cloned())
    }
}

/// Wire the stores, the runner and every tool into a registry
///
/// A missing docs bundle or schema directory leaves the tools that need it
/// unregistered; the pipeline and instruction tools are always available.
pub fn build_registry(config: &McpConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    let runner = Arc::new(PipelineRunner::new(config.tenzir_command()));
    registry.register(Arc::new(ExecutePipelineTool::new(
        runner.clone(),
        config.default_timeout()?,
    )));
    registry.register(Arc::new(ValidatePipelineTool::new(runner)));
    registry.register(Arc::new(OcsfInstructionsTool::new(Guidance::Workflow)));
    registry.register(Arc::new(OcsfInstructionsTool::new(Guidance::Rules)));

    match FilesystemSchemaSource::new(config.ocsf_path()) {
        Ok(source) => {
            let store = Arc::new(SchemaStore::new(Arc::new(source)));
            registry.register(Arc::new(OcsfVersionsTool::new(store.clone())));
            registry.register(Arc::new(DefaultOcsfVersionTool::new(store.clone())));
            registry.register(Arc::new(OcsfEventClassesTool::new(store.clone())));
            registry.register(Arc::new(OcsfEntityTool::class(store.clone())));
            registry.register(Arc::new(OcsfEntityTool::object(store)));
        }
        Err(e) => tracing::warn!("OCSF tools disabled: {:#}", e),
    }

    match FilesystemDocStore::new(config.docs_path()) {
        Ok(store) => {
            let resolver = DocResolver::new(Arc::new(store), config.data.docs_prefix.clone());
            registry.register(Arc::new(ReadDocsTool::new(resolver.clone())));
            registry.register(Arc::new(ListDocsTool::new(resolver.clone())));
            registry.register(Arc::new(DocsMetadataTool::new(resolver)));
        }
        Err(e) => tracing::warn!("Documentation tools disabled: {:#}", e),
    }

    Ok(registry)
}
