// OCSF schema tools backed by the versioned schema store

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use tenzir_mcp_core::schema::SchemaStore;
use tenzir_mcp_core::Namespace;

/// Tool to list the available OCSF schema versions
pub struct OcsfVersionsTool {
    store: Arc<SchemaStore>,
}

impl OcsfVersionsTool {
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for OcsfVersionsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_ocsf_versions".to_string(),
            description: "Get all available OCSF schema versions".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        match self.store.list_versions().await {
            Ok(versions) => CallToolResult::json(&versions),
            Err(e) => {
                tracing::error!("Failed to get OCSF versions: {}", e);
                Ok(CallToolResult::error(format!("Failed to get OCSF versions: {}", e)))
            }
        }
    }
}

/// Tool to pick the newest stable OCSF version
pub struct DefaultOcsfVersionTool {
    store: Arc<SchemaStore>,
}

impl DefaultOcsfVersionTool {
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for DefaultOcsfVersionTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "default_ocsf_version".to_string(),
            description: "Returns the newest non-development OCSF schema version. Call this when \
                          you need an OCSF version but the user did not specify one."
                .to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        match self.store.default_version().await {
            Ok(version) => Ok(CallToolResult::text(version)),
            Err(e) => Ok(CallToolResult::error(e.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionArgs {
    version: String,
}

/// Tool to list event classes with their descriptions
pub struct OcsfEventClassesTool {
    store: Arc<SchemaStore>,
}

impl OcsfEventClassesTool {
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for OcsfEventClassesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_ocsf_event_classes".to_string(),
            description: "Get all OCSF event classes and their descriptions".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "version": json_schema_string("OCSF schema version, e.g. from default_ocsf_version")
                }),
                vec!["version"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: VersionArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for get_ocsf_event_classes")?;

        match self.store.event_classes(&args.version).await {
            Ok(classes) => CallToolResult::json(&classes),
            Err(e) => {
                tracing::error!("Failed to get OCSF event classes: {}", e);
                Ok(CallToolResult::error_object(e.to_string()))
            }
        }
    }
}

/// Tool to look up one class or object definition
pub struct OcsfEntityTool {
    store: Arc<SchemaStore>,
    namespace: Namespace,
}

impl OcsfEntityTool {
    pub fn class(store: Arc<SchemaStore>) -> Self {
        Self {
            store,
            namespace: Namespace::Classes,
        }
    }

    pub fn object(store: Arc<SchemaStore>) -> Self {
        Self {
            store,
            namespace: Namespace::Objects,
        }
    }

    fn tool_name(&self) -> &'static str {
        match self.namespace {
            Namespace::Classes => "get_ocsf_class",
            Namespace::Objects => "get_ocsf_object",
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntityArgs {
    version: String,
    name: String,
}

#[async_trait::async_trait]
impl Tool for OcsfEntityTool {
    fn schema(&self) -> ToolSchema {
        let (description, name_hint) = match self.namespace {
            Namespace::Classes => (
                "Get the definition of a specific OCSF event class",
                "Class name or identifier, case-insensitive (e.g. security_finding)",
            ),
            Namespace::Objects => (
                "Get the definition of a specific OCSF object",
                "Object name or identifier, case-insensitive (e.g. email)",
            ),
        };
        ToolSchema {
            name: self.tool_name().to_string(),
            description: description.to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "version": json_schema_string("OCSF schema version"),
                    "name": json_schema_string(name_hint)
                }),
                vec!["version", "name"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: EntityArgs = serde_json::from_value(arguments)
            .with_context(|| format!("Invalid arguments for {}", self.tool_name()))?;

        let found = match self.namespace {
            Namespace::Classes => self.store.find_class(&args.version, &args.name).await,
            Namespace::Objects => self.store.find_object(&args.version, &args.name).await,
        };

        match found {
            Ok(record) => CallToolResult::json(&record),
            Err(e) if e.is_not_found() => Ok(CallToolResult::error_object(e.to_string())),
            Err(e) => {
                tracing::error!(
                    "Failed to get OCSF {} {} for version {}: {}",
                    self.namespace.key(),
                    args.name,
                    args.version,
                    e
                );
                Ok(CallToolResult::error_object(e.to_string()))
            }
        }
    }
}
