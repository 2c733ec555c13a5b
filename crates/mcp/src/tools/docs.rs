// Documentation tools for the bundled Tenzir docs

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use serde::Deserialize;
use tenzir_mcp_core::docs::DocResolver;
use tenzir_mcp_core::DocFormat;

/// Tool to read one documentation page
pub struct ReadDocsTool {
    resolver: DocResolver,
}

impl ReadDocsTool {
    pub fn new(resolver: DocResolver) -> Self {
        Self { resolver }
    }
}

#[derive(Debug, Deserialize)]
struct ReadDocsArgs {
    path: String,
}

#[async_trait::async_trait]
impl Tool for ReadDocsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "read_docs".to_string(),
            description: "Read a page of the Tenzir documentation, e.g. `reference/functions/abs` \
                          or `reference/operators/read_json`. The file extension is optional."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "path": json_schema_string("Documentation path relative to the docs root")
                }),
                vec!["path"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ReadDocsArgs =
            serde_json::from_value(arguments).context("Invalid arguments for read_docs")?;

        match self.resolver.resolve(&args.path).await {
            Ok(Some(entry)) => {
                tracing::debug!("read_docs {} -> {}", args.path, entry.path);
                Ok(CallToolResult::text(entry.content))
            }
            Ok(None) => Ok(CallToolResult::error(format!(
                "Documentation not found: {}",
                args.path
            ))),
            Err(e) => Ok(CallToolResult::error(format!(
                "Failed to read documentation {}: {}",
                args.path, e
            ))),
        }
    }
}

/// Tool to browse the pages below a documentation directory
pub struct ListDocsTool {
    resolver: DocResolver,
}

impl ListDocsTool {
    pub fn new(resolver: DocResolver) -> Self {
        Self { resolver }
    }

    /// Turn a bundle path back into the form `read_docs` accepts
    fn page_path<'a>(&self, file: &'a str) -> &'a str {
        let prefix = self.resolver.prefix().trim_matches('/');
        let page = file
            .strip_prefix(prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(file);
        DocFormat::ALL
            .iter()
            .find_map(|format| {
                page.strip_suffix(format.extension())
                    .and_then(|rest| rest.strip_suffix('.'))
            })
            .unwrap_or(page)
    }
}

#[derive(Debug, Deserialize)]
struct ListDocsArgs {
    #[serde(default)]
    path: Option<String>,
}

#[async_trait::async_trait]
impl Tool for ListDocsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_docs".to_string(),
            description: "List documentation pages below a directory, e.g. `reference/operators`. \
                          The returned paths can be passed to read_docs."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "path": json_schema_string("Directory relative to the docs root (default: everything)")
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ListDocsArgs =
            serde_json::from_value(arguments).context("Invalid arguments for list_docs")?;
        let requested = args.path.unwrap_or_default();
        let requested = requested.trim_matches('/');

        let prefix = self.resolver.prefix().trim_matches('/');
        let dir = match (prefix.is_empty(), requested.is_empty()) {
            (true, _) => requested.to_string(),
            (false, true) => prefix.to_string(),
            (false, false) => format!("{}/{}", prefix, requested),
        };

        match self.resolver.store().list(&dir).await {
            Ok(files) => {
                let pages: Vec<&str> = files.iter().map(|f| self.page_path(f)).collect();
                Ok(CallToolResult::text(format!(
                    "Directory: {}\n\nPages ({} items):\n{}",
                    if requested.is_empty() { "/" } else { requested },
                    pages.len(),
                    pages.join("\n")
                )))
            }
            Err(e) if e.is_not_found() => Ok(CallToolResult::error(format!(
                "Documentation directory not found: {}",
                requested
            ))),
            Err(e) => Ok(CallToolResult::error(format!(
                "Failed to list documentation {}: {}",
                requested, e
            ))),
        }
    }
}

/// Tool to report which docs snapshot is bundled
pub struct DocsMetadataTool {
    resolver: DocResolver,
}

impl DocsMetadataTool {
    pub fn new(resolver: DocResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait::async_trait]
impl Tool for DocsMetadataTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "docs_metadata".to_string(),
            description: "Show the source commit, repository and download time of the bundled \
                          documentation"
                .to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        CallToolResult::json(self.resolver.store().metadata())
    }
}
