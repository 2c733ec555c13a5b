// Pipeline tools that run TQL through the external tenzir binary

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_number, json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tenzir_mcp_core::pipeline::PipelineRunner;
use tenzir_mcp_core::ExecutionRequest;

/// Tool to execute a TQL pipeline
pub struct ExecutePipelineTool {
    runner: Arc<PipelineRunner>,
    default_timeout: Duration,
}

impl ExecutePipelineTool {
    pub fn new(runner: Arc<PipelineRunner>, default_timeout: Duration) -> Self {
        Self {
            runner,
            default_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExecutePipelineArgs {
    pipeline: String,
    #[serde(default)]
    input_data: Option<String>,
    #[serde(default)]
    timeout: Option<f64>,
}

fn parse_timeout(timeout: Option<f64>, default: Duration) -> Result<Duration> {
    let Some(secs) = timeout else {
        return Ok(default);
    };
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("timeout must be a positive number of seconds, got {}", secs);
    }
    Duration::try_from_secs_f64(secs).context("timeout is out of range")
}

#[async_trait::async_trait]
impl Tool for ExecutePipelineTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "execute_tql_pipeline".to_string(),
            description: "Execute a TQL (Tenzir Query Language) pipeline and return its output, \
                          including any diagnostics"
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "pipeline": json_schema_string("The TQL pipeline definition to execute"),
                    "input_data": json_schema_string("Optional input data passed to the pipeline on stdin, e.g. JSON"),
                    "timeout": json_schema_number(&format!(
                        "Execution timeout in seconds (default: {})",
                        self.default_timeout.as_secs_f64()
                    ))
                }),
                vec!["pipeline"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ExecutePipelineArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for execute_tql_pipeline")?;

        if args.pipeline.trim().is_empty() {
            return Ok(CallToolResult::error("Pipeline cannot be empty"));
        }
        let timeout = match parse_timeout(args.timeout, self.default_timeout) {
            Ok(timeout) => timeout,
            Err(e) => return Ok(CallToolResult::error(e.to_string())),
        };

        let mut request = ExecutionRequest::new(args.pipeline).with_timeout(timeout);
        if let Some(input) = args.input_data {
            request = request.with_input(input);
        }

        let result = self.runner.execute(&request).await;
        tracing::info!(
            "execute_tql_pipeline finished in {:.3}s (success: {})",
            result.elapsed.as_secs_f64(),
            result.success
        );

        Ok(CallToolResult {
            is_error: (!result.success).then_some(true),
            ..CallToolResult::text(result.output)
        })
    }
}

/// Tool to check pipeline syntax without running it
pub struct ValidatePipelineTool {
    runner: Arc<PipelineRunner>,
}

impl ValidatePipelineTool {
    pub fn new(runner: Arc<PipelineRunner>) -> Self {
        Self { runner }
    }
}

#[derive(Debug, Deserialize)]
struct ValidatePipelineArgs {
    pipeline: String,
}

#[async_trait::async_trait]
impl Tool for ValidatePipelineTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "validate_tql_pipeline".to_string(),
            description: "Validate TQL pipeline syntax without executing it. Also works for \
                          unfinished pipelines that have no destination yet."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "pipeline": json_schema_string("The TQL pipeline definition to validate")
                }),
                vec!["pipeline"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ValidatePipelineArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for validate_tql_pipeline")?;

        if args.pipeline.trim().is_empty() {
            return Ok(CallToolResult::error("Pipeline cannot be empty"));
        }

        let result = self.runner.validate(&args.pipeline).await;
        tracing::debug!(
            "validate_tql_pipeline finished in {:.3}s (valid: {})",
            result.elapsed.as_secs_f64(),
            result.success
        );

        Ok(CallToolResult {
            is_error: (!result.success).then_some(true),
            ..CallToolResult::text(result.output)
        })
    }
}
