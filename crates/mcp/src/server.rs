// MCP server: JSON-RPC 2.0 dispatch over newline-delimited stdio

use crate::protocol::*;
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

/// Upper bound for a single incoming message
const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

const SERVER_INSTRUCTIONS: &str = "Tools for Tenzir: run and validate TQL pipelines, read the \
Tenzir documentation, and look up OCSF classes and objects. Check the docs before using TQL \
syntax or functions you are unsure about.";

#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    info: ServerInfo,
    instructions: Option<String>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            info: ServerInfo::default(),
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve on stdin/stdout until stdin closes
    pub async fn start(&self) -> Result<()> {
        tracing::info!(
            "MCP server {} {} listening on stdio",
            self.info.name,
            self.info.version
        );
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one connection
    ///
    /// Every request runs in its own task. Responses are written by a single
    /// writer task, one line each.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let writer_task = tokio::spawn(async move {
            let mut sink = FramedWrite::new(writer, LinesCodec::new());
            while let Some(response) = rx.recv().await {
                let line = match serde_json::to_string(&response) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Failed to serialize response: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(line).await {
                    tracing::error!("Failed to write response: {}", e);
                    break;
                }
            }
        });

        let mut in_flight = Vec::new();
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!("Failed to read message: {}", e);
                    let _ = tx.send(JsonRpcResponse::error(
                        serde_json::Value::Null,
                        JsonRpcError::parse_error(),
                    ));
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let server = self.clone();
            let tx = tx.clone();
            in_flight.push(tokio::spawn(async move {
                if let Some(response) = server.handle_message(&line).await {
                    let _ = tx.send(response);
                }
            }));
            in_flight.retain(|task| !task.is_finished());
        }

        tracing::info!("Input closed, waiting for {} pending request(s)", in_flight.len());
        for task in in_flight {
            let _ = task.await;
        }
        drop(tx);
        writer_task.await.context("Response writer failed")?;

        Ok(())
    }

    /// Handle one raw message; `None` for notifications
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Received invalid JSON: {}", e);
                return Some(JsonRpcResponse::error(
                    serde_json::Value::Null,
                    JsonRpcError::parse_error(),
                ));
            }
        };

        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id.unwrap_or(serde_json::Value::Null),
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ));
            }
        };
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(serde_json::Value::Null),
                JsonRpcError::invalid_request("Only JSON-RPC 2.0 is supported"),
            ));
        }

        self.handle_request(request).await
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!("Notification {}", request.method);
            return None;
        };
        let params = request.params.unwrap_or(serde_json::Value::Null);

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: serde_json::Value) -> Result<serde_json::Value, JsonRpcError> {
        let params: InitializeParams = if params.is_null() {
            InitializeParams::default()
        } else {
            serde_json::from_value(params)
                .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?
        };

        let protocol_version = negotiate_protocol_version(params.protocol_version.as_deref());
        match &params.client_info {
            Some(client) => tracing::info!(
                "Client {} {} connected (protocol {})",
                client.name,
                client.version,
                protocol_version
            ),
            None => tracing::info!("Client connected (protocol {})", protocol_version),
        }

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        };
        to_value(&result)
    }

    fn list_tools(&self) -> Result<serde_json::Value, JsonRpcError> {
        to_value(&ListToolsResult {
            tools: self.registry.list_schemas(),
        })
    }

    async fn call_tool(&self, params: serde_json::Value) -> Result<serde_json::Value, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

        tracing::debug!("Calling tool {}", params.name);
        let result = self
            .registry
            .call(&params.name, params.arguments)
            .await
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;
        to_value(&result)
    }
}

fn to_value(value: &impl serde::Serialize) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{json_schema_object, json_schema_string, Tool};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    struct SleepTool;

    #[async_trait::async_trait]
    impl Tool for SleepTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "sleep".to_string(),
                description: "Sleep, then echo `text`".to_string(),
                input_schema: json_schema_object(
                    serde_json::json!({ "text": json_schema_string("Text to echo") }),
                    vec!["text"],
                ),
            }
        }

        async fn execute(&self, arguments: serde_json::Value) -> anyhow::Result<CallToolResult> {
            let text = arguments["text"].as_str().unwrap_or_default().to_string();
            let millis = arguments["millis"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(CallToolResult::text(text))
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SleepTool));
        McpServer::new(registry)
    }

    async fn handle(server: &McpServer, message: serde_json::Value) -> serde_json::Value {
        let response = server.handle_message(&message.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = handle(
            &server(),
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "clientInfo": {"name": "test", "version": "1.0"}
                }
            }),
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(response["result"]["serverInfo"]["name"], "tenzir-mcp");
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_list_and_call() {
        let server = server();

        let response = handle(
            &server,
            serde_json::json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}),
        )
        .await;
        assert_eq!(response["result"]["tools"][0]["name"], "sleep");
        assert!(response["result"]["tools"][0]["inputSchema"].is_object());

        let response = handle(
            &server,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "sleep", "arguments": {"text": "hi"}}
            }),
        )
        .await;
        assert_eq!(response["result"]["content"][0]["text"], "hi");
        assert!(response["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server();

        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, -32700);

        let response = handle(
            &server,
            serde_json::json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);

        let response = handle(
            &server,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "missing", "arguments": {}}
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
        assert!(response["error"]["message"].as_str().unwrap().contains("missing"));

        let response = handle(&server, serde_json::json!({"id": 5})).await;
        assert_eq!(response["error"]["code"], -32600);
        assert_eq!(response["id"], 5);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let message = serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(server().handle_message(&message.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_serve_interleaves_requests() {
        let (mut client, server_io) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(server_io);
        let server = server();
        let serving = tokio::spawn(async move { server.serve(reader, writer).await });

        let slow = serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": {"name": "sleep", "arguments": {"text": "slow", "millis": 300}}
        });
        let fast = serde_json::json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": {"name": "sleep", "arguments": {"text": "fast"}}
        });
        let input = format!("{}\n{}\n", slow, fast);

        client.write_all(input.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        serving.await.unwrap().unwrap();

        let responses: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 2);
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "slow");
    }
}
