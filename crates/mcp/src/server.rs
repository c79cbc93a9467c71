// MCP server: newline-delimited JSON-RPC 2.0 over stdio

use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo, ToolsCapability,
    PROTOCOL_VERSION,
};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};

pub const SERVER_NAME: &str = "fabric-mcp-server";

pub struct McpServer {
    registry: ToolRegistry,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn start(&self) -> Result<()> {
        tracing::info!("Fabric MCP server running on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Read one request per line, answer each before reading the next.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        // Raw frames, so a line that isn't UTF-8 becomes a parse error instead of ending the stream.
        let mut frames = FramedRead::new(reader, AnyDelimiterCodec::new(b"\n".to_vec(), Vec::new()));

        while let Some(frame) = frames.next().await {
            let frame = frame.context("Failed to read request from stdin")?;
            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            if let Some(response) = self.handle_message(&frame).await {
                let mut payload =
                    serde_json::to_vec(&response).context("Failed to encode response")?;
                payload.push(b'\n');
                writer
                    .write_all(&payload)
                    .await
                    .context("Failed to write response to stdout")?;
                writer.flush().await.context("Failed to flush stdout")?;
            }
        }

        tracing::info!("stdin closed, stopping server");
        Ok(())
    }

    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        self.handle_message(line.as_bytes()).await
    }

    /// Handle one raw message. Notifications produce no response.
    pub async fn handle_message(&self, message: &[u8]) -> Option<JsonRpcResponse> {
        match serde_json::from_slice::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!("Unparseable message: {}", e);
                Some(JsonRpcResponse::error(
                    serde_json::Value::Null,
                    JsonRpcError::parse_error(),
                ))
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!("Notification: {}", request.method);
            return None;
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        tracing::debug!(method = %request.method, "Request");
        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_result(&ListToolsResult {
                tools: self.registry.list_schemas(),
            }),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init) => tracing::info!(
                    "Client connected: {} {} (protocol {})",
                    init.client_info.name,
                    init.client_info.version,
                    init.protocol_version
                ),
                Err(e) => tracing::debug!("Ignoring malformed initialize params: {}", e),
            }
        }

        to_result(&InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: self.info.clone(),
        })
    }

    async fn call_tool(&self, params: Option<serde_json::Value>) -> Result<serde_json::Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing params for tools/call"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))
            })?;

        tracing::info!(tool = %params.name, "Tool call");
        let result = self.registry.call(&params.name, params.arguments).await;
        to_result(&result)
    }
}

fn to_result(value: &impl Serialize) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::build_registry;
    use fabric_mcp_core::config::{FetchConfig, TimeoutConfig};
    use fabric_mcp_core::fetch::UrlFetcher;
    use fabric_mcp_core::testing::{fabric, ScriptedRunner};
    use fabric_mcp_core::Fabric;
    use std::sync::Arc;

    fn server_with(fabric: Fabric) -> McpServer {
        let fetcher = Arc::new(UrlFetcher::new(&FetchConfig::default()).unwrap());
        McpServer::new(build_registry(Arc::new(fabric), fetcher))
    }

    fn scripted_server() -> McpServer {
        server_with(fabric(Arc::new(ScriptedRunner::new(|inv| {
            Ok(inv.input.clone().unwrap_or_default())
        }))))
    }

    async fn call(server: &McpServer, name: &str, arguments: serde_json::Value) -> serde_json::Value {
        let request = JsonRpcRequest::new(
            1,
            "tools/call",
            serde_json::json!({"name": name, "arguments": arguments}),
        );
        let response = server.handle_request(request).await.unwrap();
        assert!(response.error.is_none(), "tool failures must not be protocol errors");
        response.result.unwrap()
    }

    #[tokio::test]
    async fn test_initialize_advertises_tools() {
        let server = scripted_server();
        let response = server
            .handle_line(
                r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1"}}}"#,
            )
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = scripted_server();
        let response = server
            .handle_request(JsonRpcRequest::notification("notifications/initialized"))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = scripted_server();

        let parse = server.handle_line("{not json").await.unwrap();
        assert_eq!(parse.error.unwrap().code, -32700);

        let unknown = server
            .handle_request(JsonRpcRequest::new(2, "resources/list", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(unknown.error.unwrap().code, -32601);

        let bad_params = server
            .handle_request(JsonRpcRequest::new(3, "tools/call", serde_json::json!({"arguments": {}})))
            .await
            .unwrap();
        assert_eq!(bad_params.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_tools_list_returns_catalog() {
        let server = scripted_server();
        let response = server
            .handle_request(JsonRpcRequest::new(1, "tools/list", serde_json::json!({})))
            .await
            .unwrap();

        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert!(tools.iter().any(|t| t["name"] == "fabric_summarize"));
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn test_serve_round_trip_over_streams() {
        let server = scripted_server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();

        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let response: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8_line() {
        let server = scripted_server();
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.extend_from_slice(b"\r\n");
        let mut output = Vec::new();

        server.serve(input.as_slice(), &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let responses: Vec<serde_json::Value> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["error"]["code"], -32700);
        assert!(responses[1]["id"].is_null());
        assert_eq!(responses[2]["id"], 2);
        assert_eq!(responses[2]["result"], serde_json::json!({}));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use fabric_mcp_core::resolver::{Engine, Engines, HostEnv, Resolution, ResolvedCommand};
        use fabric_mcp_core::runner::ProcessRunner;
        use std::path::PathBuf;

        /// Engines whose commands are `sh -c <script>`, standing in for the real CLIs.
        fn stub_fabric(fabric_program: &str, fabric_script: &str, ytdlp_script: &str) -> Fabric {
            let command = |engine: Engine, program: &str, script: &str| ResolvedCommand {
                engine,
                program: PathBuf::from(program),
                args: vec!["-c".to_string(), script.to_string(), engine.name().to_string()],
                resolution: Resolution::Override,
            };
            let host = HostEnv {
                windows: false,
                home: None,
                path: std::env::var_os("PATH"),
            };
            let search_path = host.path.clone().unwrap_or_default();
            let engines = Arc::new(Engines {
                fabric: command(Engine::Fabric, fabric_program, fabric_script),
                ytdlp: command(Engine::YtDlp, "sh", ytdlp_script),
                search_path: search_path.clone(),
                host,
            });

            Fabric::new(
                Arc::new(ProcessRunner::new(search_path)),
                engines,
                TimeoutConfig::default(),
            )
        }

        #[tokio::test]
        async fn test_run_pattern_with_echo_engine() {
            let server = server_with(stub_fabric("sh", "cat", "exit 0"));

            let result = call(
                &server,
                "run_fabric_pattern",
                serde_json::json!({"pattern": "summarize", "input": "The quick brown fox..."}),
            )
            .await;

            assert_eq!(result["content"][0]["text"], "The quick brown fox...");
            assert!(result.get("isError").is_none());
        }

        #[tokio::test]
        async fn test_missing_engine_reports_spawn_failure() {
            let server = server_with(stub_fabric("/nonexistent/bin/fabric", "cat", "exit 0"));

            for (name, arguments) in [
                ("run_fabric_pattern", serde_json::json!({"pattern": "summarize", "input": "text"})),
                ("list_fabric_patterns", serde_json::json!({})),
                ("fabric_extract_wisdom", serde_json::json!({"input": "text"})),
            ] {
                let result = call(&server, name, arguments).await;
                assert_eq!(result["isError"], true, "{}", name);
                let text = result["content"][0]["text"].as_str().unwrap();
                assert!(text.starts_with("Error: Failed to spawn /nonexistent/bin/fabric"), "{}", text);
            }
        }

        #[tokio::test]
        async fn test_health_check_all_good() {
            let server = server_with(stub_fabric("sh", "exit 0", "exit 0"));

            let result = call(&server, "health_check", serde_json::json!({})).await;
            let text = result["content"][0]["text"].as_str().unwrap();

            assert!(result.get("isError").is_none());
            assert!(text.lines().last().unwrap().contains("All checks passed"), "{}", text);
        }

        #[tokio::test]
        async fn test_engine_failure_keeps_stderr() {
            let server = server_with(stub_fabric("sh", "echo 'no model configured' >&2; exit 1", "exit 0"));

            let result = call(&server, "fabric_summarize", serde_json::json!({"input": "text"})).await;
            let text = result["content"][0]["text"].as_str().unwrap();

            assert_eq!(result["isError"], true);
            assert!(text.contains("exited with code 1"));
            assert!(text.contains("no model configured"));
        }
    }
}
