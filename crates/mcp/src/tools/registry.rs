// Tool trait, catalog and dispatch

use crate::protocol::{CallToolResult, ToolSchema};
use fabric_mcp_core::{FabricError, FabricResult};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments, returning the text shown to the caller
    async fn execute(&self, arguments: serde_json::Value) -> FabricResult<String>;
}

/// Tool registry: the catalog, in registration order, plus a name index
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        match self.index.get(&name) {
            Some(&slot) => {
                tracing::warn!("Tool {} registered twice, keeping the latest", name);
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| self.tools[slot].clone())
    }

    /// List all tool schemas
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a call. Failures come back as an error-flagged result, never as `Err`.
    pub async fn call(&self, name: &str, arguments: serde_json::Value) -> CallToolResult {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, "Call to unknown tool");
            return CallToolResult::error(FabricError::UnknownTool(name.to_string()).to_string());
        };

        let started = Instant::now();
        match tool.execute(arguments).await {
            Ok(text) => {
                tracing::info!(
                    tool = name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                CallToolResult::text(text)
            }
            Err(e) => {
                tracing::warn!(
                    tool = name,
                    kind = e.kind(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call failed: {}",
                    e
                );
                CallToolResult::error(e.to_string())
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Argument helpers

/// Deserialize tool arguments; absent arguments are treated as an empty object.
pub fn parse_args<T: DeserializeOwned>(tool: &str, arguments: serde_json::Value) -> FabricResult<T> {
    let arguments = if arguments.is_null() {
        serde_json::json!({})
    } else {
        arguments
    };

    serde_json::from_value(arguments)
        .map_err(|e| FabricError::validation(format!("Invalid arguments for {}: {}", tool, e)))
}

/// A required string argument must be present and non-empty.
pub fn required(name: &str, value: Option<String>) -> FabricResult<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(FabricError::validation(format!("{} parameter is required", name))),
    }
}

/// An optional string argument, with empty treated as absent.
pub fn optional_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: serde_json::Value, required: Vec<&str>) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}
