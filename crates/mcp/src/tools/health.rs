// Environment diagnostics exposed as a tool

use crate::protocol::ToolSchema;
use crate::tools::{json_schema_object, Tool};
use fabric_mcp_core::diagnostics::perform_health_check;
use fabric_mcp_core::{Fabric, FabricResult};
use std::sync::Arc;

/// Tool to check that Fabric and yt-dlp are installed and configured
pub struct HealthCheckTool {
    fabric: Arc<Fabric>,
}

impl HealthCheckTool {
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }
}

#[async_trait::async_trait]
impl Tool for HealthCheckTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "health_check".to_string(),
            description: "Check if Fabric, yt-dlp, and other dependencies are installed and configured correctly. Provides installation instructions if needed.".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> FabricResult<String> {
        // A failing check is still a successful report.
        Ok(perform_health_check(&self.fabric).await.render())
    }
}
