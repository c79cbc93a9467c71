// Tools that fetch their input (YouTube, local files, web pages) before applying a pattern

use crate::protocol::ToolSchema;
use crate::tools::{json_schema_object, json_schema_string, optional_or, parse_args, required, Tool};
use fabric_mcp_core::fetch::{self, UrlFetcher};
use fabric_mcp_core::{Fabric, FabricResult};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_VIDEO_PATTERN: &str = "extract_wisdom";
const DEFAULT_DOCUMENT_PATTERN: &str = "summarize";

#[derive(Debug, Deserialize)]
struct UrlArgs {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileArgs {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
}

fn pattern_property(default: &str) -> serde_json::Value {
    json_schema_string(&format!("The Fabric pattern to apply (default: {})", default))
}

/// Tool to fetch a YouTube transcript
pub struct YoutubeTranscriptTool {
    fabric: Arc<Fabric>,
}

impl YoutubeTranscriptTool {
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }
}

#[async_trait::async_trait]
impl Tool for YoutubeTranscriptTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_youtube_transcript".to_string(),
            description: "Fetch transcript from a YouTube video URL".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "url": json_schema_string("The YouTube video URL")
                }),
                vec!["url"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> FabricResult<String> {
        let args: UrlArgs = parse_args("get_youtube_transcript", arguments)?;
        let url = required("url", args.url)?;

        self.fabric.youtube_transcript(&url).await
    }
}

/// Tool to fetch a transcript and run a pattern over it in one step
pub struct AnalyzeYoutubeTool {
    fabric: Arc<Fabric>,
}

impl AnalyzeYoutubeTool {
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }
}

#[async_trait::async_trait]
impl Tool for AnalyzeYoutubeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "analyze_youtube".to_string(),
            description: "Fetch a YouTube video's transcript and apply a Fabric pattern to it".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "url": json_schema_string("The YouTube video URL"),
                    "pattern": pattern_property(DEFAULT_VIDEO_PATTERN)
                }),
                vec!["url"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> FabricResult<String> {
        let args: UrlArgs = parse_args("analyze_youtube", arguments)?;
        let url = required("url", args.url)?;
        let pattern = optional_or(args.pattern, DEFAULT_VIDEO_PATTERN);

        let transcript = self.fabric.youtube_transcript(&url).await?;
        self.fabric.apply_pattern(&pattern, &transcript).await
    }
}

/// Tool to read a local file and run a pattern over it
pub struct AnalyzeFileTool {
    fabric: Arc<Fabric>,
}

impl AnalyzeFileTool {
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }
}

#[async_trait::async_trait]
impl Tool for AnalyzeFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "analyze_file".to_string(),
            description: "Read a local file and apply a Fabric pattern to its contents".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "path": json_schema_string("Path to the file to analyze (absolute, relative, or ~/...)"),
                    "pattern": pattern_property(DEFAULT_DOCUMENT_PATTERN)
                }),
                vec!["path"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> FabricResult<String> {
        let args: FileArgs = parse_args("analyze_file", arguments)?;
        let path = required("path", args.path)?;
        let pattern = optional_or(args.pattern, DEFAULT_DOCUMENT_PATTERN);

        let content = fetch::read_file(&path).await?;
        self.fabric.apply_pattern(&pattern, &content).await
    }
}

/// Tool to fetch a web page and run a pattern over it
pub struct AnalyzeUrlTool {
    fabric: Arc<Fabric>,
    fetcher: Arc<UrlFetcher>,
}

impl AnalyzeUrlTool {
    pub fn new(fabric: Arc<Fabric>, fetcher: Arc<UrlFetcher>) -> Self {
        Self { fabric, fetcher }
    }
}

#[async_trait::async_trait]
impl Tool for AnalyzeUrlTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "analyze_url".to_string(),
            description: "Fetch a web page (HTTP/HTTPS) and apply a Fabric pattern to its content".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "url": json_schema_string("The URL to fetch"),
                    "pattern": pattern_property(DEFAULT_DOCUMENT_PATTERN)
                }),
                vec!["url"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> FabricResult<String> {
        let args: UrlArgs = parse_args("analyze_url", arguments)?;
        let url = required("url", args.url)?;
        let pattern = optional_or(args.pattern, DEFAULT_DOCUMENT_PATTERN);

        let body = self.fetcher.fetch(&url).await?;
        self.fabric.apply_pattern(&pattern, &body).await
    }
}
