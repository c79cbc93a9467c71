pub mod health;
pub mod patterns;
pub mod sources;
mod registry;

pub use health::HealthCheckTool;
pub use patterns::{
    CuratedPattern, ListPatternsTool, PatternShortcutTool, RunPatternTool, CURATED_PATTERNS,
};
pub use registry::{
    json_schema_object, json_schema_string, optional_or, parse_args, required, Tool, ToolRegistry,
};
pub use sources::{AnalyzeFileTool, AnalyzeUrlTool, AnalyzeYoutubeTool, YoutubeTranscriptTool};

use fabric_mcp_core::fetch::UrlFetcher;
use fabric_mcp_core::Fabric;
use std::sync::Arc;

/// The full catalog, in the order clients see it.
pub fn build_registry(fabric: Arc<Fabric>, fetcher: Arc<UrlFetcher>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(HealthCheckTool::new(fabric.clone())));
    registry.register(Arc::new(ListPatternsTool::new(fabric.clone())));
    registry.register(Arc::new(RunPatternTool::new(fabric.clone())));
    registry.register(Arc::new(YoutubeTranscriptTool::new(fabric.clone())));

    registry.register(Arc::new(AnalyzeYoutubeTool::new(fabric.clone())));
    registry.register(Arc::new(AnalyzeFileTool::new(fabric.clone())));
    registry.register(Arc::new(AnalyzeUrlTool::new(fabric.clone(), fetcher)));

    for pattern in CURATED_PATTERNS.iter() {
        registry.register(Arc::new(PatternShortcutTool::new(fabric.clone(), pattern)));
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_mcp_core::config::FetchConfig;
    use fabric_mcp_core::testing::{fabric, ScriptedRunner};

    fn registry(runner: Arc<ScriptedRunner>) -> ToolRegistry {
        let fetcher = Arc::new(UrlFetcher::new(&FetchConfig::default()).unwrap());
        build_registry(Arc::new(fabric(runner)), fetcher)
    }

    #[test]
    fn test_catalog_contents() {
        let registry = registry(Arc::new(ScriptedRunner::new(|_| Ok(String::new()))));
        let names: Vec<String> = registry.list_schemas().into_iter().map(|s| s.name).collect();

        assert_eq!(names.len(), 7 + CURATED_PATTERNS.len());
        assert_eq!(
            &names[..7],
            &[
                "health_check",
                "list_fabric_patterns",
                "run_fabric_pattern",
                "get_youtube_transcript",
                "analyze_youtube",
                "analyze_file",
                "analyze_url",
            ]
        );
        assert!(names.iter().skip(7).all(|n| patterns::curated_pattern_for(n).is_some()));
    }

    #[tokio::test]
    async fn test_missing_required_arguments_never_spawn() {
        let runner = Arc::new(ScriptedRunner::new(|_| Ok(String::new())));
        let registry = registry(runner.clone());

        let cases = [
            ("run_fabric_pattern", serde_json::json!({"input": "text"})),
            ("run_fabric_pattern", serde_json::json!({"pattern": "summarize"})),
            ("get_youtube_transcript", serde_json::json!({})),
            ("analyze_youtube", serde_json::json!({"pattern": "summarize"})),
            ("analyze_file", serde_json::json!({"path": ""})),
            ("analyze_url", serde_json::Value::Null),
            ("fabric_summarize", serde_json::json!({})),
            ("fabric_explain_code", serde_json::json!({"input": null})),
        ];

        for (name, arguments) in cases {
            let result = registry.call(name, arguments).await;
            assert_eq!(result.is_error, Some(true), "{} should fail", name);
            assert!(result.joined_text().contains("parameter is required"), "{}", name);
        }

        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_shortcut_dispatch_uses_bound_pattern() {
        let runner = Arc::new(ScriptedRunner::new(|inv| Ok(inv.input.clone().unwrap_or_default())));
        let registry = registry(runner.clone());

        let result = registry
            .call("fabric_summarize", serde_json::json!({"input": "long text"}))
            .await;

        assert_eq!(result.is_error, None);
        assert_eq!(result.joined_text(), "long text");
        assert_eq!(runner.calls.lock().unwrap()[0].args, vec!["--pattern", "summarize"]);
    }

    #[tokio::test]
    async fn test_unlisted_prefixed_name_is_unknown() {
        let runner = Arc::new(ScriptedRunner::new(|_| Ok(String::new())));
        let registry = registry(runner.clone());

        let result = registry
            .call("fabric_write_poem", serde_json::json!({"input": "text"}))
            .await;

        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.joined_text(), "Error: Unknown tool: fabric_write_poem");
        assert_eq!(runner.call_count(), 0);
    }
}
