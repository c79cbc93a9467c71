// Pattern tools: listing, the generic runner, and one shortcut per curated pattern

use crate::protocol::ToolSchema;
use crate::tools::{json_schema_object, json_schema_string, parse_args, required, Tool};
use fabric_mcp_core::{Fabric, FabricResult};
use serde::Deserialize;
use std::sync::Arc;

/// Prefix of the per-pattern shortcut tools (`fabric_summarize`, ...).
const SHORTCUT_PREFIX: &str = "fabric_";

/// A pattern exposed as its own tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuratedPattern {
    pub name: &'static str,
    pub description: &'static str,
}

pub const CURATED_PATTERNS: [CuratedPattern; 12] = [
    CuratedPattern {
        name: "extract_wisdom",
        description: "Extract key insights, quotes, and wisdom from any content (articles, videos, podcasts)",
    },
    CuratedPattern {
        name: "summarize",
        description: "Create a concise summary of content",
    },
    CuratedPattern {
        name: "analyze_claims",
        description: "Analyze and fact-check claims made in content",
    },
    CuratedPattern {
        name: "create_quiz",
        description: "Generate quiz questions from content for learning",
    },
    CuratedPattern {
        name: "to_flashcards",
        description: "Convert content into flashcards for studying",
    },
    CuratedPattern {
        name: "analyze_paper",
        description: "Analyze academic papers or technical documents",
    },
    CuratedPattern {
        name: "summarize_git_diff",
        description: "Summarize git diff output for code reviews",
    },
    CuratedPattern {
        name: "analyze_logs",
        description: "Analyze log files for issues and patterns",
    },
    CuratedPattern {
        name: "analyze_incident",
        description: "Analyze security incidents or system failures",
    },
    CuratedPattern {
        name: "create_coding_project",
        description: "Generate project structure and planning from an idea",
    },
    CuratedPattern {
        name: "explain_code",
        description: "Explain code in simple terms",
    },
    CuratedPattern {
        name: "improve_writing",
        description: "Improve writing quality and clarity",
    },
];

/// Pattern bound to a shortcut tool name, if the name is one of ours.
#[cfg(test)]
pub(crate) fn curated_pattern_for(tool_name: &str) -> Option<&'static CuratedPattern> {
    let pattern = tool_name.strip_prefix(SHORTCUT_PREFIX)?;
    CURATED_PATTERNS.iter().find(|p| p.name == pattern)
}

/// Tool to list every pattern Fabric knows about
pub struct ListPatternsTool {
    fabric: Arc<Fabric>,
}

impl ListPatternsTool {
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }
}

#[async_trait::async_trait]
impl Tool for ListPatternsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_fabric_patterns".to_string(),
            description: "List all available Fabric patterns".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> FabricResult<String> {
        let patterns = self.fabric.list_patterns().await?;
        Ok(format!("Available Fabric patterns:\n\n{}", patterns.join("\n")))
    }
}

/// Tool to run any pattern over caller-supplied text
pub struct RunPatternTool {
    fabric: Arc<Fabric>,
}

impl RunPatternTool {
    pub fn new(fabric: Arc<Fabric>) -> Self {
        Self { fabric }
    }
}

#[derive(Debug, Deserialize)]
struct RunPatternArgs {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    input: Option<String>,
}

#[async_trait::async_trait]
impl Tool for RunPatternTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "run_fabric_pattern".to_string(),
            description: "Run any Fabric pattern with custom input. Use this for patterns not covered by specific tools.".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "pattern": json_schema_string("The name of the Fabric pattern to run"),
                    "input": json_schema_string("The input text to process with the pattern")
                }),
                vec!["pattern", "input"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> FabricResult<String> {
        let args: RunPatternArgs = parse_args("run_fabric_pattern", arguments)?;
        let pattern = required("pattern", args.pattern)?;
        let input = required("input", args.input)?;

        self.fabric.apply_pattern(&pattern, &input).await
    }
}

/// Shortcut tool that applies one fixed curated pattern
pub struct PatternShortcutTool {
    fabric: Arc<Fabric>,
    pattern: &'static CuratedPattern,
}

impl PatternShortcutTool {
    pub fn new(fabric: Arc<Fabric>, pattern: &'static CuratedPattern) -> Self {
        Self { fabric, pattern }
    }

    pub fn tool_name(&self) -> String {
        format!("{}{}", SHORTCUT_PREFIX, self.pattern.name)
    }
}

#[derive(Debug, Deserialize)]
struct ShortcutArgs {
    #[serde(default)]
    input: Option<String>,
}

#[async_trait::async_trait]
impl Tool for PatternShortcutTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.tool_name(),
            description: self.pattern.description.to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "input": json_schema_string("The input text to process")
                }),
                vec!["input"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> FabricResult<String> {
        let args: ShortcutArgs = parse_args(&self.tool_name(), arguments)?;
        let input = required("input", args.input)?;

        self.fabric.apply_pattern(self.pattern.name, &input).await
    }
}
