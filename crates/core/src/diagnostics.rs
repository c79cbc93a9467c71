//! Environment health check.
//!
//! Produces a markdown report meant to be read by a person setting the server
//! up, so failures carry install/setup instructions instead of raw errors.

use crate::error::FabricError;
use crate::fabric::Fabric;

/// Overall verdict of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fabric works and yt-dlp is available.
    Healthy,
    /// Fabric works but YouTube transcripts will fail.
    Degraded,
    /// Fabric is missing or not configured.
    Unhealthy,
}

impl HealthStatus {
    pub fn from_checks(fabric_ok: bool, transcripts_ok: bool) -> Self {
        match (fabric_ok, transcripts_ok) {
            (true, true) => Self::Healthy,
            (true, false) => Self::Degraded,
            (false, _) => Self::Unhealthy,
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Self::Healthy => "✅ All checks passed! The server is ready to use.",
            Self::Degraded => "⚠️  Server is functional but YouTube transcripts require yt-dlp.",
            Self::Unhealthy => "❌ Some issues found. Please install/configure missing components.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub status: HealthStatus,
    lines: Vec<String>,
}

impl HealthReport {
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Run every check in order and build the report.
pub async fn perform_health_check(fabric: &Fabric) -> HealthReport {
    let engines = fabric.engines();
    let host = &engines.host;
    let mut out = Vec::new();

    out.push("# Fabric MCP Server Health Check\n".to_string());

    out.push("## 0. Debug Information".to_string());
    out.push(format!("   Platform: {}", std::env::consts::OS));
    out.push(format!(
        "   Home Directory: {}",
        host.home.as_ref().map(|h| h.display().to_string()).unwrap_or_default()
    ));
    out.push(format!(
        "   Original PATH: {}",
        host.path.as_ref().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default()
    ));
    out.push(format!("   Enhanced PATH: {}", engines.search_path.to_string_lossy()));
    out.push(format!("   Resolved fabric command: {}", engines.fabric.display()));
    out.push(format!("   Resolved yt-dlp command: {}", engines.ytdlp.display()));

    let mut fabric_ok = true;

    out.push("\n## 1. Fabric Installation".to_string());
    let installed = match fabric.version().await {
        Ok(version) => {
            out.push("✅ Fabric is installed and accessible".to_string());
            out.push(format!("   Command: {}", engines.fabric.display()));
            out.push(format!("   Version: {}", version));
            true
        }
        Err(e) => {
            fabric_ok = false;
            out.push("❌ Fabric is NOT installed or not accessible".to_string());
            out.push(format!("   Tried to run: {}", engines.fabric.display()));
            out.push(format!("   Error: {}", e));
            out.extend(failure_details(&e));
            out.push("\n   To install Fabric:".to_string());
            out.push("   macOS/Linux: go install github.com/danielmiessler/fabric/cmd/fabric@latest".to_string());
            out.push("   or: pipx install fabric-ai".to_string());
            out.push("   Windows: pip install fabric-ai".to_string());
            out.push("   Then run: fabric --setup".to_string());
            out.push("\n   More info: https://github.com/danielmiessler/fabric".to_string());
            false
        }
    };

    out.push("\n## 2. Fabric Configuration".to_string());
    if installed {
        match fabric.list_patterns().await {
            Ok(patterns) => {
                out.push("✅ Fabric is configured and working".to_string());
                out.push(format!("   Patterns available: {}", patterns.len()));
            }
            Err(e) => {
                fabric_ok = false;
                out.push("❌ Fabric is installed but not configured properly".to_string());
                out.push(format!("   Error: {}", e));
                out.push("\n   To configure Fabric:".to_string());
                out.push("   Run: fabric --setup".to_string());
                out.push("   This will configure your API keys and preferences".to_string());
            }
        }
    } else {
        out.push("⚠️  Skipped (Fabric not installed)".to_string());
    }

    out.push("\n## 3. yt-dlp Installation (for YouTube transcripts)".to_string());
    let transcripts_ok = match fabric.transcript_engine_version().await {
        Ok(version) => {
            out.push("✅ yt-dlp is installed and accessible".to_string());
            out.push(format!("   Command: {}", engines.ytdlp.display()));
            out.push(format!("   Version: {}", version));
            true
        }
        Err(e) => {
            tracing::debug!("yt-dlp probe failed: {}", e);
            out.push("⚠️  yt-dlp is NOT installed (YouTube transcript feature will not work)".to_string());
            out.push(format!("   Tried: {}", engines.ytdlp.display()));
            out.push("\n   To install yt-dlp:".to_string());
            out.push("   macOS: brew install yt-dlp".to_string());
            out.push("   Linux: pip install yt-dlp".to_string());
            out.push("   Windows: pip install yt-dlp".to_string());
            out.push("\n   More info: https://github.com/yt-dlp/yt-dlp".to_string());
            false
        }
    };

    out.push("\n## 4. Server Runtime".to_string());
    out.push(format!("✅ fabric-mcp version: {}", env!("CARGO_PKG_VERSION")));
    out.push(format!("   Platform: {} ({})", std::env::consts::OS, std::env::consts::FAMILY));
    out.push(format!("   Architecture: {}", std::env::consts::ARCH));

    out.push("\n## 5. Fabric Path Configuration".to_string());
    out.push(format!("   Using: {} ({:?})", engines.fabric.display(), engines.fabric.resolution));

    let status = HealthStatus::from_checks(fabric_ok, transcripts_ok);
    out.push("\n## Summary".to_string());
    out.push(status.summary().to_string());

    tracing::info!(?status, "Health check finished");
    HealthReport { status, lines: out }
}

/// Structured fields of a failed probe, trimmed for display.
fn failure_details(err: &FabricError) -> Vec<String> {
    let mut lines = Vec::new();
    match err {
        FabricError::Spawn {
            kind,
            errno,
            syscall,
            ..
        } => {
            lines.push(format!("   Spawn error: {:?}", kind));
            if let Some(errno) = errno {
                lines.push(format!("   Errno: {}", errno));
            }
            lines.push(format!("   Syscall: {}", syscall));
        }
        FabricError::NonZeroExit {
            code,
            stdout,
            stderr,
            ..
        } => {
            if let Some(code) = code {
                lines.push(format!("   Exit code: {}", code));
            }
            if !stdout.is_empty() {
                lines.push(format!("   Stdout: {}", truncate(stdout, 200)));
            }
            if !stderr.is_empty() {
                lines.push(format!("   Stderr: {}", truncate(stderr, 200)));
            }
        }
        FabricError::Timeout { partial_stdout, .. } if !partial_stdout.is_empty() => {
            lines.push(format!("   Stdout: {}", truncate(partial_stdout, 200)));
        }
        _ => {}
    }
    lines
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
