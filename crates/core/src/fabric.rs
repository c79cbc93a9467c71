// Typed client for the Fabric CLI and the yt-dlp probe

use crate::config::TimeoutConfig;
use crate::error::FabricResult;
use crate::resolver::Engines;
use crate::runner::{CommandRunner, Invocation};
use std::sync::Arc;

/// Entry point for everything that shells out to the external engines.
pub struct Fabric {
    runner: Arc<dyn CommandRunner>,
    engines: Arc<Engines>,
    timeouts: TimeoutConfig,
}

impl Fabric {
    pub fn new(runner: Arc<dyn CommandRunner>, engines: Arc<Engines>, timeouts: TimeoutConfig) -> Self {
        Self {
            runner,
            engines,
            timeouts,
        }
    }

    pub fn engines(&self) -> &Engines {
        &self.engines
    }

    /// First line of `fabric --version`.
    pub async fn version(&self) -> FabricResult<String> {
        let output = self
            .runner
            .run(Invocation::new(&self.engines.fabric, &["--version"], self.timeouts.probe()))
            .await?;
        Ok(first_line(&output))
    }

    /// Pattern names, one per non-empty output line.
    pub async fn list_patterns(&self) -> FabricResult<Vec<String>> {
        let output = self
            .runner
            .run(Invocation::new(&self.engines.fabric, &["--listpatterns"], self.timeouts.command()))
            .await?;

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Run `pattern` over `input` and return the engine's output.
    pub async fn apply_pattern(&self, pattern: &str, input: &str) -> FabricResult<String> {
        tracing::info!(pattern, input_bytes = input.len(), "Applying pattern");
        let invocation = Invocation::new(
            &self.engines.fabric,
            &["--pattern", pattern],
            self.timeouts.pattern(),
        )
        .with_input(input);

        self.runner.run(invocation).await
    }

    /// Raw transcript text for a YouTube video.
    pub async fn youtube_transcript(&self, url: &str) -> FabricResult<String> {
        tracing::info!(url, "Fetching YouTube transcript");
        self.runner
            .run(Invocation::new(&self.engines.fabric, &["--youtube", url], self.timeouts.command()))
            .await
    }

    /// First line of `yt-dlp --version`.
    pub async fn transcript_engine_version(&self) -> FabricResult<String> {
        let output = self
            .runner
            .run(Invocation::new(&self.engines.ytdlp, &["--version"], self.timeouts.probe()))
            .await?;
        Ok(first_line(&output))
    }
}

fn first_line(output: &str) -> String {
    output.trim().lines().next().unwrap_or_default().to_string()
}
