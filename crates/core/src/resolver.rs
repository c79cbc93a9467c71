//! Locating the external executables.
//!
//! Resolution happens once at startup. The result is an immutable [`Engines`]
//! value that is handed to the runner and the tools.

use crate::config::{EngineOverride, EnginesConfig};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// The external programs this server drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// Runs patterns, lists them, and extracts YouTube transcripts.
    Fabric,
    /// Transcript extractor used by Fabric under the hood.
    YtDlp,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fabric => "fabric",
            Self::YtDlp => "yt-dlp",
        }
    }

    pub fn binary_name(&self, windows: bool) -> String {
        if windows {
            format!("{}.exe", self.name())
        } else {
            self.name().to_string()
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a command was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Taken verbatim from configuration.
    Override,
    /// Found at one of the well-known install locations.
    Probed,
    /// Bare name, left for `PATH` lookup at spawn time.
    SearchPath,
}

/// A command ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub engine: Engine,
    pub program: PathBuf,
    /// Fixed leading arguments.
    pub args: Vec<String>,
    pub resolution: Resolution,
}

impl ResolvedCommand {
    /// Program plus fixed arguments, for logs and reports.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Snapshot of the host environment that resolution depends on.
#[derive(Debug, Clone)]
pub struct HostEnv {
    pub windows: bool,
    pub home: Option<PathBuf>,
    pub path: Option<OsString>,
}

impl HostEnv {
    pub fn current() -> Self {
        Self {
            windows: cfg!(windows),
            home: dirs::home_dir(),
            path: std::env::var_os("PATH"),
        }
    }
}

/// Resolved commands for both engines plus the `PATH` handed to subprocesses.
#[derive(Debug, Clone)]
pub struct Engines {
    pub fabric: ResolvedCommand,
    pub ytdlp: ResolvedCommand,
    pub search_path: OsString,
    pub host: HostEnv,
}

impl Engines {
    pub fn resolve(config: &EnginesConfig, host: &HostEnv) -> Self {
        Self {
            fabric: resolve_engine(Engine::Fabric, &config.fabric, host),
            ytdlp: resolve_engine(Engine::YtDlp, &config.ytdlp, host),
            search_path: augmented_search_path(host),
            host: host.clone(),
        }
    }
}

/// Resolve one engine: override, then the first existing candidate, then the bare name.
pub fn resolve_engine(engine: Engine, over: &EngineOverride, host: &HostEnv) -> ResolvedCommand {
    let candidates = candidate_paths(engine, host);
    select(engine, over, &candidates, &engine.binary_name(host.windows))
}

fn select(
    engine: Engine,
    over: &EngineOverride,
    candidates: &[PathBuf],
    bare_name: &str,
) -> ResolvedCommand {
    let (program, resolution) = if let Some(path) = &over.path {
        tracing::info!("Using configured {} at: {}", engine, path.display());
        (path.clone(), Resolution::Override)
    } else if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        tracing::info!("Found {} at: {}", engine, found.display());
        (found.clone(), Resolution::Probed)
    } else {
        tracing::info!("Using '{}' from PATH", bare_name);
        (PathBuf::from(bare_name), Resolution::SearchPath)
    };

    ResolvedCommand {
        engine,
        program,
        args: over.args.clone(),
        resolution,
    }
}

/// Well-known install locations, most likely first.
pub fn candidate_paths(engine: Engine, host: &HostEnv) -> Vec<PathBuf> {
    let bin = engine.binary_name(host.windows);
    let mut paths = Vec::new();

    if host.windows {
        if let Some(home) = &host.home {
            paths.push(home.join("AppData").join("Roaming").join("Python").join("Scripts").join(&bin));
            paths.push(home.join(".local").join("bin").join(&bin));
            if engine == Engine::Fabric {
                paths.push(home.join("go").join("bin").join(&bin));
            }
        }
        for dir in WINDOWS_PYTHON_SCRIPTS {
            paths.push(Path::new(dir).join(&bin));
        }
        return paths;
    }

    if let Some(home) = &host.home {
        paths.push(home.join(".local").join("bin").join(&bin));
        if engine == Engine::Fabric {
            paths.push(home.join("go").join("bin").join(&bin));
        }
    }
    match engine {
        Engine::Fabric => {
            paths.push(Path::new("/usr/local/bin").join(&bin));
            paths.push(Path::new("/opt/homebrew/bin").join(&bin));
        }
        Engine::YtDlp => {
            paths.push(Path::new("/opt/homebrew/bin").join(&bin));
            paths.push(Path::new("/usr/local/bin").join(&bin));
        }
    }
    paths
}

const WINDOWS_PYTHON_SCRIPTS: [&str; 4] = [
    r"C:\Program Files\Python311\Scripts",
    r"C:\Program Files\Python312\Scripts",
    r"C:\Python311\Scripts",
    r"C:\Python312\Scripts",
];

fn common_bin_dirs(host: &HostEnv) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if host.windows {
        if let Some(home) = &host.home {
            dirs.push(home.join("AppData").join("Local").join("Programs").join("Python"));
            dirs.push(home.join("AppData").join("Roaming").join("Python").join("Scripts"));
            dirs.push(home.join(".local").join("bin"));
        }
        dirs.extend(WINDOWS_PYTHON_SCRIPTS.iter().map(PathBuf::from));
        return dirs;
    }

    if let Some(home) = &host.home {
        dirs.push(home.join(".local").join("bin"));
        dirs.push(home.join("go").join("bin"));
    }
    for dir in ["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin", "/bin"] {
        dirs.push(PathBuf::from(dir));
    }
    dirs
}

/// Inherited `PATH` with the common bin directories it lacks prepended.
pub fn augmented_search_path(host: &HostEnv) -> OsString {
    let existing: Vec<PathBuf> = host
        .path
        .as_deref()
        .map(|p| std::env::split_paths(p).collect())
        .unwrap_or_default();

    let extra = common_bin_dirs(host)
        .into_iter()
        .filter(|dir| !existing.contains(dir));

    let combined: Vec<PathBuf> = extra.chain(existing.iter().cloned()).collect();

    match std::env::join_paths(combined) {
        Ok(joined) => joined,
        Err(e) => {
            tracing::warn!("Could not build augmented PATH, keeping the inherited one: {}", e);
            host.path.clone().unwrap_or_default()
        }
    }
}
