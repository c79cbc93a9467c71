//! In-memory runner and fixtures for exercising tools without spawning processes.

use crate::config::TimeoutConfig;
use crate::error::{FabricError, FabricResult};
use crate::fabric::Fabric;
use crate::resolver::{Engine, Engines, HostEnv, Resolution, ResolvedCommand};
use crate::runner::{CommandRunner, Invocation};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Records every invocation and answers from a closure.
pub struct ScriptedRunner {
    pub calls: Mutex<Vec<Invocation>>,
    respond: Box<dyn Fn(&Invocation) -> FabricResult<String> + Send + Sync>,
}

impl ScriptedRunner {
    pub fn new(respond: impl Fn(&Invocation) -> FabricResult<String> + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    pub fn failing_for(engine: Engine) -> Self {
        Self::new(move |inv| {
            if inv.command.engine == engine {
                Err(FabricError::spawn(
                    inv.command.program.display().to_string(),
                    "spawn",
                    &std::io::Error::from_raw_os_error(2),
                ))
            } else {
                Ok("1.0.0\n".to_string())
            }
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: Invocation) -> FabricResult<String> {
        let result = (self.respond)(&invocation);
        self.calls.lock().unwrap().push(invocation);
        result
    }
}

/// Engines resolved to bare names, as if nothing was found on disk.
pub fn engines() -> Arc<Engines> {
    let command = |engine: Engine| ResolvedCommand {
        engine,
        program: PathBuf::from(engine.name()),
        args: vec![],
        resolution: Resolution::SearchPath,
    };
    Arc::new(Engines {
        fabric: command(Engine::Fabric),
        ytdlp: command(Engine::YtDlp),
        search_path: "/usr/bin".into(),
        host: HostEnv {
            windows: false,
            home: Some(PathBuf::from("/home/tester")),
            path: Some("/usr/bin".into()),
        },
    })
}

pub fn fabric(runner: Arc<ScriptedRunner>) -> Fabric {
    Fabric::new(runner, engines(), TimeoutConfig::default())
}
