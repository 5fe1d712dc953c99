//! Shared test helpers for supervision integration tests

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use shepherd::config::Settings;
use shepherd::fs::StateDir;
use shepherd::host::ScriptedHost;
use shepherd::monitor::Monitor;
use shepherd::oversight::{Controller, LaunchRequest};

/// Temporary state directory, scripted host and a private transcripts root
pub struct TestEnv {
    _temp: TempDir,
    pub state: StateDir,
    pub host: ScriptedHost,
    pub projects: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let state = StateDir::new(temp.path().join("state"));
        state.ensure().unwrap();
        Self {
            projects: temp.path().join("projects"),
            _temp: temp,
            state,
            host: ScriptedHost::new(),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            transcripts_dir: Some(self.projects.clone()),
            ..Settings::default()
        }
    }

    pub fn controller(&self) -> Controller {
        Controller::new(self.state.clone(), Arc::new(self.host.clone()), self.settings())
    }

    pub fn monitor(&self) -> Monitor {
        Monitor::new(self.state.clone(), Arc::new(self.host.clone()), self.settings()).unwrap()
    }
}

/// Launch `name` in `/tmp` under `parent`.
pub fn launch(controller: &Controller, name: &str, parent: Option<&str>) -> anyhow::Result<()> {
    let mut request = LaunchRequest::new(name, "/tmp");
    request.parent = parent.map(str::to_string);
    controller.launch(request).map(|_| ())
}
