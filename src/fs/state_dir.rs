use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::constants::STATE_DIR_ENV;

const SUBDIRS: [&str; 3] = ["hooks", "usage", "locks"];

/// Root of all durable supervisor state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// `SHEPHERD_STATE_DIR` if set, otherwise `~/.shepherd`.
    pub fn resolve() -> Result<Self> {
        if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(dir)));
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self::new(home.join(".shepherd")))
    }

    /// Create the directory tree if it is missing.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create state directory: {}", self.root.display()))?;
        for subdir in &SUBDIRS {
            let path = self.root.join(subdir);
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create {subdir} directory"))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn sessions_file(&self) -> PathBuf {
        self.root.join("sessions.json")
    }

    pub fn sessions_lock(&self) -> PathBuf {
        self.root.join("sessions.lock")
    }

    pub fn archive_file(&self) -> PathBuf {
        self.root.join("archive.json")
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.root.join("snapshot.json")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.root.join("daemon.pid")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("daemon.log")
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.root.join("hooks")
    }

    pub fn hook_file(&self, session: &str) -> PathBuf {
        self.hooks_dir().join(format!("{session}.json"))
    }

    pub fn usage_dir(&self) -> PathBuf {
        self.root.join("usage")
    }

    pub fn usage_file(&self, session: &str) -> PathBuf {
        self.usage_dir().join(format!("{session}.json"))
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn send_lock(&self, session: &str) -> PathBuf {
        self.locks_dir().join(format!("{session}.send.lock"))
    }
}
