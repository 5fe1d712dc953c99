//! Durable session registry
//!
//! Sessions live in a flat map keyed by name; the parent link is a key into
//! the same map. Every mutation goes through [`Registry::transaction`], which
//! holds the registry lock across read-modify-replace.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::locking::{atomic_write, read_optional, FileLock};
use super::state_dir::StateDir;
use crate::error::PolicyError;
use crate::models::session::Session;

pub type SessionMap = BTreeMap<String, Session>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    sessions: SessionMap,
}

/// Store handle for `sessions.json` and `archive.json`.
#[derive(Debug, Clone)]
pub struct Registry {
    state: StateDir,
}

impl Registry {
    pub fn new(state: StateDir) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &StateDir {
        &self.state
    }

    /// Read the current session map without locking.
    pub fn load(&self) -> Result<SessionMap> {
        load_map(&self.state.sessions_file())
    }

    pub fn get(&self, name: &str) -> Result<Option<Session>> {
        Ok(self.load()?.remove(name))
    }

    /// Like [`Registry::get`] but unknown names are a [`PolicyError`].
    pub fn require(&self, name: &str) -> Result<Session> {
        self.get(name)?
            .ok_or_else(|| PolicyError::UnknownSession(name.to_string()).into())
    }

    /// Run `apply` against the locked map and persist it if `apply` succeeds.
    ///
    /// On error nothing is written, so a rejected operation mutates nothing.
    pub fn transaction<T, F>(&self, apply: F) -> Result<T>
    where
        F: FnOnce(&mut SessionMap) -> Result<T>,
    {
        let _lock = FileLock::acquire(&self.state.sessions_lock())?;
        let path = self.state.sessions_file();
        let mut sessions = load_map(&path)?;
        let out = apply(&mut sessions)?;
        save_map(&path, sessions)?;
        Ok(out)
    }

    /// Mutate one session by name.
    pub fn update<T, F>(&self, name: &str, apply: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        self.transaction(|sessions| {
            let session = sessions
                .get_mut(name)
                .ok_or_else(|| PolicyError::UnknownSession(name.to_string()))?;
            apply(session)
        })
    }

    /// Move the named sessions into the archive. Returns how many moved.
    pub fn archive(&self, names: &[String]) -> Result<usize> {
        if names.is_empty() {
            return Ok(0);
        }
        self.transaction(|sessions| Ok(self.archive_locked(sessions, names)?.len()))
    }

    /// Remove `names` from `sessions` and append them to the archive.
    ///
    /// Only call this from inside [`Registry::transaction`]: the archive file
    /// shares the registry lock.
    pub fn archive_locked(&self, sessions: &mut SessionMap, names: &[String]) -> Result<Vec<Session>> {
        let removed: Vec<Session> = names.iter().filter_map(|n| sessions.remove(n)).collect();
        if removed.is_empty() {
            return Ok(removed);
        }
        let archive_path = self.state.archive_file();
        let mut archived = load_map(&archive_path)?;
        for session in &removed {
            archived.insert(format!("{}#{}", session.name, session.id), session.clone());
        }
        save_map(&archive_path, archived)?;
        Ok(removed)
    }

    pub fn load_archive(&self) -> Result<SessionMap> {
        load_map(&self.state.archive_file())
    }
}

fn load_map(path: &std::path::Path) -> Result<SessionMap> {
    let Some(content) = read_optional(path)? else {
        return Ok(SessionMap::new());
    };
    if content.trim().is_empty() {
        return Ok(SessionMap::new());
    }
    let file: RegistryFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse registry: {}", path.display()))?;
    Ok(file.sessions)
}

fn save_map(path: &std::path::Path, sessions: SessionMap) -> Result<()> {
    let content = serde_json::to_string_pretty(&RegistryFile { sessions })
        .context("Failed to serialize registry")?;
    atomic_write(path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::WindowHandle;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Registry) {
        let temp = TempDir::new().unwrap();
        let state = StateDir::new(temp.path());
        state.ensure().unwrap();
        (temp, Registry::new(state))
    }

    fn session(name: &str) -> Session {
        Session::new(name, WindowHandle::new("agents", "@1"), PathBuf::from("/"), None)
    }

    #[test]
    fn test_empty_registry_loads() {
        let (_temp, registry) = setup();
        assert!(registry.load().unwrap().is_empty());
    }

    #[test]
    fn test_transaction_persists_on_success() {
        let (_temp, registry) = setup();
        registry
            .transaction(|map| {
                map.insert("a".to_string(), session("a"));
                Ok(())
            })
            .unwrap();
        assert!(registry.get("a").unwrap().is_some());
    }

    #[test]
    fn test_transaction_writes_nothing_on_error() {
        let (_temp, registry) = setup();
        registry
            .transaction(|map| {
                map.insert("a".to_string(), session("a"));
                Ok(())
            })
            .unwrap();

        let result: Result<()> = registry.transaction(|map| {
            map.remove("a");
            anyhow::bail!("rejected")
        });
        assert!(result.is_err());
        assert!(registry.get("a").unwrap().is_some());
    }

    #[test]
    fn test_update_unknown_is_policy_error() {
        let (_temp, registry) = setup();
        let err = registry.update("ghost", |_| Ok(())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PolicyError>(),
            Some(PolicyError::UnknownSession(_))
        ));
    }

    #[test]
    fn test_archive_moves_sessions() {
        let (_temp, registry) = setup();
        registry
            .transaction(|map| {
                map.insert("a".to_string(), session("a"));
                map.insert("b".to_string(), session("b"));
                Ok(())
            })
            .unwrap();

        let moved = registry.archive(&["a".to_string(), "ghost".to_string()]).unwrap();
        assert_eq!(moved, 1);
        assert!(registry.get("a").unwrap().is_none());
        assert!(registry.get("b").unwrap().is_some());
        let archive = registry.load_archive().unwrap();
        assert_eq!(archive.len(), 1);
        assert!(archive.values().any(|s| s.name == "a"));
    }

    #[test]
    fn test_concurrent_transactions_do_not_lose_updates() {
        let (_temp, registry) = setup();
        registry
            .transaction(|map| {
                map.insert("a".to_string(), session("a"));
                Ok(())
            })
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry
                        .update("a", |s| {
                            s.priority += 1;
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.require("a").unwrap().priority, 8);
    }
}
