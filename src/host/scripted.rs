//! In-memory process host
//!
//! Windows are plain records; their visible text is whatever the caller
//! scripts. Clones share state, so a test can keep one handle to steer the
//! host while the code under test owns another.

use anyhow::{bail, Result};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::ProcessHost;
use crate::models::session::WindowHandle;

const GROUP: &str = "scripted";

#[derive(Debug, Clone, Default)]
struct ScriptedWindow {
    name: String,
    dir: PathBuf,
    screen: String,
    queued: VecDeque<String>,
    sent: Vec<(String, bool)>,
}

#[derive(Debug, Default)]
struct Inner {
    windows: BTreeMap<String, ScriptedWindow>,
    next_id: u32,
    unreachable: bool,
    killed: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn id_for(inner: &Inner, name: &str) -> Option<String> {
        inner
            .windows
            .iter()
            .find(|(_, w)| w.name == name)
            .map(|(id, _)| id.clone())
    }

    /// Make every call fail as if the host could not be reached.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Replace the visible text of the window named `name`.
    pub fn set_screen(&self, name: &str, text: &str) {
        let mut inner = self.lock();
        if let Some(id) = Self::id_for(&inner, name) {
            if let Some(window) = inner.windows.get_mut(&id) {
                window.screen = text.to_string();
                window.queued.clear();
            }
        }
    }

    /// Queue screens shown by successive captures; the last one sticks.
    pub fn queue_screens(&self, name: &str, screens: &[&str]) {
        let mut inner = self.lock();
        if let Some(id) = Self::id_for(&inner, name) {
            if let Some(window) = inner.windows.get_mut(&id) {
                window.queued.extend(screens.iter().map(|s| s.to_string()));
            }
        }
    }

    /// Remove a window as if its process exited and tmux closed it.
    pub fn close_window(&self, name: &str) {
        let mut inner = self.lock();
        if let Some(id) = Self::id_for(&inner, name) {
            inner.windows.remove(&id);
        }
    }

    /// Everything sent to the window named `name`, with the Enter flag.
    pub fn sent_to(&self, name: &str) -> Vec<(String, bool)> {
        let inner = self.lock();
        Self::id_for(&inner, name)
            .and_then(|id| inner.windows.get(&id).map(|w| w.sent.clone()))
            .unwrap_or_default()
    }

    pub fn has_window(&self, name: &str) -> bool {
        Self::id_for(&self.lock(), name).is_some()
    }

    pub fn working_dir_of(&self, name: &str) -> Option<PathBuf> {
        let inner = self.lock();
        Self::id_for(&inner, name).and_then(|id| inner.windows.get(&id).map(|w| w.dir.clone()))
    }

    /// Names of windows killed through the host, in kill order.
    pub fn killed(&self) -> Vec<String> {
        self.lock().killed.clone()
    }
}

impl ProcessHost for ScriptedHost {
    fn create_window(&self, name: &str, dir: &Path) -> Result<WindowHandle> {
        let mut inner = self.lock();
        if inner.unreachable {
            bail!("scripted host unreachable");
        }
        inner.next_id += 1;
        let id = format!("@{}", inner.next_id);
        inner.windows.insert(
            id.clone(),
            ScriptedWindow {
                name: name.to_string(),
                dir: dir.to_path_buf(),
                ..Default::default()
            },
        );
        Ok(WindowHandle::new(GROUP, id))
    }

    fn capture_text(&self, handle: &WindowHandle, max_lines: usize) -> Result<String> {
        let mut inner = self.lock();
        if inner.unreachable {
            bail!("scripted host unreachable");
        }
        let Some(window) = inner.windows.get_mut(&handle.id) else {
            bail!("can't find window: {}", handle.id);
        };
        if let Some(next) = window.queued.pop_front() {
            window.screen = next;
        }
        let lines: Vec<&str> = window.screen.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        Ok(lines[start..].join("\n"))
    }

    fn send_keys(&self, handle: &WindowHandle, text: &str, press_enter: bool) -> Result<()> {
        let mut inner = self.lock();
        if inner.unreachable {
            bail!("scripted host unreachable");
        }
        let Some(window) = inner.windows.get_mut(&handle.id) else {
            bail!("can't find window: {}", handle.id);
        };
        window.sent.push((text.to_string(), press_enter));
        Ok(())
    }

    fn list_windows(&self) -> Result<Vec<WindowHandle>> {
        let inner = self.lock();
        if inner.unreachable {
            bail!("scripted host unreachable");
        }
        Ok(inner
            .windows
            .keys()
            .map(|id| WindowHandle::new(GROUP, id.clone()))
            .collect())
    }

    fn kill_window(&self, handle: &WindowHandle) -> Result<()> {
        let mut inner = self.lock();
        if inner.unreachable {
            bail!("scripted host unreachable");
        }
        let Some(window) = inner.windows.remove(&handle.id) else {
            bail!("can't find window: {}", handle.id);
        };
        inner.killed.push(window.name);
        Ok(())
    }
}
