use anyhow::{Context, Result};
use shell_escape::escape;
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::{info, warn};

use super::hierarchy::depth_of;
use super::Controller;
use crate::error::PolicyError;
use crate::host::send_serialized;
use crate::models::constants::{MAX_HIERARCHY_DEPTH, SESSION_NAME_ENV, STATE_DIR_ENV};
use crate::models::oversight::OversightPolicy;
use crate::models::session::{HeartbeatPolicy, Session};

/// Everything needed to start one supervised agent
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub name: String,
    pub working_dir: PathBuf,
    pub prompt: Option<String>,
    pub parent: Option<String>,
    pub budget_usd: Option<f64>,
    pub oversight: OversightPolicy,
    pub heartbeat: HeartbeatPolicy,
    pub priority: i32,
}

impl LaunchRequest {
    pub fn new(name: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            ..Default::default()
        }
    }
}

impl Controller {
    /// Create the session's window, register it and start the agent.
    ///
    /// Parent existence and depth are checked under the registry lock.
    /// Stale hook and usage files from an earlier session of the same name
    /// are removed, and the window is created, inside the same transaction,
    /// so a rejected launch leaves no window and no registry entry behind.
    ///
    /// # Arguments
    ///
    /// * `request` - Name, working directory and initial policies
    ///
    /// # Returns
    ///
    /// The registered session. Policy rejections surface as `PolicyError`
    /// (`DuplicateSession`, `UnknownSession`, `DepthExceeded`,
    /// `InvalidAmount`).
    pub fn launch(&self, request: LaunchRequest) -> Result<Session> {
        validate_name(&request.name)?;
        if let Some(budget) = request.budget_usd {
            if !budget.is_finite() || budget < 0.0 {
                return Err(PolicyError::InvalidAmount(budget.to_string()).into());
            }
        }

        let session = self.registry.transaction(|sessions| {
            if sessions.contains_key(&request.name) {
                return Err(PolicyError::DuplicateSession(request.name.clone()).into());
            }
            if let Some(parent) = &request.parent {
                if !sessions.contains_key(parent) {
                    return Err(PolicyError::UnknownSession(parent.clone()).into());
                }
                let depth = depth_of(sessions, parent) + 1;
                if depth > MAX_HIERARCHY_DEPTH {
                    return Err(PolicyError::DepthExceeded {
                        name: request.name.clone(),
                        depth,
                    }
                    .into());
                }
            }

            // Leftovers from an earlier session with the same name
            self.hooks.clear(&request.name)?;
            let usage_file = self.state.usage_file(&request.name);
            if usage_file.exists() {
                std::fs::remove_file(&usage_file)
                    .with_context(|| format!("Failed to remove {}", usage_file.display()))?;
            }

            let window = self
                .host
                .create_window(&request.name, &request.working_dir)
                .with_context(|| format!("Failed to create window for '{}'", request.name))?;

            let mut session = Session::new(
                request.name.clone(),
                window,
                request.working_dir.clone(),
                request.parent.clone(),
            );
            session.budget_usd = request.budget_usd.filter(|b| *b > 0.0);
            session.oversight = request.oversight;
            session.heartbeat = request.heartbeat.clone();
            session.priority = request.priority;
            sessions.insert(session.name.clone(), session.clone());
            Ok(session)
        })?;

        let command = self.agent_command_line(&session.name, request.prompt.as_deref());
        if let Err(e) = send_serialized(
            self.host.as_ref(),
            &self.state.send_lock(&session.name),
            &session.window,
            &command,
            true,
        ) {
            warn!(session = %session.name, error = %e, "agent start failed, rolling back");
            if let Err(kill_err) = self.host.kill_window(&session.window) {
                warn!(session = %session.name, error = %kill_err, "rollback could not close window");
            }
            let name = session.name.clone();
            self.registry.transaction(|sessions| {
                sessions.remove(&name);
                Ok(())
            })?;
            return Err(e).context(format!("Failed to start agent in '{}'", session.name));
        }

        info!(
            session = %session.name,
            parent = session.parent.as_deref().unwrap_or("-"),
            window = %session.window,
            "launched"
        );
        Ok(session)
    }

    /// Shell line that starts the agent with its identity in the environment.
    fn agent_command_line(&self, name: &str, prompt: Option<&str>) -> String {
        let state_dir = self.state.root().to_string_lossy();
        let mut line = format!(
            "{SESSION_NAME_ENV}={} {STATE_DIR_ENV}={} {}",
            escape(Cow::Borrowed(name)),
            escape(state_dir),
            self.settings.agent_command
        );
        if let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) {
            line.push(' ');
            line.push_str(&escape(Cow::Borrowed(prompt)));
        }
        line
    }
}

/// Names become file names and tmux window names.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !name.starts_with('.');
    if !valid {
        anyhow::bail!(
            "Invalid session name '{name}': use 1-64 letters, digits, '-', '_' or '.', not starting with '.'"
        );
    }
    Ok(())
}
