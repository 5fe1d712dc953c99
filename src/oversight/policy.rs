//! Idempotent policy setters keyed by session name

use anyhow::{bail, Result};
use tracing::info;

use super::Controller;
use crate::models::oversight::OversightPolicy;
use crate::models::session::{HeartbeatPolicy, Session};

impl Controller {
    /// Configure the heartbeat. Keeps the last-sent time so re-applying the
    /// same policy does not reset the schedule.
    pub fn set_heartbeat(&self, name: &str, interval_secs: u64, instruction: &str) -> Result<Session> {
        if interval_secs == 0 {
            bail!("Heartbeat interval must be greater than zero");
        }
        if instruction.trim().is_empty() {
            bail!("Heartbeat instruction must not be empty");
        }
        let session = self.registry.update(name, |session| {
            session.heartbeat.interval_secs = Some(interval_secs);
            session.heartbeat.instruction = Some(instruction.to_string());
            session.heartbeat.paused = false;
            Ok(session.clone())
        })?;
        info!(session = %name, interval_secs, "heartbeat configured");
        Ok(session)
    }

    pub fn pause_heartbeat(&self, name: &str, paused: bool) -> Result<Session> {
        self.registry.update(name, |session| {
            session.heartbeat.paused = paused;
            Ok(session.clone())
        })
    }

    pub fn clear_heartbeat(&self, name: &str) -> Result<Session> {
        self.registry.update(name, |session| {
            session.heartbeat = HeartbeatPolicy::default();
            Ok(session.clone())
        })
    }

    pub fn set_priority(&self, name: &str, priority: i32) -> Result<Session> {
        self.registry.update(name, |session| {
            session.priority = priority;
            Ok(session.clone())
        })
    }

    /// Sleep excludes the session from time accounting and automation.
    pub fn set_asleep(&self, name: &str, asleep: bool) -> Result<Session> {
        let session = self.registry.update(name, |session| {
            session.asleep = asleep;
            Ok(session.clone())
        })?;
        info!(session = %name, asleep, "sleep flag changed");
        Ok(session)
    }

    pub fn set_oversight(&self, name: &str, policy: OversightPolicy) -> Result<Session> {
        self.registry.update(name, |session| {
            session.oversight = policy;
            Ok(session.clone())
        })
    }
}
