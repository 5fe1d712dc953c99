use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use super::types::{HeartbeatPolicy, Session, WindowHandle};
use crate::models::metrics::{TimeTotals, UsageTotals};
use crate::models::oversight::{OversightPolicy, Report};
use crate::models::status::{AgentStatus, Lifecycle};

impl Session {
    pub fn new(
        name: impl Into<String>,
        window: WindowHandle,
        working_dir: PathBuf,
        parent: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Self::generate_id(),
            name: name.into(),
            window,
            working_dir,
            parent,
            created_at: now,
            status: AgentStatus::Active,
            status_evidence: "launched".to_string(),
            status_since: now,
            time: TimeTotals::default(),
            last_sample_at: None,
            usage_seen: UsageTotals::default(),
            tokens: UsageTotals::default(),
            spend_usd: 0.0,
            budget_usd: None,
            heartbeat: HeartbeatPolicy::default(),
            oversight: OversightPolicy::default(),
            lifecycle: Lifecycle::Running,
            ended_at: None,
            report: None,
            asleep: false,
            priority: 0,
        }
    }

    fn generate_id() -> String {
        let uuid_short = uuid::Uuid::new_v4()
            .to_string()
            .split('-')
            .next()
            .unwrap_or("")
            .to_string();
        format!("agent-{uuid_short}")
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    /// A budget of zero or less is treated as no budget.
    pub fn effective_budget(&self) -> Option<f64> {
        self.budget_usd.filter(|b| *b > 0.0)
    }

    pub fn budget_exceeded(&self) -> bool {
        self.effective_budget()
            .is_some_and(|budget| self.spend_usd >= budget)
    }

    pub fn remaining_budget(&self) -> Option<f64> {
        self.effective_budget()
            .map(|budget| (budget - self.spend_usd).max(0.0))
    }

    /// Heartbeat configured with an interval and instruction, and not paused.
    pub fn heartbeat_armed(&self) -> bool {
        !self.heartbeat.paused
            && self.heartbeat.interval_secs.is_some_and(|secs| secs > 0)
            && self
                .heartbeat
                .instruction
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty())
    }

    /// A child whose completion handshake has not run yet.
    pub fn awaiting_report(&self) -> bool {
        self.is_child() && self.report.is_none() && self.lifecycle == Lifecycle::Running
    }

    /// Record a completion report and mark the session done.
    pub fn complete_with_report(&mut self, report: Report) -> Result<()> {
        self.try_transition(Lifecycle::Done)?;
        self.report = Some(report);
        Ok(())
    }

    /// Mark the session's window as gone.
    pub fn mark_terminated(&mut self) -> Result<()> {
        self.try_transition(Lifecycle::Terminated)?;
        self.set_status(AgentStatus::Terminated, "window gone", Utc::now());
        Ok(())
    }

    /// Replace the current status, resetting `status_since` on change.
    pub fn set_status(&mut self, status: AgentStatus, evidence: &str, at: DateTime<Utc>) {
        if self.status != status {
            self.status_since = at;
        }
        self.status = status;
        self.status_evidence = evidence.to_string();
    }

    /// Attempt a lifecycle transition with validation.
    pub fn try_transition(&mut self, next: Lifecycle) -> Result<()> {
        let validated = self.lifecycle.try_transition(next)?;
        if validated != self.lifecycle && validated.is_finished() {
            self.ended_at = Some(Utc::now());
        }
        self.lifecycle = validated;
        Ok(())
    }
}
