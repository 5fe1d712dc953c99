//! Activity status and lifecycle of a supervised session

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time activity classification of a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum AgentStatus {
    Active,
    IdleNoPolicy,
    IdleAwaitingSupervisor,
    IdleAwaitingHuman,
    IdleAwaitingCompletionReport,
    Terminated,
    Unreachable,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 7] = [
        AgentStatus::Active,
        AgentStatus::IdleNoPolicy,
        AgentStatus::IdleAwaitingSupervisor,
        AgentStatus::IdleAwaitingHuman,
        AgentStatus::IdleAwaitingCompletionReport,
        AgentStatus::Terminated,
        AgentStatus::Unreachable,
    ];

    pub fn is_active(&self) -> bool {
        matches!(self, AgentStatus::Active)
    }

    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            AgentStatus::IdleNoPolicy
                | AgentStatus::IdleAwaitingSupervisor
                | AgentStatus::IdleAwaitingHuman
                | AgentStatus::IdleAwaitingCompletionReport
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::IdleNoPolicy => "idle-no-policy",
            AgentStatus::IdleAwaitingSupervisor => "idle-awaiting-supervisor",
            AgentStatus::IdleAwaitingHuman => "idle-awaiting-human",
            AgentStatus::IdleAwaitingCompletionReport => "idle-awaiting-completion-report",
            AgentStatus::Terminated => "terminated",
            AgentStatus::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        AgentStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown agent status: {s}"))
    }
}

/// Lifecycle flag, mutated only by explicit operations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Running,
    Done,
    Terminated,
}

impl Lifecycle {
    /// Returns true once the session can no longer change lifecycle.
    pub fn is_finished(&self) -> bool {
        matches!(self, Lifecycle::Done | Lifecycle::Terminated)
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Running => write!(f, "running"),
            Lifecycle::Done => write!(f, "done"),
            Lifecycle::Terminated => write!(f, "terminated"),
        }
    }
}

/// Ephemeral classification produced by the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSample {
    pub status: AgentStatus,
    pub evidence: String,
    pub observed_at: DateTime<Utc>,
}

impl StatusSample {
    pub fn new(status: AgentStatus, evidence: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            status,
            evidence: evidence.into(),
            observed_at,
        }
    }
}
