use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::metrics::{TimeTotals, UsageTotals};
use crate::models::oversight::{OversightPolicy, Report};
use crate::models::status::{AgentStatus, Lifecycle};

/// Handle of the process-host window a session runs in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WindowHandle {
    /// Host-level grouping (the tmux session name)
    pub group: String,
    /// Stable window identifier inside the group (tmux `#{window_id}`)
    pub id: String,
}

impl WindowHandle {
    pub fn new(group: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.group, self.id)
    }
}

/// Heartbeat policy: an instruction periodically re-sent to an idle session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default)]
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub window: WindowHandle,
    pub working_dir: PathBuf,
    /// Registry key of the parent session, never a live reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub created_at: DateTime<Utc>,

    // Owned by the monitor daemon
    pub status: AgentStatus,
    #[serde(default)]
    pub status_evidence: String,
    pub status_since: DateTime<Utc>,
    #[serde(default)]
    pub time: TimeTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sample_at: Option<DateTime<Utc>>,
    /// Last cumulative usage read from the external source
    #[serde(default)]
    pub usage_seen: UsageTotals,
    /// Tokens accumulated over the life of the session
    #[serde(default)]
    pub tokens: UsageTotals,
    #[serde(default)]
    pub spend_usd: f64,

    // Owned by explicit policy operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_usd: Option<f64>,
    #[serde(default)]
    pub heartbeat: HeartbeatPolicy,
    #[serde(default)]
    pub oversight: OversightPolicy,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(default)]
    pub asleep: bool,
    #[serde(default)]
    pub priority: i32,
}
