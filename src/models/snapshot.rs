//! Consolidated daemon snapshot, published whole once per loop iteration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metrics::{TimeTotals, UsageTotals};
use super::session::Session;
use super::status::{AgentStatus, Lifecycle};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Per-session view captured at publish time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub status: AgentStatus,
    pub evidence: String,
    pub status_since: DateTime<Utc>,
    pub lifecycle: Lifecycle,
    pub asleep: bool,
    pub budget_exceeded: bool,
    pub time: TimeTotals,
    pub tokens: UsageTotals,
    pub spend_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_usd: Option<f64>,
    pub priority: i32,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            name: session.name.clone(),
            parent: session.parent.clone(),
            status: session.status,
            evidence: session.status_evidence.clone(),
            status_since: session.status_since,
            lifecycle: session.lifecycle,
            asleep: session.asleep,
            budget_exceeded: session.budget_exceeded(),
            time: session.time,
            tokens: session.tokens,
            spend_usd: session.spend_usd,
            budget_usd: session.budget_usd,
            priority: session.priority,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregateTotals {
    pub sessions: usize,
    pub by_status: BTreeMap<AgentStatus, usize>,
    pub active: usize,
    pub asleep: usize,
    pub spend_usd: f64,
    pub tokens: u64,
    pub active_ms: i64,
    pub idle_ms: i64,
}

impl AggregateTotals {
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a SessionSnapshot>) -> Self {
        let mut totals = AggregateTotals::default();
        for session in sessions {
            totals.sessions += 1;
            *totals.by_status.entry(session.status).or_insert(0) += 1;
            if session.status.is_active() && !session.asleep {
                totals.active += 1;
            }
            if session.asleep {
                totals.asleep += 1;
            }
            totals.spend_usd += session.spend_usd;
            totals.tokens += session.tokens.total_tokens();
            totals.active_ms += session.time.active_ms;
            totals.idle_ms += session.time.idle_ms();
        }
        totals
    }
}

/// Point-in-time view of every supervised session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonSnapshot {
    pub version: u32,
    pub loop_count: u64,
    pub published_at: DateTime<Utc>,
    pub daemon_pid: u32,
    pub sessions: Vec<SessionSnapshot>,
    pub totals: AggregateTotals,
}

impl DaemonSnapshot {
    pub fn build(loop_count: u64, sessions: Vec<SessionSnapshot>, at: DateTime<Utc>) -> Self {
        let totals = AggregateTotals::from_sessions(&sessions);
        Self {
            version: SNAPSHOT_VERSION,
            loop_count,
            published_at: at,
            daemon_pid: std::process::id(),
            sessions,
            totals,
        }
    }

    pub fn session(&self, name: &str) -> Option<&SessionSnapshot> {
        self.sessions.iter().find(|s| s.name == name)
    }
}
