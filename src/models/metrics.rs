//! Accumulated time and usage totals

use serde::{Deserialize, Serialize};

use super::status::AgentStatus;

/// Time spent per status category, in whole milliseconds.
///
/// Integer milliseconds keep the accounting identity exact:
/// `total_ms() == last_sample_at - created_at` for every session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeTotals {
    #[serde(default)]
    pub active_ms: i64,
    #[serde(default)]
    pub idle_no_policy_ms: i64,
    #[serde(default)]
    pub idle_awaiting_supervisor_ms: i64,
    #[serde(default)]
    pub idle_awaiting_human_ms: i64,
    #[serde(default)]
    pub idle_awaiting_report_ms: i64,
    #[serde(default)]
    pub terminated_ms: i64,
    #[serde(default)]
    pub unreachable_ms: i64,
    /// Time excluded from every category because the session was asleep
    #[serde(default)]
    pub asleep_ms: i64,
}

impl TimeTotals {
    pub fn bucket_mut(&mut self, status: AgentStatus) -> &mut i64 {
        match status {
            AgentStatus::Active => &mut self.active_ms,
            AgentStatus::IdleNoPolicy => &mut self.idle_no_policy_ms,
            AgentStatus::IdleAwaitingSupervisor => &mut self.idle_awaiting_supervisor_ms,
            AgentStatus::IdleAwaitingHuman => &mut self.idle_awaiting_human_ms,
            AgentStatus::IdleAwaitingCompletionReport => &mut self.idle_awaiting_report_ms,
            AgentStatus::Terminated => &mut self.terminated_ms,
            AgentStatus::Unreachable => &mut self.unreachable_ms,
        }
    }

    pub fn bucket(&self, status: AgentStatus) -> i64 {
        match status {
            AgentStatus::Active => self.active_ms,
            AgentStatus::IdleNoPolicy => self.idle_no_policy_ms,
            AgentStatus::IdleAwaitingSupervisor => self.idle_awaiting_supervisor_ms,
            AgentStatus::IdleAwaitingHuman => self.idle_awaiting_human_ms,
            AgentStatus::IdleAwaitingCompletionReport => self.idle_awaiting_report_ms,
            AgentStatus::Terminated => self.terminated_ms,
            AgentStatus::Unreachable => self.unreachable_ms,
        }
    }

    /// Sum of every non-active category except asleep.
    pub fn idle_ms(&self) -> i64 {
        self.idle_no_policy_ms
            + self.idle_awaiting_supervisor_ms
            + self.idle_awaiting_human_ms
            + self.idle_awaiting_report_ms
            + self.terminated_ms
            + self.unreachable_ms
    }

    pub fn total_ms(&self) -> i64 {
        self.active_ms + self.idle_ms() + self.asleep_ms
    }

    /// Share of awake time spent active, 0-100.
    pub fn active_percent(&self) -> u8 {
        let awake = self.active_ms + self.idle_ms();
        if awake <= 0 {
            return 0;
        }
        ((self.active_ms * 100) / awake) as u8
    }
}

/// Cumulative token usage reported by a session's usage source
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageTotals {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_tokens: u64,
    #[serde(default)]
    pub cache_read_tokens: u64,
}

impl UsageTotals {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_creation_tokens + self.cache_read_tokens
    }

    /// Per-class growth since `earlier`. A counter that went backwards is
    /// treated as a restarted source and contributes its new value.
    pub fn delta_since(&self, earlier: &UsageTotals) -> UsageTotals {
        fn grow(now: u64, before: u64) -> u64 {
            if now >= before {
                now - before
            } else {
                now
            }
        }
        UsageTotals {
            input_tokens: grow(self.input_tokens, earlier.input_tokens),
            output_tokens: grow(self.output_tokens, earlier.output_tokens),
            cache_creation_tokens: grow(self.cache_creation_tokens, earlier.cache_creation_tokens),
            cache_read_tokens: grow(self.cache_read_tokens, earlier.cache_read_tokens),
        }
    }

    pub fn add(&mut self, other: &UsageTotals) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
    }
}
