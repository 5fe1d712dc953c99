use chrono::{DateTime, Duration, Utc};

use crate::models::session::Session;
use crate::models::status::Lifecycle;

/// Outcome of checking one session's heartbeat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatDecision {
    /// Send this instruction now.
    Fire(String),
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConfigured,
    Paused,
    NotRunning,
    Asleep,
    OverBudget,
    Busy,
    NotDue,
}

/// Decide whether the heartbeat fires for `session` at `now`.
///
/// Due time counts from the last heartbeat, or from creation if none was
/// ever sent. Budget exhaustion suppresses it like sleep does.
pub fn evaluate(session: &Session, now: DateTime<Utc>) -> HeartbeatDecision {
    let policy = &session.heartbeat;
    let (Some(interval), Some(instruction)) = (policy.interval_secs, policy.instruction.as_ref())
    else {
        return HeartbeatDecision::Skip(SkipReason::NotConfigured);
    };
    if interval == 0 || instruction.trim().is_empty() {
        return HeartbeatDecision::Skip(SkipReason::NotConfigured);
    }
    if policy.paused {
        return HeartbeatDecision::Skip(SkipReason::Paused);
    }
    if session.lifecycle != Lifecycle::Running {
        return HeartbeatDecision::Skip(SkipReason::NotRunning);
    }
    if session.asleep {
        return HeartbeatDecision::Skip(SkipReason::Asleep);
    }
    if session.budget_exceeded() {
        return HeartbeatDecision::Skip(SkipReason::OverBudget);
    }
    if !session.status.is_idle() {
        return HeartbeatDecision::Skip(SkipReason::Busy);
    }

    let since = policy.last_sent_at.unwrap_or(session.created_at);
    let interval = Duration::seconds(interval.min(i64::MAX as u64) as i64);
    if now - since < interval {
        return HeartbeatDecision::Skip(SkipReason::NotDue);
    }
    HeartbeatDecision::Fire(instruction.clone())
}
