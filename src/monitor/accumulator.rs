//! Pure time and cost accounting
//!
//! Every sample credits the wall-clock interval since the previous sample
//! (or since creation, for the first one) to exactly one bucket, so
//! `time.total_ms() == last_sample_at - created_at` holds for every session.

use chrono::{DateTime, Utc};

use crate::config::Pricing;
use crate::models::metrics::{TimeTotals, UsageTotals};
use crate::models::session::Session;
use crate::models::status::{AgentStatus, StatusSample};

/// Milliseconds from the last sample (or creation) to `now`.
/// A clock that moved backwards yields zero.
pub fn elapsed_ms(
    created_at: DateTime<Utc>,
    last_sample_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let since = last_sample_at.unwrap_or(created_at);
    (now - since).num_milliseconds().max(0)
}

/// Credit `elapsed_ms` to the bucket for `status`, or to `asleep` when the
/// session is asleep regardless of what was detected.
pub fn accumulate_time(
    totals: &TimeTotals,
    status: AgentStatus,
    asleep: bool,
    elapsed_ms: i64,
) -> TimeTotals {
    let mut next = *totals;
    let elapsed_ms = elapsed_ms.max(0);
    if asleep {
        next.asleep_ms += elapsed_ms;
    } else {
        *next.bucket_mut(status) += elapsed_ms;
    }
    next
}

/// Apply one status sample to a session's totals and current status.
pub fn apply_sample(session: &mut Session, sample: &StatusSample) {
    let elapsed = elapsed_ms(session.created_at, session.last_sample_at, sample.observed_at);
    session.time = accumulate_time(&session.time, sample.status, session.asleep, elapsed);

    let since = session.last_sample_at.unwrap_or(session.created_at);
    session.last_sample_at = Some(since.max(sample.observed_at));
    session.set_status(sample.status, &sample.evidence, sample.observed_at);
}

/// Fold a cumulative usage reading into the session. Returns the delta.
pub fn apply_usage(session: &mut Session, observed: &UsageTotals, pricing: &Pricing) -> UsageTotals {
    let delta = observed.delta_since(&session.usage_seen);
    session.tokens.add(&delta);
    session.spend_usd += pricing.cost_of(&delta);
    session.usage_seen = *observed;
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::WindowHandle;
    use chrono::Duration;
    use std::path::PathBuf;

    fn session() -> Session {
        Session::new("s", WindowHandle::new("agents", "@1"), PathBuf::from("/"), None)
    }

    fn sample(status: AgentStatus, at: DateTime<Utc>) -> StatusSample {
        StatusSample::new(status, "test", at)
    }

    fn assert_identity(s: &Session) {
        let wall = (s.last_sample_at.unwrap() - s.created_at).num_milliseconds();
        assert_eq!(s.time.total_ms(), wall);
    }

    #[test]
    fn test_first_sample_measures_from_creation() {
        let mut s = session();
        let at = s.created_at + Duration::milliseconds(1_500);
        apply_sample(&mut s, &sample(AgentStatus::Active, at));
        assert_eq!(s.time.active_ms, 1_500);
        assert_identity(&s);
    }

    #[test]
    fn test_identity_holds_over_mixed_samples() {
        let mut s = session();
        let mut at = s.created_at;
        let script = [
            (AgentStatus::Active, 5_000, false),
            (AgentStatus::IdleAwaitingHuman, 2_345, false),
            (AgentStatus::Active, 7_001, true),
            (AgentStatus::IdleAwaitingSupervisor, 999, false),
            (AgentStatus::Unreachable, 10_000, false),
            (AgentStatus::Terminated, 1, false),
        ];
        for (status, step, asleep) in script {
            at += Duration::milliseconds(step);
            s.asleep = asleep;
            apply_sample(&mut s, &sample(status, at));
            assert_identity(&s);
        }
        assert_eq!(s.time.asleep_ms, 7_001);
        assert_eq!(s.time.active_ms, 5_000);
    }

    #[test]
    fn test_asleep_session_accrues_no_active_or_idle_time() {
        let mut s = session();
        s.asleep = true;
        let at = s.created_at + Duration::seconds(30);
        apply_sample(&mut s, &sample(AgentStatus::Active, at));
        assert_eq!(s.time.active_ms, 0);
        assert_eq!(s.time.idle_ms(), 0);
        assert_eq!(s.time.asleep_ms, 30_000);
        // Detected status is still recorded
        assert_eq!(s.status, AgentStatus::Active);
    }

    #[test]
    fn test_clock_going_backwards_adds_nothing() {
        let mut s = session();
        let later = s.created_at + Duration::seconds(10);
        apply_sample(&mut s, &sample(AgentStatus::Active, later));
        apply_sample(&mut s, &sample(AgentStatus::Active, later - Duration::seconds(4)));
        assert_eq!(s.time.active_ms, 10_000);
        assert_eq!(s.last_sample_at, Some(later));
        assert_identity(&s);
    }

    #[test]
    fn test_usage_accumulates_deltas_and_cost() {
        let mut s = session();
        let pricing = Pricing::default();
        let first = UsageTotals {
            input_tokens: 1_000_000,
            ..Default::default()
        };
        apply_usage(&mut s, &first, &pricing);
        assert!((s.spend_usd - 15.0).abs() < 1e-9);

        // Same reading again adds nothing
        let delta = apply_usage(&mut s, &first, &pricing);
        assert_eq!(delta.total_tokens(), 0);
        assert!((s.spend_usd - 15.0).abs() < 1e-9);

        let second = UsageTotals {
            input_tokens: 1_000_000,
            output_tokens: 100_000,
            ..Default::default()
        };
        apply_usage(&mut s, &second, &pricing);
        assert_eq!(s.tokens.output_tokens, 100_000);
        assert!((s.spend_usd - 22.5).abs() < 1e-9);
    }
}
