use chrono::{DateTime, Utc};
use std::time::Duration;

use super::{Observation, Opinion};
use crate::models::constants::{HOOK_FRESH_SECS, HOOK_STALE_SECS};
use crate::models::hook::{HookEvent, HookRecord};

/// Hook detector verdict, graded by record age
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOpinion {
    /// Younger than the fresh threshold: authoritative.
    Fresh(Opinion),
    /// Between the fresh and stale thresholds: usable fallback.
    Stale(Opinion),
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct HookDetector {
    fresh: Duration,
    stale: Duration,
}

impl Default for HookDetector {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(HOOK_FRESH_SECS),
            Duration::from_secs(HOOK_STALE_SECS),
        )
    }
}

impl HookDetector {
    pub fn new(fresh: Duration, stale: Duration) -> Self {
        Self {
            fresh,
            stale: stale.max(fresh),
        }
    }

    pub fn assess(&self, record: Option<&HookRecord>, now: DateTime<Utc>) -> HookOpinion {
        let Some(record) = record else {
            return HookOpinion::None;
        };
        let Some(event) = record.parsed_event() else {
            return HookOpinion::None;
        };
        let observation = match event {
            HookEvent::UserPromptSubmit | HookEvent::PostToolUse => Observation::Working,
            HookEvent::Stop => Observation::TurnEnded,
            HookEvent::PermissionRequest => Observation::NeedsApproval,
            HookEvent::SessionEnd => Observation::Exited,
        };

        let age = record.age_at(now);
        let evidence = match &record.tool_name {
            Some(tool) => format!("hook {} ({tool}, {}s ago)", event.as_str(), age.as_secs()),
            None => format!("hook {} ({}s ago)", event.as_str(), age.as_secs()),
        };
        let opinion = Opinion::new(observation, evidence);

        if age < self.fresh {
            HookOpinion::Fresh(opinion)
        } else if age < self.stale {
            HookOpinion::Stale(opinion)
        } else {
            HookOpinion::None
        }
    }

    pub fn is_fresh(&self, record: &HookRecord, now: DateTime<Utc>) -> bool {
        record.age_at(now) < self.fresh
    }
}
