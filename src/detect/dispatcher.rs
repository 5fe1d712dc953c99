use chrono::{DateTime, Utc};

use super::hook::{HookDetector, HookOpinion};
use super::pattern::{PaneClassifier, PatternReading};
use super::{Observation, Opinion};
use crate::models::constants::UNCONFIDENT_STREAK_LIMIT;
use crate::models::hook::HookRecord;
use crate::models::session::Session;
use crate::models::status::{AgentStatus, StatusSample};

/// Per-session memory the dispatcher carries between polls
#[derive(Debug, Clone, Default)]
pub struct DetectorState {
    pub previous_text: Option<String>,
    pub unconfident_streak: u32,
}

/// Merges the pattern and hook opinions into one status per session.
///
/// Precedence: fresh hook, then a pattern rule, then a stale hook, then an
/// unchanged pane (prior status kept). With no confident source the prior
/// status is retained until `streak_limit` consecutive misses, after which
/// the session is `unreachable`.
pub struct Dispatcher {
    classifier: Box<dyn PaneClassifier>,
    hooks: HookDetector,
    streak_limit: u32,
}

impl Dispatcher {
    pub fn new(classifier: Box<dyn PaneClassifier>, hooks: HookDetector) -> Self {
        Self {
            classifier,
            hooks,
            streak_limit: UNCONFIDENT_STREAK_LIMIT,
        }
    }

    pub fn with_streak_limit(mut self, limit: u32) -> Self {
        self.streak_limit = limit.max(1);
        self
    }

    pub fn hooks(&self) -> &HookDetector {
        &self.hooks
    }

    /// Classify one session. `pane` is `None` when the capture failed.
    pub fn dispatch(
        &self,
        session: &Session,
        pane: Option<&str>,
        hook: Option<&HookRecord>,
        state: &mut DetectorState,
        now: DateTime<Utc>,
    ) -> StatusSample {
        let hook_opinion = self.hooks.assess(hook, now);
        let reading = match pane {
            Some(text) => self.classifier.classify(text, state.previous_text.as_deref()),
            None => PatternReading::Unreadable,
        };
        if let Some(text) = pane {
            state.previous_text = Some(text.to_string());
        }

        let decided = match (hook_opinion, reading) {
            (HookOpinion::Fresh(opinion), _) => Some(resolve(session, &opinion)),
            (_, PatternReading::Classified(opinion)) => Some(resolve(session, &opinion)),
            (HookOpinion::Stale(opinion), _) => {
                let (status, evidence) = resolve(session, &opinion);
                Some((status, format!("{evidence} [stale]")))
            }
            (HookOpinion::None, PatternReading::Unchanged) => {
                Some((session.status, "output unchanged".to_string()))
            }
            (HookOpinion::None, PatternReading::Unreadable) => None,
        };

        match decided {
            Some((status, evidence)) => {
                state.unconfident_streak = 0;
                StatusSample::new(status, evidence, now)
            }
            None => {
                state.unconfident_streak += 1;
                if state.unconfident_streak >= self.streak_limit {
                    StatusSample::new(
                        AgentStatus::Unreachable,
                        format!("no readable signal for {} polls", state.unconfident_streak),
                        now,
                    )
                } else {
                    StatusSample::new(
                        session.status,
                        format!(
                            "no readable signal ({}/{}), keeping prior status",
                            state.unconfident_streak, self.streak_limit
                        ),
                        now,
                    )
                }
            }
        }
    }
}

/// Map an observation to a status using the session's oversight context.
pub fn resolve(session: &Session, opinion: &Opinion) -> (AgentStatus, String) {
    let status = match opinion.observation {
        Observation::Working => AgentStatus::Active,
        Observation::NeedsApproval => AgentStatus::IdleAwaitingHuman,
        Observation::NoStandingInstructions => AgentStatus::IdleNoPolicy,
        Observation::Exited => AgentStatus::Terminated,
        Observation::TurnEnded if session.awaiting_report() => {
            AgentStatus::IdleAwaitingCompletionReport
        }
        Observation::TurnEnded if session.heartbeat_armed() => AgentStatus::IdleAwaitingSupervisor,
        Observation::TurnEnded => AgentStatus::IdleAwaitingHuman,
    };
    (status, opinion.evidence.clone())
}
