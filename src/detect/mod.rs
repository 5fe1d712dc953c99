//! Status detection
//!
//! Two independent sources feed one classification: the [`pattern`] detector
//! reads pane text, the [`hook`] detector reads the latest hook record. Both
//! emit an [`Observation`]; the [`dispatcher`] merges them and maps the
//! winner to an [`AgentStatus`](crate::models::AgentStatus) using the
//! session's oversight context.

pub mod dispatcher;
pub mod hook;
pub mod pattern;
pub mod patterns;

pub use dispatcher::{DetectorState, Dispatcher};
pub use hook::{HookDetector, HookOpinion};
pub use pattern::{PaneClassifier, PatternDetector, PatternReading};
pub use patterns::{CompiledPatterns, PatternTable};

/// What a detector saw, before session context is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Working,
    TurnEnded,
    NeedsApproval,
    NoStandingInstructions,
    Exited,
}

impl Observation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Observation::Working => "working",
            Observation::TurnEnded => "turn-ended",
            Observation::NeedsApproval => "needs-approval",
            Observation::NoStandingInstructions => "no-standing-instructions",
            Observation::Exited => "exited",
        }
    }
}

impl std::fmt::Display for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An observation plus the evidence that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opinion {
    pub observation: Observation,
    pub evidence: String,
}

impl Opinion {
    pub fn new(observation: Observation, evidence: impl Into<String>) -> Self {
        Self {
            observation,
            evidence: evidence.into(),
        }
    }
}
