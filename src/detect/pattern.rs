use super::patterns::{CompiledPatterns, TAIL_LINES};
use super::{Observation, Opinion};

/// Result of reading one pane capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternReading {
    /// A rule fired.
    Classified(Opinion),
    /// Readable text with no new signal: keep the prior status.
    Unchanged,
    /// Empty or unreadable capture: no confidence either way.
    Unreadable,
}

/// Classifies pane text given the previous capture.
pub trait PaneClassifier: Send + Sync {
    fn classify(&self, current: &str, previous: Option<&str>) -> PatternReading;
}

/// Ordered text heuristics over the bottom of the pane
#[derive(Debug, Clone)]
pub struct PatternDetector {
    patterns: CompiledPatterns,
}

impl PatternDetector {
    pub fn new(patterns: CompiledPatterns) -> Self {
        Self { patterns }
    }
}

impl PaneClassifier for PatternDetector {
    fn classify(&self, current: &str, previous: Option<&str>) -> PatternReading {
        let plain = self.patterns.strip_ansi(current);
        let lines = self.patterns.content_lines(&plain);
        let Some(last) = lines.last() else {
            return PatternReading::Unreadable;
        };
        let tail = lines[lines.len().saturating_sub(TAIL_LINES)..].join("\n");

        if self.patterns.is_shell_prompt(last) {
            return PatternReading::Classified(Opinion::new(
                Observation::Exited,
                format!("shell prompt: {}", last.trim()),
            ));
        }
        if let Some(marker) = self.patterns.find_spawn_failure(&tail) {
            return PatternReading::Classified(Opinion::new(
                Observation::Exited,
                format!("spawn failure: {marker}"),
            ));
        }
        if let Some(marker) = self.patterns.find_permission(&tail) {
            return PatternReading::Classified(Opinion::new(
                Observation::NeedsApproval,
                format!("permission dialog: {marker}"),
            ));
        }
        if let Some(marker) = self.patterns.find_no_policy(&tail) {
            return PatternReading::Classified(Opinion::new(
                Observation::NoStandingInstructions,
                format!("marker: {marker}"),
            ));
        }

        let changed = previous
            .is_some_and(|prev| self.patterns.normalize(prev) != self.patterns.normalize(current));
        if changed {
            return PatternReading::Classified(Opinion::new(Observation::Working, "output changed"));
        }
        if let Some(marker) = self.patterns.find_active(&tail) {
            return PatternReading::Classified(Opinion::new(
                Observation::Working,
                format!("streaming: {marker}"),
            ));
        }
        if self.patterns.is_prompt_line(last) {
            return PatternReading::Classified(Opinion::new(
                Observation::TurnEnded,
                "empty input prompt",
            ));
        }
        PatternReading::Unchanged
    }
}
