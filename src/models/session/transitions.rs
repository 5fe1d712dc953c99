use anyhow::{bail, Result};

use crate::models::status::Lifecycle;

impl Lifecycle {
    /// Check if transitioning from the current lifecycle to `next` is valid.
    ///
    /// Valid transitions:
    /// - `Running` -> `Done` (completion handshake)
    /// - `Running` -> `Terminated` (window gone or killed)
    /// - `Done` -> `Terminated` (window of a finished session removed)
    pub fn can_transition_to(&self, next: &Lifecycle) -> bool {
        if self == next {
            return true;
        }

        match self {
            Lifecycle::Running => matches!(next, Lifecycle::Done | Lifecycle::Terminated),
            Lifecycle::Done => matches!(next, Lifecycle::Terminated),
            Lifecycle::Terminated => false,
        }
    }

    /// Attempt to transition to `next`, returning an error if invalid.
    pub fn try_transition(&self, next: Lifecycle) -> Result<Lifecycle> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            bail!("Invalid lifecycle transition: {self} -> {next}")
        }
    }
}
