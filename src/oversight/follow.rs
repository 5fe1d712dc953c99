//! Blocking wait on a session until it reports, stalls out or disappears

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::Controller;
use crate::detect::{CompiledPatterns, HookDetector};
use crate::error::PolicyError;
use crate::models::constants::exit_codes;
use crate::models::hook::HookEvent;
use crate::models::oversight::{OversightPolicy, Report, ReportStatus};
use crate::models::session::Session;
use crate::models::status::{AgentStatus, Lifecycle};

/// Pane lines remembered for de-duplication.
const RECENT_LINES: usize = 50;

/// Longest single sleep between interrupt checks.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

const STOPPED_WITHOUT_REPORT: &str = "stopped without report";
const TIMEOUT_EXPIRED: &str = "oversight timeout expired";

/// How a follow call resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    Success { reason: String },
    Failure { reason: String },
    /// Target vanished from the registry or its window is gone
    Terminated,
    Timeout,
    Interrupted,
}

impl FollowOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            FollowOutcome::Success { .. } => exit_codes::SUCCESS,
            FollowOutcome::Failure { .. } | FollowOutcome::Terminated => exit_codes::FAILURE,
            FollowOutcome::Timeout => exit_codes::TIMEOUT,
            FollowOutcome::Interrupted => exit_codes::INTERRUPTED,
        }
    }

    fn from_report(report: &Report) -> Self {
        let reason = report.reason.clone();
        match report.status {
            ReportStatus::Success => FollowOutcome::Success { reason },
            ReportStatus::Failure => FollowOutcome::Failure { reason },
        }
    }
}

impl std::fmt::Display for FollowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FollowOutcome::Success { reason } if reason.is_empty() => write!(f, "reported success"),
            FollowOutcome::Success { reason } => write!(f, "reported success: {reason}"),
            FollowOutcome::Failure { reason } if reason.is_empty() => write!(f, "reported failure"),
            FollowOutcome::Failure { reason } => write!(f, "reported failure: {reason}"),
            FollowOutcome::Terminated => write!(f, "terminated"),
            FollowOutcome::Timeout => write!(f, "timed out waiting for report"),
            FollowOutcome::Interrupted => write!(f, "stopped following (agent still running)"),
        }
    }
}

/// Knobs for one follow call
#[derive(Debug, Clone)]
pub struct FollowOptions {
    pub poll: Duration,
    /// Copy new pane lines to the output
    pub stream: bool,
    /// Set from outside (Ctrl-C) to release the wait
    pub interrupt: Arc<AtomicBool>,
    /// Overrides the policy stored on the session
    pub policy: Option<OversightPolicy>,
}

impl FollowOptions {
    pub fn new(poll: Duration) -> Self {
        Self {
            poll,
            stream: true,
            interrupt: Arc::new(AtomicBool::new(false)),
            policy: None,
        }
    }
}

/// A pending follow: which session, under which policy, and since when
/// it has been seen stalled.
#[derive(Debug, Clone)]
pub struct OversightRequest {
    pub target: String,
    pub policy: OversightPolicy,
    stall_started: Option<Instant>,
}

/// What one poll says about a target that owes a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StallSignal {
    /// Turn ended without a report
    Stalled,
    /// The target is working again
    Resumed,
    /// Nothing new either way
    Quiet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StallResolution {
    Fail,
    Timeout,
}

impl StallResolution {
    fn reason(self) -> &'static str {
        match self {
            StallResolution::Fail => STOPPED_WITHOUT_REPORT,
            StallResolution::Timeout => TIMEOUT_EXPIRED,
        }
    }
}

impl OversightRequest {
    pub fn new(target: impl Into<String>, policy: OversightPolicy) -> Self {
        Self {
            target: target.into(),
            policy,
            stall_started: None,
        }
    }

    /// When a `timeout` policy will resolve, if the target is stalled now.
    pub fn deadline(&self) -> Option<Instant> {
        match (self.policy, self.stall_started) {
            (OversightPolicy::Timeout(limit), Some(started)) => Some(started + limit),
            _ => None,
        }
    }

    /// Feed one observation. The timeout clock starts at the first stall
    /// and keeps running through quiet polls; only renewed activity from
    /// the target resets it.
    fn observe(&mut self, signal: StallSignal, now: Instant) -> Option<StallResolution> {
        let started = match signal {
            StallSignal::Resumed => {
                self.stall_started = None;
                return None;
            }
            StallSignal::Quiet => self.stall_started?,
            StallSignal::Stalled => *self.stall_started.get_or_insert(now),
        };
        match self.policy {
            OversightPolicy::Wait => None,
            OversightPolicy::Fail => Some(StallResolution::Fail),
            OversightPolicy::Timeout(limit) => {
                (now.duration_since(started) >= limit).then_some(StallResolution::Timeout)
            }
        }
    }
}

/// Remembers recently printed pane lines so each poll prints only what
/// scrolled in since the last one.
#[derive(Debug, Default)]
struct LineTracker {
    recent: VecDeque<String>,
}

impl LineTracker {
    fn new_lines(&mut self, screen: &str) -> Vec<String> {
        let lines: Vec<String> = screen
            .trim_end()
            .lines()
            .map(|line| line.trim().to_string())
            .collect();

        let start = self.overlap_end(&lines);
        let mut fresh = Vec::new();
        for line in &lines[start..] {
            if self.recent.len() == RECENT_LINES {
                self.recent.pop_front();
            }
            self.recent.push_back(line.clone());
            if !line.is_empty() {
                fresh.push(line.clone());
            }
        }
        fresh
    }

    /// Index just past the newest position where the screen lines up with
    /// the tail of what was already printed. Up to three lines must agree.
    fn overlap_end(&self, lines: &[String]) -> usize {
        let Some(last) = self.recent.back() else {
            return 0;
        };
        for i in (0..lines.len()).rev() {
            if &lines[i] != last {
                continue;
            }
            let depth = 3.min(self.recent.len()).min(i + 1);
            let aligned = (1..depth).all(|j| self.recent[self.recent.len() - 1 - j] == lines[i - j]);
            if aligned {
                return i + 1;
            }
        }
        0
    }
}

/// Sleep for `duration`, waking early when interrupted.
fn pause(duration: Duration, interrupt: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !interrupt.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

/// Classify one poll of a target. A Stop record stays a stall however old
/// it gets, since any later runtime event would have replaced it.
fn stall_signal(session: &Session, event: Option<HookEvent>, hook_fresh: bool) -> StallSignal {
    if !session.awaiting_report() {
        return StallSignal::Resumed;
    }
    match event {
        Some(HookEvent::Stop) => return StallSignal::Stalled,
        Some(HookEvent::UserPromptSubmit | HookEvent::PostToolUse) if hook_fresh => {
            return StallSignal::Resumed
        }
        _ => {}
    }
    match session.status {
        AgentStatus::IdleAwaitingCompletionReport => StallSignal::Stalled,
        AgentStatus::Active => StallSignal::Resumed,
        _ => StallSignal::Quiet,
    }
}

impl Controller {
    /// Block until `name` resolves, streaming its pane text into `out`.
    ///
    /// Each poll checks, in order: interruption, a recorded report, the
    /// target's disappearance or exit, then the stall policy. Interruption
    /// leaves the target untouched.
    ///
    /// # Arguments
    ///
    /// * `name` - Session to follow
    /// * `options` - Poll interval, streaming, interrupt flag and an optional
    ///   policy override
    /// * `out` - Receives pane lines as they appear
    ///
    /// # Returns
    ///
    /// The resolved outcome; `FollowOutcome::exit_code` maps it to the
    /// process exit status. Fails with `UnknownSession` when `name` is not
    /// registered at the start.
    pub fn follow(&self, name: &str, options: &FollowOptions, out: &mut dyn Write) -> Result<FollowOutcome> {
        if self.registry.get(name)?.is_none() {
            return Err(PolicyError::UnknownSession(name.to_string()).into());
        }

        let patterns = CompiledPatterns::compile(&self.settings.pattern_table())?;
        let hook_detector = HookDetector::new(self.settings.hook_fresh(), self.settings.hook_stale());
        let mut request = OversightRequest::new(
            name,
            options.policy.unwrap_or_default(),
        );
        let mut tracker = LineTracker::default();

        loop {
            if options.interrupt.load(Ordering::SeqCst) {
                info!(session = %name, "follow interrupted");
                return Ok(FollowOutcome::Interrupted);
            }

            let Some(session) = self.registry.get(name)? else {
                return Ok(FollowOutcome::Terminated);
            };

            if let Some(report) = &session.report {
                if options.stream {
                    self.stream_new_lines(&session, &patterns, &mut tracker, out)?;
                }
                return Ok(FollowOutcome::from_report(report));
            }

            match session.lifecycle {
                Lifecycle::Terminated => return Ok(FollowOutcome::Terminated),
                Lifecycle::Done => {
                    return Ok(FollowOutcome::Failure {
                        reason: "finished without report".to_string(),
                    })
                }
                Lifecycle::Running => {}
            }

            if options.stream {
                self.stream_new_lines(&session, &patterns, &mut tracker, out)?;
            }

            let now = chrono::Utc::now();
            let hook = self.hooks.latest(name);
            let event = hook.as_ref().and_then(|record| record.parsed_event());
            if session.status == AgentStatus::Terminated || event == Some(HookEvent::SessionEnd) {
                info!(session = %name, "agent exited without report");
                return Ok(FollowOutcome::Terminated);
            }

            if options.policy.is_none() {
                request.policy = session.oversight;
            }
            let fresh = hook
                .as_ref()
                .is_some_and(|record| hook_detector.is_fresh(record, now));
            let signal = stall_signal(&session, event, fresh);
            if let Some(resolution) = request.observe(signal, Instant::now()) {
                return self.resolve_stall(name, resolution);
            }

            pause(options.poll, &options.interrupt);
        }
    }

    /// Record the failure report a `fail` or `timeout` policy calls for. A
    /// report that lands first wins over the policy's own.
    fn resolve_stall(&self, name: &str, resolution: StallResolution) -> Result<FollowOutcome> {
        let outcome = self.registry.transaction(|sessions| {
            let Some(session) = sessions.get_mut(name) else {
                return Ok(FollowOutcome::Terminated);
            };
            if let Some(report) = &session.report {
                return Ok(FollowOutcome::from_report(report));
            }
            if session.lifecycle == Lifecycle::Terminated {
                return Ok(FollowOutcome::Terminated);
            }
            let report = Report::new(ReportStatus::Failure, Some(resolution.reason().to_string()));
            session.complete_with_report(report)?;
            Ok(match resolution {
                StallResolution::Fail => FollowOutcome::Failure {
                    reason: resolution.reason().to_string(),
                },
                StallResolution::Timeout => FollowOutcome::Timeout,
            })
        })?;
        info!(session = %name, outcome = %outcome, "oversight policy resolved follow");
        Ok(outcome)
    }

    fn stream_new_lines(
        &self,
        session: &Session,
        patterns: &CompiledPatterns,
        tracker: &mut LineTracker,
        out: &mut dyn Write,
    ) -> Result<()> {
        let screen = match self
            .host
            .capture_text(&session.window, self.settings.capture_lines)
        {
            Ok(screen) => screen,
            Err(e) => {
                debug!(session = %session.name, error = %e, "capture failed while following");
                return Ok(());
            }
        };
        for line in tracker.new_lines(&patterns.strip_ansi(&screen)) {
            writeln!(out, "{line}").context("Failed to write followed output")?;
        }
        out.flush().context("Failed to flush followed output")?;
        Ok(())
    }
}
