//! The monitor control loop
//!
//! One iteration: read the registry, detect every running session, fold the
//! samples and usage into the registry in a single transaction, fire due
//! heartbeats, archive old finished sessions, then publish one snapshot.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::accumulator::{apply_sample, apply_usage};
use super::archive::select_archivable;
use super::heartbeat::{evaluate, HeartbeatDecision};
use crate::config::Settings;
use crate::detect::{CompiledPatterns, DetectorState, Dispatcher, HookDetector, PatternDetector};
use crate::fs::snapshot_store::{load_snapshot, publish_snapshot};
use crate::fs::usage::sync_usage;
use crate::fs::{HookStore, Registry, SessionMap, StateDir};
use crate::host::{send_serialized, ProcessHost};
use crate::models::metrics::UsageTotals;
use crate::models::session::{Session, WindowHandle};
use crate::models::snapshot::{DaemonSnapshot, SessionSnapshot};
use crate::models::status::{AgentStatus, Lifecycle, StatusSample};

/// Granularity of shutdown checks while sleeping between iterations
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Summary of one loop iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub loop_count: u64,
    pub sessions: usize,
    pub terminated: Vec<String>,
    pub heartbeats: Vec<String>,
    pub archived: Vec<String>,
    pub failures: usize,
}

/// What detection produced for one session
enum Observed {
    Sample {
        sample: StatusSample,
        usage: Option<UsageTotals>,
    },
    WindowGone,
}

struct SessionUpdate {
    name: String,
    id: String,
    observed: Observed,
}

struct DueHeartbeat {
    name: String,
    id: String,
    window: WindowHandle,
    instruction: String,
}

pub struct Monitor {
    state: StateDir,
    registry: Registry,
    hooks: HookStore,
    host: Arc<dyn ProcessHost>,
    dispatcher: Dispatcher,
    settings: Settings,
    detector_states: HashMap<String, DetectorState>,
    loop_count: u64,
}

impl Monitor {
    /// Build a monitor over `state`, compiling the configured patterns.
    ///
    /// # Arguments
    ///
    /// * `state` - State directory holding the registry and hook records
    /// * `host` - Process host whose windows are sampled
    /// * `settings` - Thresholds, pricing and pattern overrides
    ///
    /// # Returns
    ///
    /// A monitor whose loop counter continues from the last published
    /// snapshot, or an error if a pattern fails to compile.
    pub fn new(state: StateDir, host: Arc<dyn ProcessHost>, settings: Settings) -> Result<Self> {
        let patterns = CompiledPatterns::compile(&settings.pattern_table())
            .context("Failed to compile status patterns")?;
        let dispatcher = Dispatcher::new(
            Box::new(PatternDetector::new(patterns)),
            HookDetector::new(settings.hook_fresh(), settings.hook_stale()),
        )
        .with_streak_limit(settings.unconfident_streak);

        // Continue the loop counter from the last published snapshot.
        let loop_count = match load_snapshot(&state) {
            Ok(Some(snapshot)) => snapshot.loop_count,
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable snapshot");
                0
            }
        };

        Ok(Self {
            registry: Registry::new(state.clone()),
            hooks: HookStore::new(state.clone()),
            state,
            host,
            dispatcher,
            settings,
            detector_states: HashMap::new(),
            loop_count,
        })
    }

    pub fn loop_count(&self) -> u64 {
        self.loop_count
    }

    /// Run iterations until `shutdown` is set.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        let interval = self.settings.poll_interval();
        info!(interval_secs = interval.as_secs(), "monitor loop started");

        while !shutdown.load(Ordering::Relaxed) {
            let started = Instant::now();
            match self.run_iteration(Utc::now()) {
                Ok(report) => debug!(
                    loop_count = report.loop_count,
                    sessions = report.sessions,
                    failures = report.failures,
                    "iteration complete"
                ),
                Err(e) => warn!(error = %format!("{e:#}"), "iteration failed"),
            }

            while started.elapsed() < interval && !shutdown.load(Ordering::Relaxed) {
                std::thread::sleep(SHUTDOWN_POLL.min(interval.saturating_sub(started.elapsed())));
            }
        }

        info!(loop_count = self.loop_count, "monitor loop stopped");
        Ok(())
    }

    /// One full poll-detect-accumulate-publish pass at time `now`.
    ///
    /// Detection runs outside the registry lock. Results are applied in one
    /// transaction keyed by session id, so a session relaunched mid-pass is
    /// left alone.
    ///
    /// # Returns
    ///
    /// An [`IterationReport`] describing what the pass changed.
    pub fn run_iteration(&mut self, now: DateTime<Utc>) -> Result<IterationReport> {
        let sessions = self.registry.load()?;
        let mut report = IterationReport::default();

        let live: Option<HashSet<String>> = match self.host.list_windows() {
            Ok(windows) => Some(windows.into_iter().map(|w| w.id).collect()),
            Err(e) => {
                warn!(error = %e, "process host unreachable, skipping liveness checks");
                None
            }
        };

        let mut updates = Vec::new();
        for session in sessions.values() {
            match self.observe(session, live.as_ref(), now) {
                Ok(Some(observed)) => updates.push(SessionUpdate {
                    name: session.name.clone(),
                    id: session.id.clone(),
                    observed,
                }),
                Ok(None) => {}
                Err(e) => {
                    report.failures += 1;
                    warn!(session = %session.name, error = %format!("{e:#}"), "detection failed");
                }
            }
        }

        let pricing = self.settings.pricing;
        let (mut sessions, due, terminated) = self.registry.transaction(|map| {
            let mut due = Vec::new();
            let mut terminated = Vec::new();
            for update in &updates {
                let Some(session) = map.get_mut(&update.name) else {
                    continue;
                };
                if session.id != update.id {
                    continue;
                }
                match &update.observed {
                    Observed::Sample { sample, usage } => {
                        let was_over = session.budget_exceeded();
                        apply_sample(session, sample);
                        if let Some(usage) = usage {
                            apply_usage(session, usage, &pricing);
                        }
                        if !was_over && session.budget_exceeded() {
                            info!(
                                session = %session.name,
                                spend_usd = session.spend_usd,
                                "budget exhausted, automation suppressed"
                            );
                        }
                    }
                    Observed::WindowGone => {
                        let sample = StatusSample::new(AgentStatus::Terminated, "window gone", now);
                        apply_sample(session, &sample);
                        if let Err(e) = session.try_transition(Lifecycle::Terminated) {
                            warn!(session = %session.name, error = %e, "lifecycle update rejected");
                        } else {
                            terminated.push(session.name.clone());
                        }
                    }
                }

                if let HeartbeatDecision::Fire(instruction) = evaluate(session, now) {
                    due.push(DueHeartbeat {
                        name: session.name.clone(),
                        id: session.id.clone(),
                        window: session.window.clone(),
                        instruction,
                    });
                }
            }
            Ok((map.clone(), due, terminated))
        })?;
        for name in &terminated {
            info!(session = %name, "window gone, session terminated");
        }
        report.terminated = terminated;

        let fired = self.fire_heartbeats(due, now);
        if !fired.is_empty() {
            self.registry.transaction(|map| {
                for (name, id) in &fired {
                    if let Some(session) = map.get_mut(name).filter(|s| &s.id == id) {
                        session.heartbeat.last_sent_at = Some(now);
                    }
                }
                Ok(())
            })?;
            for (name, id) in &fired {
                if let Some(session) = sessions.get_mut(name).filter(|s| &s.id == id) {
                    session.heartbeat.last_sent_at = Some(now);
                }
            }
        }
        report.heartbeats = fired.into_iter().map(|(name, _)| name).collect();

        report.archived = self.archive_finished(&mut sessions, live.as_ref(), now);

        let known: HashSet<&str> = sessions.values().map(|s| s.id.as_str()).collect();
        self.detector_states.retain(|id, _| known.contains(id.as_str()));

        self.loop_count += 1;
        let snapshot = DaemonSnapshot::build(
            self.loop_count,
            sessions.values().map(SessionSnapshot::from).collect(),
            now,
        );
        publish_snapshot(&self.state, &snapshot)?;

        report.loop_count = self.loop_count;
        report.sessions = sessions.len();
        Ok(report)
    }

    /// Detect one session. `None` means nothing to record this iteration.
    fn observe(
        &mut self,
        session: &Session,
        live: Option<&HashSet<String>>,
        now: DateTime<Utc>,
    ) -> Result<Option<Observed>> {
        let window_alive = live.map(|ids| ids.contains(&session.window.id));
        match session.lifecycle {
            Lifecycle::Terminated => return Ok(None),
            Lifecycle::Done => {
                return Ok((window_alive == Some(false)).then_some(Observed::WindowGone));
            }
            Lifecycle::Running => {}
        }
        if window_alive == Some(false) {
            return Ok(Some(Observed::WindowGone));
        }

        let pane = match self
            .host
            .capture_text(&session.window, self.settings.capture_lines)
        {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(session = %session.name, error = %e, "pane capture failed");
                None
            }
        };
        let hook = self.hooks.latest(&session.name);
        let state = self.detector_states.entry(session.id.clone()).or_default();
        let sample = self
            .dispatcher
            .dispatch(session, pane.as_deref(), hook.as_ref(), state, now);

        let projects = self.settings.transcripts_root();
        let usage = match sync_usage(
            &self.state,
            &session.name,
            &session.working_dir,
            hook.as_ref().map(|record| record.session_id.as_str()),
            projects.as_deref(),
        ) {
            Ok(usage) => usage,
            Err(e) => {
                warn!(session = %session.name, error = %format!("{e:#}"), "usage sync failed");
                None
            }
        };

        Ok(Some(Observed::Sample { sample, usage }))
    }

    /// Send due heartbeats. Returns `(name, id)` of each successful send.
    fn fire_heartbeats(&self, due: Vec<DueHeartbeat>, now: DateTime<Utc>) -> Vec<(String, String)> {
        let mut fired = Vec::new();
        for heartbeat in due {
            let lock = self.state.send_lock(&heartbeat.name);
            match send_serialized(
                self.host.as_ref(),
                &lock,
                &heartbeat.window,
                &heartbeat.instruction,
                true,
            ) {
                Ok(()) => {
                    info!(session = %heartbeat.name, at = %now, "heartbeat sent");
                    fired.push((heartbeat.name, heartbeat.id));
                }
                Err(e) => {
                    warn!(session = %heartbeat.name, error = %format!("{e:#}"), "heartbeat send failed");
                }
            }
        }
        fired
    }

    /// Archive finished sessions past the age threshold, killing any window
    /// still open. Removes them from `sessions` and returns their names.
    fn archive_finished(
        &self,
        sessions: &mut SessionMap,
        live: Option<&HashSet<String>>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let names = select_archivable(sessions, now, self.settings.archive_after());
        if names.is_empty() {
            return names;
        }

        for name in &names {
            let Some(session) = sessions.get(name) else {
                continue;
            };
            if live.is_some_and(|ids| ids.contains(&session.window.id)) {
                if let Err(e) = self.host.kill_window(&session.window) {
                    warn!(session = %name, error = %e, "failed to kill window before archiving");
                }
            }
        }

        match self.registry.archive(&names) {
            Ok(moved) => {
                info!(count = moved, "archived finished sessions");
                for name in &names {
                    sessions.remove(name);
                }
                names
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "archiving failed");
                Vec::new()
            }
        }
    }
}
