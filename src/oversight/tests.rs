use super::*;
use crate::error::PolicyError;
use crate::host::ScriptedHost;
use crate::models::constants::SESSION_NAME_ENV;
use crate::models::hook::HookRecord;
use crate::models::oversight::{OversightPolicy, ReportStatus};
use crate::models::status::{AgentStatus, Lifecycle};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    state: StateDir,
    host: ScriptedHost,
    controller: Controller,
}

fn setup() -> Fixture {
    let temp = TempDir::new().unwrap();
    let state = StateDir::new(temp.path());
    state.ensure().unwrap();
    let host = ScriptedHost::new();
    let controller = Controller::new(state.clone(), Arc::new(host.clone()), Settings::default());
    Fixture {
        _temp: temp,
        state,
        host,
        controller,
    }
}

impl Fixture {
    fn launch(&self, name: &str, parent: Option<&str>) -> Result<crate::models::session::Session> {
        let mut request = LaunchRequest::new(name, "/tmp");
        request.parent = parent.map(str::to_string);
        self.controller.launch(request)
    }

    fn second_controller(&self) -> Controller {
        Controller::new(self.state.clone(), Arc::new(self.host.clone()), Settings::default())
    }

    fn set_status(&self, name: &str, status: AgentStatus) {
        self.controller
            .registry()
            .update(name, |s| {
                s.set_status(status, "test", chrono::Utc::now());
                Ok(())
            })
            .unwrap();
    }

    fn budget(&self, name: &str) -> Option<f64> {
        self.controller.registry().require(name).unwrap().budget_usd
    }
}

fn policy_error(err: &anyhow::Error) -> Option<&PolicyError> {
    err.downcast_ref::<PolicyError>()
}

fn fast_follow(policy: Option<OversightPolicy>) -> FollowOptions {
    let mut options = FollowOptions::new(Duration::from_millis(20));
    options.policy = policy;
    options
}

// =========================================================================
// launch
// =========================================================================

#[test]
fn test_launch_chain_to_max_depth_then_reject() {
    let fx = setup();
    fx.launch("d0", None).unwrap();
    for depth in 1..=5 {
        let parent = format!("d{}", depth - 1);
        fx.launch(&format!("d{depth}"), Some(&parent)).unwrap();
    }

    let err = fx.launch("d6", Some("d5")).unwrap_err();
    assert_eq!(
        policy_error(&err),
        Some(&PolicyError::DepthExceeded {
            name: "d6".to_string(),
            depth: 6
        })
    );
    assert!(!fx.host.has_window("d6"));
    assert!(fx.controller.registry().get("d6").unwrap().is_none());
    assert_eq!(fx.controller.registry().load().unwrap().len(), 6);
}

#[test]
fn test_launch_rejects_duplicate_and_unknown_parent() {
    let fx = setup();
    fx.launch("a", None).unwrap();

    let err = fx.launch("a", None).unwrap_err();
    assert_eq!(policy_error(&err), Some(&PolicyError::DuplicateSession("a".to_string())));

    let err = fx.launch("b", Some("ghost")).unwrap_err();
    assert_eq!(policy_error(&err), Some(&PolicyError::UnknownSession("ghost".to_string())));
    assert!(!fx.host.has_window("b"));
}

#[test]
fn test_launch_rejects_bad_names_and_budgets() {
    let fx = setup();
    for name in ["", ".hidden", "has space", "slash/name"] {
        assert!(fx.launch(name, None).is_err(), "{name:?} should be rejected");
    }

    let mut request = LaunchRequest::new("a", "/tmp");
    request.budget_usd = Some(-1.0);
    let err = fx.controller.launch(request).unwrap_err();
    assert!(matches!(policy_error(&err), Some(PolicyError::InvalidAmount(_))));
    assert!(fx.controller.registry().load().unwrap().is_empty());
}

#[test]
fn test_launch_starts_agent_with_identity() {
    let fx = setup();
    let mut request = LaunchRequest::new("worker", "/srv/repo");
    request.prompt = Some("fix the build".to_string());
    request.budget_usd = Some(2.5);
    request.oversight = OversightPolicy::Fail;
    let session = fx.controller.launch(request).unwrap();

    assert_eq!(session.budget_usd, Some(2.5));
    assert_eq!(session.oversight, OversightPolicy::Fail);
    assert_eq!(session.lifecycle, Lifecycle::Running);
    assert_eq!(fx.host.working_dir_of("worker"), Some("/srv/repo".into()));

    let sent = fx.host.sent_to("worker");
    assert_eq!(sent.len(), 1);
    let (line, enter) = &sent[0];
    assert!(enter);
    assert!(line.starts_with("SHEPHERD_SESSION_NAME=worker SHEPHERD_STATE_DIR="));
    assert!(line.contains(" claude 'fix the build'"));
}

#[test]
fn test_launch_clears_leftover_hook_record() {
    let fx = setup();
    let hooks = HookStore::new(fx.state.clone());
    hooks
        .write("a", &HookRecord::new("Stop", "old", None, chrono::Utc::now()))
        .unwrap();
    fx.launch("a", None).unwrap();
    assert!(hooks.latest("a").is_none());
}

#[test]
fn test_launch_cleanup_failure_leaves_nothing_behind() {
    let fx = setup();
    // A directory where the usage file should be cannot be removed as a file
    let usage_path = fx.state.usage_file("a");
    std::fs::create_dir_all(usage_path.join("stuck")).unwrap();

    assert!(fx.launch("a", None).is_err());
    assert!(!fx.host.has_window("a"));
    assert!(fx.controller.registry().load().unwrap().is_empty());
}

#[test]
fn test_duplicate_launch_keeps_live_hook_record() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    let hooks = HookStore::new(fx.state.clone());
    hooks
        .write("a", &HookRecord::new("PostToolUse", "sid", None, chrono::Utc::now()))
        .unwrap();

    assert!(fx.launch("a", None).is_err());
    assert!(hooks.latest("a").is_some());
}

#[test]
fn test_launch_rolls_back_when_host_unreachable() {
    let fx = setup();
    fx.host.set_unreachable(true);
    assert!(fx.launch("a", None).is_err());
    fx.host.set_unreachable(false);
    assert!(fx.controller.registry().load().unwrap().is_empty());
}

// =========================================================================
// kill
// =========================================================================

fn build_tree(fx: &Fixture) {
    // a -> b -> c, a -> d
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    fx.launch("c", Some("b")).unwrap();
    fx.launch("d", Some("a")).unwrap();
}

#[test]
fn test_cascade_kill_goes_deepest_first() {
    let fx = setup();
    build_tree(&fx);

    let outcome = fx.controller.kill("a", true).unwrap();
    assert_eq!(outcome.killed, vec!["c", "b", "d", "a"]);
    assert!(outcome.orphaned.is_empty());
    assert_eq!(fx.host.killed(), vec!["c", "b", "d", "a"]);

    assert!(fx.controller.registry().load().unwrap().is_empty());
    let archive = fx.controller.registry().load_archive().unwrap();
    assert_eq!(archive.len(), 4);
    assert!(archive.values().all(|s| s.lifecycle == Lifecycle::Terminated));
}

#[test]
fn test_kill_without_cascade_orphans_children() {
    let fx = setup();
    build_tree(&fx);

    let outcome = fx.controller.kill("b", false).unwrap();
    assert_eq!(outcome.killed, vec!["b"]);
    assert_eq!(outcome.orphaned, vec!["c"]);

    let sessions = fx.controller.registry().load().unwrap();
    assert!(!sessions.contains_key("b"));
    assert_eq!(sessions["c"].parent, None);
    assert_eq!(sessions["c"].lifecycle, Lifecycle::Running);
    assert_eq!(sessions["d"].parent.as_deref(), Some("a"));
    assert!(fx.host.has_window("c"));
}

#[test]
fn test_kill_tolerates_already_closed_window() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.host.close_window("a");
    let outcome = fx.controller.kill("a", true).unwrap();
    assert_eq!(outcome.killed, vec!["a"]);
    assert!(fx.host.killed().is_empty());
}

#[test]
fn test_kill_unknown_or_unreachable_changes_nothing() {
    let fx = setup();
    fx.launch("a", None).unwrap();

    let err = fx.controller.kill("ghost", true).unwrap_err();
    assert_eq!(policy_error(&err), Some(&PolicyError::UnknownSession("ghost".to_string())));

    fx.host.set_unreachable(true);
    assert!(fx.controller.kill("a", true).is_err());
    fx.host.set_unreachable(false);
    assert!(fx.controller.registry().get("a").unwrap().is_some());
    assert!(fx.host.has_window("a"));
}

// =========================================================================
// budget
// =========================================================================

#[test]
fn test_transfer_from_non_ancestor_mutates_nothing() {
    let fx = setup();
    build_tree(&fx);
    fx.controller.set_budget("b", 10.0).unwrap();
    fx.controller.set_budget("d", 4.0).unwrap();

    let err = fx.controller.transfer_budget("b", "d", 1.0).unwrap_err();
    assert!(matches!(policy_error(&err), Some(PolicyError::NotAncestor { .. })));
    let err = fx.controller.transfer_budget("c", "b", 1.0).unwrap_err();
    assert!(matches!(policy_error(&err), Some(PolicyError::NotAncestor { .. })));

    assert_eq!(fx.budget("b"), Some(10.0));
    assert_eq!(fx.budget("d"), Some(4.0));
    assert_eq!(fx.budget("c"), None);
}

#[test]
fn test_transfer_to_transitive_descendant() {
    let fx = setup();
    build_tree(&fx);
    fx.controller.set_budget("a", 10.0).unwrap();
    fx.controller.set_budget("c", 1.0).unwrap();

    fx.controller.transfer_budget("a", "c", 4.0).unwrap();
    assert_eq!(fx.budget("a"), Some(6.0));
    assert_eq!(fx.budget("c"), Some(5.0));

    let err = fx.controller.transfer_budget("a", "c", 20.0).unwrap_err();
    assert!(matches!(
        policy_error(&err),
        Some(PolicyError::InsufficientBudget { .. })
    ));
    assert_eq!(fx.budget("a"), Some(6.0));
    assert_eq!(fx.budget("c"), Some(5.0));
}

#[test]
fn test_transfer_from_unlimited_source_sets_target() {
    let fx = setup();
    build_tree(&fx);
    fx.controller.set_budget("b", 9.0).unwrap();
    fx.controller.transfer_budget("a", "b", 3.0).unwrap();
    assert_eq!(fx.budget("a"), None);
    assert_eq!(fx.budget("b"), Some(3.0));
}

#[test]
fn test_budget_amount_validation() {
    let fx = setup();
    build_tree(&fx);
    for amount in [0.0, -1.0, f64::NAN] {
        let err = fx.controller.transfer_budget("a", "b", amount).unwrap_err();
        assert!(matches!(policy_error(&err), Some(PolicyError::InvalidAmount(_))));
    }
    fx.controller.set_budget("a", 5.0).unwrap();
    fx.controller.set_budget("a", 0.0).unwrap();
    assert_eq!(fx.budget("a"), None);
    assert!(fx.controller.set_budget("a", -2.0).is_err());
}

#[test]
fn test_budget_lines_include_subtree_spend() {
    let fx = setup();
    build_tree(&fx);
    for (name, spend) in [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)] {
        fx.controller
            .registry()
            .update(name, |s| {
                s.spend_usd = spend;
                Ok(())
            })
            .unwrap();
    }
    fx.controller.set_budget("b", 10.0).unwrap();

    let lines = fx.controller.budget_lines(Some("b")).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].remaining_usd, Some(8.0));
    assert_eq!(lines[0].subtree_spend_usd, 5.0);

    let all = fx.controller.budget_lines(None).unwrap();
    let root = all.iter().find(|l| l.name == "a").unwrap();
    assert_eq!(root.subtree_spend_usd, 10.0);
    assert_eq!(root.remaining_usd, None);
}

// =========================================================================
// report and policy setters
// =========================================================================

#[test]
fn test_report_marks_done_once() {
    let fx = setup();
    fx.launch("a", None).unwrap();

    let report = fx.controller.report("a", "failure", Some("tests red".into())).unwrap();
    assert_eq!(report.status, ReportStatus::Failure);

    let session = fx.controller.registry().require("a").unwrap();
    assert_eq!(session.lifecycle, Lifecycle::Done);
    assert!(session.ended_at.is_some());
    assert_eq!(session.report.unwrap().reason, "tests red");

    assert!(fx.controller.report("a", "success", None).is_err());
}

#[test]
fn test_report_rejects_bad_status() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    let err = fx.controller.report("a", "finished", None).unwrap_err();
    assert!(matches!(policy_error(&err), Some(PolicyError::InvalidReportStatus(_))));
    assert_eq!(
        fx.controller.registry().require("a").unwrap().lifecycle,
        Lifecycle::Running
    );
}

#[test]
#[serial]
fn test_report_self_requires_identity() {
    let fx = setup();
    fx.launch("a", None).unwrap();

    std::env::remove_var(SESSION_NAME_ENV);
    let err = fx.controller.report_self("success", None).unwrap_err();
    assert_eq!(policy_error(&err), Some(&PolicyError::NoReportingContext));

    std::env::set_var(SESSION_NAME_ENV, "a");
    let (name, _) = fx.controller.report_self("success", None).unwrap();
    std::env::remove_var(SESSION_NAME_ENV);
    assert_eq!(name, "a");
}

#[test]
fn test_policy_setters_are_idempotent() {
    let fx = setup();
    fx.launch("a", None).unwrap();

    fx.controller.set_heartbeat("a", 60, "keep going").unwrap();
    fx.controller
        .registry()
        .update("a", |s| {
            s.heartbeat.last_sent_at = Some(chrono::Utc::now());
            Ok(())
        })
        .unwrap();
    let again = fx.controller.set_heartbeat("a", 60, "keep going").unwrap();
    assert!(again.heartbeat.last_sent_at.is_some());
    assert!(again.heartbeat_armed());

    assert!(!fx.controller.pause_heartbeat("a", true).unwrap().heartbeat_armed());
    assert!(fx.controller.pause_heartbeat("a", false).unwrap().heartbeat_armed());
    assert!(!fx.controller.clear_heartbeat("a").unwrap().heartbeat_armed());
    assert!(fx.controller.set_heartbeat("a", 0, "x").is_err());

    assert!(fx.controller.set_asleep("a", true).unwrap().asleep);
    assert!(fx.controller.set_asleep("a", true).unwrap().asleep);
    assert_eq!(fx.controller.set_priority("a", 7).unwrap().priority, 7);
    let policy = OversightPolicy::Timeout(Duration::from_secs(30));
    assert_eq!(fx.controller.set_oversight("a", policy).unwrap().oversight, policy);
}

#[test]
fn test_send_goes_to_the_session_window() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.controller.send("a", "status?", true).unwrap();
    assert_eq!(fx.host.sent_to("a").last(), Some(&("status?".to_string(), true)));
    assert!(fx.controller.send("ghost", "x", true).is_err());
}

// =========================================================================
// follow
// =========================================================================

#[test]
fn test_follow_resolves_success_when_report_arrives() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    fx.set_status("b", AgentStatus::IdleAwaitingCompletionReport);

    let reporter = fx.second_controller();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        reporter.report("b", "success", Some("done".into())).unwrap();
    });

    let mut out = Vec::new();
    let outcome = fx.controller.follow("b", &fast_follow(None), &mut out).unwrap();
    handle.join().unwrap();

    assert_eq!(outcome, FollowOutcome::Success { reason: "done".to_string() });
    assert_eq!(outcome.exit_code(), 0);
}

#[test]
fn test_follow_timeout_records_failure_report() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    fx.controller
        .set_oversight("b", "timeout:300ms".parse().unwrap())
        .unwrap();
    fx.set_status("b", AgentStatus::IdleAwaitingCompletionReport);

    let started = Instant::now();
    let outcome = fx.controller.follow("b", &fast_follow(None), &mut Vec::new()).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome, FollowOutcome::Timeout);
    assert_eq!(outcome.exit_code(), 2);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(3));

    let session = fx.controller.registry().require("b").unwrap();
    assert_eq!(session.lifecycle, Lifecycle::Done);
    let report = session.report.unwrap();
    assert_eq!(report.status, ReportStatus::Failure);
    assert_eq!(report.reason, "oversight timeout expired");
}

#[test]
fn test_follow_fail_policy_resolves_immediately() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    fx.set_status("b", AgentStatus::IdleAwaitingCompletionReport);

    let outcome = fx
        .controller
        .follow("b", &fast_follow(Some(OversightPolicy::Fail)), &mut Vec::new())
        .unwrap();
    assert_eq!(
        outcome,
        FollowOutcome::Failure {
            reason: "stopped without report".to_string()
        }
    );
    let report = fx.controller.registry().require("b").unwrap().report.unwrap();
    assert_eq!(report.reason, "stopped without report");
}

#[test]
fn test_follow_treats_fresh_stop_hook_as_stall() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    HookStore::new(fx.state.clone())
        .write("b", &HookRecord::new("Stop", "sid", None, chrono::Utc::now()))
        .unwrap();

    let outcome = fx
        .controller
        .follow("b", &fast_follow(Some(OversightPolicy::Fail)), &mut Vec::new())
        .unwrap();
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn test_follow_timeout_outlasts_hook_freshness() {
    let fx = setup();
    let settings = Settings {
        hook_fresh_secs: 1,
        ..Settings::default()
    };
    let controller = Controller::new(fx.state.clone(), Arc::new(fx.host.clone()), settings);
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    HookStore::new(fx.state.clone())
        .write("b", &HookRecord::new("Stop", "sid", None, chrono::Utc::now()))
        .unwrap();

    // No monitor runs, so the Stop record ages past fresh while waiting
    let limit = Duration::from_millis(1500);
    let started = Instant::now();
    let outcome = controller
        .follow("b", &fast_follow(Some(OversightPolicy::Timeout(limit))), &mut Vec::new())
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome, FollowOutcome::Timeout);
    assert!(elapsed >= limit, "resolved early after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "resolved late after {elapsed:?}");
}

#[test]
fn test_follow_timeout_restarts_after_new_activity() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    let hooks = HookStore::new(fx.state.clone());
    hooks
        .write("b", &HookRecord::new("Stop", "sid", None, chrono::Utc::now()))
        .unwrap();

    let writer = hooks.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(250));
        writer
            .write("b", &HookRecord::new("UserPromptSubmit", "sid", None, chrono::Utc::now()))
            .unwrap();
        std::thread::sleep(Duration::from_millis(100));
        writer
            .write("b", &HookRecord::new("Stop", "sid", None, chrono::Utc::now()))
            .unwrap();
    });

    let limit = Duration::from_millis(400);
    let started = Instant::now();
    let outcome = fx
        .controller
        .follow("b", &fast_follow(Some(OversightPolicy::Timeout(limit))), &mut Vec::new())
        .unwrap();
    handle.join().unwrap();

    assert_eq!(outcome, FollowOutcome::Timeout);
    // Second stall began at ~350ms
    assert!(started.elapsed() >= Duration::from_millis(700));
}

#[test]
fn test_follow_resolves_when_agent_exits_to_shell() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    fx.host.set_screen("b", "Goodbye!\nuser@host ~/src %");
    let mut monitor =
        crate::monitor::Monitor::new(fx.state.clone(), Arc::new(fx.host.clone()), Settings::default())
            .unwrap();
    monitor.run_iteration(chrono::Utc::now()).unwrap();

    let b = fx.controller.registry().require("b").unwrap();
    assert_eq!(b.status, AgentStatus::Terminated);
    assert_eq!(b.lifecycle, Lifecycle::Running);

    let outcome = fx
        .controller
        .follow("b", &fast_follow(Some(OversightPolicy::Fail)), &mut Vec::new())
        .unwrap();
    assert_eq!(outcome, FollowOutcome::Terminated);
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn test_follow_resolves_on_session_end_hook() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    HookStore::new(fx.state.clone())
        .write("a", &HookRecord::new("SessionEnd", "sid", None, chrono::Utc::now()))
        .unwrap();

    let outcome = fx.controller.follow("a", &fast_follow(None), &mut Vec::new()).unwrap();
    assert_eq!(outcome, FollowOutcome::Terminated);
}

#[test]
fn test_follow_interrupt_leaves_target_untouched() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.launch("b", Some("a")).unwrap();
    fx.set_status("b", AgentStatus::IdleAwaitingCompletionReport);

    let options = fast_follow(None);
    let interrupt = options.interrupt.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        interrupt.store(true, Ordering::SeqCst);
    });
    let outcome = fx.controller.follow("b", &options, &mut Vec::new()).unwrap();
    handle.join().unwrap();

    assert_eq!(outcome, FollowOutcome::Interrupted);
    assert_eq!(outcome.exit_code(), 130);
    let session = fx.controller.registry().require("b").unwrap();
    assert_eq!(session.lifecycle, Lifecycle::Running);
    assert!(session.report.is_none());
}

#[test]
fn test_follow_terminated_or_killed_target() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.controller
        .registry()
        .update("a", |s| s.mark_terminated())
        .unwrap();
    let outcome = fx.controller.follow("a", &fast_follow(None), &mut Vec::new()).unwrap();
    assert_eq!(outcome, FollowOutcome::Terminated);

    fx.launch("b", None).unwrap();
    let killer = fx.second_controller();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        killer.kill("b", true).unwrap();
    });
    let outcome = fx.controller.follow("b", &fast_follow(None), &mut Vec::new()).unwrap();
    handle.join().unwrap();
    assert_eq!(outcome.exit_code(), 1);

    let err = fx.controller.follow("ghost", &fast_follow(None), &mut Vec::new()).unwrap_err();
    assert!(matches!(policy_error(&err), Some(PolicyError::UnknownSession(_))));
}

#[test]
fn test_follow_streams_pane_text_before_resolving() {
    let fx = setup();
    fx.launch("a", None).unwrap();
    fx.host.set_screen("a", "building\ncompiling 3 crates\n");
    fx.controller.report("a", "success", None).unwrap();

    let mut out = Vec::new();
    let outcome = fx.controller.follow("a", &fast_follow(None), &mut out).unwrap();
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(String::from_utf8(out).unwrap(), "building\ncompiling 3 crates\n");
}
