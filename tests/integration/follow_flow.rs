//! End-to-end delegation: a parent launches a child, the monitor sees the
//! child stall without reporting, and a follower resolves on the handshake
//! or on the oversight policy.

use chrono::Utc;
use serial_test::serial;
use shepherd::fs::HookStore;
use shepherd::models::constants::SESSION_NAME_ENV;
use shepherd::models::{AgentStatus, HookRecord, Lifecycle, OversightPolicy, ReportStatus};
use shepherd::oversight::{Controller, FollowOptions, FollowOutcome, LaunchRequest};
use std::thread;
use std::time::{Duration, Instant};

use super::helpers::{launch, TestEnv};

/// Launch A and its child B, then make B end its turn without reporting.
fn stalled_child(env: &TestEnv, policy: OversightPolicy) -> Controller {
    let controller = env.controller();
    controller.launch(LaunchRequest::new("A", "/tmp")).unwrap();

    let mut request = LaunchRequest::new("B", "/tmp");
    request.parent = Some("A".to_string());
    request.oversight = policy;
    let child = controller.launch(request).unwrap();
    assert!(child.awaiting_report());

    env.host.set_screen("B", "Refactored the parser.\n\n>");
    HookStore::new(env.state.clone())
        .write("B", &HookRecord::new("Stop", "runtime-b", None, Utc::now()))
        .unwrap();
    env.monitor().run_iteration(Utc::now()).unwrap();

    let b = controller.registry().require("B").unwrap();
    assert_eq!(b.status, AgentStatus::IdleAwaitingCompletionReport);
    controller
}

fn options() -> FollowOptions {
    FollowOptions::new(Duration::from_millis(25))
}

#[test]
#[serial]
fn test_blocked_follow_returns_when_child_reports_success() {
    let env = TestEnv::new();
    let controller = stalled_child(&env, OversightPolicy::Wait);

    let reporter = env.controller();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        std::env::set_var(SESSION_NAME_ENV, "B");
        let result = reporter.report_self("success", Some("done".to_string()));
        std::env::remove_var(SESSION_NAME_ENV);
        result.unwrap()
    });

    let started = Instant::now();
    let mut out = Vec::new();
    let outcome = controller.follow("B", &options(), &mut out).unwrap();
    let (name, report) = handle.join().unwrap();

    assert_eq!(name, "B");
    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(outcome, FollowOutcome::Success { reason: "done".to_string() });
    assert_eq!(outcome.exit_code(), 0);
    assert!(started.elapsed() >= Duration::from_millis(300));

    let streamed = String::from_utf8(out).unwrap();
    assert!(streamed.contains("Refactored the parser."));

    let b = controller.registry().require("B").unwrap();
    assert_eq!(b.lifecycle, Lifecycle::Done);
}

#[test]
fn test_timeout_policy_resolves_with_exit_two() {
    let env = TestEnv::new();
    let limit = Duration::from_millis(400);
    let controller = stalled_child(&env, OversightPolicy::Timeout(limit));

    let started = Instant::now();
    let outcome = controller.follow("B", &options(), &mut Vec::new()).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.exit_code(), 2);
    assert!(elapsed >= limit, "resolved early after {elapsed:?}");
    assert!(elapsed < limit + Duration::from_secs(2), "resolved late after {elapsed:?}");

    let report = controller.registry().require("B").unwrap().report.unwrap();
    assert_eq!(report.status, ReportStatus::Failure);
}

#[test]
fn test_report_before_follow_resolves_immediately() {
    let env = TestEnv::new();
    let controller = stalled_child(&env, OversightPolicy::Wait);

    env.host
        .queue_screens("B", &["Thinking… 3s", "Thinking… 4s", "Running tests"]);
    controller.report("B", "success", None).unwrap();
    env.monitor().run_iteration(Utc::now()).unwrap();

    let outcome = controller.follow("B", &options(), &mut Vec::new()).unwrap();
    assert_eq!(outcome.exit_code(), 0);
}

#[test]
fn test_fail_policy_and_cascade_after_resolution() {
    let env = TestEnv::new();
    let controller = stalled_child(&env, OversightPolicy::Fail);

    let outcome = controller.follow("B", &options(), &mut Vec::new()).unwrap();
    assert_eq!(outcome.exit_code(), 1);

    let outcome = controller.kill("A", true).unwrap();
    assert_eq!(outcome.killed, vec!["B", "A"]);
    assert!(controller.registry().load().unwrap().is_empty());
}

#[test]
fn test_child_exiting_to_shell_resolves_terminated() {
    let env = TestEnv::new();
    let controller = env.controller();
    launch(&controller, "A", None).unwrap();
    launch(&controller, "B", Some("A")).unwrap();
    env.host.set_screen("B", "Goodbye!\nuser@host ~/src %");
    env.monitor().run_iteration(Utc::now()).unwrap();

    let mut options = options();
    options.policy = Some(OversightPolicy::Fail);
    let outcome = controller.follow("B", &options, &mut Vec::new()).unwrap();

    assert_eq!(outcome, FollowOutcome::Terminated);
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn test_timeout_longer_than_hook_freshness_without_monitor() {
    let env = TestEnv::new();
    let controller = env.controller();
    launch(&controller, "A", None).unwrap();
    launch(&controller, "B", Some("A")).unwrap();
    HookStore::new(env.state.clone())
        .write("B", &HookRecord::new("Stop", "runtime-b", None, Utc::now() - chrono::Duration::seconds(60)))
        .unwrap();

    let limit = Duration::from_millis(300);
    let mut options = options();
    options.policy = Some(OversightPolicy::Timeout(limit));
    let started = Instant::now();
    let outcome = controller.follow("B", &options, &mut Vec::new()).unwrap();

    assert_eq!(outcome, FollowOutcome::Timeout);
    assert!(started.elapsed() >= limit);
}
