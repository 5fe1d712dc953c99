//! Monitor iterations against launched sessions.

use chrono::{Duration, Utc};
use shepherd::fs::snapshot_store::load_snapshot;
use shepherd::fs::usage::{transcript_path, write_usage};
use shepherd::fs::HookStore;
use shepherd::models::{AgentStatus, HookRecord, UsageTotals};
use shepherd::oversight::LaunchRequest;
use std::path::Path;

use super::helpers::TestEnv;

#[test]
fn test_asleep_session_accrues_no_active_or_idle_time() {
    let env = TestEnv::new();
    let controller = env.controller();
    let host = env.host.clone();
    let session = controller.launch(LaunchRequest::new("napper", "/tmp")).unwrap();
    controller.set_asleep("napper", true).unwrap();

    let mut monitor = env.monitor();
    let start = session.created_at;
    for step in 1..=5 {
        host.set_screen("napper", &format!("compiling crate {step} of 5"));
        monitor.run_iteration(start + Duration::seconds(step * 5)).unwrap();
    }

    let napper = controller.registry().require("napper").unwrap();
    assert_eq!(napper.time.active_ms, 0);
    assert_eq!(napper.time.idle_ms(), 0);
    assert_eq!(napper.time.asleep_ms, 25_000);
    assert_eq!(napper.time.total_ms(), 25_000);
}

#[test]
fn test_snapshot_totals_cover_every_session() {
    let env = TestEnv::new();
    let (state, host, controller) = (env.state.clone(), env.host.clone(), env.controller());
    controller.launch(LaunchRequest::new("busy", "/tmp")).unwrap();
    controller.launch(LaunchRequest::new("waiting", "/tmp")).unwrap();
    host.queue_screens("busy", &["step 1", "step 1\nstep 2"]);
    host.set_screen("waiting", "Which file should I edit?\n\n>");
    write_usage(
        &state,
        "busy",
        &UsageTotals {
            input_tokens: 1_000_000,
            ..Default::default()
        },
    )
    .unwrap();

    let mut monitor = env.monitor();
    let now = Utc::now();
    monitor.run_iteration(now).unwrap();
    monitor.run_iteration(now + Duration::seconds(5)).unwrap();

    let snapshot = load_snapshot(&state).unwrap().unwrap();
    assert_eq!(snapshot.loop_count, 2);
    assert_eq!(snapshot.totals.sessions, 2);
    assert_eq!(snapshot.totals.tokens, 1_000_000);
    assert!((snapshot.totals.spend_usd - 15.0).abs() < 1e-9);

    let busy = snapshot.session("busy").unwrap();
    assert_eq!(busy.status, AgentStatus::Active);
    let waiting = snapshot.session("waiting").unwrap();
    assert_eq!(waiting.status, AgentStatus::IdleAwaitingHuman);
}

#[test]
fn test_transcript_usage_exhausts_budget_and_silences_heartbeat() {
    let env = TestEnv::new();
    let controller = env.controller();
    let mut request = LaunchRequest::new("spender", "/tmp");
    request.budget_usd = Some(1.0);
    controller.launch(request).unwrap();
    controller
        .set_heartbeat("spender", 1, "continue with the next task")
        .unwrap();
    env.host.set_screen("spender", "All done for now.\n\n>");

    let now = Utc::now();
    HookStore::new(env.state.clone())
        .write("spender", &HookRecord::new("Stop", "rt-7", None, now))
        .unwrap();
    let transcript = transcript_path(&env.projects, Path::new("/tmp"), "rt-7");
    std::fs::create_dir_all(transcript.parent().unwrap()).unwrap();
    std::fs::write(
        &transcript,
        r#"{"type":"assistant","message":{"usage":{"input_tokens":0,"output_tokens":20000}}}"#,
    )
    .unwrap();

    let mut monitor = env.monitor();
    let report = monitor.run_iteration(now + Duration::seconds(30)).unwrap();

    let spender = controller.registry().require("spender").unwrap();
    assert_eq!(spender.tokens.output_tokens, 20_000);
    assert!(spender.budget_exceeded());
    assert!(report.heartbeats.is_empty());
    assert!(env.host.sent_to("spender").iter().all(|(text, _)| !text.contains("next task")));
}
