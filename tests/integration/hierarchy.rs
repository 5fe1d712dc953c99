//! Hierarchy policy through the public controller API.

use shepherd::error::PolicyError;
use shepherd::host::ProcessHost;
use shepherd::models::constants::MAX_HIERARCHY_DEPTH;
use shepherd::oversight::hierarchy::depth_of;
use shepherd::oversight::Controller;

use super::helpers::{launch, TestEnv};

fn setup() -> (TestEnv, Controller) {
    let env = TestEnv::new();
    let controller = env.controller();
    (env, controller)
}

#[test]
fn test_depth_limit_counts_from_root() {
    let (_env, controller) = setup();
    launch(&controller, "n0", None).unwrap();
    for depth in 1..=MAX_HIERARCHY_DEPTH {
        launch(&controller, &format!("n{depth}"), Some(&format!("n{}", depth - 1))).unwrap();
    }

    let sessions = controller.registry().load().unwrap();
    assert_eq!(depth_of(&sessions, &format!("n{MAX_HIERARCHY_DEPTH}")), MAX_HIERARCHY_DEPTH);

    let err = launch(&controller, "too-deep", Some(&format!("n{MAX_HIERARCHY_DEPTH}"))).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PolicyError>(),
        Some(PolicyError::DepthExceeded { .. })
    ));
}

#[test]
fn test_cascade_kill_of_wide_tree() {
    let (env, controller) = setup();
    launch(&controller, "root", None).unwrap();
    for lead in ["lead-a", "lead-b"] {
        launch(&controller, lead, Some("root")).unwrap();
        for i in 0..3 {
            launch(&controller, &format!("{lead}-w{i}"), Some(lead)).unwrap();
        }
    }
    launch(&controller, "bystander", None).unwrap();

    let outcome = controller.kill("root", true).unwrap();
    assert_eq!(outcome.killed.len(), 9);
    assert_eq!(outcome.killed.last().map(String::as_str), Some("root"));

    // Every worker is killed before its lead
    let position = |name: &str| outcome.killed.iter().position(|n| n == name).unwrap();
    for lead in ["lead-a", "lead-b"] {
        for i in 0..3 {
            assert!(position(&format!("{lead}-w{i}")) < position(lead));
        }
    }

    let remaining = controller.registry().load().unwrap();
    assert_eq!(remaining.keys().collect::<Vec<_>>(), vec!["bystander"]);
    assert_eq!(env.host.list_windows().unwrap().len(), 1);
    assert_eq!(controller.registry().load_archive().unwrap().len(), 9);
}

#[test]
fn test_budget_flows_down_only() {
    let (_env, controller) = setup();
    launch(&controller, "lead", None).unwrap();
    launch(&controller, "worker", Some("lead")).unwrap();
    launch(&controller, "peer", None).unwrap();
    controller.set_budget("lead", 5.0).unwrap();
    controller.set_budget("peer", 5.0).unwrap();

    controller.transfer_budget("lead", "worker", 2.0).unwrap();

    for (source, target) in [("worker", "lead"), ("peer", "worker"), ("lead", "peer")] {
        let err = controller.transfer_budget(source, target, 1.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PolicyError>(),
            Some(PolicyError::NotAncestor { .. })
        ));
    }

    let sessions = controller.registry().load().unwrap();
    assert_eq!(sessions["lead"].budget_usd, Some(3.0));
    assert_eq!(sessions["worker"].budget_usd, Some(2.0));
    assert_eq!(sessions["peer"].budget_usd, Some(5.0));
}
