//! Integration tests for shepherd supervision
//!
//! These tests drive the public controller and monitor APIs against a
//! scripted process host and a temporary state directory.

pub mod follow_flow;
pub mod helpers;
pub mod hierarchy;
pub mod monitor_loop;
