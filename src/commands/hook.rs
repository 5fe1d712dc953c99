//! Hook command - receives agent runtime hook events on stdin
//!
//! Registered for every hook event the runtime emits. It must never fail
//! the agent's turn, so missing identity or bad input is a silent no-op.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

use crate::fs::{HookStore, StateDir};
use crate::models::hook::{HookEvent, HookRecord};
use crate::oversight::report_from_env;

/// Fields of the runtime's hook payload that detection uses
#[derive(Debug, Deserialize)]
struct HookPayload {
    #[serde(default)]
    hook_event_name: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    tool_name: Option<String>,
}

/// Parse `input` and store it as the latest record for `session`.
/// Unknown events are dropped so they cannot displace a useful record.
pub fn record_hook(
    state: &StateDir,
    session: &str,
    input: &str,
    now: DateTime<Utc>,
) -> Result<Option<HookRecord>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    let payload: HookPayload = match serde_json::from_str(input) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(session, error = %e, "ignoring malformed hook payload");
            return Ok(None);
        }
    };
    let Some(event) = payload.hook_event_name.filter(|e| HookEvent::parse(e).is_some()) else {
        return Ok(None);
    };

    let record = HookRecord::new(
        &event,
        payload.session_id.as_deref().unwrap_or_default(),
        payload.tool_name,
        now,
    );
    HookStore::new(state.clone()).write(session, &record)?;
    Ok(Some(record))
}

pub fn execute() -> Result<()> {
    let Ok(session) = report_from_env() else {
        return Ok(());
    };
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        return Ok(());
    }
    let state = StateDir::resolve()?;
    state.ensure()?;
    record_hook(&state, &session, &input, Utc::now())?;
    Ok(())
}
