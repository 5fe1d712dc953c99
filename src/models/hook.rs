//! Hook event records written by the agent runtime's hook handler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hook events the detector understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    UserPromptSubmit,
    PostToolUse,
    Stop,
    PermissionRequest,
    SessionEnd,
}

impl HookEvent {
    /// Parse the runtime's event name. Unknown events yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "UserPromptSubmit" => Some(HookEvent::UserPromptSubmit),
            "PostToolUse" => Some(HookEvent::PostToolUse),
            "Stop" => Some(HookEvent::Stop),
            "PermissionRequest" => Some(HookEvent::PermissionRequest),
            "SessionEnd" => Some(HookEvent::SessionEnd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::UserPromptSubmit => "UserPromptSubmit",
            HookEvent::PostToolUse => "PostToolUse",
            HookEvent::Stop => "Stop",
            HookEvent::PermissionRequest => "PermissionRequest",
            HookEvent::SessionEnd => "SessionEnd",
        }
    }

    /// Coarse state label stored alongside the event.
    pub fn status_label(&self) -> &'static str {
        match self {
            HookEvent::UserPromptSubmit | HookEvent::PostToolUse => "running",
            HookEvent::Stop | HookEvent::PermissionRequest => "waiting",
            HookEvent::SessionEnd => "terminated",
        }
    }
}

/// Latest hook record for one session; later records replace earlier ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookRecord {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl HookRecord {
    pub fn new(event: &str, session_id: &str, tool_name: Option<String>, at: DateTime<Utc>) -> Self {
        let status = HookEvent::parse(event)
            .map(|e| e.status_label().to_string())
            .unwrap_or_default();
        Self {
            event: event.to_string(),
            timestamp: at,
            session_id: session_id.to_string(),
            status,
            tool_name,
        }
    }

    pub fn parsed_event(&self) -> Option<HookEvent> {
        HookEvent::parse(&self.event)
    }

    /// Age of the record at `now`; a timestamp in the future counts as zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.timestamp).to_std().unwrap_or_default()
    }
}
