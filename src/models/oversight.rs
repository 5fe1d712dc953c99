//! Oversight policy and completion reports

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

use crate::error::PolicyError;

/// What a follower does when its target stalls without reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversightPolicy {
    /// Block until a report arrives
    #[default]
    Wait,
    /// Resolve as failure as soon as the stall is observed
    Fail,
    /// Resolve as timeout once the stall has lasted this long
    Timeout(Duration),
}

impl std::fmt::Display for OversightPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OversightPolicy::Wait => write!(f, "wait"),
            OversightPolicy::Fail => write!(f, "fail"),
            OversightPolicy::Timeout(d) => write!(f, "timeout:{}", format_duration(*d)),
        }
    }
}

impl std::str::FromStr for OversightPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed {
            "wait" => return Ok(OversightPolicy::Wait),
            "fail" => return Ok(OversightPolicy::Fail),
            _ => {}
        }

        let duration = trimmed
            .strip_prefix("timeout:")
            .and_then(parse_duration)
            .ok_or_else(|| PolicyError::InvalidPolicy(trimmed.to_string()))?;
        if duration.is_zero() {
            return Err(PolicyError::InvalidPolicy(trimmed.to_string()).into());
        }
        Ok(OversightPolicy::Timeout(duration))
    }
}

impl Serialize for OversightPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OversightPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse `500ms`, `5s`, `2m`, `1h` or bare seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(value.checked_mul(3600)?)),
        _ => None,
    }
}

/// Inverse of [`parse_duration`], using the largest exact unit.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 != 0 {
        return format!("{millis}ms");
    }
    let secs = duration.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

/// Outcome announced by a session's completion handshake
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Failure,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Success => write!(f, "success"),
            ReportStatus::Failure => write!(f, "failure"),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(ReportStatus::Success),
            "failure" => Ok(ReportStatus::Failure),
            other => Err(PolicyError::InvalidReportStatus(other.to_string()).into()),
        }
    }
}

/// Completion report recorded on the session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub status: ReportStatus,
    #[serde(default)]
    pub reason: String,
    pub reported_at: DateTime<Utc>,
}

impl Report {
    pub fn new(status: ReportStatus, reason: Option<String>) -> Self {
        Self {
            status,
            reason: reason.unwrap_or_default(),
            reported_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policies() {
        assert_eq!("wait".parse::<OversightPolicy>().unwrap(), OversightPolicy::Wait);
        assert_eq!("fail".parse::<OversightPolicy>().unwrap(), OversightPolicy::Fail);
        assert_eq!(
            "timeout:5s".parse::<OversightPolicy>().unwrap(),
            OversightPolicy::Timeout(Duration::from_secs(5))
        );
        assert_eq!(
            "timeout:2m".parse::<OversightPolicy>().unwrap(),
            OversightPolicy::Timeout(Duration::from_secs(120))
        );
        assert_eq!(
            "timeout:250ms".parse::<OversightPolicy>().unwrap(),
            OversightPolicy::Timeout(Duration::from_millis(250))
        );
        assert_eq!(
            "timeout:30".parse::<OversightPolicy>().unwrap(),
            OversightPolicy::Timeout(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_invalid_policies_are_named_errors() {
        for raw in ["", "later", "timeout:", "timeout:0s", "timeout:5d", "timeout:-1"] {
            let err = raw.parse::<OversightPolicy>().unwrap_err();
            assert!(
                matches!(err.downcast_ref::<PolicyError>(), Some(PolicyError::InvalidPolicy(_))),
                "expected InvalidPolicy for {raw:?}"
            );
        }
    }

    #[test]
    fn test_policy_display_matches_input_form() {
        for raw in ["wait", "fail", "timeout:5s", "timeout:2m", "timeout:1h", "timeout:1500ms"] {
            assert_eq!(raw.parse::<OversightPolicy>().unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_policy_serde_uses_string_form() {
        let policy = OversightPolicy::Timeout(Duration::from_secs(90));
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, "\"timeout:90s\"");
        let back: OversightPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_report_status_parse() {
        assert_eq!("success".parse::<ReportStatus>().unwrap(), ReportStatus::Success);
        assert!("maybe".parse::<ReportStatus>().is_err());
    }
}
