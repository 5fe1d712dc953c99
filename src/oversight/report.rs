use anyhow::{bail, Result};
use tracing::info;

use super::Controller;
use crate::error::PolicyError;
use crate::models::constants::SESSION_NAME_ENV;
use crate::models::oversight::{Report, ReportStatus};

/// Identity of the calling agent, taken from its launch environment.
pub fn report_from_env() -> Result<String> {
    match std::env::var(SESSION_NAME_ENV) {
        Ok(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(PolicyError::NoReportingContext.into()),
    }
}

impl Controller {
    /// Completion handshake for session `name`: record the report and mark
    /// it done. Any follower polling the session resolves on its next read.
    ///
    /// # Arguments
    ///
    /// * `name` - Reporting session
    /// * `status` - `success` or `failure`
    /// * `reason` - Free text carried to the follower
    ///
    /// # Returns
    ///
    /// The stored report. A second report for the same session is rejected.
    pub fn report(&self, name: &str, status: &str, reason: Option<String>) -> Result<Report> {
        let status: ReportStatus = status.parse()?;
        let report = Report::new(status, reason);

        self.registry.update(name, |session| {
            if let Some(existing) = &session.report {
                bail!(
                    "Session '{name}' already reported {} at {}",
                    existing.status,
                    existing.reported_at.format("%H:%M:%S")
                );
            }
            session.complete_with_report(report.clone())
        })?;

        info!(session = %name, status = %report.status, reason = %report.reason, "completion reported");
        Ok(report)
    }

    /// Handshake resolved against the caller's own identity.
    pub fn report_self(&self, status: &str, reason: Option<String>) -> Result<(String, Report)> {
        let name = report_from_env()?;
        let report = self.report(&name, status, reason)?;
        Ok((name, report))
    }
}
