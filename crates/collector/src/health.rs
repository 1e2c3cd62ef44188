//! Connectivity check: open a session, read a little of everything a run
//! depends on, release, and report each step.

use crate::provider::{ConnectOptions, ProbeResult, SessionProvider};
use crate::session::connect;
use tracing::{info, warn};
use vcevidence_common::{Result, Timestamp};

/// Outcome of one step: a short detail on success, the error otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStep {
    pub name: &'static str,
    pub outcome: std::result::Result<String, String>,
}

impl HealthStep {
    fn record<T>(
        name: &'static str,
        result: ProbeResult<T>,
        detail: impl FnOnce(T) -> String,
    ) -> Self {
        let outcome = match result {
            Ok(value) => Ok(detail(value)),
            Err(e) => {
                warn!("Health step {} failed: {}", name, e);
                Err(e.to_string())
            }
        };
        Self { name, outcome }
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub target: String,
    pub steps: Vec<HealthStep>,
}

impl HealthReport {
    pub fn healthy(&self) -> bool {
        self.steps.iter().all(HealthStep::passed)
    }
}

/// Run the connectivity check against `options.target`.
///
/// A session that cannot be opened is returned as the connection error; every
/// later failure is recorded on its step and the session is still released.
pub fn health_check<P: SessionProvider>(options: &ConnectOptions) -> Result<HealthReport> {
    let session = connect::<P>(options)?;
    let mut steps = vec![HealthStep {
        name: "session",
        outcome: Ok(format!("connected to {}", session.target())),
    }];

    steps.push(HealthStep::record("identity", session.identity(), |id| {
        format!("{} {}", id.name, id.version)
    }));
    steps.push(HealthStep::record("hosts", session.hosts(), |hosts| {
        format!("{} host(s) listed", hosts.len())
    }));
    steps.push(HealthStep::record(
        "events",
        session.events(Timestamp::now().days_before(1), 1),
        |events| format!("{} event(s) readable in the last day", events.len()),
    ));
    steps.push(HealthStep::record("release", session.close(), |()| {
        "session released".to_string()
    }));

    let report = HealthReport {
        target: options.target.clone(),
        steps,
    };
    info!(
        "Health check of {} {}",
        report.target,
        if report.healthy() { "passed" } else { "failed" }
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureProvider;
    use crate::session::tests::{reset_releases, CountingProvider};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_healthy_session_is_released_once() {
        let releases = reset_releases();
        let report = health_check::<CountingProvider>(&ConnectOptions::new("vc01")).unwrap();

        assert!(report.healthy());
        let names: Vec<&str> = report.steps.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["session", "identity", "hosts", "events", "release"]);
        assert_eq!(report.steps[1].outcome, Ok("vc01 8.0.2".to_string()));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_refused_login_is_fatal() {
        let releases = reset_releases();
        let err = health_check::<CountingProvider>(&ConnectOptions::new("wrong-vc"))
            .err()
            .unwrap();
        assert!(err.is_fatal());
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_failed_listing_marks_report_unhealthy() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(
            br#"
vcenter: { name: vc01, version: "8.0.2", build: "1" }
failures:
  hosts: "PropertyCollector fault"
"#,
        )
        .unwrap();

        let options = ConnectOptions::new("vc01").with_inventory(file.path());
        let report = health_check::<FixtureProvider>(&options).unwrap();

        assert!(!report.healthy());
        let hosts = report.steps.iter().find(|s| s.name == "hosts").unwrap();
        assert!(hosts.outcome.as_ref().unwrap_err().contains("PropertyCollector fault"));
        assert!(report.steps.iter().find(|s| s.name == "release").unwrap().passed());
    }
}
