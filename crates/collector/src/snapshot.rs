//! Point-in-time inventory capture.

use crate::provider::{InventoryProvider, ProbeResult};
use tracing::{debug, info, warn};
use vcevidence_common::Timestamp;
use vcevidence_schema::inventory::{
    Cluster, Datastore, DistributedPortGroup, DistributedSwitch, Extension, Host, InventoryEvent,
    StandardPortGroup, VcenterIdentity, VirtualMachine,
};

/// Time range and sample bound for event collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub since: Timestamp,
    pub days_back: u32,
    pub max_samples: usize,
}

impl EventWindow {
    /// Window of `days_back` days ending at `now`.
    pub fn ending_at(now: Timestamp, days_back: u32, max_samples: usize) -> Self {
        Self {
            since: now.days_before(days_back),
            days_back,
            max_samples,
        }
    }

    /// Scope written on window-level records.
    pub fn scope(&self) -> String {
        format!("since {}", self.since.to_date())
    }
}

/// Immutable read of the audited environment.
///
/// Each listing keeps its probe outcome so a failed listing surfaces as
/// evidence instead of aborting the capture.
#[derive(Debug, Clone)]
pub struct InventorySnapshot {
    pub target: String,
    pub captured_at: Timestamp,
    pub window: EventWindow,
    pub identity: ProbeResult<VcenterIdentity>,
    pub clusters: ProbeResult<Vec<Cluster>>,
    pub hosts: ProbeResult<Vec<Host>>,
    pub standard_portgroups: ProbeResult<Vec<StandardPortGroup>>,
    pub distributed_portgroups: ProbeResult<Vec<DistributedPortGroup>>,
    pub distributed_switches: ProbeResult<Vec<DistributedSwitch>>,
    pub virtual_machines: ProbeResult<Vec<VirtualMachine>>,
    pub datastores: ProbeResult<Vec<Datastore>>,
    pub extensions: ProbeResult<Vec<Extension>>,
    pub events: ProbeResult<Vec<InventoryEvent>>,
}

impl InventorySnapshot {
    /// Read every listing once from the provider.
    pub fn capture(provider: &dyn InventoryProvider, target: &str, window: EventWindow) -> Self {
        info!("Capturing inventory snapshot of {}", target);

        let snapshot = Self {
            target: target.to_string(),
            captured_at: Timestamp::now(),
            window,
            identity: provider.identity(),
            clusters: listed("clusters", provider.clusters()),
            hosts: listed("hosts", provider.hosts()),
            standard_portgroups: listed("standard port groups", provider.standard_portgroups()),
            distributed_portgroups: listed(
                "distributed port groups",
                provider.distributed_portgroups(),
            ),
            distributed_switches: listed(
                "distributed switches",
                provider.distributed_switches(),
            ),
            virtual_machines: listed("virtual machines", provider.virtual_machines()),
            datastores: listed("datastores", provider.datastores()),
            extensions: listed("extensions", provider.extensions()),
            events: listed(
                "events",
                provider.events(window.since, window.max_samples),
            ),
        };

        if let Err(e) = &snapshot.identity {
            warn!("vCenter identity unavailable: {}", e);
        }
        snapshot
    }
}

fn listed<T>(group: &str, result: ProbeResult<Vec<T>>) -> ProbeResult<Vec<T>> {
    match &result {
        Ok(items) => debug!("Listed {} {}", items.len(), group),
        Err(e) => warn!("Listing {} failed: {}", group, e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureProvider, InventoryDocument};

    #[test]
    fn test_capture_keeps_failed_listings() {
        let document = InventoryDocument::from_yaml(
            r#"
vcenter: { name: vc01, version: "8.0.2" }
datastores:
  - { name: ds01, capacity_bytes: 100, free_bytes: 50 }
failures:
  virtual_machines: "view expired"
"#,
        )
        .unwrap();
        let provider = FixtureProvider::new(document);
        let window = EventWindow::ending_at(Timestamp::now(), 30, 5000);

        let snapshot = InventorySnapshot::capture(&provider, "vc01", window);

        assert_eq!(snapshot.identity.as_ref().unwrap().name, "vc01");
        assert_eq!(snapshot.datastores.as_ref().unwrap().len(), 1);
        assert!(snapshot.virtual_machines.is_err());
        assert!(snapshot.events.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_window_scope() {
        let window = EventWindow::ending_at(Timestamp::now(), 30, 10);
        assert!(window.scope().starts_with("since "));
        assert!(window.since < Timestamp::now());
    }
}
