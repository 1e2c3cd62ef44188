//! Offline provider serving a captured inventory document.
//!
//! The document is the offline analogue of a live session: every listing
//! and per-host probe is read from it. Any probe can be recorded as
//! `{ error: "..." }` to replay an unreadable field, a host carrying
//! `unreachable` fails all of its probes, and `failures.<group>` fails a
//! whole listing.

use crate::provider::{ConnectOptions, InventoryProvider, ProbeError, ProbeResult, SessionProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use vcevidence_common::Timestamp;
use vcevidence_schema::inventory::{
    AcceptanceLevel, Cluster, CoreDumpTarget, Datastore, DistributedPortGroup, DistributedSwitch,
    Extension, FirewallState, Host, InventoryEvent, NtpConfig, ServiceState, SettingValue,
    StandardPortGroup, VcenterIdentity, VirtualMachine,
};

/// Listing group names accepted under `failures`.
pub const GROUP_CLUSTERS: &str = "clusters";
pub const GROUP_HOSTS: &str = "hosts";
pub const GROUP_STANDARD_PORTGROUPS: &str = "standard_portgroups";
pub const GROUP_DISTRIBUTED_PORTGROUPS: &str = "distributed_portgroups";
pub const GROUP_DISTRIBUTED_SWITCHES: &str = "distributed_switches";
pub const GROUP_VIRTUAL_MACHINES: &str = "virtual_machines";
pub const GROUP_DATASTORES: &str = "datastores";
pub const GROUP_EXTENSIONS: &str = "extensions";
pub const GROUP_EVENTS: &str = "events";

/// A probe value as captured: either the observed value or the error the
/// probe returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recorded<T> {
    Failed { error: String },
    Value(T),
}

impl<T: Clone> Recorded<T> {
    fn to_probe(&self, resource: impl Into<String>) -> ProbeResult<T> {
        match self {
            Recorded::Value(value) => Ok(value.clone()),
            Recorded::Failed { error } => Err(ProbeError::Unreadable {
                resource: resource.into(),
                reason: error.clone(),
            }),
        }
    }
}

/// One host with its captured probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    #[serde(flatten)]
    pub host: Host,
    /// Reason every probe of this host fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreachable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntp: Option<Recorded<NtpConfig>>,
    #[serde(default)]
    pub services: BTreeMap<String, Recorded<ServiceState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firewall: Option<Recorded<FirewallState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_level: Option<Recorded<AcceptanceLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coredump: Option<Recorded<CoreDumpTarget>>,
    /// Advanced settings by key. A key absent here is reported as unset.
    #[serde(default)]
    pub settings: BTreeMap<String, Recorded<SettingValue>>,
}

/// A captured vCenter inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryDocument {
    pub vcenter: VcenterIdentity,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub hosts: Vec<HostRecord>,
    #[serde(default)]
    pub standard_portgroups: Vec<StandardPortGroup>,
    #[serde(default)]
    pub distributed_portgroups: Vec<DistributedPortGroup>,
    #[serde(default)]
    pub distributed_switches: Vec<DistributedSwitch>,
    #[serde(default, alias = "vms")]
    pub virtual_machines: Vec<VirtualMachine>,
    #[serde(default)]
    pub datastores: Vec<Datastore>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
    #[serde(default)]
    pub events: Vec<InventoryEvent>,
    /// Listing group → error returned for the whole listing.
    #[serde(default)]
    pub failures: BTreeMap<String, String>,
}

impl InventoryDocument {
    pub fn from_yaml(text: &str) -> vcevidence_common::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> vcevidence_common::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a document, choosing the format by extension (`.json` or YAML).
    pub fn load(path: &Path) -> vcevidence_common::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
    }
}

/// Provider backed by an [`InventoryDocument`].
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    document: InventoryDocument,
}

impl FixtureProvider {
    pub fn new(document: InventoryDocument) -> Self {
        Self { document }
    }

    pub fn load(path: &Path) -> ProbeResult<Self> {
        let document = InventoryDocument::load(path).map_err(|e| ProbeError::Unreadable {
            resource: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            "Loaded inventory for {} from {}",
            document.vcenter.name,
            path.display()
        );
        Ok(Self::new(document))
    }

    pub fn document(&self) -> &InventoryDocument {
        &self.document
    }

    fn listing<T: Clone>(&self, group: &str, items: &[T]) -> ProbeResult<Vec<T>> {
        match self.document.failures.get(group) {
            Some(reason) => Err(ProbeError::Unreadable {
                resource: group.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(items.to_vec()),
        }
    }

    fn host(&self, name: &str) -> ProbeResult<&HostRecord> {
        let record = self
            .document
            .hosts
            .iter()
            .find(|h| h.host.name == name)
            .ok_or_else(|| ProbeError::NotFound(format!("host {}", name)))?;

        match &record.unreachable {
            Some(reason) => Err(ProbeError::Unreadable {
                resource: name.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(record),
        }
    }

    fn probe<T: Clone>(
        &self,
        host: &str,
        probe: &str,
        pick: impl FnOnce(&HostRecord) -> Option<&Recorded<T>>,
    ) -> ProbeResult<T> {
        debug!("Probe {} on {}", probe, host);
        let record = self.host(host)?;
        match pick(record) {
            Some(recorded) => recorded.to_probe(format!("{} {}", host, probe)),
            None => Err(ProbeError::NotCaptured(format!("{} {}", host, probe))),
        }
    }
}

impl InventoryProvider for FixtureProvider {
    fn identity(&self) -> ProbeResult<VcenterIdentity> {
        Ok(self.document.vcenter.clone())
    }

    fn clusters(&self) -> ProbeResult<Vec<Cluster>> {
        self.listing(GROUP_CLUSTERS, &self.document.clusters)
    }

    fn hosts(&self) -> ProbeResult<Vec<Host>> {
        let hosts: Vec<Host> = self.document.hosts.iter().map(|h| h.host.clone()).collect();
        self.listing(GROUP_HOSTS, &hosts)
    }

    fn host_ntp(&self, host: &str) -> ProbeResult<NtpConfig> {
        self.probe(host, "ntp", |h| h.ntp.as_ref())
    }

    fn host_service(&self, host: &str, service: &str) -> ProbeResult<ServiceState> {
        self.probe(host, service, |h| h.services.get(service))
    }

    fn host_firewall(&self, host: &str) -> ProbeResult<FirewallState> {
        self.probe(host, "firewall", |h| h.firewall.as_ref())
    }

    fn host_acceptance_level(&self, host: &str) -> ProbeResult<AcceptanceLevel> {
        self.probe(host, "acceptance level", |h| h.acceptance_level.as_ref())
    }

    fn host_coredump(&self, host: &str) -> ProbeResult<CoreDumpTarget> {
        self.probe(host, "coredump", |h| h.coredump.as_ref())
    }

    fn host_setting(&self, host: &str, key: &str) -> ProbeResult<Option<SettingValue>> {
        debug!("Setting {} on {}", key, host);
        let record = self.host(host)?;
        match record.settings.get(key) {
            Some(recorded) => recorded.to_probe(format!("{} {}", host, key)).map(Some),
            None => Ok(None),
        }
    }

    fn standard_portgroups(&self) -> ProbeResult<Vec<StandardPortGroup>> {
        self.listing(GROUP_STANDARD_PORTGROUPS, &self.document.standard_portgroups)
    }

    fn distributed_portgroups(&self) -> ProbeResult<Vec<DistributedPortGroup>> {
        self.listing(
            GROUP_DISTRIBUTED_PORTGROUPS,
            &self.document.distributed_portgroups,
        )
    }

    fn distributed_switches(&self) -> ProbeResult<Vec<DistributedSwitch>> {
        self.listing(GROUP_DISTRIBUTED_SWITCHES, &self.document.distributed_switches)
    }

    fn virtual_machines(&self) -> ProbeResult<Vec<VirtualMachine>> {
        self.listing(GROUP_VIRTUAL_MACHINES, &self.document.virtual_machines)
    }

    fn datastores(&self) -> ProbeResult<Vec<Datastore>> {
        self.listing(GROUP_DATASTORES, &self.document.datastores)
    }

    fn extensions(&self) -> ProbeResult<Vec<Extension>> {
        self.listing(GROUP_EXTENSIONS, &self.document.extensions)
    }

    fn events(&self, since: Timestamp, max_samples: usize) -> ProbeResult<Vec<InventoryEvent>> {
        let events = self.listing(GROUP_EVENTS, &self.document.events)?;
        Ok(events
            .into_iter()
            .filter(|e| e.created >= since)
            .take(max_samples)
            .collect())
    }
}

impl SessionProvider for FixtureProvider {
    fn open(options: &ConnectOptions) -> ProbeResult<Self> {
        let path = options
            .inventory
            .as_ref()
            .ok_or_else(|| ProbeError::Session("no inventory document given".to_string()))?;
        Self::load(path)
    }

    fn handshake(&self, options: &ConnectOptions) -> ProbeResult<()> {
        if options.credentials.is_some() {
            debug!("Credentials ignored: inventory is read from a captured document");
        }
        let captured = &self.document.vcenter.name;
        if captured.eq_ignore_ascii_case(&options.target) {
            Ok(())
        } else {
            Err(ProbeError::Session(format!(
                "inventory was captured from {}, not {}",
                captured, options.target
            )))
        }
    }

    fn release(&mut self) -> ProbeResult<()> {
        debug!("Fixture session for {} released", self.document.vcenter.name);
        Ok(())
    }
}
