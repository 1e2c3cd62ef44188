//! The check catalog.
//!
//! Checks are static descriptors: an object kind (the type parameter), the
//! key, category and compliance reference stamped on their records, and a
//! plain `fn` rule mapping one object to zero or more verdicts. Severity
//! decisions live in [`rules`] as pure predicates.

pub mod host;
pub mod network;
pub mod platform;
pub mod rules;
pub mod storage;
pub mod vm;

use crate::provider::{InventoryProvider, ProbeError};
use crate::settings::AuditSettings;
use serde::Serialize;
use thiserror::Error;
use vcevidence_common::Timestamp;
use vcevidence_schema::inventory::{
    Audited, Cluster, Datastore, DistributedPortGroup, DistributedSwitch, Extension, Host,
    ObjectKind, StandardPortGroup, VcenterIdentity, VirtualMachine,
};
use vcevidence_schema::{Category, EvidenceRecord, Severity};

/// Compliance control references stamped on records.
pub mod refs {
    pub const ASSET_INVENTORY: &str = "8.4";
    pub const CAPACITY: &str = "9.2";
    pub const SOFTWARE_INTEGRITY: &str = "9.3.b";
    pub const NETWORK_SEGREGATION: &str = "9.4.b";
    pub const ACCESS_HARDENING: &str = "9.4.c";
    pub const CHANGE_MANAGEMENT: &str = "9.4.e";
    pub const ANOMALY_DETECTION: &str = "10.1";
    pub const CONTINUITY: &str = "11.1";
    pub const LOGGING: &str = "12.2";
    pub const THIRD_PARTY: &str = "28.3";
}

/// Value written on a record whose check could not be evaluated.
pub const UNAVAILABLE: &str = "Unavailable";

/// Why a check produced no verdict.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Unexpected value: {0}")]
    Unexpected(String),

    #[error("Check panicked: {0}")]
    Panicked(String),
}

pub type CheckResult = std::result::Result<Vec<Verdict>, CheckError>;

/// What a rule sees besides the object itself.
pub struct CheckContext<'a> {
    /// Per-host probes are queried lazily through the provider.
    pub provider: &'a dyn InventoryProvider,
    pub settings: &'a AuditSettings,
    /// Reference instant for age computations.
    pub now: Timestamp,
}

/// One rule outcome. Key and scope default to the check's key and the
/// object's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub severity: Severity,
    pub value: String,
    pub notes: String,
    pub key: Option<String>,
}

impl Verdict {
    pub fn new(severity: Severity, value: impl Into<String>) -> Self {
        Self {
            severity,
            value: value.into(),
            notes: String::new(),
            key: None,
        }
    }

    pub fn pass(value: impl Into<String>) -> Self {
        Self::new(Severity::Pass, value)
    }

    pub fn info(value: impl Into<String>) -> Self {
        Self::new(Severity::Info, value)
    }

    pub fn warn(value: impl Into<String>) -> Self {
        Self::new(Severity::Warn, value)
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

pub type Evaluate<T> = fn(&T, &CheckContext<'_>) -> CheckResult;

/// A declarative check on objects of kind `T`.
pub struct CheckDefinition<T> {
    pub id: &'static str,
    pub key: &'static str,
    pub category: Category,
    pub reference: &'static str,
    /// Severity of the record written when the rule fails.
    pub failure_severity: Severity,
    pub evaluate: Evaluate<T>,
}

impl<T: Audited> CheckDefinition<T> {
    /// Check whose failure must be reviewed (Warn).
    pub fn security(
        id: &'static str,
        key: &'static str,
        category: Category,
        reference: &'static str,
        evaluate: Evaluate<T>,
    ) -> Self {
        Self {
            id,
            key,
            category,
            reference,
            failure_severity: Severity::Warn,
            evaluate,
        }
    }

    /// Check whose failure is only observational (Info).
    pub fn informational(
        id: &'static str,
        key: &'static str,
        category: Category,
        reference: &'static str,
        evaluate: Evaluate<T>,
    ) -> Self {
        Self {
            id,
            key,
            category,
            reference,
            failure_severity: Severity::Info,
            evaluate,
        }
    }

    pub fn applies_to(&self) -> ObjectKind {
        T::KIND
    }

    /// Stamp a verdict into a record for `scope`.
    pub fn record(&self, scope: &str, verdict: Verdict) -> EvidenceRecord {
        let key = verdict.key.unwrap_or_else(|| self.key.to_string());
        EvidenceRecord::new(self.category, scope, key, verdict.value, verdict.severity)
            .with_reference(self.reference)
            .with_notes(verdict.notes)
    }

    /// The single record written when the rule fails.
    pub fn failure_record(&self, scope: &str, error: &CheckError) -> EvidenceRecord {
        EvidenceRecord::new(
            self.category,
            scope,
            self.key,
            UNAVAILABLE,
            self.failure_severity,
        )
        .with_reference(self.reference)
        .with_notes(error.to_string())
    }

    fn entry(&self) -> CatalogEntry {
        CatalogEntry {
            id: self.id,
            applies_to: T::KIND,
            category: self.category,
            reference: self.reference,
            key: self.key,
        }
    }
}

/// Printable description of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub applies_to: ObjectKind,
    pub category: Category,
    pub reference: &'static str,
    pub key: &'static str,
}

/// Every check, grouped by object kind.
pub struct Registry {
    pub identity: Vec<CheckDefinition<VcenterIdentity>>,
    pub clusters: Vec<CheckDefinition<Cluster>>,
    pub hosts: Vec<CheckDefinition<Host>>,
    pub standard_portgroups: Vec<CheckDefinition<StandardPortGroup>>,
    pub distributed_portgroups: Vec<CheckDefinition<DistributedPortGroup>>,
    pub distributed_switches: Vec<CheckDefinition<DistributedSwitch>>,
    pub virtual_machines: Vec<CheckDefinition<VirtualMachine>>,
    pub datastores: Vec<CheckDefinition<Datastore>>,
    pub extensions: Vec<CheckDefinition<Extension>>,
}

impl Registry {
    /// The built-in catalog.
    pub fn standard() -> Self {
        Self {
            identity: platform::identity_checks(),
            clusters: platform::cluster_checks(),
            hosts: host::checks(),
            standard_portgroups: network::standard_portgroup_checks(),
            distributed_portgroups: network::distributed_portgroup_checks(),
            distributed_switches: network::distributed_switch_checks(),
            virtual_machines: vm::checks(),
            datastores: storage::datastore_checks(),
            extensions: storage::extension_checks(),
        }
    }

    /// Descriptions of every check in traversal order, followed by the
    /// event-window records.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();
        entries.extend(self.identity.iter().map(CheckDefinition::entry));
        entries.extend(self.clusters.iter().map(CheckDefinition::entry));
        entries.extend(self.hosts.iter().map(CheckDefinition::entry));
        entries.extend(self.standard_portgroups.iter().map(CheckDefinition::entry));
        entries.extend(self.distributed_portgroups.iter().map(CheckDefinition::entry));
        entries.extend(self.distributed_switches.iter().map(CheckDefinition::entry));
        entries.extend(self.virtual_machines.iter().map(CheckDefinition::entry));
        entries.extend(self.datastores.iter().map(CheckDefinition::entry));
        entries.extend(self.extensions.iter().map(CheckDefinition::entry));
        entries.extend(crate::events::catalog());
        entries
    }

    pub fn len(&self) -> usize {
        self.identity.len()
            + self.clusters.len()
            + self.hosts.len()
            + self.standard_portgroups.len()
            + self.distributed_portgroups.len()
            + self.distributed_switches.len()
            + self.virtual_machines.len()
            + self.datastores.len()
            + self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

/// "True"/"False", the rendering used in record values.
pub(crate) fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
