//! Evidence schema definitions for vcevidence.
//!
//! This crate defines the evidence record, the per-run ledger and its
//! summary, and the typed inventory objects the checks are evaluated on.

pub mod evidence;
pub mod inventory;
pub mod ledger;
pub mod schema;
pub mod summary;
pub mod validation;

pub use evidence::{Category, EvidenceRecord, Severity};
pub use inventory::{
    AcceptanceLevel, Audited, CdRomBacking, Cluster, ConnectionState, CoreDumpTarget, Datastore,
    DistributedPortGroup, DistributedSwitch, Extension, FirewallState, Host, InventoryEvent,
    NetflowConfig, NtpConfig, ObjectKind, PowerState, SecurityPolicy, ServiceState, SettingValue,
    StandardPortGroup, StartupPolicy, VcenterIdentity, VirtualDevice, VirtualMachine, VlanRange,
    VlanSpec, VmSnapshot,
};
pub use ledger::{sort_for_display, Ledger};
pub use summary::Summary;
pub use validation::{validate_export, validate_records};
