//! Typed inventory objects read from the control plane.
//!
//! Variant types (VLAN spec, virtual devices, core dump target, ...) are
//! decided once at the provider boundary so checks match on a closed set.

use serde::{Deserialize, Serialize};
use std::fmt;
use vcevidence_common::Timestamp;

/// Kind of audited object a check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Identity,
    Cluster,
    Host,
    StandardPortGroup,
    DistributedPortGroup,
    DistributedSwitch,
    VirtualMachine,
    Datastore,
    Extension,
    EventWindow,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Identity => "identity",
            ObjectKind::Cluster => "cluster",
            ObjectKind::Host => "host",
            ObjectKind::StandardPortGroup => "standard_portgroup",
            ObjectKind::DistributedPortGroup => "distributed_portgroup",
            ObjectKind::DistributedSwitch => "distributed_switch",
            ObjectKind::VirtualMachine => "virtual_machine",
            ObjectKind::Datastore => "datastore",
            ObjectKind::Extension => "extension",
            ObjectKind::EventWindow => "event_window",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inventory object checks can be evaluated on.
pub trait Audited {
    const KIND: ObjectKind;

    /// Scope written on every record produced for this object.
    fn scope(&self) -> String;
}

/// vCenter identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcenterIdentity {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub build: String,
}

impl Audited for VcenterIdentity {
    const KIND: ObjectKind = ObjectKind::Identity;

    fn scope(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub ha_enabled: bool,
    #[serde(default)]
    pub drs_enabled: bool,
    #[serde(default)]
    pub admission_control_enabled: bool,
    #[serde(default)]
    pub host_count: u32,
}

impl Audited for Cluster {
    const KIND: ObjectKind = ObjectKind::Cluster;

    fn scope(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    NotResponding,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::NotResponding => "NotResponding",
        })
    }
}

/// ESXi host attributes. Per-host configuration is queried through the
/// provider's host probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    #[serde(default)]
    pub cluster: Option<String>,
    pub version: String,
    #[serde(default)]
    pub build: String,
    pub connection_state: ConnectionState,
    #[serde(default)]
    pub in_maintenance: bool,
}

impl Audited for Host {
    const KIND: ObjectKind = ObjectKind::Host;

    fn scope(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtpConfig {
    #[serde(default)]
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPolicy {
    On,
    Off,
    Automatic,
}

impl fmt::Display for StartupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StartupPolicy::On => "on",
            StartupPolicy::Off => "off",
            StartupPolicy::Automatic => "automatic",
        })
    }
}

/// State of a host service (`ntpd`, `TSM-SSH`, `TSM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub running: bool,
    pub policy: StartupPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallState {
    pub enabled: bool,
    pub default_incoming_blocked: bool,
    pub default_outgoing_blocked: bool,
}

/// Lowest VIB acceptance level the host will install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptanceLevel {
    #[serde(rename = "VMwareCertified")]
    VmwareCertified,
    #[serde(rename = "VMwareAccepted")]
    VmwareAccepted,
    PartnerSupported,
    CommunitySupported,
}

impl fmt::Display for AcceptanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AcceptanceLevel::VmwareCertified => "VMwareCertified",
            AcceptanceLevel::VmwareAccepted => "VMwareAccepted",
            AcceptanceLevel::PartnerSupported => "PartnerSupported",
            AcceptanceLevel::CommunitySupported => "CommunitySupported",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoreDumpTarget {
    Network { address: String },
    File { path: String },
    Partition { name: String },
    Unconfigured,
}

impl fmt::Display for CoreDumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreDumpTarget::Network { address } => write!(f, "Network={}", address),
            CoreDumpTarget::File { path } => write!(f, "File={}", path),
            CoreDumpTarget::Partition { name } => write!(f, "Partition={}", name),
            CoreDumpTarget::Unconfigured => f.write_str("Unconfigured"),
        }
    }
}

/// Advanced setting value as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SettingValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(v) => Some(*v),
            SettingValue::Text(s) => s.trim().parse().ok(),
            SettingValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            SettingValue::Int(v) => Some(*v != 0),
            SettingValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
        }
    }

    /// Text form; blank text counts as unset.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SettingValue::Text(s) if s.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(v) => write!(f, "{}", v),
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

/// Port group security policy. `None` means inherited / not reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    #[serde(default)]
    pub allow_promiscuous: Option<bool>,
    #[serde(default)]
    pub mac_changes: Option<bool>,
    #[serde(default)]
    pub forged_transmits: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardPortGroup {
    pub host: String,
    pub vswitch: String,
    pub name: String,
    #[serde(default)]
    pub vlan_id: u16,
    #[serde(default)]
    pub security: SecurityPolicy,
}

impl Audited for StandardPortGroup {
    const KIND: ObjectKind = ObjectKind::StandardPortGroup;

    fn scope(&self) -> String {
        format!("{}/{}/{}", self.host, self.vswitch, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanRange {
    pub start: u16,
    pub end: u16,
}

impl VlanRange {
    pub fn contains(&self, vlan_id: u16) -> bool {
        self.start <= vlan_id && vlan_id <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VlanSpec {
    Access { vlan_id: u16 },
    Trunk { ranges: Vec<VlanRange> },
}

impl VlanSpec {
    pub fn covers(&self, vlan_id: u16) -> bool {
        match self {
            VlanSpec::Access { vlan_id: id } => *id == vlan_id,
            VlanSpec::Trunk { ranges } => ranges.iter().any(|r| r.contains(vlan_id)),
        }
    }
}

impl fmt::Display for VlanSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VlanSpec::Access { vlan_id } => write!(f, "Access({})", vlan_id),
            VlanSpec::Trunk { ranges } => {
                let ranges: Vec<String> = ranges
                    .iter()
                    .map(|r| format!("{}-{}", r.start, r.end))
                    .collect();
                write!(f, "Trunk({})", ranges.join(","))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedPortGroup {
    pub switch: String,
    pub name: String,
    pub vlan: VlanSpec,
    #[serde(default)]
    pub security: SecurityPolicy,
}

impl Audited for DistributedPortGroup {
    const KIND: ObjectKind = ObjectKind::DistributedPortGroup;

    fn scope(&self) -> String {
        format!("{}/{}", self.switch, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetflowConfig {
    pub collector_ip: String,
    #[serde(default)]
    pub collector_port: u16,
    #[serde(default)]
    pub active_flow_timeout_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedSwitch {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub netflow: Option<NetflowConfig>,
}

impl Audited for DistributedSwitch {
    const KIND: ObjectKind = ObjectKind::DistributedSwitch;

    fn scope(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CdRomBacking {
    IsoFile { path: String },
    RemotePassthrough,
    Atapi { device: String },
    Sata,
}

impl fmt::Display for CdRomBacking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CdRomBacking::IsoFile { path } => write!(f, "ISO {}", path),
            CdRomBacking::RemotePassthrough => f.write_str("Remote passthrough"),
            CdRomBacking::Atapi { device } => write!(f, "ATAPI {}", device),
            CdRomBacking::Sata => f.write_str("SATA"),
        }
    }
}

/// Virtual devices relevant to device-exposure checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VirtualDevice {
    ParallelPort {
        label: String,
    },
    SerialPort {
        label: String,
    },
    CdRom {
        label: String,
        backing: CdRomBacking,
        #[serde(default)]
        connected: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSnapshot {
    pub name: String,
    pub created: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub name: String,
    pub power_state: PowerState,
    #[serde(default)]
    pub devices: Vec<VirtualDevice>,
    #[serde(default)]
    pub snapshots: Vec<VmSnapshot>,
}

impl Audited for VirtualMachine {
    const KIND: ObjectKind = ObjectKind::VirtualMachine;

    fn scope(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastore {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    pub capacity_bytes: u64,
    pub free_bytes: u64,
    #[serde(default = "default_true")]
    pub accessible: bool,
}

impl Audited for Datastore {
    const KIND: ObjectKind = ObjectKind::Datastore;

    fn scope(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub company: String,
}

impl Audited for Extension {
    const KIND: ObjectKind = ObjectKind::Extension;

    fn scope(&self) -> String {
        self.key.clone()
    }
}

/// A control-plane event inside the evidence window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub key: i64,
    pub event_type: String,
    pub created: Timestamp,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub message: String,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlan_spec_coverage() {
        let trunk = VlanSpec::Trunk {
            ranges: vec![
                VlanRange { start: 100, end: 200 },
                VlanRange { start: 4000, end: 4095 },
            ],
        };
        assert!(trunk.covers(4095));
        assert!(trunk.covers(150));
        assert!(!trunk.covers(300));
        assert_eq!(trunk.to_string(), "Trunk(100-200,4000-4095)");
        assert!(VlanSpec::Access { vlan_id: 4095 }.covers(4095));
    }

    #[test]
    fn test_tagged_variants_deserialize() {
        let yaml = r#"
- type: serial_port
  label: Serial port 1
- type: cd_rom
  label: CD/DVD drive 1
  backing: { kind: iso_file, path: "[ds01] iso/tools.iso" }
"#;
        let devices: Vec<VirtualDevice> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(devices.len(), 2);
        assert!(matches!(
            &devices[1],
            VirtualDevice::CdRom { backing: CdRomBacking::IsoFile { .. }, connected: false, .. }
        ));
    }

    #[test]
    fn test_setting_value_coercions() {
        let salting: SettingValue = serde_json::from_str("2").unwrap();
        assert_eq!(salting.as_int(), Some(2));
        let mob: SettingValue = serde_json::from_str("false").unwrap();
        assert_eq!(mob.as_bool(), Some(false));
        let blank = SettingValue::Text("  ".to_string());
        assert_eq!(blank.as_text(), None);
        assert_eq!(SettingValue::Text("1".into()).as_bool(), Some(true));
    }

    #[test]
    fn test_scopes() {
        let pg = DistributedPortGroup {
            switch: "dvs-prod".into(),
            name: "pg-web".into(),
            vlan: VlanSpec::Access { vlan_id: 10 },
            security: SecurityPolicy::default(),
        };
        assert_eq!(pg.scope(), "dvs-prod/pg-web");
        assert_eq!(<DistributedPortGroup as Audited>::KIND, ObjectKind::DistributedPortGroup);
    }
}
