//! Read-only inventory access.
//!
//! Every audit input comes through [`InventoryProvider`]. The trait has no
//! mutating operation; session lifecycle lives on [`SessionProvider`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use vcevidence_common::Timestamp;
use vcevidence_schema::inventory::{
    AcceptanceLevel, Cluster, CoreDumpTarget, Datastore, DistributedPortGroup, DistributedSwitch,
    Extension, FirewallState, Host, InventoryEvent, NtpConfig, ServiceState, SettingValue,
    StandardPortGroup, VcenterIdentity, VirtualMachine,
};

/// Service keys queried through [`InventoryProvider::host_service`].
pub const SERVICE_NTP: &str = "ntpd";
pub const SERVICE_SSH: &str = "TSM-SSH";
pub const SERVICE_SHELL: &str = "TSM";

/// Advanced setting keys queried through [`InventoryProvider::host_setting`].
pub const SETTING_LOG_DIR: &str = "Syslog.global.logDir";
pub const SETTING_LOG_HOST: &str = "Syslog.global.logHost";
pub const SETTING_SHELL_INTERACTIVE_TIMEOUT: &str = "UserVars.ESXiShellInteractiveTimeOut";
pub const SETTING_SHELL_TIMEOUT: &str = "UserVars.ESXiShellTimeOut";
pub const SETTING_SUPPRESS_SHELL_WARNING: &str = "UserVars.SuppressShellWarning";
pub const SETTING_DCUI_ACCESS: &str = "DCUI.Access";
pub const SETTING_SHARE_FORCE_SALTING: &str = "Mem.ShareForceSalting";
pub const SETTING_ESX_ADMINS_GROUP: &str = "Config.HostAgent.plugins.hostsvc.esxAdminsGroup";
pub const SETTING_ENABLE_MOB: &str = "Config.HostAgent.plugins.solo.enableMob";

/// Failure to read one piece of inventory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{resource} unreadable: {reason}")]
    Unreadable { resource: String, reason: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} was not captured")]
    NotCaptured(String),

    #[error("Session error: {0}")]
    Session(String),
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// Read-only view of one vCenter inventory.
pub trait InventoryProvider {
    fn identity(&self) -> ProbeResult<VcenterIdentity>;

    fn clusters(&self) -> ProbeResult<Vec<Cluster>>;

    fn hosts(&self) -> ProbeResult<Vec<Host>>;

    fn host_ntp(&self, host: &str) -> ProbeResult<NtpConfig>;

    /// State of a host service by key (`ntpd`, `TSM-SSH`, `TSM`).
    fn host_service(&self, host: &str, service: &str) -> ProbeResult<ServiceState>;

    fn host_firewall(&self, host: &str) -> ProbeResult<FirewallState>;

    fn host_acceptance_level(&self, host: &str) -> ProbeResult<AcceptanceLevel>;

    fn host_coredump(&self, host: &str) -> ProbeResult<CoreDumpTarget>;

    /// Advanced setting by key. `Ok(None)` means the host reports no value.
    fn host_setting(&self, host: &str, key: &str) -> ProbeResult<Option<SettingValue>>;

    fn standard_portgroups(&self) -> ProbeResult<Vec<StandardPortGroup>>;

    fn distributed_portgroups(&self) -> ProbeResult<Vec<DistributedPortGroup>>;

    fn distributed_switches(&self) -> ProbeResult<Vec<DistributedSwitch>>;

    fn virtual_machines(&self) -> ProbeResult<Vec<VirtualMachine>>;

    fn datastores(&self) -> ProbeResult<Vec<Datastore>>;

    fn extensions(&self) -> ProbeResult<Vec<Extension>>;

    /// Events created at or after `since`, at most `max_samples` of them.
    fn events(&self, since: Timestamp, max_samples: usize) -> ProbeResult<Vec<InventoryEvent>>;
}

/// Login material for a session.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// What to connect to.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// vCenter identity the run is for.
    pub target: String,
    /// Captured inventory document served instead of a live endpoint.
    pub inventory: Option<PathBuf>,
    pub credentials: Option<Credentials>,
}

impl ConnectOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            inventory: None,
            credentials: None,
        }
    }

    pub fn with_inventory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory = Some(path.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// A provider that is acquired and released as a session.
pub trait SessionProvider: InventoryProvider + Sized {
    /// Acquire the underlying connection.
    fn open(options: &ConnectOptions) -> ProbeResult<Self>;

    /// Confirm the session talks to the requested target.
    fn handshake(&self, options: &ConnectOptions) -> ProbeResult<()>;

    /// Release the connection. Called exactly once per opened session.
    fn release(&mut self) -> ProbeResult<()>;
}
