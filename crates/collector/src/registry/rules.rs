//! Severity predicates.
//!
//! Convention: a safe state is Pass, an unsafe one Warn, a value that needs
//! policy context to judge is Info, and an unset value is Info unless the
//! control requires it to be present.

use vcevidence_schema::inventory::{
    AcceptanceLevel, CdRomBacking, CoreDumpTarget, ServiceState, StartupPolicy, VlanSpec,
};
use vcevidence_schema::Severity;

/// VLAN id that trunks every VLAN into the guest (virtual guest tagging).
pub const VGT_VLAN: u16 = 4095;

/// Default group granted full host administration when joined to AD.
pub const DEFAULT_ADMINS_GROUP: &str = "ESX Admins";

/// Salting value that restricts page sharing to within one VM.
pub const INTRA_VM_SALTING: i64 = 2;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Pass when the observed state is the hardened one.
pub fn hardened(safe: bool) -> Severity {
    if safe {
        Severity::Pass
    } else {
        Severity::Warn
    }
}

/// Tri-state flag: Pass at the safe value, Warn at the other, Info when
/// not reported.
pub fn tri_state(observed: Option<bool>, safe: bool) -> Severity {
    match observed {
        Some(value) => hardened(value == safe),
        None => Severity::Info,
    }
}

/// A value that must be set (Warn when missing) or is merely observed
/// (Info when missing).
pub fn presence(value: Option<&str>, required: bool) -> Severity {
    match value {
        Some(v) if !v.trim().is_empty() => Severity::Pass,
        _ if required => Severity::Warn,
        _ => Severity::Info,
    }
}

pub fn ntp(servers: &[String], running: bool) -> Severity {
    hardened(!servers.is_empty() && running)
}

/// SSH and the ESXi Shell should be stopped and not start with the host.
pub fn remote_access_service(state: &ServiceState) -> Severity {
    hardened(!state.running && state.policy != StartupPolicy::On)
}

/// Logs under scratch or tmp do not survive a reboot.
pub fn log_dir(value: Option<&str>) -> Severity {
    match value {
        Some(dir) if !dir.trim().is_empty() => {
            let dir = dir.to_ascii_lowercase();
            hardened(!(dir.contains("/scratch") || dir.contains("/tmp")))
        }
        _ => Severity::Info,
    }
}

/// Both shell timeouts must be positive; zero disables the timeout.
pub fn shell_timeouts(interactive: Option<i64>, shell: Option<i64>) -> Severity {
    match (interactive, shell) {
        (Some(a), _) if a <= 0 => Severity::Warn,
        (_, Some(b)) if b <= 0 => Severity::Warn,
        (Some(_), Some(_)) => Severity::Pass,
        _ => Severity::Info,
    }
}

pub fn acceptance_level(level: AcceptanceLevel) -> Severity {
    hardened(level != AcceptanceLevel::CommunitySupported)
}

pub fn coredump(target: &CoreDumpTarget) -> Severity {
    hardened(*target != CoreDumpTarget::Unconfigured)
}

pub fn salting(value: Option<i64>) -> Severity {
    match value {
        Some(v) => hardened(v == INTRA_VM_SALTING),
        None => Severity::Info,
    }
}

pub fn admins_group(value: Option<&str>) -> Severity {
    match value {
        Some(group) if !group.trim().is_empty() => {
            hardened(!group.trim().eq_ignore_ascii_case(DEFAULT_ADMINS_GROUP))
        }
        _ => Severity::Info,
    }
}

pub fn vlan_exposure(vlan: &VlanSpec) -> Severity {
    hardened(!vlan.covers(VGT_VLAN))
}

/// Free-space percentage and its severity. `None` when capacity is unknown.
pub fn free_space(
    capacity_bytes: u64,
    free_bytes: u64,
    min_free_pct: f64,
) -> Option<(f64, Severity)> {
    if capacity_bytes == 0 {
        return None;
    }
    let pct = free_bytes as f64 * 100.0 / capacity_bytes as f64;
    let severity = if pct < min_free_pct {
        Severity::Warn
    } else {
        Severity::Info
    };
    Some((pct, severity))
}

pub fn gigabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

/// Host-backed optical drives expose the host device to the guest.
pub fn cdrom_backing(backing: &CdRomBacking) -> Severity {
    match backing {
        CdRomBacking::RemotePassthrough | CdRomBacking::Atapi { .. } => Severity::Warn,
        CdRomBacking::IsoFile { .. } | CdRomBacking::Sata => Severity::Info,
    }
}

/// Clusters with fewer than two hosts have no failover capacity.
pub fn host_count(count: u32) -> Severity {
    if count < 2 {
        Severity::Warn
    } else {
        Severity::Info
    }
}
