//! Virtual machine checks.

use super::{flag, refs, rules, CheckContext, CheckDefinition, CheckResult, Verdict};
use vcevidence_schema::inventory::{VirtualDevice, VirtualMachine};
use vcevidence_schema::{Category, Severity};

pub fn checks() -> Vec<CheckDefinition<VirtualMachine>> {
    vec![
        CheckDefinition::security(
            "vm.devices",
            "Attached devices",
            Category::Security,
            refs::ACCESS_HARDENING,
            devices,
        ),
        CheckDefinition::security(
            "vm.snapshots",
            "Snapshots older than N days",
            Category::Resilience,
            refs::CONTINUITY,
            snapshots,
        ),
    ]
}

fn device_verdict(device: &VirtualDevice) -> Verdict {
    match device {
        VirtualDevice::ParallelPort { label } => {
            Verdict::warn(label.as_str()).with_key("Parallel port attached")
        }
        VirtualDevice::SerialPort { label } => {
            Verdict::warn(label.as_str()).with_key("Serial port attached")
        }
        VirtualDevice::CdRom {
            label,
            backing,
            connected,
        } => Verdict::new(
            rules::cdrom_backing(backing),
            format!("{}: {}; Connected={}", label, backing, flag(*connected)),
        )
        .with_key("CD/DVD drive"),
    }
}

/// One verdict per exposed device, or a single Pass when none is attached.
fn devices(vm: &VirtualMachine, _ctx: &CheckContext<'_>) -> CheckResult {
    if vm.devices.is_empty() {
        return Ok(vec![Verdict::pass("None attached")]);
    }
    Ok(vm.devices.iter().map(device_verdict).collect())
}

/// Nothing is recorded for a VM without snapshots.
fn snapshots(vm: &VirtualMachine, ctx: &CheckContext<'_>) -> CheckResult {
    let Some(oldest) = vm.snapshots.iter().map(|s| s.created).min() else {
        return Ok(Vec::new());
    };
    let max_age = ctx.settings.snapshot_max_age_days;
    let cutoff = ctx.now.days_before(max_age);
    let stale = vm.snapshots.iter().filter(|s| s.created < cutoff).count();

    let severity = if stale == 0 {
        Severity::Pass
    } else {
        Severity::Warn
    };
    let value = format!(
        "Snapshots={}; Stale={}; Oldest={}",
        vm.snapshots.len(),
        stale,
        oldest.to_date()
    );
    Ok(vec![Verdict::new(severity, value)
        .with_key(format!("Snapshots older than {} days", max_age))])
}
