//! vCenter identity and cluster checks.

use super::{flag, refs, rules, CheckContext, CheckDefinition, CheckResult, Verdict};
use vcevidence_schema::inventory::{Cluster, VcenterIdentity};
use vcevidence_schema::{Category, Severity};

pub fn identity_checks() -> Vec<CheckDefinition<VcenterIdentity>> {
    vec![CheckDefinition::informational(
        "vc.identity",
        "vCenter version",
        Category::Inventory,
        refs::ASSET_INVENTORY,
        vcenter_version,
    )]
}

pub fn cluster_checks() -> Vec<CheckDefinition<Cluster>> {
    vec![
        CheckDefinition::security(
            "cluster.ha",
            "HA enabled",
            Category::Resilience,
            refs::CONTINUITY,
            ha_enabled,
        ),
        CheckDefinition::informational(
            "cluster.drs",
            "DRS enabled",
            Category::Resilience,
            refs::CONTINUITY,
            drs_enabled,
        ),
        CheckDefinition::security(
            "cluster.admission",
            "HA admission control",
            Category::Resilience,
            refs::CONTINUITY,
            admission_control,
        ),
        CheckDefinition::informational(
            "cluster.hosts",
            "Host count",
            Category::Inventory,
            refs::ASSET_INVENTORY,
            host_count,
        ),
    ]
}

fn vcenter_version(vc: &VcenterIdentity, _ctx: &CheckContext<'_>) -> CheckResult {
    let value = if vc.build.is_empty() {
        format!("Version={}", vc.version)
    } else {
        format!("Version={}; Build={}", vc.version, vc.build)
    };
    Ok(vec![Verdict::info(value)])
}

fn ha_enabled(cluster: &Cluster, _ctx: &CheckContext<'_>) -> CheckResult {
    Ok(vec![Verdict::new(
        rules::hardened(cluster.ha_enabled),
        flag(cluster.ha_enabled),
    )])
}

fn drs_enabled(cluster: &Cluster, _ctx: &CheckContext<'_>) -> CheckResult {
    let severity = if cluster.drs_enabled {
        Severity::Pass
    } else {
        Severity::Info
    };
    Ok(vec![Verdict::new(severity, flag(cluster.drs_enabled))])
}

fn admission_control(cluster: &Cluster, _ctx: &CheckContext<'_>) -> CheckResult {
    let mut verdict = Verdict::new(
        rules::hardened(cluster.admission_control_enabled),
        flag(cluster.admission_control_enabled),
    );
    if !cluster.ha_enabled {
        verdict = verdict.with_notes("HA is disabled on this cluster");
    }
    Ok(vec![verdict])
}

fn host_count(cluster: &Cluster, _ctx: &CheckContext<'_>) -> CheckResult {
    let mut verdict = Verdict::new(
        rules::host_count(cluster.host_count),
        cluster.host_count.to_string(),
    );
    if cluster.host_count < 2 {
        verdict = verdict.with_notes("no failover capacity");
    }
    Ok(vec![verdict])
}
