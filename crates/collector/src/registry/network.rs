//! Port group and distributed switch checks.

use super::{refs, rules, CheckContext, CheckDefinition, CheckResult, Verdict};
use vcevidence_schema::inventory::{
    DistributedPortGroup, DistributedSwitch, SecurityPolicy, StandardPortGroup, VlanSpec,
};
use vcevidence_schema::{Category, Severity};

pub fn standard_portgroup_checks() -> Vec<CheckDefinition<StandardPortGroup>> {
    vec![
        CheckDefinition::security(
            "vss.vlan",
            "VLAN 4095 (VGT)",
            Category::Security,
            refs::NETWORK_SEGREGATION,
            standard_vlan,
        ),
        CheckDefinition::security(
            "vss.security",
            "Security policy",
            Category::Security,
            refs::NETWORK_SEGREGATION,
            standard_security,
        ),
    ]
}

pub fn distributed_portgroup_checks() -> Vec<CheckDefinition<DistributedPortGroup>> {
    vec![
        CheckDefinition::security(
            "vds.vlan",
            "VLAN 4095 (VGT)",
            Category::Security,
            refs::NETWORK_SEGREGATION,
            distributed_vlan,
        ),
        CheckDefinition::security(
            "vds.security",
            "Security policy",
            Category::Security,
            refs::NETWORK_SEGREGATION,
            distributed_security,
        ),
    ]
}

pub fn distributed_switch_checks() -> Vec<CheckDefinition<DistributedSwitch>> {
    vec![CheckDefinition::informational(
        "vds.netflow",
        "NetFlow/IPFIX collector",
        Category::Logging,
        refs::LOGGING,
        netflow,
    )]
}

fn vlan_verdict(vlan: &VlanSpec, value: String) -> Verdict {
    let severity = rules::vlan_exposure(vlan);
    let verdict = Verdict::new(severity, value);
    if severity != Severity::Warn {
        return verdict;
    }
    match vlan {
        VlanSpec::Access { .. } => {
            verdict.with_notes("VLAN 4095 passes every VLAN tag to the guest")
        }
        VlanSpec::Trunk { .. } => verdict.with_notes("trunk range includes VLAN 4095"),
    }
}

fn standard_vlan(pg: &StandardPortGroup, _ctx: &CheckContext<'_>) -> CheckResult {
    let vlan = VlanSpec::Access { vlan_id: pg.vlan_id };
    Ok(vec![vlan_verdict(&vlan, format!("VLAN={}", pg.vlan_id))])
}

fn distributed_vlan(pg: &DistributedPortGroup, _ctx: &CheckContext<'_>) -> CheckResult {
    Ok(vec![vlan_verdict(&pg.vlan, pg.vlan.to_string())])
}

/// One verdict per policy flag. Every flag is safe when rejected.
fn security_policy(policy: &SecurityPolicy) -> Vec<Verdict> {
    [
        ("Promiscuous mode", policy.allow_promiscuous),
        ("MAC address changes", policy.mac_changes),
        ("Forged transmits", policy.forged_transmits),
    ]
    .into_iter()
    .map(|(key, observed)| {
        let verdict = match observed {
            Some(true) => Verdict::new(rules::tri_state(observed, false), "Allowed"),
            Some(false) => Verdict::new(rules::tri_state(observed, false), "Rejected"),
            None => Verdict::new(rules::tri_state(observed, false), "Inherited")
                .with_notes("not reported on the port group"),
        };
        verdict.with_key(key)
    })
    .collect()
}

fn standard_security(pg: &StandardPortGroup, _ctx: &CheckContext<'_>) -> CheckResult {
    Ok(security_policy(&pg.security))
}

fn distributed_security(pg: &DistributedPortGroup, _ctx: &CheckContext<'_>) -> CheckResult {
    Ok(security_policy(&pg.security))
}

fn netflow(switch: &DistributedSwitch, _ctx: &CheckContext<'_>) -> CheckResult {
    let verdict = match &switch.netflow {
        Some(cfg) if !cfg.collector_ip.trim().is_empty() => Verdict::info(format!(
            "Collector={}:{}; ActiveTimeout={}s",
            cfg.collector_ip, cfg.collector_port, cfg.active_flow_timeout_secs
        )),
        _ => Verdict::info("Not configured").with_notes("no flow collector on this switch"),
    };
    Ok(vec![verdict])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{context, provider};
    use crate::settings::AuditSettings;
    use vcevidence_schema::inventory::{NetflowConfig, VlanRange};

    fn dvpg(vlan: VlanSpec) -> DistributedPortGroup {
        DistributedPortGroup {
            switch: "dvs-prod".into(),
            name: "pg-trunk".into(),
            vlan,
            security: SecurityPolicy {
                allow_promiscuous: Some(true),
                mac_changes: Some(false),
                forged_transmits: None,
            },
        }
    }

    #[test]
    fn test_trunk_covering_4095_warns_once() {
        let p = provider("vcenter: { name: vc01, version: '8.0.2' }");
        let settings = AuditSettings::default();
        let ctx = context(&p, &settings);
        let pg = dvpg(VlanSpec::Trunk {
            ranges: vec![VlanRange { start: 4000, end: 4095 }],
        });

        let verdicts = distributed_vlan(&pg, &ctx).unwrap();
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].severity, Severity::Warn);
        assert_eq!(verdicts[0].value, "Trunk(4000-4095)");
        assert!(verdicts[0].notes.contains("4095"));

        let access = distributed_vlan(&dvpg(VlanSpec::Access { vlan_id: 4095 }), &ctx).unwrap();
        assert_eq!(access[0].severity, Severity::Warn);
        let tagged = distributed_vlan(&dvpg(VlanSpec::Access { vlan_id: 20 }), &ctx).unwrap();
        assert_eq!(tagged[0].severity, Severity::Pass);
        assert!(tagged[0].notes.is_empty());
    }

    #[test]
    fn test_security_policy_is_tri_state() {
        let p = provider("vcenter: { name: vc01, version: '8.0.2' }");
        let settings = AuditSettings::default();
        let verdicts =
            distributed_security(&dvpg(VlanSpec::Access { vlan_id: 20 }), &context(&p, &settings))
                .unwrap();

        let summary: Vec<(Option<String>, Severity, String)> = verdicts
            .into_iter()
            .map(|v| (v.key, v.severity, v.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some("Promiscuous mode".into()), Severity::Warn, "Allowed".into()),
                (Some("MAC address changes".into()), Severity::Pass, "Rejected".into()),
                (Some("Forged transmits".into()), Severity::Info, "Inherited".into()),
            ]
        );
    }

    #[test]
    fn test_netflow() {
        let p = provider("vcenter: { name: vc01, version: '8.0.2' }");
        let settings = AuditSettings::default();
        let ctx = context(&p, &settings);
        let mut switch = DistributedSwitch {
            name: "dvs-prod".into(),
            version: "8.0.0".into(),
            netflow: None,
        };
        assert_eq!(netflow(&switch, &ctx).unwrap()[0].value, "Not configured");

        switch.netflow = Some(NetflowConfig {
            collector_ip: "10.0.0.5".into(),
            collector_port: 2055,
            active_flow_timeout_secs: 60,
        });
        let verdict = &netflow(&switch, &ctx).unwrap()[0];
        assert_eq!(verdict.value, "Collector=10.0.0.5:2055; ActiveTimeout=60s");
        assert_eq!(verdict.severity, Severity::Info);
    }
}
