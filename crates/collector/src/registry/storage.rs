//! Datastore and registered extension checks.

use super::{refs, rules, CheckContext, CheckDefinition, CheckError, CheckResult, Verdict};
use vcevidence_schema::inventory::{Datastore, Extension};
use vcevidence_schema::Category;

pub fn datastore_checks() -> Vec<CheckDefinition<Datastore>> {
    vec![CheckDefinition::informational(
        "ds.free",
        "Free space",
        Category::Operational,
        refs::CAPACITY,
        free_space,
    )]
}

pub fn extension_checks() -> Vec<CheckDefinition<Extension>> {
    vec![CheckDefinition::informational(
        "ext.registered",
        "Registered extension",
        Category::ThirdParty,
        refs::THIRD_PARTY,
        registered,
    )]
}

fn free_space(ds: &Datastore, ctx: &CheckContext<'_>) -> CheckResult {
    if !ds.accessible {
        return Ok(vec![
            Verdict::info("Capacity unknown").with_notes("datastore is not accessible")
        ]);
    }
    if ds.free_bytes > ds.capacity_bytes {
        return Err(CheckError::Unexpected(format!(
            "free space {} exceeds capacity {}",
            ds.free_bytes, ds.capacity_bytes
        )));
    }
    let min_free_pct = ctx.settings.datastore_min_free_pct;
    let verdict = match rules::free_space(ds.capacity_bytes, ds.free_bytes, min_free_pct) {
        Some((pct, severity)) => {
            let value = format!(
                "Capacity={:.1}GB; Free={:.1}GB; Free%={:.1}",
                rules::gigabytes(ds.capacity_bytes),
                rules::gigabytes(ds.free_bytes),
                pct
            );
            Verdict::new(severity, value).with_notes(format!("threshold {}%", min_free_pct))
        }
        None => Verdict::info("Capacity unknown").with_notes("datastore reports zero capacity"),
    };
    Ok(vec![verdict])
}

fn registered(ext: &Extension, _ctx: &CheckContext<'_>) -> CheckResult {
    let label = if ext.label.is_empty() {
        ext.key.as_str()
    } else {
        ext.label.as_str()
    };
    let mut value = format!("{} {}", label, ext.version);
    if !ext.company.is_empty() {
        value.push_str(&format!(" ({})", ext.company));
    }
    Ok(vec![Verdict::info(value.trim().to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{context, provider};
    use crate::settings::AuditSettings;
    use vcevidence_schema::Severity;

    const GB: u64 = 1024 * 1024 * 1024;

    fn datastore(capacity: u64, free: u64) -> Datastore {
        Datastore {
            name: "ds01".into(),
            kind: "VMFS".into(),
            capacity_bytes: capacity,
            free_bytes: free,
            accessible: true,
        }
    }

    #[test]
    fn test_free_space_against_threshold() {
        let p = provider("vcenter: { name: vc01, version: '8.0.2' }");
        let settings = AuditSettings::default();
        let ctx = context(&p, &settings);

        let low = &free_space(&datastore(100 * GB, 10 * GB), &ctx).unwrap()[0];
        assert_eq!(low.severity, Severity::Warn);
        assert_eq!(low.value, "Capacity=100.0GB; Free=10.0GB; Free%=10.0");

        let fine = &free_space(&datastore(100 * GB, 20 * GB), &ctx).unwrap()[0];
        assert_eq!(fine.severity, Severity::Info);
        assert!(fine.value.ends_with("Free%=20.0"));
    }

    #[test]
    fn test_unknown_capacity_is_info_with_note() {
        let p = provider("vcenter: { name: vc01, version: '8.0.2' }");
        let settings = AuditSettings::default();
        let ctx = context(&p, &settings);

        let zero = &free_space(&datastore(0, 0), &ctx).unwrap()[0];
        assert_eq!(zero.severity, Severity::Info);
        assert!(!zero.notes.is_empty());

        let mut offline = datastore(100 * GB, 1);
        offline.accessible = false;
        let verdict = &free_space(&offline, &ctx).unwrap()[0];
        assert_eq!(verdict.severity, Severity::Info);
        assert_eq!(verdict.notes, "datastore is not accessible");
    }

    #[test]
    fn test_free_above_capacity_is_an_error() {
        let p = provider("vcenter: { name: vc01, version: '8.0.2' }");
        let settings = AuditSettings::default();
        let err = free_space(&datastore(10 * GB, 20 * GB), &context(&p, &settings)).unwrap_err();
        assert!(matches!(err, CheckError::Unexpected(_)));
    }

    #[test]
    fn test_registered_extension_value() {
        let p = provider("vcenter: { name: vc01, version: '8.0.2' }");
        let settings = AuditSettings::default();
        let ext = Extension {
            key: "com.vendor.backup".into(),
            label: "Backup Plugin".into(),
            version: "12.1".into(),
            company: "Vendor Inc.".into(),
        };
        let verdicts = registered(&ext, &context(&p, &settings)).unwrap();
        assert_eq!(verdicts[0].value, "Backup Plugin 12.1 (Vendor Inc.)");
    }
}
