//! Evaluation engine.
//!
//! Walks the snapshot in a fixed group order and runs every applicable
//! check on every object. Each check invocation is its own failure
//! boundary: an error or panic becomes one "Unavailable" record and the
//! traversal continues.

use crate::events;
use crate::provider::{InventoryProvider, ProbeError};
use crate::registry::{CheckContext, CheckDefinition, CheckError, Registry, UNAVAILABLE};
use crate::settings::AuditSettings;
use crate::snapshot::InventorySnapshot;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vcevidence_schema::inventory::Audited;
use vcevidence_schema::{Category, EvidenceRecord, Ledger, Severity};

/// Shared run cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Traversal stopped by [`Cancellation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cancelled;

/// The ledger of one run and whether traversal reached the end.
#[derive(Debug)]
pub struct RunOutcome {
    pub ledger: Ledger,
    pub completed: bool,
}

pub const KEY_EVIDENCE_WINDOW: &str = "Evidence window";
pub const KEY_INVENTORY_LISTING: &str = "Inventory listing";

pub struct Engine<'a> {
    registry: &'a Registry,
    settings: &'a AuditSettings,
}

impl<'a> Engine<'a> {
    pub fn new(registry: &'a Registry, settings: &'a AuditSettings) -> Self {
        Self { registry, settings }
    }

    /// Evaluate the registry against a snapshot.
    pub fn evaluate(
        &self,
        provider: &dyn InventoryProvider,
        snapshot: &InventorySnapshot,
        cancel: &Cancellation,
    ) -> RunOutcome {
        let ctx = CheckContext {
            provider,
            settings: self.settings,
            now: snapshot.captured_at,
        };
        let mut ledger = Ledger::new();
        ledger.append(self.window_record(snapshot));

        let completed = match self.traverse(&ctx, snapshot, cancel, &mut ledger) {
            Ok(()) => true,
            Err(Cancelled) => {
                warn!("Audit cancelled after {} records", ledger.len());
                false
            }
        };
        info!("Evaluation produced {} records", ledger.len());

        RunOutcome { ledger, completed }
    }

    fn window_record(&self, snapshot: &InventorySnapshot) -> EvidenceRecord {
        let value = format!(
            "Since={}; {}",
            snapshot.window.since.to_display(),
            self.settings.describe()
        );
        EvidenceRecord::new(
            Category::Control,
            &snapshot.target,
            KEY_EVIDENCE_WINDOW,
            value,
            Severity::Info,
        )
    }

    fn traverse(
        &self,
        ctx: &CheckContext<'_>,
        snapshot: &InventorySnapshot,
        cancel: &Cancellation,
        ledger: &mut Ledger,
    ) -> Result<(), Cancelled> {
        let r = self.registry;
        let identity = snapshot.identity.as_ref().map(std::slice::from_ref);

        self.evaluate_group("vcenter", &r.identity, identity, ctx, cancel, ledger)?;
        self.evaluate_group(
            "clusters",
            &r.clusters,
            snapshot.clusters.as_deref(),
            ctx,
            cancel,
            ledger,
        )?;
        self.evaluate_group("hosts", &r.hosts, snapshot.hosts.as_deref(), ctx, cancel, ledger)?;
        self.evaluate_group(
            "standard port groups",
            &r.standard_portgroups,
            snapshot.standard_portgroups.as_deref(),
            ctx,
            cancel,
            ledger,
        )?;
        self.evaluate_group(
            "distributed port groups",
            &r.distributed_portgroups,
            snapshot.distributed_portgroups.as_deref(),
            ctx,
            cancel,
            ledger,
        )?;
        self.evaluate_group(
            "distributed switches",
            &r.distributed_switches,
            snapshot.distributed_switches.as_deref(),
            ctx,
            cancel,
            ledger,
        )?;
        self.evaluate_group(
            "virtual machines",
            &r.virtual_machines,
            snapshot.virtual_machines.as_deref(),
            ctx,
            cancel,
            ledger,
        )?;
        self.evaluate_group(
            "datastores",
            &r.datastores,
            snapshot.datastores.as_deref(),
            ctx,
            cancel,
            ledger,
        )?;
        self.evaluate_group(
            "extensions",
            &r.extensions,
            snapshot.extensions.as_deref(),
            ctx,
            cancel,
            ledger,
        )?;

        cancel.checkpoint()?;
        self.evaluate_events(snapshot, ledger);
        Ok(())
    }

    fn evaluate_group<T: Audited>(
        &self,
        group: &str,
        checks: &[CheckDefinition<T>],
        objects: Result<&[T], &ProbeError>,
        ctx: &CheckContext<'_>,
        cancel: &Cancellation,
        ledger: &mut Ledger,
    ) -> Result<(), Cancelled> {
        let objects = match objects {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Skipping {}: {}", group, e);
                ledger.append(listing_failure(group, e));
                return Ok(());
            }
        };
        info!("Evaluating {} {}", objects.len(), group);

        for object in objects {
            cancel.checkpoint()?;
            let scope = object.scope();
            for check in checks {
                ledger.extend(run_check(check, object, &scope, ctx));
            }
        }
        Ok(())
    }

    fn evaluate_events(&self, snapshot: &InventorySnapshot, ledger: &mut Ledger) {
        let window = &snapshot.window;
        match &snapshot.events {
            Ok(sample) => {
                info!("Classifying {} events", sample.len());
                match isolate(|| Ok(events::evidence(sample, window))) {
                    Ok(records) => ledger.extend(records),
                    Err(e) => {
                        warn!("Event classification failed: {}", e);
                        ledger.append(events::unavailable(window, &e.to_string()));
                    }
                }
            }
            Err(e) => ledger.append(events::unavailable(window, &e.to_string())),
        }
    }
}

/// Run one check on one object behind its failure boundary.
fn run_check<T: Audited>(
    check: &CheckDefinition<T>,
    object: &T,
    scope: &str,
    ctx: &CheckContext<'_>,
) -> Vec<EvidenceRecord> {
    debug!("{} on {}", check.id, scope);
    match isolate(|| (check.evaluate)(object, ctx)) {
        Ok(verdicts) => verdicts
            .into_iter()
            .map(|verdict| check.record(scope, verdict))
            .collect(),
        Err(e) => {
            let contained = vcevidence_common::Error::CheckEvaluation {
                check: check.id.to_string(),
                scope: scope.to_string(),
                reason: e.to_string(),
            };
            warn!("{}", contained);
            vec![check.failure_record(scope, &e)]
        }
    }
}

/// Convert a panic inside `f` into a [`CheckError`].
fn isolate<R>(f: impl FnOnce() -> Result<R, CheckError>) -> Result<R, CheckError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CheckError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn listing_failure(group: &str, error: &ProbeError) -> EvidenceRecord {
    EvidenceRecord::new(
        Category::Inventory,
        group,
        KEY_INVENTORY_LISTING,
        UNAVAILABLE,
        Severity::Warn,
    )
    .with_notes(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureProvider, InventoryDocument};
    use crate::registry::{CheckResult, Verdict};
    use crate::snapshot::EventWindow;
    use pretty_assertions::assert_eq;
    use vcevidence_common::Timestamp;
    use vcevidence_schema::inventory::Host;

    const LAB: &str = r#"
vcenter: { name: vc01.lab.local, version: "8.0.2" }
hosts:
  - name: esx01
    version: "8.0.2"
    connection_state: connected
    ntp: { servers: [ntp1.local] }
    services:
      ntpd: { running: true, policy: "on" }
  - name: esx02
    version: "8.0.2"
    connection_state: not_responding
    unreachable: "host not responding"
  - name: esx03
    version: "8.0.2"
    connection_state: connected
    ntp: { servers: [ntp1.local] }
    services:
      ntpd: { running: true, policy: "on" }
datastores:
  - { name: ds01, capacity_bytes: 107374182400, free_bytes: 10737418240 }
failures:
  extensions: "extension manager unavailable"
"#;

    fn run(registry: &Registry, cancel: &Cancellation) -> RunOutcome {
        let provider = FixtureProvider::new(InventoryDocument::from_yaml(LAB).unwrap());
        let settings = AuditSettings::default();
        let window = EventWindow::ending_at(Timestamp::now(), settings.days_back, 100);
        let snapshot = InventorySnapshot::capture(&provider, "vc01.lab.local", window);
        Engine::new(registry, &settings).evaluate(&provider, &snapshot, cancel)
    }

    fn ntp_only() -> Registry {
        let mut registry = Registry::standard();
        registry.hosts.retain(|c| c.id == "host.ntp");
        registry
    }

    fn records_for<'a>(outcome: &'a RunOutcome, key: &str) -> Vec<&'a EvidenceRecord> {
        outcome
            .ledger
            .records()
            .iter()
            .filter(|r| r.key == key)
            .collect()
    }

    #[test]
    fn test_one_faulty_host_does_not_stop_others() {
        let outcome = run(&ntp_only(), &Cancellation::new());
        assert!(outcome.completed);

        let ntp: Vec<(&str, Severity, &str)> = records_for(&outcome, "NTP configured & running")
            .into_iter()
            .map(|r| (r.scope.as_str(), r.severity, r.value.as_str()))
            .collect();
        assert_eq!(
            ntp,
            vec![
                ("esx01", Severity::Pass, "Servers=[ntp1.local]; Running=True"),
                ("esx02", Severity::Warn, UNAVAILABLE),
                ("esx03", Severity::Pass, "Servers=[ntp1.local]; Running=True"),
            ]
        );
    }

    #[test]
    fn test_run_opens_with_window_and_orders_groups() {
        let outcome = run(&ntp_only(), &Cancellation::new());
        let records = outcome.ledger.records();

        assert_eq!(records[0].category, Category::Control);
        assert_eq!(records[0].key, KEY_EVIDENCE_WINDOW);
        assert_eq!(records[0].scope, "vc01.lab.local");
        assert_eq!(records[1].key, "vCenter version");

        let listing = records_for(&outcome, KEY_INVENTORY_LISTING);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].scope, "extensions");
        assert_eq!(listing[0].severity, Severity::Warn);

        let last = records.last().unwrap();
        assert_eq!(last.category, Category::Events);
        assert!(last.value.starts_with("No events returned"));
        assert!(outcome.ledger.summary().is_consistent());
    }

    fn exploding(_host: &Host, _ctx: &CheckContext<'_>) -> CheckResult {
        panic!("probe decoder blew up")
    }

    fn steady(_host: &Host, _ctx: &CheckContext<'_>) -> CheckResult {
        Ok(vec![Verdict::pass("ok")])
    }

    #[test]
    fn test_panicking_check_is_contained() {
        let mut registry = Registry::standard();
        registry.hosts = vec![
            CheckDefinition::security(
                "test.panic",
                "Exploding",
                Category::Security,
                "",
                exploding,
            ),
            CheckDefinition::informational(
                "test.steady",
                "Steady",
                Category::Inventory,
                "",
                steady,
            ),
        ];

        let outcome = run(&registry, &Cancellation::new());

        let exploded = records_for(&outcome, "Exploding");
        assert_eq!(exploded.len(), 3);
        assert!(exploded.iter().all(|r| r.value == UNAVAILABLE && r.severity == Severity::Warn));
        assert!(exploded[0].notes.contains("probe decoder blew up"));
        assert_eq!(records_for(&outcome, "Steady").len(), 3);
    }

    #[test]
    fn test_cancelled_run_keeps_partial_ledger() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let outcome = run(&Registry::standard(), &cancel);

        assert!(!outcome.completed);
        assert!(!outcome.ledger.is_empty());
        assert_eq!(outcome.ledger.records()[0].key, KEY_EVIDENCE_WINDOW);
        assert!(outcome.ledger.summary().is_consistent());
    }

    #[test]
    fn test_datastore_warns_below_threshold() {
        let outcome = run(&Registry::standard(), &Cancellation::new());
        let free = records_for(&outcome, "Free space");
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].severity, Severity::Warn);
        assert!(free[0].value.ends_with("Free%=10.0"));
    }

    const LAB_INVENTORY: &str = include_str!("../../../demos/lab-inventory.yaml");

    fn severity_of(outcome: &RunOutcome, scope: &str, key: &str) -> Severity {
        outcome
            .ledger
            .records()
            .iter()
            .find(|r| r.scope == scope && r.key == key)
            .map(|r| r.severity)
            .unwrap_or_else(|| panic!("no {} record for {}", key, scope))
    }

    #[test]
    fn test_lab_inventory_end_to_end() {
        use chrono::{TimeZone, Utc};
        use vcevidence_schema::validation::validate_ledger;

        let document = InventoryDocument::from_yaml(LAB_INVENTORY).unwrap();
        let provider = FixtureProvider::new(document);
        let settings = AuditSettings::default();
        let end = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        let window = EventWindow::ending_at(end, settings.days_back, settings.max_event_samples);
        let snapshot = InventorySnapshot::capture(&provider, "vc01.lab.local", window);
        let registry = Registry::standard();
        let outcome =
            Engine::new(&registry, &settings).evaluate(&provider, &snapshot, &Cancellation::new());

        assert!(outcome.completed);
        assert!(outcome.ledger.summary().is_consistent());
        assert!(validate_ledger(&outcome.ledger).valid);
        assert!(records_for(&outcome, KEY_INVENTORY_LISTING).is_empty());

        assert_eq!(
            severity_of(&outcome, "esx01.lab.local", "NTP configured & running"),
            Severity::Pass
        );
        assert_eq!(
            severity_of(&outcome, "esx02.lab.local", "NTP configured & running"),
            Severity::Warn
        );
        assert_eq!(severity_of(&outcome, "esx01.lab.local", "SSH service"), Severity::Pass);
        assert_eq!(severity_of(&outcome, "esx02.lab.local", "SSH service"), Severity::Warn);
        assert_eq!(
            severity_of(&outcome, "esx02.lab.local", "Persistent log directory"),
            Severity::Warn
        );
        assert_eq!(severity_of(&outcome, "esx02.lab.local", "ESX admins group"), Severity::Warn);
        assert_eq!(
            severity_of(&outcome, "esx01.lab.local", "Memory sharing salting"),
            Severity::Pass
        );
        assert_eq!(severity_of(&outcome, "ds-prod-02", "Free space"), Severity::Warn);
        assert_eq!(severity_of(&outcome, "ds-prod-01", "Free space"), Severity::Info);

        // esx02 denies the shell service probe, esx03 does not answer at all.
        let shell = records_for(&outcome, "ESXi Shell service");
        assert_eq!(shell.len(), 3);
        assert_eq!(shell[1].value, UNAVAILABLE);
        assert!(shell[1].notes.contains("NoPermission"));
        assert_eq!(shell[2].value, UNAVAILABLE);
        assert_eq!(severity_of(&outcome, "esx03.lab.local", "ESXi version"), Severity::Warn);

        let vgt: Vec<Severity> = records_for(&outcome, "VLAN 4095 (VGT)")
            .into_iter()
            .map(|r| r.severity)
            .collect();
        assert_eq!(vgt, vec![Severity::Pass, Severity::Warn, Severity::Pass, Severity::Warn]);

        let failed_logins = records_for(&outcome, events::KEY_LOGIN_FAILURE);
        assert_eq!(failed_logins[0].value, "1");
        assert_eq!(failed_logins[0].severity, Severity::Warn);
        assert_eq!(records_for(&outcome, events::KEY_CRITICAL)[0].value, "1");

        let changes: Vec<&str> = outcome
            .ledger
            .records()
            .iter()
            .filter(|r| r.category == Category::Change)
            .map(|r| r.scope.as_str())
            .collect();
        assert_eq!(changes, vec!["ops@vsphere.local", events::SYSTEM_ACTOR]);
    }
}
