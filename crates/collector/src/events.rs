//! Event-window classification.
//!
//! Events are tallied into critical, warning, login-success and
//! login-failure buckets, by message pattern and by a table of event types
//! known to signal an outage. The buckets are independent: one event can
//! count as both critical and warning. The first configuration-change
//! events become one Change record each.

use crate::registry::{refs, CatalogEntry};
use crate::snapshot::EventWindow;
use regex::Regex;
use std::sync::LazyLock;
use vcevidence_schema::inventory::{InventoryEvent, ObjectKind};
use vcevidence_schema::{Category, EvidenceRecord, Severity};

/// Change records kept per run.
pub const MAX_CHANGE_RECORDS: usize = 10;

/// Scope of a change made without a recorded user.
pub const SYSTEM_ACTOR: &str = "system";

pub const KEY_SAMPLED: &str = "Events sampled";
pub const KEY_RETURNED: &str = "Events returned";
pub const KEY_CRITICAL: &str = "Critical/alert events";
pub const KEY_WARNING: &str = "Warning events";
pub const KEY_LOGIN_SUCCESS: &str = "Successful logins";
pub const KEY_LOGIN_FAILURE: &str = "Failed logins";

static CRITICAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)critical|alert").unwrap());

static WARNING_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)warn").unwrap());

/// Event types counted as critical whatever their message says.
pub const CRITICAL_EVENT_TYPES: &[&str] = &["VmFailedToPowerOnEvent", "HostConnectionLostEvent"];

/// Event types counted as warnings whatever their message says.
pub const WARNING_EVENT_TYPES: &[&str] = &[
    "VmSuspendedEvent",
    "HostDisconnectedEvent",
    "VmMigrateFailedEvent",
    "DvsPortLinkDownEvent",
];

static LOGIN_SUCCESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(vim\.event\.)?UserLoginSessionEvent$").unwrap());

static LOGIN_FAILURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(BadUsernameSessionEvent|InvalidLogin|UserLoginFailed|LoginFailure)").unwrap()
});

static CHANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(Reconfigured|ConfigChanged|SettingsChanged|PermissionAdded|PermissionRemoved",
        r"|PermissionUpdated|RoleAdded|RoleRemoved|RoleUpdated|Modified)Event$",
    ))
    .unwrap()
});

/// Tallies over one sample of events.
#[derive(Debug, Default)]
pub struct EventTally<'a> {
    pub sampled: usize,
    pub critical: usize,
    pub warning: usize,
    pub login_success: usize,
    pub login_failure: usize,
    /// Configuration changes in sample order, capped at [`MAX_CHANGE_RECORDS`].
    pub changes: Vec<&'a InventoryEvent>,
}

pub fn classify(events: &[InventoryEvent]) -> EventTally<'_> {
    let mut tally = EventTally {
        sampled: events.len(),
        ..Default::default()
    };

    for event in events {
        let event_type = short_type(&event.event_type);
        if CRITICAL_EVENT_TYPES.contains(&event_type) || CRITICAL_PATTERN.is_match(&event.message) {
            tally.critical += 1;
        }
        if WARNING_EVENT_TYPES.contains(&event_type) || WARNING_PATTERN.is_match(&event.message) {
            tally.warning += 1;
        }

        if LOGIN_SUCCESS_PATTERN.is_match(&event.event_type) {
            tally.login_success += 1;
        } else if LOGIN_FAILURE_PATTERN.is_match(&event.event_type) {
            tally.login_failure += 1;
        }

        if CHANGE_PATTERN.is_match(&event.event_type) && tally.changes.len() < MAX_CHANGE_RECORDS {
            tally.changes.push(event);
        }
    }

    tally
}

/// `vim.event.HostConnectionLostEvent` -> `HostConnectionLostEvent`
fn short_type(event_type: &str) -> &str {
    event_type.rsplit('.').next().unwrap_or(event_type)
}

fn window_record(
    window: &EventWindow,
    key: &str,
    value: impl Into<String>,
    severity: Severity,
) -> EvidenceRecord {
    EvidenceRecord::new(Category::Events, window.scope(), key, value, severity)
        .with_reference(refs::ANOMALY_DETECTION)
}

fn warn_if_any(count: usize) -> Severity {
    if count > 0 {
        Severity::Warn
    } else {
        Severity::Info
    }
}

fn change_record(event: &InventoryEvent) -> EvidenceRecord {
    let actor = event
        .user
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(SYSTEM_ACTOR);
    let value = if event.message.trim().is_empty() {
        event.event_type.as_str()
    } else {
        event.message.as_str()
    };
    EvidenceRecord::new(Category::Change, actor, &event.event_type, value, Severity::Info)
        .with_reference(refs::CHANGE_MANAGEMENT)
        .with_notes(format!("Event {} at {}", event.key, event.created.to_display()))
}

/// Records describing the events returned for the window.
pub fn evidence(events: &[InventoryEvent], window: &EventWindow) -> Vec<EvidenceRecord> {
    if events.is_empty() {
        return vec![window_record(
            window,
            KEY_RETURNED,
            format!("No events returned since {}", window.since.to_date()),
            Severity::Warn,
        )
        .with_notes("event retention or permissions may hide activity")];
    }

    let tally = classify(events);
    let mut sampled = window_record(
        window,
        KEY_SAMPLED,
        format!("Count={}; Cap={}", tally.sampled, window.max_samples),
        Severity::Info,
    );
    if tally.sampled >= window.max_samples {
        sampled = sampled.with_notes("sample cap reached; older events were not read");
    }

    let mut records = vec![
        sampled,
        window_record(
            window,
            KEY_CRITICAL,
            tally.critical.to_string(),
            warn_if_any(tally.critical),
        ),
        window_record(window, KEY_WARNING, tally.warning.to_string(), Severity::Info),
        window_record(
            window,
            KEY_LOGIN_SUCCESS,
            tally.login_success.to_string(),
            Severity::Info,
        ),
        window_record(
            window,
            KEY_LOGIN_FAILURE,
            tally.login_failure.to_string(),
            warn_if_any(tally.login_failure),
        ),
    ];
    records.extend(tally.changes.into_iter().map(change_record));
    records
}

/// The record written when the event listing itself failed.
pub fn unavailable(window: &EventWindow, reason: &str) -> EvidenceRecord {
    window_record(
        window,
        KEY_RETURNED,
        crate::registry::UNAVAILABLE,
        Severity::Warn,
    )
    .with_notes(reason)
}

/// Catalog entries for the event-window records.
pub fn catalog() -> Vec<CatalogEntry> {
    fn entry(id: &'static str, category: Category, key: &'static str) -> CatalogEntry {
        let reference = match category {
            Category::Change => refs::CHANGE_MANAGEMENT,
            _ => refs::ANOMALY_DETECTION,
        };
        CatalogEntry {
            id,
            applies_to: ObjectKind::EventWindow,
            category,
            reference,
            key,
        }
    }
    vec![
        entry("events.sampled", Category::Events, KEY_SAMPLED),
        entry("events.critical", Category::Events, KEY_CRITICAL),
        entry("events.warning", Category::Events, KEY_WARNING),
        entry("events.logins", Category::Events, KEY_LOGIN_SUCCESS),
        entry("events.login-failures", Category::Events, KEY_LOGIN_FAILURE),
        entry("events.changes", Category::Change, "<event type>"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vcevidence_common::Timestamp;

    fn window() -> EventWindow {
        EventWindow::ending_at(Timestamp::now(), 30, 5000)
    }

    fn event(key: i64, event_type: &str, user: Option<&str>, message: &str) -> InventoryEvent {
        InventoryEvent {
            key,
            event_type: event_type.to_string(),
            created: Timestamp::now(),
            user: user.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_zero_events_is_one_warn_record() {
        let records = evidence(&[], &window());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::Events);
        assert_eq!(records[0].severity, Severity::Warn);
        assert!(records[0].value.starts_with("No events returned"));
    }

    #[test]
    fn test_classification() {
        let events = vec![
            event(1, "UserLoginSessionEvent", Some("admin"), "User admin logged in"),
            event(2, "BadUsernameSessionEvent", None, "Cannot login root"),
            event(3, "AlarmStatusChangedEvent", None, "Alarm 'Host CPU' changed to critical"),
            event(4, "EventEx", None, "Datastore usage warning on ds01"),
            event(5, "VmReconfiguredEvent", Some("ops@vsphere.local"), "Reconfigured app01"),
            event(6, "HostConfigChangedEvent", None, ""),
        ];
        let tally = classify(&events);
        assert_eq!(tally.sampled, 6);
        assert_eq!(tally.critical, 1);
        assert_eq!(tally.warning, 1);
        assert_eq!(tally.login_success, 1);
        assert_eq!(tally.login_failure, 1);
        assert_eq!(tally.changes.len(), 2);
    }

    #[test]
    fn test_tallies_match_substrings_independently() {
        let events = vec![
            event(1, "EventEx", None, "Datastore usage warnings exceeded on ds01"),
            event(2, "EventEx", None, "Host esx01 raised alerts for CPU"),
            event(3, "EventEx", None, "critical: disk warning threshold crossed"),
            event(4, "EventEx", None, "Admission check warned about capacity"),
        ];
        let tally = classify(&events);
        assert_eq!(tally.critical, 2);
        assert_eq!(tally.warning, 3);
    }

    #[test]
    fn test_event_type_table() {
        let events = vec![
            event(1, "vim.event.HostConnectionLostEvent", None, "Host esx03 lost connection"),
            event(2, "VmFailedToPowerOnEvent", None, "Cannot power on db01"),
            event(3, "HostDisconnectedEvent", None, "Host esx04 disconnected"),
            event(4, "DvsPortLinkDownEvent", None, "Port 12 link down"),
            event(5, "VmPoweredOnEvent", None, "db02 powered on"),
        ];
        let tally = classify(&events);
        assert_eq!(tally.critical, 2);
        assert_eq!(tally.warning, 2);
    }

    #[test]
    fn test_evidence_records() {
        let events = vec![
            event(1, "BadUsernameSessionEvent", None, "Cannot login root"),
            event(2, "DvsReconfiguredEvent", Some("ops@vsphere.local"), "Reconfigured dvs-prod"),
            event(3, "HostConfigChangedEvent", None, ""),
        ];
        let records = evidence(&events, &window());

        let failed = records.iter().find(|r| r.key == KEY_LOGIN_FAILURE).unwrap();
        assert_eq!(failed.severity, Severity::Warn);
        assert_eq!(failed.value, "1");

        let critical = records.iter().find(|r| r.key == KEY_CRITICAL).unwrap();
        assert_eq!(critical.severity, Severity::Info);

        let changes: Vec<(&str, &str, &str)> = records
            .iter()
            .filter(|r| r.category == Category::Change)
            .map(|r| (r.scope.as_str(), r.key.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("ops@vsphere.local", "DvsReconfiguredEvent", "Reconfigured dvs-prod"),
                ("system", "HostConfigChangedEvent", "HostConfigChangedEvent"),
            ]
        );
    }

    #[test]
    fn test_change_records_are_capped() {
        let events: Vec<InventoryEvent> = (0..25)
            .map(|i| event(i, "VmReconfiguredEvent", Some("ops"), "Reconfigured vm"))
            .collect();
        let records = evidence(&events, &window());
        let changes = records.iter().filter(|r| r.category == Category::Change).count();
        assert_eq!(changes, MAX_CHANGE_RECORDS);
    }

    #[test]
    fn test_sample_cap_note() {
        let small = EventWindow::ending_at(Timestamp::now(), 30, 2);
        let events = vec![
            event(1, "EventEx", None, "a"),
            event(2, "EventEx", None, "b"),
        ];
        let records = evidence(&events, &small);
        assert!(!records[0].notes.is_empty());
        assert_eq!(records[0].value, "Count=2; Cap=2");
    }
}
