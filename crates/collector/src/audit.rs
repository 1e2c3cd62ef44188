//! One audit run: acquire the session, capture, evaluate, release.

use crate::engine::{Cancellation, Engine};
use crate::provider::{ConnectOptions, SessionProvider};
use crate::registry::Registry;
use crate::session;
use crate::settings::AuditSettings;
use crate::snapshot::{EventWindow, InventorySnapshot};
use tracing::{info, info_span, warn};
use uuid::Uuid;
use vcevidence_common::{Result, Timestamp};
use vcevidence_schema::{Ledger, Summary};

/// Everything a finished (or cancelled) run produced.
#[derive(Debug)]
pub struct AuditRun {
    pub run_id: Uuid,
    pub target: String,
    pub started_at: Timestamp,
    pub window: EventWindow,
    pub ledger: Ledger,
    /// False when the run was cancelled before traversal finished.
    pub completed: bool,
}

impl AuditRun {
    pub fn summary(&self) -> Summary {
        self.ledger.summary()
    }
}

/// Run one audit against the target in `options`.
///
/// Only session acquisition can fail the run; everything after it is
/// recorded as evidence. The session is released on every path.
pub fn run_audit<P: SessionProvider>(
    options: &ConnectOptions,
    settings: &AuditSettings,
    registry: &Registry,
    cancel: &Cancellation,
) -> Result<AuditRun> {
    let run_id = Uuid::new_v4();
    let span = info_span!("audit", %run_id, target = %options.target);
    let _enter = span.enter();

    let started_at = Timestamp::now();
    let session = session::connect::<P>(options)?;

    let window = EventWindow::ending_at(started_at, settings.days_back, settings.max_event_samples);
    let snapshot = InventorySnapshot::capture(&*session, &options.target, window);
    let outcome = Engine::new(registry, settings).evaluate(&*session, &snapshot, cancel);

    if let Err(e) = session.close() {
        warn!("Session release failed: {}", e);
    }

    let summary = outcome.ledger.summary();
    info!(
        total = summary.total,
        pass = summary.pass,
        info = summary.info,
        warn = summary.warn,
        fail = summary.fail,
        completed = outcome.completed,
        elapsed_ms = started_at.elapsed().num_milliseconds(),
        "Audit finished"
    );

    Ok(AuditRun {
        run_id,
        target: options.target.clone(),
        started_at,
        window,
        ledger: outcome.ledger,
        completed: outcome.completed,
    })
}
