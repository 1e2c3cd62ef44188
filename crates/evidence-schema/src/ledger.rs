//! The per-run evidence ledger.

use crate::evidence::EvidenceRecord;
use crate::summary::Summary;

/// Append-only, ordered collection of evidence records for one run.
///
/// Records keep insertion order; [`Ledger::display_order`] gives the
/// deterministic `(category, scope)` order used for console and export.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<EvidenceRecord>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    ///
    /// Timestamps never go backwards within a ledger: a record stamped
    /// earlier than its predecessor is clamped to the predecessor's time.
    pub fn append(&mut self, mut record: EvidenceRecord) {
        if let Some(last) = self.records.last() {
            if record.timestamp < last.timestamp {
                record.timestamp = last.timestamp;
            }
        }
        self.records.push(record);
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records sorted for presentation and export.
    pub fn display_order(&self) -> Vec<EvidenceRecord> {
        let mut records = self.records.clone();
        sort_for_display(&mut records);
        records
    }

    /// Severity tallies over every record.
    pub fn summary(&self) -> Summary {
        Summary::from_records(&self.records)
    }
}

impl Extend<EvidenceRecord> for Ledger {
    fn extend<I: IntoIterator<Item = EvidenceRecord>>(&mut self, iter: I) {
        for record in iter {
            self.append(record);
        }
    }
}

/// Stable sort by `(category, scope)`; ties keep their relative order.
pub fn sort_for_display(records: &mut [EvidenceRecord]) {
    records.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.scope.cmp(&b.scope))
    });
}
