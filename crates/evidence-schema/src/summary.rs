//! Severity tallies over a ledger.

use crate::evidence::{EvidenceRecord, Severity};
use serde::{Deserialize, Serialize};

/// Counts per severity. `pass + info + warn + fail == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub pass: usize,
    pub info: usize,
    pub warn: usize,
    pub fail: usize,
}

impl Summary {
    pub fn from_records(records: &[EvidenceRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.total += 1;
            match record.severity {
                Severity::Pass => summary.pass += 1,
                Severity::Info => summary.info += 1,
                Severity::Warn => summary.warn += 1,
                Severity::Fail => summary.fail += 1,
            }
            summary
        })
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Pass => self.pass,
            Severity::Info => self.info,
            Severity::Warn => self.warn,
            Severity::Fail => self.fail,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.pass + self.info + self.warn + self.fail == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::Category;

    #[test]
    fn test_empty_summary() {
        let summary = Summary::from_records(&[]);
        assert_eq!(summary, Summary::default());
        assert!(summary.is_consistent());
    }

    #[test]
    fn test_tallies_add_up() {
        let severities = [
            Severity::Pass,
            Severity::Warn,
            Severity::Warn,
            Severity::Info,
            Severity::Fail,
            Severity::Pass,
            Severity::Pass,
        ];
        let records: Vec<EvidenceRecord> = severities
            .iter()
            .map(|s| EvidenceRecord::new(Category::Security, "esx01", "k", "v", *s))
            .collect();

        let summary = Summary::from_records(&records);
        assert_eq!(summary.total, 7);
        assert_eq!(summary.count(Severity::Pass), 3);
        assert_eq!(summary.warn, 2);
        assert_eq!(summary.info, 1);
        assert_eq!(summary.fail, 1);
        assert!(summary.is_consistent());
        assert_eq!(Summary::from_records(&records), summary);
    }
}
