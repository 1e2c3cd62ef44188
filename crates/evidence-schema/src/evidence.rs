//! The evidence record, the atomic unit of audit output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vcevidence_common::Timestamp;

/// Placeholder written when a rule produces a blank scope or value.
pub const EMPTY_PLACEHOLDER: &str = "(none)";

/// Evidence category.
///
/// Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Change,
    Control,
    Events,
    Inventory,
    Logging,
    Operational,
    Resilience,
    Security,
    ThirdParty,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Change,
        Category::Control,
        Category::Events,
        Category::Inventory,
        Category::Logging,
        Category::Operational,
        Category::Resilience,
        Category::Security,
        Category::ThirdParty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Change => "Change",
            Category::Control => "Control",
            Category::Events => "Events",
            Category::Inventory => "Inventory",
            Category::Logging => "Logging",
            Category::Operational => "Operational",
            Category::Resilience => "Resilience",
            Category::Security => "Security",
            Category::ThirdParty => "ThirdParty",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = vcevidence_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| vcevidence_common::Error::Schema(format!("unknown category: {}", s)))
    }
}

/// Verdict level of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Compliant.
    Pass,
    /// Observational, no verdict.
    Info,
    /// Non-compliant or needs review.
    Warn,
    /// Reserved for definitive violations.
    Fail,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Pass => "Pass",
            Severity::Info => "Info",
            Severity::Warn => "Warn",
            Severity::Fail => "Fail",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified observation.
///
/// Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvidenceRecord {
    /// When the record was produced.
    pub timestamp: Timestamp,
    pub category: Category,
    /// Audited object (host name, "dvSwitch/portgroup", "since 2024-01-01", ...).
    pub scope: String,
    /// Compliance control reference, empty when not applicable.
    #[serde(rename = "Ref", default)]
    pub reference: String,
    /// Short name of the observation.
    pub key: String,
    /// Observed value rendered as text.
    pub value: String,
    pub severity: Severity,
    #[serde(default)]
    pub notes: String,
}

impl EvidenceRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        category: Category,
        scope: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            timestamp: Timestamp::now(),
            category,
            scope: non_blank(scope.into()),
            reference: String::new(),
            key: non_blank(key.into()),
            value: non_blank(value.into()),
            severity,
            notes: String::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

fn non_blank(text: String) -> String {
    if text.trim().is_empty() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_are_normalised() {
        let record =
            EvidenceRecord::new(Category::Security, " ", "DCUI access list", "", Severity::Info);
        assert_eq!(record.scope, EMPTY_PLACEHOLDER);
        assert_eq!(record.value, EMPTY_PLACEHOLDER);
        assert!(record.reference.is_empty());
    }

    #[test]
    fn test_json_field_names() {
        let record = EvidenceRecord::new(
            Category::Logging,
            "esx01",
            "NTP configured & running",
            "Servers=[ntp1.local]; Running=True",
            Severity::Pass,
        )
        .with_reference("9.4.c");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Ref"], "9.4.c");
        assert_eq!(json["Category"], "Logging");
        assert_eq!(json["Severity"], "Pass");
        assert_eq!(json["Notes"], "");
    }

    #[test]
    fn test_category_parse_and_order() {
        assert_eq!("thirdparty".parse::<Category>().unwrap(), Category::ThirdParty);
        assert!("Bogus".parse::<Category>().is_err());
        let mut names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);
    }
}
