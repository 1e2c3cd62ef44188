//! Evidence validation utilities.

use crate::evidence::{EvidenceRecord, EMPTY_PLACEHOLDER};
use crate::ledger::Ledger;
use crate::schema;
use jsonschema::JSONSchema;
use serde_json::Value;
use thiserror::Error;

/// Validation error type.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Record {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },

    #[error("Record {index} is stamped before its predecessor")]
    TimestampRegression { index: usize },

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result of evidence validation.
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate an exported JSON document against the export schema, then
/// check record invariants on the parsed records.
pub fn validate_export(export: &Value) -> Result<ValidationResult, ValidationError> {
    let mut result = ValidationResult::new();

    let schema_value = schema::evidence_export_schema();
    let compiled = JSONSchema::compile(&schema_value)
        .map_err(|e| ValidationError::SchemaError(e.to_string()))?;

    if let Err(errors) = compiled.validate(export) {
        for error in errors {
            result.add_error(ValidationError::SchemaError(format!(
                "{} at {}",
                error, error.instance_path
            )));
        }
        return Ok(result);
    }

    let records: Vec<EvidenceRecord> = serde_json::from_value(export.clone())?;
    let record_result = validate_records(&records);
    for error in record_result.errors {
        result.add_error(error);
    }
    for warning in record_result.warnings {
        result.add_warning(warning);
    }

    Ok(result)
}

/// Check per-record invariants: non-empty scope, key and value.
pub fn validate_records(records: &[EvidenceRecord]) -> ValidationResult {
    let mut result = ValidationResult::new();

    for (index, record) in records.iter().enumerate() {
        for (field, text) in [
            ("scope", &record.scope),
            ("key", &record.key),
            ("value", &record.value),
        ] {
            if text.trim().is_empty() {
                result.add_error(ValidationError::EmptyField { index, field });
            }
        }
        if record.value == EMPTY_PLACEHOLDER {
            result.add_warning(format!(
                "Record {} ({} / {}) carries no observed value",
                index, record.scope, record.key
            ));
        }
    }

    result
}

/// Record invariants plus timestamp monotonicity in insertion order.
pub fn validate_ledger(ledger: &Ledger) -> ValidationResult {
    let mut result = validate_records(ledger.records());

    for (index, pair) in ledger.records().windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            result.add_error(ValidationError::TimestampRegression { index: index + 1 });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{Category, Severity};

    #[test]
    fn test_validate_export_minimal() {
        let export = serde_json::json!([{
            "Timestamp": "2024-01-01T00:00:00Z",
            "Category": "Security",
            "Scope": "esx01",
            "Ref": "",
            "Key": "SSH service",
            "Value": "Running=False; Policy=off",
            "Severity": "Pass",
            "Notes": ""
        }]);

        let result = validate_export(&export).unwrap();
        assert!(result.valid, "Errors: {:?}", result.errors);
    }

    #[test]
    fn test_validate_export_rejects_unknown_severity() {
        let export = serde_json::json!([{
            "Timestamp": "2024-01-01T00:00:00Z",
            "Category": "Security",
            "Scope": "esx01",
            "Ref": "",
            "Key": "SSH service",
            "Value": "Running=True",
            "Severity": "Critical",
            "Notes": ""
        }]);

        let result = validate_export(&export).unwrap();
        assert!(!result.valid);
    }

    #[test]
    fn test_validate_records_flags_blank_key() {
        let mut record = EvidenceRecord::new(Category::Inventory, "vc01", "k", "v", Severity::Info);
        record.key = "  ".to_string();
        let result = validate_records(&[record]);
        assert!(!result.valid);
        assert!(matches!(
            result.errors[0],
            ValidationError::EmptyField { index: 0, field: "key" }
        ));
    }

    #[test]
    fn test_validate_ledger_accepts_appended_records() {
        let mut ledger = Ledger::new();
        for key in ["a", "b", "c"] {
            ledger.append(EvidenceRecord::new(Category::Control, "vc01", key, "v", Severity::Info));
        }
        assert!(validate_ledger(&ledger).valid);
    }
}
