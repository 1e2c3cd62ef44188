//! JSON schema for exported evidence.

/// JSON Schema for the JSON export (an array of flat evidence records).
pub const EVIDENCE_EXPORT_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "$id": "https://vcevidence.dev/schemas/evidence-export.json",
  "title": "vCenter Evidence Export",
  "type": "array",
  "items": {
    "type": "object",
    "required": ["Timestamp", "Category", "Scope", "Ref", "Key", "Value", "Severity", "Notes"],
    "additionalProperties": false,
    "properties": {
      "Timestamp": { "type": "string", "format": "date-time" },
      "Category": {
        "type": "string",
        "enum": [
          "Change", "Control", "Events", "Inventory", "Logging",
          "Operational", "Resilience", "Security", "ThirdParty"
        ]
      },
      "Scope": { "type": "string", "minLength": 1 },
      "Ref": { "type": "string" },
      "Key": { "type": "string", "minLength": 1 },
      "Value": { "type": "string", "minLength": 1 },
      "Severity": { "type": "string", "enum": ["Pass", "Info", "Warn", "Fail"] },
      "Notes": { "type": "string" }
    }
  }
}"#;

/// Get the export schema as a parsed JSON value.
pub fn evidence_export_schema() -> serde_json::Value {
    serde_json::from_str(EVIDENCE_EXPORT_SCHEMA).expect("Invalid evidence export schema")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_every_category() {
        let schema = evidence_export_schema();
        let categories = schema["items"]["properties"]["Category"]["enum"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(categories, crate::Category::ALL.len());
    }
}
