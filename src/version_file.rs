//! Version files
//!
//! One JSON document per subject version, as returned by
//! `GET /subjects/{subject}/versions/{version}`. The `subject` field is
//! dropped on load: where a file sits in the tree decides the target subject.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{MigrateError, Result};

/// A parsed version file ready to be replayed
#[derive(Debug, Clone)]
pub struct VersionFile {
    version: i64,
    payload: Value,
}

impl VersionFile {
    /// Read and parse a version file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content).map_err(|e| invalid(path, e.to_string()))?;
        Self::from_value(path, value)
    }

    /// Validate an already-parsed document
    pub fn from_value(path: impl AsRef<Path>, value: Value) -> Result<Self> {
        let path = path.as_ref();
        let Value::Object(mut fields) = value else {
            return Err(invalid(path, "expected a JSON object"));
        };

        fields.remove("subject");

        let version = match fields.get("version") {
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| invalid(path, format!("version {n} is not an integer")))?,
            Some(other) => return Err(invalid(path, format!("version must be an integer, got {other}"))),
            None => return Err(invalid(path, "missing 'version' field")),
        };

        if !matches!(fields.get("schema"), Some(Value::String(_))) {
            return Err(invalid(path, "missing 'schema' body"));
        }

        Ok(Self {
            version,
            payload: Value::Object(fields),
        })
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Registration body, without any `subject` field
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.payload.as_object()
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> MigrateError {
    MigrateError::InvalidVersionFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_subject_and_keeps_rest() {
        let file = VersionFile::from_value(
            "orders/1.json",
            json!({
                "subject": "orders-value",
                "version": 1,
                "id": 100,
                "schemaType": "AVRO",
                "schema": "{\"type\":\"string\"}"
            }),
        )
        .unwrap();

        assert_eq!(file.version(), 1);
        let fields = file.fields().unwrap();
        assert!(!fields.contains_key("subject"));
        assert_eq!(fields["id"], 100);
        assert_eq!(fields["schemaType"], "AVRO");
    }

    #[test]
    fn test_version_must_be_integer() {
        let err = VersionFile::from_value("x.json", json!({"version": "1", "schema": "{}"})).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidVersionFile { .. }));
        assert!(VersionFile::from_value("x.json", json!({"version": 1.5, "schema": "{}"})).is_err());
        assert!(VersionFile::from_value("x.json", json!({"schema": "{}"})).is_err());
    }

    #[test]
    fn test_schema_body_required() {
        assert!(VersionFile::from_value("x.json", json!({"version": 1})).is_err());
        assert!(VersionFile::from_value("x.json", json!([1, 2])).is_err());
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            VersionFile::load(&path),
            Err(MigrateError::InvalidVersionFile { .. })
        ));
    }
}
