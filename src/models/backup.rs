//! Backup document: the whole local state in one portable JSON file.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::{Catalog, CatalogMeta, Holding};
use crate::errors::AppError;

/// Current backup schema version written on export.
pub const SCHEMA_VERSION: i64 = 1;

/// The persisted artifacts carried by a backup.
///
/// `holdings` is required and unknown keys are refused, so a truncated or
/// misspelled document never reaches the destructive restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupPayload {
    pub holdings: Vec<Holding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Catalog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_meta: Option<CatalogMeta>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Versioned<'a> {
    schema_version: i64,
    #[serde(flatten)]
    payload: &'a BackupPayload,
}

/// A decoded backup, tagged by the schema it was written with.
#[derive(Debug, Clone, PartialEq)]
pub enum BackupDocument {
    /// `schemaVersion: 1`
    V1(BackupPayload),
    /// No `schemaVersion` at all; restoring requires confirmation.
    Unversioned(BackupPayload),
}

impl BackupDocument {
    /// Decode and shape-check a backup without touching any storage.
    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::RestoreCorruption(format!("Backup is not valid JSON: {}", e)))?;

        let Value::Object(mut fields) = value else {
            return Err(AppError::RestoreCorruption(
                "Backup must be a JSON object".to_string(),
            ));
        };

        let schema_version = fields.remove("schemaVersion");

        let payload: BackupPayload = serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::RestoreCorruption(format!("Backup has an invalid shape: {}", e)))?;

        match schema_version {
            None | Some(Value::Null) => Ok(BackupDocument::Unversioned(payload)),
            Some(Value::Number(n)) if n.as_f64() == Some(SCHEMA_VERSION as f64) => {
                Ok(BackupDocument::V1(payload))
            }
            Some(Value::Number(n)) => Err(AppError::RestoreCorruption(format!(
                "Unsupported backup schemaVersion {}",
                n
            ))),
            // A non-numeric version is treated as missing
            Some(_) => Ok(BackupDocument::Unversioned(payload)),
        }
    }

    pub fn schema_version(&self) -> Option<i64> {
        match self {
            BackupDocument::V1(_) => Some(SCHEMA_VERSION),
            BackupDocument::Unversioned(_) => None,
        }
    }

    pub fn payload(&self) -> &BackupPayload {
        match self {
            BackupDocument::V1(payload) | BackupDocument::Unversioned(payload) => payload,
        }
    }

    pub fn into_payload(self) -> BackupPayload {
        match self {
            BackupDocument::V1(payload) | BackupDocument::Unversioned(payload) => payload,
        }
    }
}

impl Serialize for BackupDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BackupDocument::V1(payload) => Versioned {
                schema_version: SCHEMA_VERSION,
                payload,
            }
            .serialize(serializer),
            BackupDocument::Unversioned(payload) => payload.serialize(serializer),
        }
    }
}
