//! Catalog models: car types, ECUs and firmware versions
//!
//! Persisted fields use snake_case on the wire (`model_number`,
//! `manufactured_count`, `car_ids`, `compatible_car_types`, `hex_file_path`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A vehicle model/trim definition, the top-level catalog entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarType {
    /// Unique name (primary key, immutable after creation)
    pub name: String,
    pub model_number: String,
    /// Number of vehicles built of this type
    #[serde(default)]
    pub manufactured_count: u64,
    /// Identifiers of the physical vehicles of this type
    #[serde(default)]
    pub car_ids: Vec<String>,
    /// ECUs installed in this car type, in display order
    #[serde(default)]
    pub ecus: Vec<Ecu>,
}

/// An electronic control unit as stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ecu {
    pub name: String,
    pub model_number: String,
    #[serde(default)]
    pub versions: Vec<FirmwareVersion>,
}

impl Ecu {
    /// Create an ECU without any firmware history
    pub fn new(name: impl Into<String>, model_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_number: model_number.into(),
            versions: Vec::new(),
        }
    }

    /// Natural key used for de-duplication and lookups
    pub fn key(&self) -> EcuKey {
        EcuKey::new(&self.name, &self.model_number)
    }

    /// Find a version by number
    pub fn version(&self, version_number: &str) -> Option<&FirmwareVersion> {
        self.versions
            .iter()
            .find(|v| v.version_number == version_number)
    }
}

/// The `(name, model_number)` pair identifying an ECU
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EcuKey {
    pub name: String,
    pub model_number: String,
}

impl EcuKey {
    pub fn new(name: impl Into<String>, model_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_number: model_number.into(),
        }
    }
}

impl fmt::Display for EcuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.model_number)
    }
}

/// A specific firmware build for one ECU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    /// Unique within the owning ECU
    pub version_number: String,
    /// Lowercase names of every car type allowed to receive this firmware
    #[serde(default)]
    pub compatible_car_types: Vec<String>,
    /// Opaque storage locator (e.g. a blob URL)
    #[serde(default)]
    pub hex_file_path: String,
}

impl FirmwareVersion {
    /// Whether the given car type may receive this firmware
    pub fn is_compatible_with(&self, car_type: &str) -> bool {
        let car_type = car_type.to_lowercase();
        self.compatible_car_types.iter().any(|c| *c == car_type)
    }
}

// =============================================================================
// Read-side projections
// =============================================================================

/// Single version as returned by the version detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDetail {
    #[serde(flatten)]
    pub version: FirmwareVersion,
    /// Size of the stored firmware image, when the backend can tell
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Car type entry returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarTypeSummary {
    pub name: String,
    pub model_number: String,
    #[serde(default)]
    pub manufactured_count: u64,
    #[serde(default)]
    pub car_ids: Vec<String>,
    #[serde(default)]
    pub car_ids_count: usize,
    #[serde(default)]
    pub ecus_count: usize,
}

/// ECU entry without its version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcuSummary {
    pub name: String,
    pub model_number: String,
    #[serde(default)]
    pub versions_count: usize,
}

/// ECU with the version numbers compatible with a given car type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibleEcu {
    pub name: String,
    pub model_number: String,
    #[serde(default)]
    pub compatible_versions: Vec<String>,
}

/// Firmware version compatible with a given car type, with its owning ECU
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibleVersion {
    pub ecu_name: String,
    pub ecu_model: String,
    pub version_number: String,
    #[serde(default)]
    pub hex_file_path: String,
}

/// Car type referencing an ECU, as returned by `GET /car-types/by-ecu/{name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarTypeByEcu {
    pub name: String,
    pub model_number: String,
    #[serde(default)]
    pub manufactured_count: u64,
    #[serde(default)]
    pub car_ids_count: usize,
    #[serde(default)]
    pub ecus: Vec<EcuSummary>,
}

/// Aggregate numbers over all car types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarTypeStatistics {
    #[serde(default)]
    pub total_car_types: usize,
    #[serde(default)]
    pub total_manufactured: u64,
    #[serde(default)]
    pub car_type_details: Vec<CarTypeStat>,
}

/// Per car type line of [`CarTypeStatistics`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarTypeStat {
    pub name: String,
    pub model_number: String,
    #[serde(default)]
    pub manufactured_count: u64,
    #[serde(default)]
    pub car_ids_count: usize,
    #[serde(default)]
    pub ecu_count: usize,
}

/// Partial car type update (`PATCH /car-types/{name}`)
///
/// Only the fields that are set are sent; the backend ignores the name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarTypePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufactured_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_ids: Option<Vec<String>>,
}

impl CarTypePatch {
    pub fn is_empty(&self) -> bool {
        self.model_number.is_none() && self.manufactured_count.is_none() && self.car_ids.is_none()
    }
}

/// Firmware version echoed back by the upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedVersion {
    #[serde(default)]
    pub message: Option<String>,
    pub version: FirmwareVersion,
}

/// Generic `{"message": ...}` acknowledgement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_type_defaults() {
        let json = r#"{"name": "sedan", "model_number": "M1"}"#;
        let car_type: CarType = serde_json::from_str(json).unwrap();
        assert_eq!(car_type.manufactured_count, 0);
        assert!(car_type.car_ids.is_empty());
        assert!(car_type.ecus.is_empty());
    }

    #[test]
    fn test_compatibility_is_case_insensitive() {
        let version = FirmwareVersion {
            version_number: "1.0".into(),
            compatible_car_types: vec!["sedan".into()],
            hex_file_path: "blob".into(),
        };
        assert!(version.is_compatible_with("Sedan"));
        assert!(!version.is_compatible_with("coupe"));
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = CarTypePatch {
            manufactured_count: Some(12),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"manufactured_count": 12}));
    }
}
