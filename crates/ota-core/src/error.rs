//! Error types for draft editing and submission

use thiserror::Error;

use crate::models::EcuKey;

/// Result type for draft operations
pub type DraftResult<T> = Result<T, DraftError>;

/// Validation failures raised while editing a draft
///
/// These never reach the network. A failed operation leaves the draft
/// exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// A required field was empty
    #[error("{0} is required")]
    MissingField(&'static str),

    /// ECU with the same name and model number already attached
    #[error("ECU {0} is already part of this car type")]
    DuplicateEcu(EcuKey),

    /// Version number already present under the target ECU
    #[error("Version {version_number} already exists for ECU {ecu}")]
    DuplicateVersion { ecu: EcuKey, version_number: String },

    /// Car ID already present
    #[error("Car ID {0} already exists")]
    DuplicateCarId(String),

    /// Car ID not present
    #[error("Car ID {0} not found")]
    UnknownCarId(String),

    /// ECU index out of range
    #[error("No ECU at position {0}")]
    EcuIndexOutOfRange(usize),

    /// Version index out of range
    #[error("No version at position {version_index} for ECU at position {ecu_index}")]
    VersionIndexOutOfRange { ecu_index: usize, version_index: usize },

    /// A version operation needs a selected ECU
    #[error("Please select an ECU first")]
    NoEcuSelected,

    /// Name cannot change once the car type exists
    #[error("Car type name cannot be changed after creation")]
    NameLocked,

    /// Standalone upload without any target car type
    #[error("Please select at least one compatible car type")]
    NoCompatibleCarType,

    /// Payload requested while firmware files are still local
    #[error("Version {version_number} of ECU {ecu} has not been uploaded yet")]
    UnresolvedUpload { ecu: EcuKey, version_number: String },
}

/// Errors returned when turning a draft into a submission payload
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Draft failed validation
    #[error(transparent)]
    Invalid(#[from] DraftError),

    /// Uploading a firmware file failed; later uploads were not attempted
    #[error("Failed to upload version {version_number} of ECU {ecu_name} ({ecu_model}): {source}")]
    Upload {
        ecu_name: String,
        ecu_model: String,
        version_number: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
