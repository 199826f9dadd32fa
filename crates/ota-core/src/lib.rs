//! ota-core - Firmware catalog model and draft consistency rules
//!
//! This crate holds the types shared by the OTA console client and CLI:
//!
//! - the catalog wire model (car types, ECUs, firmware versions) and the
//!   service/download request records
//! - [`CarTypeDraft`], the single-owner in-memory draft of a car type being
//!   created or edited, with the invariants the backend expects
//! - the [`FirmwareUploader`] seam used to resolve pending firmware files
//!   before a draft is submitted
//!
//! # Example
//!
//! ```
//! use ota_core::{CarTypeDraft, HexSource};
//!
//! let mut draft = CarTypeDraft::new("Sedan", "M1");
//! draft.add_new_ecu("ECU-A", "V1")?;
//! draft.add_version(0, "v1.0.0", HexSource::resolved("https://blob/ecu-a.hex"), &["Coupe"])?;
//!
//! let payload = draft.to_payload()?;
//! assert_eq!(payload.ecus[0].versions[0].compatible_car_types, vec!["coupe", "sedan"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod draft;
pub mod error;
pub mod models;
pub mod upload;

pub use draft::{
    coerce_count, compute_compatible_car_types, CarTypeDraft, DraftCommand, DraftEcu, DraftMode,
    DraftVersion, EcuSelection, HexSource, LocalHexFile,
};
pub use error::{DraftError, DraftResult, SubmitError};
pub use models::*;
pub use upload::{FirmwareUploader, UploadRequest};
