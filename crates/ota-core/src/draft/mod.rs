//! Car type draft builder
//!
//! A [`CarTypeDraft`] is the client-local representation of a car type that
//! is being created or edited. It is owned by exactly one editor and only
//! changes through the operations below (or the [`DraftCommand`] reducer),
//! each of which either applies completely or leaves the draft untouched.
//!
//! Rejected operations return a [`DraftError`] and log a warning; nothing
//! is ever sent to the backend from here.

mod command;
mod compat;
mod selection;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DraftError, DraftResult};
use crate::models::{CarType, Ecu, EcuKey, FirmwareVersion};

pub use command::DraftCommand;
pub use compat::compute_compatible_car_types;
pub use selection::EcuSelection;

/// Whether the draft creates a new car type or edits an existing one
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DraftMode {
    #[default]
    Create,
    Edit { original_name: String },
}

/// Firmware file on the operator's machine, not yet uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalHexFile {
    pub path: PathBuf,
    #[serde(rename = "hexFileName")]
    pub file_name: String,
    #[serde(rename = "hexFileSize")]
    pub size: u64,
}

impl LocalHexFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            file_name,
            size,
        }
    }

    /// Reference a file on disk, reading its size
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }
        Ok(Self::new(path, metadata.len()))
    }
}

/// Where a draft version's firmware image lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HexSource {
    /// Local file that must be uploaded before submission
    Pending {
        #[serde(rename = "hexFile")]
        hex_file: LocalHexFile,
    },
    /// Durable storage path returned by the backend
    Resolved { hex_file_path: String },
}

impl HexSource {
    pub fn resolved(path: impl Into<String>) -> Self {
        Self::Resolved {
            hex_file_path: path.into(),
        }
    }

    pub fn pending(file: LocalHexFile) -> Self {
        Self::Pending { hex_file: file }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Pending { hex_file } => hex_file.path.as_os_str().is_empty(),
            Self::Resolved { hex_file_path } => hex_file_path.trim().is_empty(),
        }
    }
}

/// Firmware version inside a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftVersion {
    pub version_number: String,
    pub compatible_car_types: Vec<String>,
    #[serde(flatten)]
    pub source: HexSource,
    /// Added in this draft; the owner entry follows renames
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub added: bool,
}

impl From<&FirmwareVersion> for DraftVersion {
    fn from(version: &FirmwareVersion) -> Self {
        Self {
            version_number: version.version_number.clone(),
            compatible_car_types: version.compatible_car_types.clone(),
            source: HexSource::resolved(version.hex_file_path.clone()),
            added: false,
        }
    }
}

/// ECU inside a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEcu {
    pub name: String,
    pub model_number: String,
    #[serde(default)]
    pub versions: Vec<DraftVersion>,
}

impl DraftEcu {
    pub fn key(&self) -> EcuKey {
        EcuKey::new(&self.name, &self.model_number)
    }

    pub fn has_version(&self, version_number: &str) -> bool {
        self.versions
            .iter()
            .any(|v| v.version_number == version_number)
    }
}

impl From<&Ecu> for DraftEcu {
    fn from(ecu: &Ecu) -> Self {
        Self {
            name: ecu.name.clone(),
            model_number: ecu.model_number.clone(),
            versions: ecu.versions.iter().map(DraftVersion::from).collect(),
        }
    }
}

/// In-memory draft of a car type with its ECU and version collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarTypeDraft {
    #[serde(default)]
    mode: DraftMode,
    name: String,
    model_number: String,
    #[serde(default)]
    manufactured_count: u64,
    #[serde(default)]
    car_ids: Vec<String>,
    #[serde(default)]
    ecus: Vec<DraftEcu>,
    #[serde(default)]
    selection: EcuSelection,
}

impl Default for CarTypeDraft {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl CarTypeDraft {
    /// Start a draft for a new car type
    pub fn new(name: impl Into<String>, model_number: impl Into<String>) -> Self {
        Self {
            mode: DraftMode::Create,
            name: name.into(),
            model_number: model_number.into(),
            manufactured_count: 0,
            car_ids: Vec::new(),
            ecus: Vec::new(),
            selection: EcuSelection::None,
        }
    }

    /// Start an edit draft from a car type read from the backend
    pub fn from_car_type(car_type: &CarType) -> Self {
        let mut car_ids: Vec<String> = Vec::with_capacity(car_type.car_ids.len());
        for id in &car_type.car_ids {
            if !car_ids.contains(id) {
                car_ids.push(id.clone());
            }
        }

        Self {
            mode: DraftMode::Edit {
                original_name: car_type.name.clone(),
            },
            name: car_type.name.clone(),
            model_number: car_type.model_number.clone(),
            manufactured_count: car_type.manufactured_count,
            car_ids,
            ecus: car_type.ecus.iter().map(DraftEcu::from).collect(),
            selection: EcuSelection::None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn mode(&self) -> &DraftMode {
        &self.mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_number(&self) -> &str {
        &self.model_number
    }

    pub fn manufactured_count(&self) -> u64 {
        self.manufactured_count
    }

    pub fn car_ids(&self) -> &[String] {
        &self.car_ids
    }

    pub fn ecus(&self) -> &[DraftEcu] {
        &self.ecus
    }

    pub fn selection(&self) -> EcuSelection {
        self.selection
    }

    pub fn selected_ecu(&self) -> Option<&DraftEcu> {
        self.selection.index().and_then(|i| self.ecus.get(i))
    }

    /// Lowercased car type name every new version is made compatible with
    pub fn owner_car_type(&self) -> String {
        self.name.trim().to_lowercase()
    }

    /// Number of versions still waiting for their file upload
    pub fn pending_uploads(&self) -> usize {
        self.ecus
            .iter()
            .flat_map(|ecu| &ecu.versions)
            .filter(|v| v.source.is_pending())
            .count()
    }

    // =========================================================================
    // Basic fields
    // =========================================================================

    /// Rename the car type (create mode only)
    ///
    /// Versions added in this draft move their owner entry to the new name.
    pub fn set_name(&mut self, name: impl Into<String>) -> DraftResult<()> {
        if matches!(self.mode, DraftMode::Edit { .. }) {
            return reject(DraftError::NameLocked);
        }
        let old_owner = self.owner_car_type();
        self.name = name.into();
        let new_owner = self.owner_car_type();
        if old_owner == new_owner {
            return Ok(());
        }

        for version in self
            .ecus
            .iter_mut()
            .flat_map(|ecu| ecu.versions.iter_mut())
            .filter(|v| v.added)
        {
            let compatible = &mut version.compatible_car_types;
            compatible.retain(|name| name != &old_owner);
            if !new_owner.is_empty() && !compatible.contains(&new_owner) {
                compatible.push(new_owner.clone());
            }
        }
        Ok(())
    }

    pub fn set_model_number(&mut self, model_number: impl Into<String>) {
        self.model_number = model_number.into();
    }

    pub fn set_manufactured_count(&mut self, count: u64) {
        self.manufactured_count = count;
    }

    /// Set the count from operator input, see [`coerce_count`]
    pub fn set_manufactured_count_input(&mut self, input: &str) {
        self.manufactured_count = coerce_count(input);
    }

    // =========================================================================
    // Car IDs
    // =========================================================================

    pub fn add_car_id(&mut self, id: impl Into<String>) -> DraftResult<()> {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return reject(DraftError::MissingField("Car ID"));
        }
        if self.car_ids.iter().any(|existing| existing == id) {
            return reject(DraftError::DuplicateCarId(id.to_string()));
        }
        self.car_ids.push(id.to_string());
        Ok(())
    }

    pub fn remove_car_id(&mut self, id: &str) -> DraftResult<()> {
        match self.car_ids.iter().position(|existing| existing == id) {
            Some(pos) => {
                self.car_ids.remove(pos);
                Ok(())
            }
            None => reject(DraftError::UnknownCarId(id.to_string())),
        }
    }

    // =========================================================================
    // ECUs
    // =========================================================================

    /// Attach a catalog ECU, keeping its firmware history as read
    pub fn add_existing_ecu(&mut self, ecu: &Ecu) -> DraftResult<()> {
        self.ensure_unique_ecu(&ecu.key())?;
        self.ecus.push(DraftEcu::from(ecu));
        debug!(ecu = %ecu.key(), "Attached existing ECU");
        Ok(())
    }

    /// Add a brand new ECU without versions
    pub fn add_new_ecu(
        &mut self,
        name: impl Into<String>,
        model_number: impl Into<String>,
    ) -> DraftResult<()> {
        let name = name.into().trim().to_string();
        let model_number = model_number.into().trim().to_string();

        if name.is_empty() {
            return reject(DraftError::MissingField("ECU name"));
        }
        if model_number.is_empty() {
            return reject(DraftError::MissingField("ECU model number"));
        }

        let key = EcuKey::new(name, model_number);
        self.ensure_unique_ecu(&key)?;
        debug!(ecu = %key, "Added new ECU");
        self.ecus.push(DraftEcu {
            name: key.name,
            model_number: key.model_number,
            versions: Vec::new(),
        });
        Ok(())
    }

    /// Remove the ECU at `index`; the selection keeps following its ECU
    pub fn remove_ecu(&mut self, index: usize) -> DraftResult<DraftEcu> {
        if index >= self.ecus.len() {
            return reject(DraftError::EcuIndexOutOfRange(index));
        }
        let removed = self.ecus.remove(index);
        self.selection = self.selection.after_removal(index);
        Ok(removed)
    }

    /// Point the version editor at the ECU at `index`
    pub fn select_ecu(&mut self, index: usize) -> DraftResult<()> {
        if index >= self.ecus.len() {
            return reject(DraftError::EcuIndexOutOfRange(index));
        }
        self.selection = EcuSelection::Selected(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = EcuSelection::None;
    }

    /// Position of an ECU by natural key
    pub fn find_ecu(&self, key: &EcuKey) -> Option<usize> {
        self.ecus.iter().position(|ecu| ecu.key() == *key)
    }

    fn ensure_unique_ecu(&self, key: &EcuKey) -> DraftResult<()> {
        if self.find_ecu(key).is_some() {
            return reject(DraftError::DuplicateEcu(key.clone()));
        }
        Ok(())
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Append a firmware version to the ECU at `ecu_index`
    ///
    /// The owning car type (lowercased) is always added to the compatible
    /// set, whatever the operator picked.
    pub fn add_version<S: AsRef<str>>(
        &mut self,
        ecu_index: usize,
        version_number: &str,
        source: HexSource,
        compatible_car_types: &[S],
    ) -> DraftResult<()> {
        let version_number = version_number.trim();
        if version_number.is_empty() {
            return reject(DraftError::MissingField("Version number"));
        }
        if source.is_empty() {
            return reject(DraftError::MissingField("Firmware file"));
        }

        let owner = self.owner_car_type();
        let ecu = match self.ecus.get_mut(ecu_index) {
            Some(ecu) => ecu,
            None => return reject(DraftError::EcuIndexOutOfRange(ecu_index)),
        };

        if ecu.has_version(version_number) {
            return reject(DraftError::DuplicateVersion {
                ecu: ecu.key(),
                version_number: version_number.to_string(),
            });
        }

        let mut compatible = normalize_car_types(compatible_car_types);
        if !owner.is_empty() && !compatible.contains(&owner) {
            compatible.push(owner);
        }

        debug!(
            ecu = %ecu.key(),
            version = version_number,
            pending_upload = source.is_pending(),
            "Added version"
        );
        ecu.versions.push(DraftVersion {
            version_number: version_number.to_string(),
            compatible_car_types: compatible,
            source,
            added: true,
        });
        Ok(())
    }

    /// [`add_version`](Self::add_version) on the currently selected ECU
    pub fn add_version_to_selected<S: AsRef<str>>(
        &mut self,
        version_number: &str,
        source: HexSource,
        compatible_car_types: &[S],
    ) -> DraftResult<()> {
        match self.selection.index() {
            Some(index) => self.add_version(index, version_number, source, compatible_car_types),
            None => reject(DraftError::NoEcuSelected),
        }
    }

    pub fn remove_version(
        &mut self,
        ecu_index: usize,
        version_index: usize,
    ) -> DraftResult<DraftVersion> {
        let ecu = match self.ecus.get_mut(ecu_index) {
            Some(ecu) => ecu,
            None => return reject(DraftError::EcuIndexOutOfRange(ecu_index)),
        };
        if version_index >= ecu.versions.len() {
            return reject(DraftError::VersionIndexOutOfRange {
                ecu_index,
                version_index,
            });
        }
        Ok(ecu.versions.remove(version_index))
    }

    /// Compatibility choices to offer for a new version of the ECU at `ecu_index`
    ///
    /// Car types already carrying firmware for the same ECU family, plus
    /// this draft's own car type.
    pub fn compatibility_choices(
        &self,
        ecu_index: usize,
        catalog: &[CarType],
    ) -> DraftResult<BTreeSet<String>> {
        let ecu = self
            .ecus
            .get(ecu_index)
            .ok_or(DraftError::EcuIndexOutOfRange(ecu_index))?;
        let mut choices = compute_compatible_car_types(&ecu.name, catalog);
        let owner = self.owner_car_type();
        if !owner.is_empty() {
            choices.insert(owner);
        }
        Ok(choices)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Check the fields the backend requires
    pub fn validate_for_submit(&self) -> DraftResult<()> {
        if self.name.trim().is_empty() {
            return reject(DraftError::MissingField("Car type name"));
        }
        if self.model_number.trim().is_empty() {
            return reject(DraftError::MissingField("Car type model number"));
        }
        Ok(())
    }

    /// Wire-ready car type, valid only once every upload is resolved
    ///
    /// Use [`to_submission_payload`](Self::to_submission_payload) to upload
    /// pending files first.
    pub fn to_payload(&self) -> DraftResult<CarType> {
        let mut ecus = Vec::with_capacity(self.ecus.len());

        for ecu in &self.ecus {
            let mut versions = Vec::with_capacity(ecu.versions.len());
            for version in &ecu.versions {
                let hex_file_path = match &version.source {
                    HexSource::Resolved { hex_file_path } => hex_file_path.clone(),
                    HexSource::Pending { .. } => {
                        return Err(DraftError::UnresolvedUpload {
                            ecu: ecu.key(),
                            version_number: version.version_number.clone(),
                        })
                    }
                };
                versions.push(FirmwareVersion {
                    version_number: version.version_number.clone(),
                    compatible_car_types: version.compatible_car_types.clone(),
                    hex_file_path,
                });
            }
            ecus.push(Ecu {
                name: ecu.name.clone(),
                model_number: ecu.model_number.clone(),
                versions,
            });
        }

        Ok(CarType {
            name: self.name.trim().to_string(),
            model_number: self.model_number.trim().to_string(),
            manufactured_count: self.manufactured_count,
            car_ids: self.car_ids.clone(),
            ecus,
        })
    }

    /// Replace the file reference of one version with its durable path
    pub(crate) fn resolve_version(
        &mut self,
        ecu_index: usize,
        version_index: usize,
        hex_file_path: String,
    ) {
        if let Some(version) = self
            .ecus
            .get_mut(ecu_index)
            .and_then(|ecu| ecu.versions.get_mut(version_index))
        {
            version.source = HexSource::Resolved { hex_file_path };
        }
    }

    /// Continue editing from the car type the backend accepted
    ///
    /// Switches to edit mode, adopts the resolved firmware paths and clears
    /// the ECU selection.
    pub fn finish_submit(&mut self, accepted: &CarType) {
        *self = Self::from_car_type(accepted);
    }

    /// Reset editor state when the operator abandons the form
    pub fn cancel(&mut self) {
        self.selection = EcuSelection::None;
    }
}

/// Coerce operator input to a non-negative count
///
/// Parses the leading integer (`"12abc"` is 12); anything non-numeric is 0
/// and negative values clamp to 0.
pub fn coerce_count(input: &str) -> u64 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];

    if negative || digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

pub(crate) fn normalize_car_types<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(names.len() + 1);
    for name in names {
        let name = name.as_ref().trim().to_lowercase();
        if !name.is_empty() && !normalized.contains(&name) {
            normalized.push(name);
        }
    }
    normalized
}

fn reject<T>(err: DraftError) -> DraftResult<T> {
    warn!("Draft change rejected: {}", err);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sedan_draft() -> CarTypeDraft {
        CarTypeDraft::new("Sedan", "M1")
    }

    fn hex(name: &str) -> HexSource {
        HexSource::pending(LocalHexFile::new(format!("/firmware/{}", name), 128))
    }

    fn catalog_ecu() -> Ecu {
        Ecu {
            name: "ECU-A".into(),
            model_number: "V1".into(),
            versions: vec![FirmwareVersion {
                version_number: "0.9".into(),
                compatible_car_types: vec!["coupe".into()],
                hex_file_path: "https://blob/ecu-a-0.9.hex".into(),
            }],
        }
    }

    #[test]
    fn test_duplicate_ecu_is_rejected_without_mutation() {
        let mut draft = sedan_draft();
        draft.add_existing_ecu(&catalog_ecu()).unwrap();
        let before = draft.clone();

        assert_eq!(
            draft.add_new_ecu("ECU-A", "V1"),
            Err(DraftError::DuplicateEcu(EcuKey::new("ECU-A", "V1")))
        );
        assert_eq!(
            draft.add_existing_ecu(&catalog_ecu()),
            Err(DraftError::DuplicateEcu(EcuKey::new("ECU-A", "V1")))
        );
        assert_eq!(draft, before);

        // Same name, other model is a different ECU
        draft.add_new_ecu("ECU-A", "V2").unwrap();
        assert_eq!(draft.ecus().len(), 2);
    }

    #[test]
    fn test_existing_ecu_keeps_history() {
        let mut draft = sedan_draft();
        draft.add_existing_ecu(&catalog_ecu()).unwrap();
        let versions = &draft.ecus()[0].versions;
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].compatible_car_types, vec!["coupe"]);
        assert_eq!(
            versions[0].source,
            HexSource::resolved("https://blob/ecu-a-0.9.hex")
        );
    }

    #[test]
    fn test_new_ecu_requires_both_fields() {
        let mut draft = sedan_draft();
        assert_eq!(
            draft.add_new_ecu("", "V1"),
            Err(DraftError::MissingField("ECU name"))
        );
        assert_eq!(
            draft.add_new_ecu("ECU-A", "  "),
            Err(DraftError::MissingField("ECU model number"))
        );
        assert!(draft.ecus().is_empty());
    }

    #[test]
    fn test_duplicate_version_is_rejected_without_mutation() {
        let mut draft = sedan_draft();
        draft.add_existing_ecu(&catalog_ecu()).unwrap();
        let before = draft.clone();

        let err = draft
            .add_version(0, "0.9", hex("other.hex"), &["sedan"])
            .unwrap_err();
        assert_eq!(
            err,
            DraftError::DuplicateVersion {
                ecu: EcuKey::new("ECU-A", "V1"),
                version_number: "0.9".into(),
            }
        );
        assert_eq!(draft, before);
    }

    #[test]
    fn test_owner_car_type_is_always_compatible() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("ECU-A", "V1").unwrap();

        draft
            .add_version(0, "1.0", hex("a.hex"), &[] as &[&str])
            .unwrap();
        draft
            .add_version(0, "1.1", hex("b.hex"), &["Coupe", "coupe", " "])
            .unwrap();
        draft
            .add_version(0, "1.2", hex("c.hex"), &["SEDAN"])
            .unwrap();

        let versions = &draft.ecus()[0].versions;
        assert_eq!(versions[0].compatible_car_types, vec!["sedan"]);
        assert_eq!(versions[1].compatible_car_types, vec!["coupe", "sedan"]);
        assert_eq!(versions[2].compatible_car_types, vec!["sedan"]);
    }

    #[test]
    fn test_version_requires_number_and_file() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("ECU-A", "V1").unwrap();

        assert_eq!(
            draft.add_version(0, " ", hex("a.hex"), &[] as &[&str]),
            Err(DraftError::MissingField("Version number"))
        );
        assert_eq!(
            draft.add_version(0, "1.0", HexSource::resolved(""), &[] as &[&str]),
            Err(DraftError::MissingField("Firmware file"))
        );
        assert_eq!(
            draft.add_version(3, "1.0", hex("a.hex"), &[] as &[&str]),
            Err(DraftError::EcuIndexOutOfRange(3))
        );
        assert!(draft.ecus()[0].versions.is_empty());
    }

    #[test]
    fn test_version_on_selected_ecu() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("ECU-A", "V1").unwrap();
        draft.add_new_ecu("ECU-B", "V1").unwrap();

        assert_eq!(
            draft.add_version_to_selected("1.0", hex("a.hex"), &[] as &[&str]),
            Err(DraftError::NoEcuSelected)
        );

        draft.select_ecu(1).unwrap();
        draft
            .add_version_to_selected("1.0", hex("b.hex"), &[] as &[&str])
            .unwrap();
        assert!(draft.ecus()[0].versions.is_empty());
        assert_eq!(draft.ecus()[1].versions.len(), 1);
    }

    #[test]
    fn test_selection_follows_removals() {
        let mut draft = sedan_draft();
        for name in ["A", "B", "C"] {
            draft.add_new_ecu(name, "V1").unwrap();
        }

        draft.select_ecu(2).unwrap();
        draft.remove_ecu(0).unwrap();
        assert_eq!(draft.selection(), EcuSelection::Selected(1));
        assert_eq!(draft.selected_ecu().unwrap().name, "C");

        draft.remove_ecu(1).unwrap();
        assert_eq!(draft.selection(), EcuSelection::None);

        draft.select_ecu(0).unwrap();
        draft.add_new_ecu("D", "V1").unwrap();
        draft.remove_ecu(1).unwrap();
        assert_eq!(draft.selection(), EcuSelection::Selected(0));
        assert_eq!(draft.selected_ecu().unwrap().name, "B");

        assert_eq!(draft.remove_ecu(7), Err(DraftError::EcuIndexOutOfRange(7)));
    }

    #[test]
    fn test_submit_and_cancel_clear_selection() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("A", "V1").unwrap();
        draft.select_ecu(0).unwrap();
        draft.cancel();
        assert_eq!(draft.selection(), EcuSelection::None);

        draft.select_ecu(0).unwrap();
        let accepted = draft.to_payload().unwrap();
        draft.finish_submit(&accepted);
        assert_eq!(draft.selection(), EcuSelection::None);
        assert_eq!(
            draft.mode(),
            &DraftMode::Edit {
                original_name: "Sedan".into()
            }
        );
        assert_eq!(draft.ecus()[0].name, "A");
    }

    #[test]
    fn test_remove_version() {
        let mut draft = sedan_draft();
        draft.add_existing_ecu(&catalog_ecu()).unwrap();
        let removed = draft.remove_version(0, 0).unwrap();
        assert_eq!(removed.version_number, "0.9");
        assert!(draft.ecus()[0].versions.is_empty());
        assert_eq!(
            draft.remove_version(0, 0),
            Err(DraftError::VersionIndexOutOfRange {
                ecu_index: 0,
                version_index: 0
            })
        );
    }

    #[test]
    fn test_car_ids_have_set_semantics() {
        let mut draft = sedan_draft();
        draft.add_car_id("VIN-1").unwrap();
        assert_eq!(
            draft.add_car_id("VIN-1"),
            Err(DraftError::DuplicateCarId("VIN-1".into()))
        );
        assert_eq!(draft.car_ids(), ["VIN-1".to_string()]);

        assert_eq!(draft.add_car_id(""), Err(DraftError::MissingField("Car ID")));
        draft.remove_car_id("VIN-1").unwrap();
        assert!(draft.car_ids().is_empty());
        assert_eq!(
            draft.remove_car_id("VIN-1"),
            Err(DraftError::UnknownCarId("VIN-1".into()))
        );
    }

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count("42"), 42);
        assert_eq!(coerce_count(" 12abc"), 12);
        assert_eq!(coerce_count("abc"), 0);
        assert_eq!(coerce_count(""), 0);
        assert_eq!(coerce_count("-5"), 0);
        assert_eq!(coerce_count("+7"), 7);
    }

    #[test]
    fn test_rename_moves_owner_of_added_versions() {
        let mut draft = sedan_draft();
        draft.add_existing_ecu(&catalog_ecu()).unwrap();
        draft
            .add_version(0, "1.0", hex("a.hex"), &["coupe"])
            .unwrap();
        draft.add_new_ecu("ECU-B", "V2").unwrap();
        draft
            .add_version(1, "2.0", HexSource::resolved("blob"), &[] as &[&str])
            .unwrap();

        draft.set_name("Wagon").unwrap();

        let versions = &draft.ecus()[0].versions;
        assert_eq!(versions[0].compatible_car_types, vec!["coupe"]);
        assert_eq!(versions[1].compatible_car_types, vec!["coupe", "wagon"]);
        assert_eq!(
            draft.ecus()[1].versions[0].compatible_car_types,
            vec!["wagon"]
        );

        let payload = draft.to_payload().unwrap();
        assert_eq!(payload.name, "Wagon");
        assert_eq!(
            payload.ecus[1].versions[0].compatible_car_types,
            vec!["wagon"]
        );
    }

    #[test]
    fn test_unnamed_draft_gains_owner_on_rename() {
        let mut draft = CarTypeDraft::new("", "M1");
        draft.add_new_ecu("ECU-A", "V1").unwrap();
        draft
            .add_version(0, "1.0", hex("a.hex"), &[] as &[&str])
            .unwrap();
        assert!(draft.ecus()[0].versions[0].compatible_car_types.is_empty());

        draft.set_name("Sedan").unwrap();
        assert_eq!(
            draft.ecus()[0].versions[0].compatible_car_types,
            vec!["sedan"]
        );
    }

    #[test]
    fn test_name_locked_in_edit_mode() {
        let car_type = CarType {
            name: "sedan".into(),
            model_number: "M1".into(),
            manufactured_count: 3,
            car_ids: vec!["a".into(), "a".into(), "b".into()],
            ecus: vec![catalog_ecu()],
        };
        let mut draft = CarTypeDraft::from_car_type(&car_type);
        assert_eq!(draft.car_ids(), ["a".to_string(), "b".to_string()]);
        assert_eq!(draft.set_name("coupe"), Err(DraftError::NameLocked));
        assert_eq!(draft.name(), "sedan");
    }

    #[test]
    fn test_payload_requires_resolved_uploads() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("ECU-A", "V1").unwrap();
        draft
            .add_version(0, "1.0", hex("a.hex"), &[] as &[&str])
            .unwrap();
        assert_eq!(draft.pending_uploads(), 1);
        assert_eq!(
            draft.to_payload(),
            Err(DraftError::UnresolvedUpload {
                ecu: EcuKey::new("ECU-A", "V1"),
                version_number: "1.0".into(),
            })
        );
    }

    #[test]
    fn test_payload_has_no_transient_fields() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("ECU-A", "V1").unwrap();
        draft
            .add_version(0, "1.0", HexSource::resolved("https://blob/a.hex"), &["coupe"])
            .unwrap();

        let payload = serde_json::to_value(draft.to_payload().unwrap()).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "name": "Sedan",
                "model_number": "M1",
                "manufactured_count": 0,
                "car_ids": [],
                "ecus": [{
                    "name": "ECU-A",
                    "model_number": "V1",
                    "versions": [{
                        "version_number": "1.0",
                        "compatible_car_types": ["coupe", "sedan"],
                        "hex_file_path": "https://blob/a.hex"
                    }]
                }]
            })
        );
    }

    #[test]
    fn test_draft_serialization_keeps_pending_file() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("ECU-A", "V1").unwrap();
        draft
            .add_version(0, "1.0", hex("a.hex"), &[] as &[&str])
            .unwrap();
        draft
            .add_version(0, "1.1", HexSource::resolved("blob"), &[] as &[&str])
            .unwrap();

        let json = serde_json::to_value(&draft).unwrap();
        let versions = &json["ecus"][0]["versions"];
        assert_eq!(versions[0]["hexFile"]["hexFileName"], "a.hex");
        assert_eq!(versions[0]["hexFile"]["hexFileSize"], 128);
        assert_eq!(versions[1]["hex_file_path"], "blob");

        let restored: CarTypeDraft = serde_json::from_value(json).unwrap();
        assert_eq!(restored, draft);
    }

    #[test]
    fn test_compatibility_choices_include_owner() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("ECU-A", "V9").unwrap();
        let catalog = vec![CarType {
            name: "Coupe".into(),
            model_number: "C1".into(),
            manufactured_count: 0,
            car_ids: vec![],
            ecus: vec![catalog_ecu()],
        }];

        let choices = draft.compatibility_choices(0, &catalog).unwrap();
        let choices: Vec<&str> = choices.iter().map(String::as_str).collect();
        assert_eq!(choices, vec!["coupe", "sedan"]);
    }

    /// Walkthrough of the basic create flow
    #[test]
    fn test_scenario_sedan_ecu_a() {
        let mut draft = sedan_draft();
        draft.add_new_ecu("ECU-A", "V1").unwrap();
        assert_eq!(
            draft.ecus(),
            [DraftEcu {
                name: "ECU-A".into(),
                model_number: "V1".into(),
                versions: vec![],
            }]
        );

        draft.select_ecu(0).unwrap();
        draft
            .add_version(0, "v1.0.0", hex("file1.hex"), &[] as &[&str])
            .unwrap();
        assert_eq!(draft.ecus()[0].versions[0].version_number, "v1.0.0");
        assert_eq!(
            draft.ecus()[0].versions[0].compatible_car_types,
            vec!["sedan"]
        );

        assert!(draft
            .add_version(0, "v1.0.0", hex("file2.hex"), &[] as &[&str])
            .is_err());
        assert_eq!(draft.ecus()[0].versions.len(), 1);
    }
}
