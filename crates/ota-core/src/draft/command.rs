//! Draft edits as serializable commands
//!
//! Every editor action maps to one [`DraftCommand`]; [`CarTypeDraft::apply`]
//! is the single reducer that runs them against a draft. The CLI records
//! commands as JSON (`{"op": "add_new_ecu", "value": {...}}`).

use serde::{Deserialize, Serialize};

use super::{CarTypeDraft, HexSource};
use crate::error::DraftResult;
use crate::models::Ecu;

/// A single edit to a [`CarTypeDraft`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum DraftCommand {
    SetName(String),
    SetModelNumber(String),
    /// Raw count; negative values are stored as 0
    SetManufacturedCount(i64),
    AddCarId(String),
    RemoveCarId(String),
    AddExistingEcu(Ecu),
    AddNewEcu {
        name: String,
        model_number: String,
    },
    RemoveEcu(usize),
    SelectEcu(usize),
    ClearSelection,
    AddVersion {
        ecu_index: usize,
        version_number: String,
        source: HexSource,
        #[serde(default)]
        compatible_car_types: Vec<String>,
    },
    RemoveVersion {
        ecu_index: usize,
        version_index: usize,
    },
}

impl CarTypeDraft {
    /// Apply one command; on error the draft is unchanged
    pub fn apply(&mut self, command: DraftCommand) -> DraftResult<()> {
        match command {
            DraftCommand::SetName(name) => self.set_name(name),
            DraftCommand::SetModelNumber(model_number) => {
                self.set_model_number(model_number);
                Ok(())
            }
            DraftCommand::SetManufacturedCount(count) => {
                self.set_manufactured_count(u64::try_from(count).unwrap_or(0));
                Ok(())
            }
            DraftCommand::AddCarId(id) => self.add_car_id(id),
            DraftCommand::RemoveCarId(id) => self.remove_car_id(&id),
            DraftCommand::AddExistingEcu(ecu) => self.add_existing_ecu(&ecu),
            DraftCommand::AddNewEcu { name, model_number } => self.add_new_ecu(name, model_number),
            DraftCommand::RemoveEcu(index) => self.remove_ecu(index).map(|_| ()),
            DraftCommand::SelectEcu(index) => self.select_ecu(index),
            DraftCommand::ClearSelection => {
                self.clear_selection();
                Ok(())
            }
            DraftCommand::AddVersion {
                ecu_index,
                version_number,
                source,
                compatible_car_types,
            } => self.add_version(
                ecu_index,
                &version_number,
                source,
                compatible_car_types.as_slice(),
            ),
            DraftCommand::RemoveVersion {
                ecu_index,
                version_index,
            } => self.remove_version(ecu_index, version_index).map(|_| ()),
        }
    }

    /// Apply commands in order as one change
    ///
    /// The first rejection discards the whole batch and leaves the draft as
    /// it was. Returns how many commands were applied.
    pub fn apply_all<I>(&mut self, commands: I) -> DraftResult<usize>
    where
        I: IntoIterator<Item = DraftCommand>,
    {
        let mut staged = self.clone();
        let mut applied = 0;
        for command in commands {
            staged.apply(command)?;
            applied += 1;
        }
        *self = staged;
        Ok(applied)
    }
}
