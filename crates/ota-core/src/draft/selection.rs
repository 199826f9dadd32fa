//! Which ECU the version editor is operating on

use serde::{Deserialize, Serialize};

/// Selection pointer for the per-ECU version editor
///
/// Tracks the identity of the selected ECU across list mutations: removing
/// an ECU in front of the selection shifts the index down, removing the
/// selected ECU clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcuSelection {
    #[default]
    None,
    Selected(usize),
}

impl EcuSelection {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Selected(i) => Some(*i),
        }
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.index() == Some(index)
    }

    /// State after the ECU at `removed` has been taken out of the list
    #[must_use]
    pub fn after_removal(self, removed: usize) -> Self {
        match self {
            Self::None => Self::None,
            Self::Selected(i) if i == removed => Self::None,
            Self::Selected(i) if i > removed => Self::Selected(i - 1),
            selected => selected,
        }
    }
}
