//! Car type draft persisted between commands
//!
//! The draft is stored as pretty JSON. Firmware files that are not uploaded
//! yet keep their local path, file name and size so a later `draft submit`
//! can upload them.

use anyhow::{bail, Context, Result};
use ota_core::CarTypeDraft;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Draft file used when `--file` is not given
pub const DEFAULT_DRAFT_FILE: &str = "car-type-draft.json";

/// Location of one draft on disk
#[derive(Debug, Clone)]
pub struct DraftFile {
    path: PathBuf,
}

impl DraftFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<CarTypeDraft> {
        if !self.exists() {
            bail!(
                "No draft at {}; start one with `draft new` or `draft edit`",
                self.path.display()
            );
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read draft file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse draft file: {}", self.path.display()))
    }

    pub fn save(&self, draft: &CarTypeDraft) -> Result<()> {
        let content = serde_json::to_string_pretty(draft).context("Failed to serialize draft")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write draft file: {}", self.path.display()))?;
        debug!("Draft saved to {}", self.path.display());
        Ok(())
    }

    /// Start a new draft file; refuses to replace one unless `force`
    pub fn create(&self, draft: &CarTypeDraft, force: bool) -> Result<()> {
        if self.exists() && !force {
            bail!(
                "Draft {} already exists; use --force to replace it",
                self.path.display()
            );
        }
        self.save(draft)
    }

    pub fn discard(&self) -> Result<()> {
        if self.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove draft file: {}", self.path.display()))?;
        }
        Ok(())
    }
}
