//! Saved connection profiles.
//!
//! Profiles are kept as a JSON array in a single file. The file is read and
//! rewritten whole; a missing file is an empty list.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use notebook_store::{BackendOptions, BackendRegistry};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A named backend connection the user can reopen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedConnectionProfile {
    pub name: String,
    pub backend_kind: String,
    #[serde(default)]
    pub options: BackendOptions,
}

impl SavedConnectionProfile {
    /// A profile named after the backend's label for `options`.
    ///
    /// Falls back to the kind itself for unregistered backends.
    pub fn labelled(registry: &BackendRegistry, kind: &str, options: BackendOptions) -> Self {
        let name = registry
            .get(kind)
            .map(|descriptor| (descriptor.saved_name)(&options))
            .unwrap_or_else(|| kind.to_string());
        Self {
            name,
            backend_kind: kind.to_string(),
            options,
        }
    }
}

/// File-backed list of profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every profile, in saved order.
    pub fn load(&self) -> AppResult<Vec<SavedConnectionProfile>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file contents with `profiles`.
    pub fn save(&self, profiles: &[SavedConnectionProfile]) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(profiles)?)?;
        tracing::debug!(path = %self.path.display(), count = profiles.len(), "Profiles saved");
        Ok(())
    }

    /// Add `profile`, replacing one with the same name in place.
    pub fn upsert(&self, profile: SavedConnectionProfile) -> AppResult<()> {
        let mut profiles = self.load()?;
        match profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
        self.save(&profiles)
    }

    /// Delete the profile called `name`.
    pub fn remove(&self, name: &str) -> AppResult<SavedConnectionProfile> {
        let mut profiles = self.load()?;
        let position = profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| AppError::ProfileNotFound(name.to_string()))?;
        let removed = profiles.remove(position);
        self.save(&profiles)?;
        Ok(removed)
    }

    /// Look up the profile called `name`.
    pub fn find(&self, name: &str) -> AppResult<SavedConnectionProfile> {
        self.load()?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| AppError::ProfileNotFound(name.to_string()))
    }
}
