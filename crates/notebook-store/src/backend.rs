//! The storage backend protocol and the registry of backend kinds.
//!
//! A backend maps notebooks onto repositories and notes onto files of one
//! remote host type. Exactly one backend is active at a time; which one is
//! decided when the user connects, by looking its kind up in a
//! [`BackendRegistry`] and handing it the saved connection options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use notebook_core::{Note, Notebook};

use crate::error::{StoreError, StoreResult};
use crate::{gitlab, memory};

/// Connection options of a backend, keyed by option name.
pub type BackendOptions = BTreeMap<String, String>;

/// Constructor stored in a [`BackendDescriptor`].
pub type Connector = fn(&BackendOptions) -> StoreResult<Arc<dyn StorageBackend>>;

/// A configuration field a backend needs before it can connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredOption {
    /// Key in [`BackendOptions`].
    pub name: &'static str,
    /// Prompt shown to the user.
    pub title: &'static str,
    /// Prompted for, but may be left empty; the backend decides how to
    /// proceed without it.
    pub optional: bool,
}

/// Static description of a backend kind.
#[derive(Debug, Clone, Copy)]
pub struct BackendDescriptor {
    /// Registry key, e.g. `"gitlab"`.
    pub kind: &'static str,
    /// Name shown in the connection chooser.
    pub display_name: &'static str,
    /// Options that must be present, in prompt order.
    pub required_options: &'static [RequiredOption],
    /// Label of a saved connection profile built from these options.
    pub saved_name: fn(&BackendOptions) -> String,
    /// Build a backend from its options.
    pub connect: Connector,
}

impl BackendDescriptor {
    /// Non-optional options that are absent or empty in `options`.
    pub fn missing_options(&self, options: &BackendOptions) -> Vec<&'static str> {
        self.required_options
            .iter()
            .filter(|option| !option.optional)
            .filter(|option| {
                options
                    .get(option.name)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .map(|option| option.name)
            .collect()
    }
}

/// Notebook and note CRUD against one remote host.
///
/// Every method suspends only on I/O. Failures are returned to the caller
/// unchanged, except in [`StorageBackend::notes`] which reports a missing
/// collection as an empty one.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Static description of this backend's kind.
    fn descriptor(&self) -> &'static BackendDescriptor;

    /// Establish credentials. Resolves immediately when already authorized.
    async fn authorize(&self) -> StoreResult<()>;

    /// Name of the authenticated user.
    async fn username(&self) -> StoreResult<String>;

    /// All notebooks visible to the user.
    async fn notebooks(&self) -> StoreResult<Vec<Notebook>>;

    /// Notes of `notebook`; empty rather than failing when it has none.
    async fn notes(&self, notebook: &Notebook) -> StoreResult<Vec<Note>>;

    /// Create an empty note with a fresh id and return it as stored.
    async fn create_note(&self, notebook: &Notebook) -> StoreResult<Note>;

    /// Replace the content of `note` and return it as stored.
    ///
    /// The returned note may carry a different id than `note`.
    async fn update_note(
        &self,
        notebook: &Notebook,
        note: &Note,
        content: &str,
    ) -> StoreResult<Note>;

    /// Delete `note`.
    async fn remove_note(&self, notebook: &Notebook, note: &Note) -> StoreResult<()>;
}

/// Maps backend kinds to their descriptors.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    descriptors: Vec<&'static BackendDescriptor>,
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every backend shipped with this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(&gitlab::DESCRIPTOR);
        registry.register(&memory::DESCRIPTOR);
        registry
    }

    /// Add a backend kind, replacing any previous one of the same kind.
    pub fn register(&mut self, descriptor: &'static BackendDescriptor) {
        match self
            .descriptors
            .iter_mut()
            .find(|existing| existing.kind == descriptor.kind)
        {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    /// Descriptor registered under `kind`.
    pub fn get(&self, kind: &str) -> Option<&'static BackendDescriptor> {
        self.descriptors
            .iter()
            .copied()
            .find(|descriptor| descriptor.kind == kind)
    }

    /// All descriptors in registration order.
    pub fn descriptors(&self) -> &[&'static BackendDescriptor] {
        &self.descriptors
    }

    /// Construct the backend registered under `kind`.
    ///
    /// Fails if the kind is unknown or a required option is missing.
    pub fn connect(
        &self,
        kind: &str,
        options: &BackendOptions,
    ) -> StoreResult<Arc<dyn StorageBackend>> {
        let descriptor = self
            .get(kind)
            .ok_or_else(|| StoreError::UnknownBackend(kind.to_string()))?;

        if let Some(name) = descriptor.missing_options(options).first() {
            return Err(StoreError::MissingOption {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }

        tracing::debug!(kind, "Constructing storage backend");
        (descriptor.connect)(options)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> BackendOptions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_registered_in_order() {
        let registry = BackendRegistry::with_defaults();
        let kinds: Vec<&str> = registry.descriptors().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![gitlab::KIND, memory::KIND]);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let registry = BackendRegistry::with_defaults();
        let err = registry.connect("svn", &BackendOptions::new()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownBackend(kind) if kind == "svn"));
    }

    #[test]
    fn missing_required_option_is_rejected() {
        let registry = BackendRegistry::with_defaults();
        let err = registry
            .connect(gitlab::KIND, &options(&[("baseUrl", "  ")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingOption { name, .. } if name == "baseUrl"));
    }

    #[test]
    fn missing_options_lists_every_gap() {
        let missing = gitlab::DESCRIPTOR.missing_options(&BackendOptions::new());
        assert_eq!(missing, vec!["baseUrl"]);
    }

    #[test]
    fn optional_option_may_be_empty() {
        let registry = BackendRegistry::with_defaults();
        let backend = registry
            .connect(
                gitlab::KIND,
                &options(&[("baseUrl", "https://git.example.com"), ("token", "")]),
            )
            .unwrap();
        assert_eq!(backend.descriptor().kind, gitlab::KIND);
    }

    #[test]
    fn register_replaces_same_kind() {
        fn scratch_name(_: &BackendOptions) -> String {
            "Scratch".to_string()
        }

        static CUSTOM: BackendDescriptor = BackendDescriptor {
            kind: memory::KIND,
            display_name: "Scratch",
            required_options: &[],
            saved_name: scratch_name,
            connect: memory::connect,
        };

        let mut registry = BackendRegistry::with_defaults();
        registry.register(&CUSTOM);

        assert_eq!(registry.descriptors().len(), 2);
        assert_eq!(registry.get(memory::KIND).unwrap().display_name, "Scratch");
    }

    #[test]
    fn connect_builds_backend_of_requested_kind() {
        let registry = BackendRegistry::with_defaults();
        let backend = registry.connect(memory::KIND, &BackendOptions::new()).unwrap();
        assert_eq!(backend.descriptor().kind, memory::KIND);
    }

    #[test]
    fn saved_name_labels_profile() {
        let saved_name = gitlab::DESCRIPTOR.saved_name;
        let name = saved_name(&options(&[("baseUrl", "https://git.example.com")]));
        assert_eq!(name, "Gitlab (https://git.example.com)");
    }
}
