//! notebook-store: Storage backends for the notebook client
//!
//! This crate provides:
//! - The [`StorageBackend`] protocol every remote host implementation satisfies
//! - A [`BackendRegistry`] mapping backend kinds to their descriptors
//! - The paginated [`QueryClient`] used to talk to REST APIs
//! - A GitLab backend and an in-memory backend
//!
//! # Usage
//!
//! ```rust,ignore
//! use notebook_store::{BackendOptions, BackendRegistry};
//!
//! let registry = BackendRegistry::with_defaults();
//! let mut options = BackendOptions::new();
//! options.insert("baseUrl".into(), "https://gitlab.com".into());
//! options.insert("token".into(), token);
//!
//! let backend = registry.connect("gitlab", &options)?;
//! backend.authorize().await?;
//! let notebooks = backend.notebooks().await?;
//! ```

pub mod backend;
pub mod error;
pub mod gitlab;
pub mod memory;
pub mod query;

pub use backend::{
    BackendDescriptor, BackendOptions, BackendRegistry, Connector, RequiredOption, StorageBackend,
};
pub use error::{StoreError, StoreResult};
pub use gitlab::GitlabBackend;
pub use memory::MemoryBackend;
pub use query::{QueryClient, RequestOptions, merge_query};

// Re-export notebook-core for downstream crates
pub use notebook_core;
