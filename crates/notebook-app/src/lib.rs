//! notebook-app: application layer of the git-backed notebook client
//!
//! This crate provides:
//! - The application event set exchanged over the event bus
//! - The state controller reacting to intents and publishing state changes
//! - Client configuration from the environment
//! - Saved connection profiles
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use notebook_app::{AppBus, AppEvent, Controller};
//! use notebook_store::BackendRegistry;
//!
//! let bus = Arc::new(AppBus::new());
//! let controller = Controller::new(bus.clone(), ui, BackendRegistry::with_defaults());
//! controller.bind()?;
//! bus.publish(&AppEvent::Ready)?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod profiles;

// Re-exports for convenience
pub use config::{ClientConfig, ConfigError};
pub use controller::{Controller, Ui};
pub use error::{AppError, AppResult};
pub use events::{AppBus, AppEvent, EventName};
pub use profiles::{ProfileStore, SavedConnectionProfile};

// Re-export dependent crates
pub use notebook_core;
pub use notebook_store;
