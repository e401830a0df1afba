// src/config/mod.rs

//! Optional settings file (`poh.toml`).
//!
//! - [`model`] holds the raw (deserialized) and validated settings types.
//! - [`validate`] turns a [`RawSettings`] into [`Settings`].
//! - [`loader`] finds and reads the file.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, resolve_settings};
pub use model::{
    DispatchSection, RawSettings, Settings, StorageSection, TransportSection,
};
