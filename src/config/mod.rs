// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] holds the serde structs mirroring `Testherd.toml`.
//! - [`loader`] reads the file and resolves env/CLI overrides.
//! - [`validate`] turns a [`model::RawConfigFile`] into a validated
//!   [`model::ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{jobs_from_env, load_and_validate, load_or_default, resolve_settings};
pub use model::{ConfigFile, ConfigSection, DefaultSection, RawConfigFile, RunSettings};
