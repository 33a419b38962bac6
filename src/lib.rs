//! Idempotent macOS workstation provisioning engine.
//!
//! Reconciles a declarative catalog of configuration units (preference
//! keys, Dock tiles, runtime versions, login items, package manifests,
//! installers, and whole files) against the live machine.  Every run is
//! safe to repeat: units already in the desired state are left untouched.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load and validate the TOML catalog
//! - **[`system`]**: collaborator traits for OS state stores and their macOS implementations
//! - **[`resources`]**: per-domain `probe + diff + apply` primitives
//! - **[`reconcile`]**: tolerance layer, orchestrator state machine, run report
//! - **[`commands`]**: top-level subcommands (`apply`, `plan`, `validate`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod reconcile;
pub mod resources;
pub mod system;
