//! External collaborators the reconciler talks to.
//!
//! Each OS state store is reached through a narrow trait so resources can
//! be exercised against in-memory fakes.  [`Host::system`] wires the real
//! macOS implementations, all of which shell out through an
//! [`Executor`].

pub mod asdf;
pub mod defaults;
#[cfg(test)]
pub mod fake;
pub mod login_items;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use crate::config::units::{DockSection, LoginItemSpec, PreferenceSpec};
use crate::exec::Executor;
use crate::resources::error::ResourceError;

/// Flat `(domain, key) -> scalar` preference store.
pub trait PreferenceStore: Send + Sync {
    /// Read the raw value of a key; `None` when the key has never been set.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself cannot be queried.
    fn read(&self, pref: &PreferenceSpec) -> Result<Option<String>, ResourceError>;

    /// Overwrite a key with `pref.value`.
    ///
    /// When `privileged` is set the write is attempted with elevated rights.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::PrivilegeDenied`] when rights are missing.
    fn write(&self, pref: &PreferenceSpec, privileged: bool) -> Result<(), ResourceError>;
}

/// Persisted Dock tile arrays, read and written whole.
pub trait DockStore: Send + Sync {
    /// Read every raw entry of a section, in order; empty when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the Dock preferences cannot be read or decoded.
    fn read_section(&self, section: DockSection) -> Result<Vec<plist::Value>, ResourceError>;

    /// Replace a section with `entries`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Dock preferences cannot be written.
    fn write_section(
        &self,
        section: DockSection,
        entries: Vec<plist::Value>,
    ) -> Result<(), ResourceError>;
}

/// Multi-version runtime manager CLI.
#[cfg_attr(test, mockall::automock)]
pub trait VersionManager: Send + Sync {
    /// Program name, for diagnostics.
    fn tool(&self) -> &'static str;

    /// Whether the manager is installed.
    fn is_available(&self) -> bool;

    /// Names of registered plugins.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager cannot be queried.
    fn plugin_list(&self) -> Result<Vec<String>, ResourceError>;

    /// Register a plugin from its source repository.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails.
    fn plugin_add(&self, name: &str, url: &str) -> Result<(), ResourceError>;

    /// Installed versions of a runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager cannot be queried.
    fn list(&self, name: &str) -> Result<Vec<String>, ResourceError>;

    /// Install one version of a runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the install fails.
    fn install(&self, name: &str, version: &str) -> Result<(), ResourceError>;

    /// The configured global version, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the global configuration cannot be read.
    fn global_get(&self, name: &str) -> Result<Option<String>, ResourceError>;

    /// Set the global version.
    ///
    /// # Errors
    ///
    /// Returns an error if the global configuration cannot be written.
    fn global_set(&self, name: &str, version: &str) -> Result<(), ResourceError>;
}

/// Login item registry.
pub trait LoginItems: Send + Sync {
    /// Whether a login item with this display name exists.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::PrivilegeDenied`] when Automation access is missing.
    fn exists(&self, name: &str) -> Result<bool, ResourceError>;

    /// Register an application as a login item.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::PrivilegeDenied`] when Automation access is missing.
    fn add(&self, item: &LoginItemSpec) -> Result<(), ResourceError>;
}

/// Restarts UI services so they reload their preferences.
pub trait ServiceControl: Send + Sync {
    /// Restart a named service (`Dock`, `Finder`, ...).
    ///
    /// # Errors
    ///
    /// Returns an error if the restart signal cannot be delivered.
    fn restart(&self, service: &str) -> Result<(), ResourceError>;
}

/// Every collaborator a reconcile run needs.
#[derive(Clone)]
pub struct Host {
    /// Raw command executor (installers, bundle manifests).
    pub executor: Arc<dyn Executor>,
    /// Preference store.
    pub preferences: Arc<dyn PreferenceStore>,
    /// Dock entry store.
    pub dock: Arc<dyn DockStore>,
    /// Version manager.
    pub versions: Arc<dyn VersionManager>,
    /// Login items.
    pub login_items: Arc<dyn LoginItems>,
    /// Service restarts.
    pub services: Arc<dyn ServiceControl>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("executor", &"<dyn Executor>")
            .field("preferences", &"<dyn PreferenceStore>")
            .field("dock", &"<dyn DockStore>")
            .field("versions", &"<dyn VersionManager>")
            .field("login_items", &"<dyn LoginItems>")
            .field("services", &"<dyn ServiceControl>")
            .finish()
    }
}

impl Host {
    /// Wire the real macOS collaborators.
    #[must_use]
    pub fn system(executor: Arc<dyn Executor>, home: &Path) -> Self {
        Self {
            preferences: Arc::new(defaults::DefaultsPreferences::new(Arc::clone(&executor))),
            dock: Arc::new(defaults::DefaultsDock::new(Arc::clone(&executor))),
            versions: Arc::new(asdf::Asdf::new(Arc::clone(&executor), home)),
            login_items: Arc::new(login_items::SystemEventsLoginItems::new(Arc::clone(
                &executor,
            ))),
            services: Arc::new(services::Killall::new(Arc::clone(&executor))),
            executor,
        }
    }
}
