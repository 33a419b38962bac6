//! In-memory collaborators for reconciler tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use plist::Value;

use super::{DockStore, Host, LoginItems, PreferenceStore, ServiceControl, VersionManager};
use crate::config::units::{DockSection, LoginItemSpec, PrefValue, PreferenceSpec};
use crate::exec::test_helpers::MockExecutor;
use crate::resources::error::ResourceError;

/// Preference store backed by a map; domains in `denied` refuse writes.
#[derive(Debug, Default)]
pub struct FakePreferences {
    values: Mutex<HashMap<(String, String), String>>,
    denied: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl FakePreferences {
    /// Seed a raw value as `defaults read` would print it.
    pub fn set(&self, domain: &str, key: &str, raw: &str) {
        self.values
            .lock()
            .unwrap()
            .insert((domain.to_string(), key.to_string()), raw.to_string());
    }

    /// Current raw value.
    pub fn get(&self, domain: &str, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap()
            .get(&(domain.to_string(), key.to_string()))
            .cloned()
    }

    /// Refuse every write to `domain`.
    pub fn deny(&self, domain: &str) {
        self.denied.lock().unwrap().insert(domain.to_string());
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PreferenceStore for FakePreferences {
    fn read(&self, pref: &PreferenceSpec) -> Result<Option<String>, ResourceError> {
        Ok(self.get(&pref.domain, &pref.key))
    }

    fn write(&self, pref: &PreferenceSpec, _privileged: bool) -> Result<(), ResourceError> {
        if self.denied.lock().unwrap().contains(&pref.domain) {
            return Err(ResourceError::PrivilegeDenied {
                resource: format!("{} {}", pref.domain, pref.key),
                remediation: format!("sudo defaults write {} {}", pref.domain, pref.key),
            });
        }
        let raw = match &pref.value {
            PrefValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            other => other.to_string(),
        };
        self.set(&pref.domain, &pref.key, &raw);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Dock store backed by in-memory arrays.
#[derive(Debug, Default)]
pub struct FakeDock {
    sections: Mutex<HashMap<&'static str, Vec<Value>>>,
    writes: AtomicUsize,
}

impl FakeDock {
    /// Seed a section.
    pub fn seed(&self, section: DockSection, entries: Vec<Value>) {
        self.sections
            .lock()
            .unwrap()
            .insert(section.plist_key(), entries);
    }

    /// Current content of a section.
    pub fn entries(&self, section: DockSection) -> Vec<Value> {
        self.sections
            .lock()
            .unwrap()
            .get(section.plist_key())
            .cloned()
            .unwrap_or_default()
    }

    /// Number of section writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DockStore for FakeDock {
    fn read_section(&self, section: DockSection) -> Result<Vec<Value>, ResourceError> {
        Ok(self.entries(section))
    }

    fn write_section(&self, section: DockSection, entries: Vec<Value>) -> Result<(), ResourceError> {
        self.seed(section, entries);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Version manager with in-memory plugins, versions, and globals.
#[derive(Debug)]
pub struct FakeVersions {
    available: bool,
    plugins: Mutex<Vec<String>>,
    installed: Mutex<HashMap<String, Vec<String>>>,
    globals: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    installs: AtomicUsize,
    global_sets: AtomicUsize,
}

impl Default for FakeVersions {
    fn default() -> Self {
        Self {
            available: true,
            plugins: Mutex::default(),
            installed: Mutex::default(),
            globals: Mutex::default(),
            failing: Mutex::default(),
            installs: AtomicUsize::new(0),
            global_sets: AtomicUsize::new(0),
        }
    }
}

impl FakeVersions {
    /// A manager that reports itself as not installed.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Register a plugin with `versions` installed.
    pub fn seed(&self, name: &str, versions: &[&str]) {
        self.plugins.lock().unwrap().push(name.to_string());
        self.installed.lock().unwrap().insert(
            name.to_string(),
            versions.iter().map(|v| (*v).to_string()).collect(),
        );
    }

    /// Seed the global version.
    pub fn seed_global(&self, name: &str, version: &str) {
        self.globals
            .lock()
            .unwrap()
            .insert(name.to_string(), version.to_string());
    }

    /// Make installs of `version` fail.
    pub fn fail_install(&self, version: &str) {
        self.failing.lock().unwrap().insert(version.to_string());
    }

    /// Installed versions of `name`.
    pub fn installed(&self, name: &str) -> Vec<String> {
        self.installed
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Global version of `name`.
    pub fn global(&self, name: &str) -> Option<String> {
        self.globals.lock().unwrap().get(name).cloned()
    }

    /// Number of successful installs.
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    /// Number of global-set calls.
    pub fn global_sets(&self) -> usize {
        self.global_sets.load(Ordering::SeqCst)
    }
}

impl VersionManager for FakeVersions {
    fn tool(&self) -> &'static str {
        "asdf"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn plugin_list(&self) -> Result<Vec<String>, ResourceError> {
        Ok(self.plugins.lock().unwrap().clone())
    }

    fn plugin_add(&self, name: &str, _url: &str) -> Result<(), ResourceError> {
        self.plugins.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn list(&self, name: &str) -> Result<Vec<String>, ResourceError> {
        Ok(self.installed(name))
    }

    fn install(&self, name: &str, version: &str) -> Result<(), ResourceError> {
        if self.failing.lock().unwrap().contains(version) {
            return Err(ResourceError::ExecutionFailed {
                program: "asdf".to_string(),
                exit_code: 1,
                stderr: format!("failed to build {name} {version}"),
            });
        }
        self.installed
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push(version.to_string());
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn global_get(&self, name: &str) -> Result<Option<String>, ResourceError> {
        Ok(self.global(name))
    }

    fn global_set(&self, name: &str, version: &str) -> Result<(), ResourceError> {
        self.seed_global(name, version);
        self.global_sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Login item registry backed by a list of names.
#[derive(Debug, Default)]
pub struct FakeLoginItems {
    items: Mutex<Vec<String>>,
    denied: bool,
}

impl FakeLoginItems {
    /// A registry that refuses every query, as without Automation consent.
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }

    /// Registered names.
    pub fn names(&self) -> Vec<String> {
        self.items.lock().unwrap().clone()
    }

    fn check(&self, name: &str) -> Result<(), ResourceError> {
        if self.denied {
            return Err(ResourceError::PrivilegeDenied {
                resource: name.to_string(),
                remediation: "allow Automation access to System Events".to_string(),
            });
        }
        Ok(())
    }
}

impl LoginItems for FakeLoginItems {
    fn exists(&self, name: &str) -> Result<bool, ResourceError> {
        self.check(name)?;
        Ok(self.items.lock().unwrap().iter().any(|n| n == name))
    }

    fn add(&self, item: &LoginItemSpec) -> Result<(), ResourceError> {
        self.check(&item.name)?;
        self.items.lock().unwrap().push(item.name.clone());
        Ok(())
    }
}

/// Records every restart request.
#[derive(Debug, Default)]
pub struct FakeServices {
    restarts: Mutex<Vec<String>>,
}

impl FakeServices {
    /// Services restarted so far, in order.
    pub fn restarts(&self) -> Vec<String> {
        self.restarts.lock().unwrap().clone()
    }
}

impl ServiceControl for FakeServices {
    fn restart(&self, service: &str) -> Result<(), ResourceError> {
        self.restarts.lock().unwrap().push(service.to_string());
        Ok(())
    }
}

/// A [`Host`] wired to fakes, with handles for seeding and inspection.
#[derive(Debug)]
pub struct FakeHost {
    /// Scripted executor for installers and manifests.
    pub executor: Arc<MockExecutor>,
    /// Preferences.
    pub preferences: Arc<FakePreferences>,
    /// Dock.
    pub dock: Arc<FakeDock>,
    /// Version manager.
    pub versions: Arc<FakeVersions>,
    /// Login items.
    pub login_items: Arc<FakeLoginItems>,
    /// Service restarts.
    pub services: Arc<FakeServices>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::with_executor(MockExecutor::default())
    }
}

impl FakeHost {
    /// Fakes everywhere, with a specific scripted executor.
    pub fn with_executor(executor: MockExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            preferences: Arc::default(),
            dock: Arc::default(),
            versions: Arc::default(),
            login_items: Arc::default(),
            services: Arc::default(),
        }
    }

    /// Replace the version manager.
    #[must_use]
    pub fn with_versions(mut self, versions: FakeVersions) -> Self {
        self.versions = Arc::new(versions);
        self
    }

    /// Replace the login item registry.
    #[must_use]
    pub fn with_login_items(mut self, items: FakeLoginItems) -> Self {
        self.login_items = Arc::new(items);
        self
    }

    /// The [`Host`] the reconciler sees.
    pub fn host(&self) -> Host {
        Host {
            executor: self.executor.clone(),
            preferences: self.preferences.clone(),
            dock: self.dock.clone(),
            versions: self.versions.clone(),
            login_items: self.login_items.clone(),
            services: self.services.clone(),
        }
    }
}
