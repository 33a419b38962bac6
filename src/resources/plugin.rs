//! Version-manager plugins and runtime versions.
use std::fmt;

use super::{Drift, Probed, Resource, ResourceChange, ResourceError};
use crate::config::units::PluginVersionSet;
use crate::system::VersionManager;

/// What the version manager currently has for one runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginState {
    /// Whether the plugin is registered.
    pub registered: bool,
    /// Installed versions.
    pub installed: Vec<String>,
    /// Configured global version.
    pub global: Option<String>,
}

/// Global-version mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalMismatch {
    /// Currently configured global, if any.
    pub current: Option<String>,
    /// Last requested version.
    pub desired: String,
}

/// The three independently actionable facts about a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDrift {
    /// The plugin has to be registered first.
    pub plugin_missing: bool,
    /// Requested versions not installed yet, in catalog order.
    pub missing_versions: Vec<String>,
    /// Set when the global version differs from the last requested one.
    pub global: Option<GlobalMismatch>,
}

impl Drift for PluginDrift {
    fn needs_change(&self) -> bool {
        self.plugin_missing || !self.missing_versions.is_empty() || self.global.is_some()
    }
}

impl fmt::Display for PluginDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.plugin_missing {
            parts.push("add plugin".to_string());
        }
        if !self.missing_versions.is_empty() {
            parts.push(format!("install {}", self.missing_versions.join(", ")));
        }
        if let Some(g) = &self.global {
            parts.push(format!(
                "set global {} (currently {})",
                g.desired,
                g.current.as_deref().unwrap_or("unset")
            ));
        }
        if parts.is_empty() {
            f.write_str("in sync")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

/// A runtime plugin with its requested versions and global default.
pub struct PluginResource<'a> {
    set: &'a PluginVersionSet,
    manager: &'a dyn VersionManager,
}

impl std::fmt::Debug for PluginResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginResource")
            .field("set", &self.set)
            .finish_non_exhaustive()
    }
}

impl<'a> PluginResource<'a> {
    /// Create a plugin resource.
    #[must_use]
    pub const fn new(set: &'a PluginVersionSet, manager: &'a dyn VersionManager) -> Self {
        Self { set, manager }
    }
}

impl Resource for PluginResource<'_> {
    type State = PluginState;
    type Drift = PluginDrift;

    fn description(&self) -> String {
        format!("{} {}", self.set.name, self.set.versions.join(" "))
    }

    fn probe(&self) -> Result<Probed<PluginState>, ResourceError> {
        if !self.manager.is_available() {
            return Err(ResourceError::ToolMissing {
                tool: self.manager.tool().to_string(),
            });
        }
        let registered = self
            .manager
            .plugin_list()?
            .iter()
            .any(|p| *p == self.set.name);
        // Listing versions of an unregistered plugin is an error in asdf.
        let installed = if registered {
            self.manager.list(&self.set.name)?
        } else {
            vec![]
        };
        let global = self.manager.global_get(&self.set.name)?;
        if !registered && global.is_none() {
            return Ok(Probed::Absent);
        }
        Ok(Probed::Present(PluginState {
            registered,
            installed,
            global,
        }))
    }

    fn diff(&self, current: &Probed<PluginState>) -> PluginDrift {
        let empty = PluginState {
            registered: false,
            installed: vec![],
            global: None,
        };
        let state = current.present().unwrap_or(&empty);

        let mut missing_versions: Vec<String> = Vec::new();
        for v in &self.set.versions {
            if !state.installed.contains(v) && !missing_versions.contains(v) {
                missing_versions.push(v.clone());
            }
        }
        let global = self
            .set
            .global_version()
            .filter(|desired| state.global.as_deref() != Some(*desired))
            .map(|desired| GlobalMismatch {
                current: state.global.clone(),
                desired: desired.to_string(),
            });

        PluginDrift {
            plugin_missing: !state.registered,
            missing_versions,
            global,
        }
    }

    fn apply(&self, drift: &PluginDrift) -> Result<ResourceChange, ResourceError> {
        if !drift.needs_change() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let name = self.set.name.as_str();
        let mut changed = false;

        if drift.plugin_missing {
            self.manager.plugin_add(name, &self.set.source)?;
            changed = true;
        }

        // One broken version must not block the others.
        let mut failures = Vec::new();
        for version in &drift.missing_versions {
            match self.manager.install(name, version) {
                Ok(()) => changed = true,
                Err(e) => failures.push(format!("{name} {version}: {e}")),
            }
        }

        // Evaluated against the last requested version whatever happened above.
        if let Some(global) = &drift.global {
            self.manager.global_set(name, &global.desired)?;
            changed = true;
        }

        Ok(match (changed, failures.is_empty()) {
            (_, true) => ResourceChange::Applied,
            (true, false) => ResourceChange::Partial { failures },
            (false, false) => ResourceChange::Skipped {
                reason: failures.join("; "),
            },
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::resources::converge;
    use crate::system::MockVersionManager;
    use crate::system::fake::FakeVersions;

    fn nodejs(versions: &[&str]) -> PluginVersionSet {
        PluginVersionSet {
            name: "nodejs".to_string(),
            source: "https://github.com/asdf-vm/asdf-nodejs.git".to_string(),
            versions: versions.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    #[test]
    fn unregistered_plugin_reports_all_three_facts() {
        let manager = FakeVersions::default();
        let set = nodejs(&["18.20.0", "20.11.1"]);
        let resource = PluginResource::new(&set, &manager);
        let current = resource.probe().unwrap();
        assert!(current.is_absent());

        let drift = resource.diff(&current);
        assert!(drift.plugin_missing);
        assert_eq!(drift.missing_versions, vec!["18.20.0", "20.11.1"]);
        assert_eq!(drift.global.unwrap().desired, "20.11.1");
    }

    #[test]
    fn facts_are_independent() {
        let manager = FakeVersions::default();
        manager.seed("nodejs", &["18.20.0", "20.11.1"]);
        manager.seed_global("nodejs", "18.20.0");
        let set = nodejs(&["18.20.0", "20.11.1"]);
        let resource = PluginResource::new(&set, &manager);

        let drift = resource.diff(&resource.probe().unwrap());
        assert!(!drift.plugin_missing);
        assert!(drift.missing_versions.is_empty());
        assert_eq!(
            drift.global,
            Some(GlobalMismatch {
                current: Some("18.20.0".to_string()),
                desired: "20.11.1".to_string()
            })
        );
        assert_eq!(drift.to_string(), "set global 20.11.1 (currently 18.20.0)");
    }

    #[test]
    fn failing_version_does_not_block_others() {
        let manager = FakeVersions::default();
        manager.fail_install("B");
        let set = nodejs(&["A", "B", "C"]);
        let resource = PluginResource::new(&set, &manager);

        let change = converge(&resource).unwrap();

        match change {
            ResourceChange::Partial { failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].starts_with("nodejs B:"));
            }
            other => panic!("expected partial change, got {other:?}"),
        }
        assert_eq!(manager.installed("nodejs"), vec!["A", "C"]);
        assert_eq!(manager.global("nodejs").as_deref(), Some("C"));
    }

    #[test]
    fn all_versions_failing_is_skipped() {
        let manager = FakeVersions::default();
        manager.seed("nodejs", &[]);
        manager.seed_global("nodejs", "B");
        manager.fail_install("B");
        let set = nodejs(&["B"]);
        let resource = PluginResource::new(&set, &manager);
        assert!(matches!(
            converge(&resource).unwrap(),
            ResourceChange::Skipped { .. }
        ));
    }

    #[test]
    fn missing_manager_is_tool_missing() {
        let manager = FakeVersions::unavailable();
        let set = nodejs(&["20.11.1"]);
        let err = PluginResource::new(&set, &manager).probe().unwrap_err();
        assert!(matches!(err, ResourceError::ToolMissing { ref tool } if tool == "asdf"));
    }

    #[test]
    fn global_set_never_called_when_global_matches() {
        let mut manager = MockVersionManager::new();
        manager.expect_is_available().return_const(true);
        manager
            .expect_plugin_list()
            .returning(|| Ok(vec!["nodejs".to_string()]));
        manager
            .expect_list()
            .returning(|_| Ok(vec!["18.20.0".to_string(), "20.11.1".to_string()]));
        manager
            .expect_global_get()
            .returning(|_| Ok(Some("20.11.1".to_string())));
        manager.expect_install().never();
        manager.expect_plugin_add().never();
        manager.expect_global_set().never();

        let set = nodejs(&["18.20.0", "20.11.1"]);
        let resource = PluginResource::new(&set, &manager);
        assert_eq!(converge(&resource).unwrap(), ResourceChange::AlreadyCorrect);
    }

    #[test]
    fn global_set_called_once_on_mismatch() {
        let mut manager = MockVersionManager::new();
        manager.expect_is_available().return_const(true);
        manager
            .expect_plugin_list()
            .returning(|| Ok(vec!["nodejs".to_string()]));
        manager
            .expect_list()
            .returning(|_| Ok(vec!["20.11.1".to_string()]));
        manager
            .expect_global_get()
            .returning(|_| Ok(Some("18.20.0".to_string())));
        manager
            .expect_global_set()
            .withf(|name, version| name == "nodejs" && version == "20.11.1")
            .times(1)
            .returning(|_, _| Ok(()));

        let set = nodejs(&["20.11.1"]);
        let resource = PluginResource::new(&set, &manager);
        assert_eq!(converge(&resource).unwrap(), ResourceChange::Applied);
    }
}
