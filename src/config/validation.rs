//! Structural validation of a loaded catalog.
//!
//! A catalog that fails validation is treated as corrupt: the run aborts
//! before any unit is probed.
use std::collections::HashMap;
use std::path::Path;

use super::units::{ConfigUnit, DockSection, UnitSpec, has_valid_percent_encoding, is_ghost_url};

/// Stand-in home directory for comparing `~` paths without touching `$HOME`.
const SYMBOLIC_HOME: &str = "~";

/// A single catalog problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Unit the problem was found in (empty for catalog-wide problems).
    pub unit: String,
    /// What is wrong.
    pub message: String,
}

impl ValidationIssue {
    fn new(unit: &str, message: impl Into<String>) -> Self {
        Self {
            unit: unit.to_string(),
            message: message.into(),
        }
    }
}

/// Check every unit and return all problems found, in catalog order.
#[must_use]
pub fn validate(units: &[ConfigUnit]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut tiles: HashMap<(DockSection, String), &str> = HashMap::new();

    for (index, unit) in units.iter().enumerate() {
        let id = unit.id.as_str();
        if id.trim().is_empty() {
            issues.push(ValidationIssue::new(
                &format!("#{}", index + 1),
                "unit id is empty",
            ));
            continue;
        }
        if positions.insert(id, index).is_some() {
            issues.push(ValidationIssue::new(id, "duplicate unit id"));
        }
        if unit
            .restarts
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            issues.push(ValidationIssue::new(id, "restarts names an empty service"));
        }
        for dep in &unit.depends_on {
            match positions.get(dep.as_str()) {
                Some(&pos) if pos < index => {}
                Some(_) => issues.push(ValidationIssue::new(
                    id,
                    format!("depends on itself or a later unit '{dep}'"),
                )),
                None if units.iter().any(|u| &u.id == dep) => issues.push(
                    ValidationIssue::new(id, format!("depends on later unit '{dep}'")),
                ),
                None => issues.push(ValidationIssue::new(
                    id,
                    format!("depends on unknown unit '{dep}'"),
                )),
            }
        }
        validate_spec(unit, &mut issues);
        if let UnitSpec::DockEntry(d) = &unit.spec
            && d.url.is_some() != d.path.is_some()
        {
            let identity = d.entry(Path::new(SYMBOLIC_HOME)).identity();
            if let Some(first) = tiles.insert((d.section, identity), id) {
                issues.push(ValidationIssue::new(
                    id,
                    format!("dock entry duplicates '{first}' in {}", d.section.plist_key()),
                ));
            }
        }
    }

    issues
}

fn validate_spec(unit: &ConfigUnit, issues: &mut Vec<ValidationIssue>) {
    let id = unit.id.as_str();
    match &unit.spec {
        UnitSpec::Preference(p) => {
            if p.domain.trim().is_empty() || p.key.trim().is_empty() {
                issues.push(ValidationIssue::new(id, "preference domain and key are required"));
            }
        }
        UnitSpec::DockEntry(d) => match (&d.url, &d.path) {
            (Some(_), Some(_)) => {
                issues.push(ValidationIssue::new(id, "set either url or path, not both"));
            }
            (None, None) => issues.push(ValidationIssue::new(id, "dock entry has no url or path")),
            (Some(url), None) if is_ghost_url(url) => {
                issues.push(ValidationIssue::new(id, format!("dock entry url '{url}' has no path")));
            }
            (Some(url), None) if !has_valid_percent_encoding(url) => {
                issues.push(ValidationIssue::new(
                    id,
                    format!("dock entry url '{url}' has invalid percent-encoding"),
                ));
            }
            (None, Some(path)) if path.trim().is_empty() => {
                issues.push(ValidationIssue::new(id, "dock entry path is empty"));
            }
            _ => {}
        },
        UnitSpec::PluginVersions(p) => {
            if p.name.trim().is_empty() {
                issues.push(ValidationIssue::new(id, "plugin name is empty"));
            }
            if p.versions.is_empty() {
                issues.push(ValidationIssue::new(id, "versions must list at least one version"));
            }
            if p.versions.iter().any(|v| v.trim().is_empty()) {
                issues.push(ValidationIssue::new(id, "versions contains an empty entry"));
            }
        }
        UnitSpec::LoginItem(l) => {
            if l.name.trim().is_empty() || l.path.trim().is_empty() {
                issues.push(ValidationIssue::new(id, "login item name and path are required"));
            }
        }
        UnitSpec::PackageManifest(m) => {
            if m.manifest.as_os_str().is_empty() {
                issues.push(ValidationIssue::new(id, "manifest path is empty"));
            }
        }
        UnitSpec::Installer(i) => {
            if i.command.first().is_none_or(|p| p.trim().is_empty()) {
                issues.push(ValidationIssue::new(id, "installer command is empty"));
            }
        }
        UnitSpec::File(f) => {
            if f.target.trim().is_empty() {
                issues.push(ValidationIssue::new(id, "file target is empty"));
            }
            if f.source.is_some() == f.content.is_some() {
                issues.push(ValidationIssue::new(id, "set exactly one of source or content"));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Catalog;

    fn issues_for(toml: &str) -> Vec<ValidationIssue> {
        let catalog = Catalog::parse(toml, "<test>", std::path::Path::new("/")).unwrap();
        validate(&catalog.units)
    }

    #[test]
    fn valid_catalog_has_no_issues() {
        let issues = issues_for(
            r#"
[[unit]]
id = "tools.homebrew"
kind = "installer"
check = { program = "brew" }
command = ["/bin/bash", "-c", "install"]

[[unit]]
id = "runtime.nodejs"
kind = "plugin-versions"
depends-on = ["tools.homebrew"]
name = "nodejs"
source = "https://github.com/asdf-vm/asdf-nodejs.git"
versions = ["20.11.1"]
"#,
        );
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let issues = issues_for(
            r#"
[[unit]]
id = "finder.path-bar"
kind = "preference"
domain = "com.apple.finder"
key = "ShowPathbar"
value = true

[[unit]]
id = "finder.path-bar"
kind = "preference"
domain = "com.apple.finder"
key = "ShowStatusBar"
value = true
"#,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "duplicate unit id");
    }

    #[test]
    fn empty_versions_are_reported() {
        let issues = issues_for(
            r#"
[[unit]]
id = "runtime.python"
kind = "plugin-versions"
name = "python"
source = "https://github.com/asdf-community/asdf-python.git"
versions = []
"#,
        );
        assert!(issues.iter().any(|i| i.message.contains("at least one version")));
    }

    #[test]
    fn ghost_dock_url_is_reported() {
        let issues = issues_for(
            r#"
[[unit]]
id = "dock.broken"
kind = "dock-entry"
url = "file://"
"#,
        );
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("has no path"));
    }

    #[test]
    fn same_tile_twice_in_one_section_is_reported() {
        let issues = issues_for(
            r#"
[[unit]]
id = "dock.downloads"
kind = "dock-entry"
path = "/Users/x/Downloads"
show-as = "fan"

[[unit]]
id = "dock.downloads-grid"
kind = "dock-entry"
url = "file:///Users/x/Downloads"
show-as = "grid"

[[unit]]
id = "dock.downloads-apps"
kind = "dock-entry"
path = "/Users/x/Downloads"
section = "apps"
"#,
        );
        assert_eq!(issues.len(), 1, "{issues:?}");
        assert_eq!(issues[0].unit, "dock.downloads-grid");
        assert_eq!(
            issues[0].message,
            "dock entry duplicates 'dock.downloads' in persistent-others"
        );
    }

    #[test]
    fn undecodable_dock_url_is_reported() {
        let issues = issues_for(
            r#"
[[unit]]
id = "dock.reports"
kind = "dock-entry"
url = "file:///Users/x/100%/"
"#,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].message,
            "dock entry url 'file:///Users/x/100%/' has invalid percent-encoding"
        );
    }

    #[test]
    fn forward_and_unknown_dependencies_are_reported() {
        let issues = issues_for(
            r#"
[[unit]]
id = "runtime.nodejs"
kind = "plugin-versions"
depends-on = ["tools.asdf", "tools.missing"]
name = "nodejs"
source = "https://example.invalid/asdf-nodejs.git"
versions = ["20.11.1"]

[[unit]]
id = "tools.asdf"
kind = "installer"
check = { program = "asdf" }
command = ["brew", "install", "asdf"]
"#,
        );
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "depends on later unit 'tools.asdf'",
                "depends on unknown unit 'tools.missing'"
            ]
        );
    }

    #[test]
    fn empty_installer_command_is_reported() {
        let issues = issues_for(
            r#"
[[unit]]
id = "tools.omz"
kind = "installer"
check = { path = "~/.oh-my-zsh" }
command = []
"#,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].unit, "tools.omz");
    }
}
