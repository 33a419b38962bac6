//! Desired-state catalog: loading, selection, and validation.
pub mod toml_loader;
pub mod units;
pub mod validation;

use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CatalogError;
use units::ConfigUnit;

/// Catalog compiled into the binary, used when no path is given.
pub const BUILTIN_CATALOG: &str = include_str!("../../conf/catalog.toml");

/// Environment variable naming a catalog file.
pub const CATALOG_ENV: &str = "PROVISION_CATALOG";

/// On-disk shape of a catalog file.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "unit")]
    units: Vec<ConfigUnit>,
}

/// The ordered list of configuration units to reconcile.
///
/// Order is execution order: units are never reordered after loading.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Where the catalog came from (a path or `<built-in>`).
    pub origin: String,
    /// Directory relative paths in the catalog resolve against.
    pub base_dir: PathBuf,
    /// Units in declared order.
    pub units: Vec<ConfigUnit>,
}

impl Catalog {
    /// Parse catalog text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] if the text is not a valid catalog.
    pub fn parse(content: &str, origin: &str, base_dir: &Path) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml_loader::parse_str(content, origin)?;
        Ok(Self {
            origin: origin.to_string(),
            base_dir: base_dir.to_path_buf(),
            units: file.units,
        })
    }

    /// Load a catalog file; relative paths inside it resolve against its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml_loader::load_file(path)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self {
            origin: path.display().to_string(),
            base_dir,
            units: file.units,
        })
    }

    /// The catalog shipped with the binary.
    ///
    /// Its relative paths resolve against [`config_dir`], never the working
    /// directory the command happens to run from.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded catalog does not parse.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(BUILTIN_CATALOG, "<built-in>", &config_dir())
    }

    /// Resolve the catalog from an explicit path, `PROVISION_CATALOG`, or the
    /// built-in default, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen catalog cannot be loaded.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, CatalogError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        if let Ok(path) = std::env::var(CATALOG_ENV)
            && !path.is_empty()
        {
            return Self::from_path(Path::new(&path));
        }
        Self::builtin()
    }

    /// Validate the catalog, returning it unchanged if no problem was found.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Invalid`] listing every problem.
    pub fn validated(self) -> Result<Self, CatalogError> {
        let issues = validation::validate(&self.units);
        if issues.is_empty() {
            return Ok(self);
        }
        let mut details = String::new();
        for issue in &issues {
            let _ = writeln!(details, "  {}: {}", issue.unit, issue.message);
        }
        Err(CatalogError::Invalid {
            count: issues.len(),
            details: details.trim_end().to_string(),
        })
    }

    /// Units passing the `--only` / `--skip` selectors, in declared order.
    ///
    /// An empty `only` list selects everything.
    #[must_use]
    pub fn select(&self, only: &[String], skip: &[String]) -> Vec<&ConfigUnit> {
        self.units
            .iter()
            .filter(|u| only.is_empty() || only.iter().any(|s| u.matches_selector(s)))
            .filter(|u| !skip.iter().any(|s| u.matches_selector(s)))
            .collect()
    }
}

/// Per-user configuration directory: `$XDG_CONFIG_HOME/provision`, falling
/// back to `~/.config/provision`.
#[must_use]
pub fn config_dir() -> PathBuf {
    config_dir_from(
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
}

fn config_dir_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    let xdg = xdg_config_home
        .map(PathBuf::from)
        .filter(|p| p.is_absolute());
    let base = xdg.unwrap_or_else(|| {
        home.filter(|h| !h.is_empty())
            .map_or_else(|| PathBuf::from("/"), PathBuf::from)
            .join(".config")
    });
    base.join("provision")
}


#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::units::{Domain, PrefValue, UnitSpec};
    use super::*;
    use test_helpers::catalog;

    const SAMPLE: &str = r#"
[[unit]]
id = "keyboard.repeat-rate"
kind = "preference"
domain = "NSGlobalDomain"
key = "KeyRepeat"
value = 2

[[unit]]
id = "dock.autohide"
kind = "preference"
domain = "com.apple.dock"
key = "autohide"
value = true
restarts = "Dock"

[[unit]]
id = "dock.downloads-stack"
kind = "dock-entry"
url = "file:///Users/x/Downloads/"
arrangement = "date-created"
display-as = "folder"
show-as = "fan"
restarts = "Dock"

[[unit]]
id = "shell.brewfile"
kind = "package-manifest"
manifest = "Brewfile"
"#;

    #[test]
    fn builtin_catalog_parses_and_validates() {
        let catalog = Catalog::builtin().unwrap().validated().unwrap();
        assert!(!catalog.units.is_empty());
    }

    #[test]
    fn parse_preserves_declared_order() {
        let c = catalog(SAMPLE);
        let ids: Vec<&str> = c.units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "keyboard.repeat-rate",
                "dock.autohide",
                "dock.downloads-stack",
                "shell.brewfile"
            ]
        );
    }

    #[test]
    fn parse_reads_kind_specific_fields() {
        let c = catalog(SAMPLE);
        assert_eq!(c.units[0].domain(), Domain::Preferences);
        match &c.units[0].spec {
            UnitSpec::Preference(p) => assert_eq!(p.value, PrefValue::Int(2)),
            other => panic!("expected preference, got {other:?}"),
        }
        assert_eq!(c.units[1].restarts.as_deref(), Some("Dock"));
        assert_eq!(c.units[2].domain(), Domain::DockEntries);
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let err = Catalog::parse(
            "[[unit]]\nid = \"x\"\nkind = \"registry\"\n",
            "<test>",
            Path::new("/"),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn from_path_anchors_relative_paths_at_catalog_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let c = Catalog::from_path(&path).unwrap();
        assert_eq!(c.base_dir, dir.path());
    }

    #[test]
    fn builtin_is_anchored_at_config_dir() {
        let c = Catalog::builtin().unwrap();
        assert_eq!(c.base_dir, config_dir());
        assert!(c.base_dir.ends_with("provision"));
        assert_ne!(Some(c.base_dir), std::env::current_dir().ok());
    }

    #[test]
    fn config_dir_prefers_absolute_xdg_config_home() {
        assert_eq!(
            config_dir_from(Some("/xdg".into()), Some("/Users/x".into())),
            PathBuf::from("/xdg/provision")
        );
        assert_eq!(
            config_dir_from(Some("relative".into()), Some("/Users/x".into())),
            PathBuf::from("/Users/x/.config/provision")
        );
        assert_eq!(
            config_dir_from(None, Some("/Users/x".into())),
            PathBuf::from("/Users/x/.config/provision")
        );
        assert_eq!(
            config_dir_from(None, None),
            PathBuf::from("/.config/provision")
        );
    }

    #[test]
    fn select_filters_by_only_and_skip() {
        let c = catalog(SAMPLE);
        let only: Vec<&str> = c
            .select(&["dock".to_string()], &[])
            .iter()
            .map(|u| u.id.as_str())
            .collect();
        assert_eq!(only, vec!["dock.autohide", "dock.downloads-stack"]);

        let skipped: Vec<&str> = c
            .select(&[], &["dock.autohide".to_string(), "shell".to_string()])
            .iter()
            .map(|u| u.id.as_str())
            .collect();
        assert_eq!(skipped, vec!["keyboard.repeat-rate", "dock.downloads-stack"]);
    }

    #[test]
    fn validated_reports_every_issue() {
        let c = catalog(
            r#"
[[unit]]
id = "a"
kind = "plugin-versions"
name = "nodejs"
source = "x"
versions = []

[[unit]]
id = "a"
kind = "login-item"
name = "Rectangle"
path = "/Applications/Rectangle.app"
"#,
        );
        let err = c.validated().unwrap_err();
        assert!(matches!(err, CatalogError::Invalid { count: 2, .. }));
    }
}
