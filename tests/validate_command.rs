#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for the `validate` command.
//!
//! Each test writes a catalog into a temporary directory, runs the command
//! through its public entry point, and checks either the logged summary or
//! the problems reported in the error.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{CollectingLog, TestCatalog};
use provision_cli::commands::validate;
use provision_cli::config::units::UnitSpec;
use provision_cli::exec::SystemExecutor;
use provision_cli::reconcile::Context;
use provision_cli::system::Host;

fn validate_err(catalog: &TestCatalog) -> String {
    let err = validate::run(&catalog.global(), &CollectingLog::default())
        .expect_err("catalog should be rejected");
    format!("{err:#}")
}

// ---------------------------------------------------------------------------
// Accepted catalogs
// ---------------------------------------------------------------------------

#[test]
fn every_unit_kind_is_accepted() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "tools.homebrew"
kind = "installer"
check = { program = "brew" }
command = ["/bin/bash", "-c", "install"]

[[unit]]
id = "runtimes.nodejs"
kind = "plugin-versions"
name = "nodejs"
source = "https://github.com/asdf-vm/asdf-nodejs.git"
versions = ["20.11.1"]
depends-on = ["tools.homebrew"]

[[unit]]
id = "shell.zshrc"
kind = "file"
source = "dotfiles/zshrc"
target = "~/.zshrc"

[[unit]]
id = "apps.brewfile"
kind = "package-manifest"
manifest = "Brewfile"
depends-on = ["tools.homebrew"]

[[unit]]
id = "login.rectangle"
kind = "login-item"
name = "Rectangle"
path = "/Applications/Rectangle.app"

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
path = "~/Downloads"
arrangement = "date-added"
restarts = "Dock"
"#,
    )
    .with_file("dotfiles/zshrc", "export EDITOR=vim\n")
    .with_file("Brewfile", "brew \"ripgrep\"\n");

    let log = CollectingLog::default();
    validate::run(&catalog.global(), &log).unwrap();

    assert!(log.contains("loaded 7 unit(s)"));
    assert!(log.contains("info preferences: 1"));
    assert!(log.contains("info dock-entries: 1"));
    assert!(log.contains("info plugin-versions: 1"));
    assert!(log.contains("info catalog is valid"));
}

#[test]
fn relative_paths_resolve_against_catalog_directory() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "shell.zshrc"
kind = "file"
source = "dotfiles/zshrc"
target = "~/.zshrc"
"#,
    );
    let loaded = catalog.load();
    let UnitSpec::File(spec) = &loaded.units[0].spec else {
        panic!("shell.zshrc is not a file unit");
    };
    let ctx = Context::new(
        Arc::new(CollectingLog::default()),
        Host::system(Arc::new(SystemExecutor), Path::new("/Users/tester")),
        PathBuf::from("/Users/tester"),
        loaded.base_dir.clone(),
    );
    let source = spec.source.clone().unwrap();
    assert_eq!(ctx.resolve(&source), catalog.dir().join("dotfiles/zshrc"));
    assert_eq!(
        ctx.resolve(&PathBuf::from("~/.zshrc")),
        PathBuf::from("/Users/tester/.zshrc")
    );
}

#[test]
fn selectors_are_logged_per_unit() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "finder.path-bar"
kind = "preference"
domain = "com.apple.finder"
key = "ShowPathbar"
value = true
restarts = "Finder"

[[unit]]
id = "keyboard.repeat"
kind = "preference"
domain = "NSGlobalDomain"
key = "KeyRepeat"
value = 2
"#,
    );
    let mut global = catalog.global();
    global.only = vec!["finder".to_string()];
    let log = CollectingLog::default();
    validate::run(&global, &log).unwrap();

    assert!(log.contains("selected 1 of 2 unit(s)"));
    assert!(log.contains("debug finder.path-bar [finder] preferences, restarts Finder"));
    assert!(!log.contains("debug keyboard.repeat"));
}

// ---------------------------------------------------------------------------
// Rejected catalogs
// ---------------------------------------------------------------------------

#[test]
fn malformed_toml_is_a_syntax_error() {
    let catalog = TestCatalog::new("[[unit]\nid = ");
    let text = validate_err(&catalog);
    assert!(text.contains("Invalid catalog syntax"), "{text}");
}

#[test]
fn unknown_kind_is_a_syntax_error() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "misc.wallpaper"
kind = "wallpaper"
path = "/Library/Desktop Pictures/Sonoma.heic"
"#,
    );
    let text = validate_err(&catalog);
    assert!(text.contains("Invalid catalog syntax"), "{text}");
}

#[test]
fn forward_dependency_is_rejected() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "runtimes.nodejs"
kind = "plugin-versions"
name = "nodejs"
source = "https://github.com/asdf-vm/asdf-nodejs.git"
versions = ["20.11.1"]
depends-on = ["tools.asdf"]

[[unit]]
id = "tools.asdf"
kind = "installer"
check = { program = "asdf" }
command = ["brew", "install", "asdf"]
"#,
    );
    let text = validate_err(&catalog);
    assert!(text.contains("1 catalog problem(s)"), "{text}");
    assert!(text.contains("runtimes.nodejs: depends on later unit 'tools.asdf'"), "{text}");
}

#[test]
fn file_unit_needs_exactly_one_content_source() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "shell.both"
kind = "file"
source = "zshrc"
content = "export EDITOR=vim\n"
target = "~/.zshrc"

[[unit]]
id = "shell.neither"
kind = "file"
target = "~/.zprofile"
"#,
    );
    let text = validate_err(&catalog);
    assert!(text.contains("2 catalog problem(s)"), "{text}");
    assert!(text.contains("shell.both: set exactly one of source or content"), "{text}");
    assert!(text.contains("shell.neither: set exactly one of source or content"), "{text}");
}

#[test]
fn ghost_dock_url_is_rejected() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "dock.ghost"
kind = "dock-entry"
url = "file://"
"#,
    );
    let text = validate_err(&catalog);
    assert!(text.contains("dock.ghost: dock entry url 'file://' has no path"), "{text}");
}

#[test]
fn same_dock_tile_in_two_units_is_rejected() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "dock.downloads"
kind = "dock-entry"
path = "~/Downloads"
show-as = "fan"

[[unit]]
id = "dock.downloads-list"
kind = "dock-entry"
path = "~/Downloads/"
show-as = "list"
"#,
    );
    let text = validate_err(&catalog);
    assert!(text.contains("1 catalog problem(s)"), "{text}");
    assert!(
        text.contains("dock.downloads-list: dock entry duplicates 'dock.downloads'"),
        "{text}"
    );
}

#[test]
fn dock_url_with_broken_escape_is_rejected() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "dock.reports"
kind = "dock-entry"
url = "file:///Users/tester/Q3%2"
"#,
    );
    let text = validate_err(&catalog);
    assert!(text.contains("has invalid percent-encoding"), "{text}");
}

#[test]
fn problems_are_reported_together_in_catalog_order() {
    let catalog = TestCatalog::new(
        r#"
[[unit]]
id = "tools.empty"
kind = "installer"
check = { path = "~/.tool" }
command = []

[[unit]]
id = "dock.autohide"
kind = "preference"
domain = "com.apple.dock"
key = "autohide"
value = true
restarts = ""

[[unit]]
id = "dock.autohide"
kind = "preference"
domain = "com.apple.dock"
key = "autohide"
value = false
"#,
    );
    let text = validate_err(&catalog);
    assert!(text.contains("3 catalog problem(s)"), "{text}");
    let empty = text.find("installer command is empty").unwrap();
    let restarts = text.find("restarts names an empty service").unwrap();
    let duplicate = text.find("duplicate unit id").unwrap();
    assert!(empty < restarts && restarts < duplicate, "{text}");
}
