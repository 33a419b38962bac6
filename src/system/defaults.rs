//! `defaults`-backed preference and Dock stores.
use std::io::Cursor;
use std::sync::Arc;

use plist::{Dictionary, Value};

use super::{DockStore, PreferenceStore};
use crate::config::units::{DockSection, PrefValue, PreferenceSpec};
use crate::exec::Executor;
use crate::resources::error::ResourceError;

const DOCK_DOMAIN: &str = "com.apple.dock";

/// Preference store that shells out to `defaults`.
#[derive(Clone)]
pub struct DefaultsPreferences {
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for DefaultsPreferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultsPreferences").finish_non_exhaustive()
    }
}

impl DefaultsPreferences {
    /// Create a store using `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }
}

/// Leading `defaults` arguments shared by read and write.
fn host_args(pref: &PreferenceSpec) -> Vec<&str> {
    if pref.current_host {
        vec!["-currentHost"]
    } else {
        vec![]
    }
}

/// The command an operator would run by hand to apply `pref`.
fn manual_command(pref: &PreferenceSpec) -> String {
    let host = if pref.current_host { " -currentHost" } else { "" };
    format!(
        "sudo defaults{host} write {} {} {} '{}'",
        pref.domain,
        pref.key,
        pref.value.type_flag(),
        pref.value
    )
}

impl PreferenceStore for DefaultsPreferences {
    fn read(&self, pref: &PreferenceSpec) -> Result<Option<String>, ResourceError> {
        let mut args = host_args(pref);
        args.extend(["read", pref.domain.as_str(), pref.key.as_str()]);
        let result = self
            .executor
            .run_unchecked("defaults", &args)
            .map_err(|e| ResourceError::spawn("defaults", &e))?;
        if result.success {
            return Ok(Some(result.stdout.trim_end_matches('\n').to_string()));
        }
        if result.stderr.contains("does not exist") {
            return Ok(None);
        }
        Err(ResourceError::from_exec(
            "defaults",
            &result,
            &format!("{} {}", pref.domain, pref.key),
            &format!("run manually: {}", manual_command(pref)),
        ))
    }

    fn write(&self, pref: &PreferenceSpec, privileged: bool) -> Result<(), ResourceError> {
        let value = match pref.value {
            PrefValue::Bool(b) => {
                if b { "true" } else { "false" }.to_string()
            }
            ref other => other.to_string(),
        };
        let mut args: Vec<&str> = Vec::new();
        let program = if privileged {
            // Non-interactive: fail instead of prompting for a password.
            args.extend(["-n", "defaults"]);
            "sudo"
        } else {
            "defaults"
        };
        args.extend(host_args(pref));
        args.extend([
            "write",
            pref.domain.as_str(),
            pref.key.as_str(),
            pref.value.type_flag(),
            value.as_str(),
        ]);
        let result = self
            .executor
            .run_unchecked(program, &args)
            .map_err(|e| ResourceError::spawn(program, &e))?;
        if result.success {
            return Ok(());
        }
        Err(ResourceError::from_exec(
            program,
            &result,
            &format!("{} {}", pref.domain, pref.key),
            &format!("run manually: {}", manual_command(pref)),
        ))
    }
}

/// Dock store that round-trips the whole `com.apple.dock` domain through
/// `defaults export` / `defaults import`.
#[derive(Clone)]
pub struct DefaultsDock {
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for DefaultsDock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultsDock").finish_non_exhaustive()
    }
}

impl DefaultsDock {
    /// Create a store using `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    fn export(&self) -> Result<Dictionary, ResourceError> {
        let result = self
            .executor
            .run_unchecked("defaults", &["export", DOCK_DOMAIN, "-"])
            .map_err(|e| ResourceError::spawn("defaults", &e))?;
        if !result.success {
            return Err(ResourceError::from_exec(
                "defaults",
                &result,
                DOCK_DOMAIN,
                "grant your terminal Full Disk Access in System Settings",
            ));
        }
        if result.stdout.trim().is_empty() {
            return Ok(Dictionary::new());
        }
        let value = Value::from_reader_xml(Cursor::new(result.stdout.as_bytes())).map_err(|e| {
            ResourceError::Codec {
                domain: DOCK_DOMAIN.to_string(),
                message: e.to_string(),
            }
        })?;
        value
            .into_dictionary()
            .ok_or_else(|| ResourceError::Codec {
                domain: DOCK_DOMAIN.to_string(),
                message: "exported domain is not a dictionary".to_string(),
            })
    }
}

impl DockStore for DefaultsDock {
    fn read_section(&self, section: DockSection) -> Result<Vec<Value>, ResourceError> {
        let mut domain = self.export()?;
        match domain.remove(section.plist_key()) {
            None => Ok(vec![]),
            Some(Value::Array(entries)) => Ok(entries),
            Some(_) => Err(ResourceError::InvalidState {
                resource: format!("{DOCK_DOMAIN} {}", section.plist_key()),
                reason: "expected an array".to_string(),
            }),
        }
    }

    fn write_section(&self, section: DockSection, entries: Vec<Value>) -> Result<(), ResourceError> {
        let mut domain = self.export()?;
        domain.insert(section.plist_key().to_string(), Value::Array(entries));
        let mut buf = Vec::new();
        Value::Dictionary(domain)
            .to_writer_xml(&mut buf)
            .map_err(|e| ResourceError::Codec {
                domain: DOCK_DOMAIN.to_string(),
                message: e.to_string(),
            })?;
        let result = self
            .executor
            .run_with_stdin("defaults", &["import", DOCK_DOMAIN, "-"], &buf)
            .map_err(|e| ResourceError::spawn("defaults", &e))?;
        if result.success {
            Ok(())
        } else {
            Err(ResourceError::from_exec(
                "defaults",
                &result,
                DOCK_DOMAIN,
                "grant your terminal Full Disk Access in System Settings",
            ))
        }
    }
}
