//! Login items through System Events (`osascript`).
use std::sync::Arc;

use super::LoginItems;
use crate::config::units::LoginItemSpec;
use crate::exec::Executor;
use crate::resources::error::ResourceError;

const OSASCRIPT: &str = "osascript";

/// Manual fix for a missing Automation grant.
pub const AUTOMATION_REMEDIATION: &str = "allow your terminal to control System Events in \
     System Settings > Privacy & Security > Automation, then re-run";

/// Login item registry driven by AppleScript.
#[derive(Clone)]
pub struct SystemEventsLoginItems {
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for SystemEventsLoginItems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemEventsLoginItems")
            .finish_non_exhaustive()
    }
}

impl SystemEventsLoginItems {
    /// Create a registry using `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    fn script(&self, script: &str, resource: &str) -> Result<String, ResourceError> {
        let result = self
            .executor
            .run_unchecked(OSASCRIPT, &["-e", script])
            .map_err(|e| ResourceError::spawn(OSASCRIPT, &e))?;
        if result.success {
            Ok(result.stdout)
        } else {
            Err(ResourceError::from_exec(
                OSASCRIPT,
                &result,
                resource,
                AUTOMATION_REMEDIATION,
            ))
        }
    }
}

/// Quote a string as an AppleScript literal.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

impl LoginItems for SystemEventsLoginItems {
    fn exists(&self, name: &str) -> Result<bool, ResourceError> {
        let script = format!(
            "tell application \"System Events\" to exists login item {}",
            quote(name)
        );
        let out = self.script(&script, name)?;
        match out.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ResourceError::InvalidState {
                resource: format!("login item {name}"),
                reason: format!("unexpected osascript answer '{other}'"),
            }),
        }
    }

    fn add(&self, item: &LoginItemSpec) -> Result<(), ResourceError> {
        let script = format!(
            "tell application \"System Events\" to make login item at end with properties \
             {{name:{}, path:{}, hidden:{}}}",
            quote(&item.name),
            quote(&item.path),
            item.hidden
        );
        self.script(&script, &item.name).map(|_| ())
    }
}
