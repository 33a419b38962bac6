//! Opaque third-party installers guarded by a presence check.
use std::path::PathBuf;

use super::{Probed, Resource, ResourceChange, ResourceError, ValueDrift};
use crate::exec::Executor;

/// How presence of the installed product is detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// A program on `PATH`.
    Program(String),
    /// A file or directory.
    Path(PathBuf),
}

/// An installer that runs only when its product is absent.
pub struct InstallerResource<'a> {
    presence: Presence,
    command: &'a [String],
    executor: &'a dyn Executor,
}

impl std::fmt::Debug for InstallerResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallerResource")
            .field("presence", &self.presence)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl<'a> InstallerResource<'a> {
    /// Create an installer resource.
    #[must_use]
    pub const fn new(presence: Presence, command: &'a [String], executor: &'a dyn Executor) -> Self {
        Self {
            presence,
            command,
            executor,
        }
    }
}

impl Resource for InstallerResource<'_> {
    type State = ();
    type Drift = ValueDrift;

    fn description(&self) -> String {
        match &self.presence {
            Presence::Program(p) => format!("install {p}"),
            Presence::Path(p) => format!("install {}", p.display()),
        }
    }

    fn probe(&self) -> Result<Probed<()>, ResourceError> {
        let present = match &self.presence {
            Presence::Program(p) => self.executor.which(p),
            Presence::Path(p) => p.exists(),
        };
        Ok(present.then_some(()).into())
    }

    fn diff(&self, current: &Probed<()>) -> ValueDrift {
        if current.is_absent() {
            ValueDrift::Missing
        } else {
            ValueDrift::InSync
        }
    }

    fn apply(&self, drift: &ValueDrift) -> Result<ResourceChange, ResourceError> {
        if *drift == ValueDrift::InSync {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let Some((program, rest)) = self.command.split_first() else {
            return Err(ResourceError::InvalidState {
                resource: self.description(),
                reason: "installer command is empty".to_string(),
            });
        };
        if !self.executor.which(program) {
            return Err(ResourceError::ToolMissing {
                tool: program.clone(),
            });
        }
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        let result = self
            .executor
            .run_unchecked(program, &args)
            .map_err(|e| ResourceError::spawn(program, &e))?;
        if result.success {
            Ok(ResourceChange::Applied)
        } else {
            Err(ResourceError::from_exec(
                program,
                &result,
                &self.description(),
                &format!("run manually: {}", self.command.join(" ")),
            ))
        }
    }
}
