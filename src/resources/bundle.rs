//! Package bundle manifests (`brew bundle`), treated as one opaque step.
use std::path::PathBuf;

use super::{Probed, Resource, ResourceChange, ResourceError, ValueDrift};
use crate::exec::Executor;

const BREW: &str = "brew";

/// A Brewfile whose dependencies should all be installed.
pub struct BundleResource<'a> {
    manifest: PathBuf,
    executor: &'a dyn Executor,
}

impl std::fmt::Debug for BundleResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleResource")
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

impl<'a> BundleResource<'a> {
    /// Create a bundle resource for an already-resolved manifest path.
    #[must_use]
    pub const fn new(manifest: PathBuf, executor: &'a dyn Executor) -> Self {
        Self { manifest, executor }
    }

    fn manifest_arg(&self) -> String {
        self.manifest.display().to_string()
    }
}

impl Resource for BundleResource<'_> {
    type State = ();
    type Drift = ValueDrift;

    fn description(&self) -> String {
        format!("bundle {}", self.manifest.display())
    }

    fn probe(&self) -> Result<Probed<()>, ResourceError> {
        if !self.manifest.is_file() {
            return Err(ResourceError::SourceMissing {
                path: self.manifest_arg(),
            });
        }
        if !self.executor.which(BREW) {
            return Err(ResourceError::ToolMissing {
                tool: BREW.to_string(),
            });
        }
        let file = self.manifest_arg();
        let result = self
            .executor
            .run_unchecked(BREW, &["bundle", "check", "--no-upgrade", "--file", &file])
            .map_err(|e| ResourceError::spawn(BREW, &e))?;
        Ok(result.success.then_some(()).into())
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
        let file = self.manifest_arg();
        let result = self
            .executor
            .run_unchecked(BREW, &["bundle", "--file", &file])
            .map_err(|e| ResourceError::spawn(BREW, &e))?;
        if result.success {
            Ok(ResourceChange::Applied)
        } else {
            Err(ResourceError::from_exec(
                BREW,
                &result,
                &file,
                "run `brew bundle` manually and enter your password when prompted",
            ))
        }
    }
}
