//! Login item registration.
use std::path::PathBuf;

use super::{Probed, Resource, ResourceChange, ResourceError, ValueDrift};
use crate::config::units::LoginItemSpec;
use crate::system::LoginItems;

/// An application that should launch at login.
pub struct LoginItemResource<'a> {
    item: &'a LoginItemSpec,
    app: PathBuf,
    registry: &'a dyn LoginItems,
}

impl std::fmt::Debug for LoginItemResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginItemResource")
            .field("item", &self.item)
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}

impl<'a> LoginItemResource<'a> {
    /// Create a login item resource; `app` is the expanded bundle path.
    #[must_use]
    pub const fn new(item: &'a LoginItemSpec, app: PathBuf, registry: &'a dyn LoginItems) -> Self {
        Self {
            item,
            app,
            registry,
        }
    }
}

impl Resource for LoginItemResource<'_> {
    type State = ();
    type Drift = ValueDrift;

    fn description(&self) -> String {
        format!("login item {}", self.item.name)
    }

    fn probe(&self) -> Result<Probed<()>, ResourceError> {
        Ok(self.registry.exists(&self.item.name)?.then_some(()).into())
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
        if !self.app.exists() {
            return Err(ResourceError::ApplicationMissing {
                path: self.app.display().to_string(),
            });
        }
        let item = LoginItemSpec {
            path: self.app.display().to_string(),
            ..self.item.clone()
        };
        self.registry.add(&item)?;
        Ok(ResourceChange::Applied)
    }
}
