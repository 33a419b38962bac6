//! Flat preference keys (`defaults read` / `defaults write`).
use super::{Probed, Resource, ResourceChange, ResourceError, ValueDrift};
use crate::config::units::PreferenceSpec;
use crate::system::PreferenceStore;

/// A single preference key that should hold a given value.
pub struct PreferenceResource<'a> {
    pref: &'a PreferenceSpec,
    store: &'a dyn PreferenceStore,
    privileged: bool,
}

impl std::fmt::Debug for PreferenceResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceResource")
            .field("pref", &self.pref)
            .field("privileged", &self.privileged)
            .finish_non_exhaustive()
    }
}

impl<'a> PreferenceResource<'a> {
    /// Create a preference resource.
    ///
    /// `privileged` writes go through non-interactive `sudo`.
    #[must_use]
    pub const fn new(pref: &'a PreferenceSpec, store: &'a dyn PreferenceStore, privileged: bool) -> Self {
        Self {
            pref,
            store,
            privileged,
        }
    }
}

impl Resource for PreferenceResource<'_> {
    type State = String;
    type Drift = ValueDrift;

    fn description(&self) -> String {
        format!("{} {} = {}", self.pref.domain, self.pref.key, self.pref.value)
    }

    fn probe(&self) -> Result<Probed<String>, ResourceError> {
        Ok(self.store.read(self.pref)?.into())
    }

    fn diff(&self, current: &Probed<String>) -> ValueDrift {
        match current {
            Probed::Absent => ValueDrift::Missing,
            Probed::Present(raw) if self.pref.value.matches_raw(raw) => ValueDrift::InSync,
            Probed::Present(raw) => ValueDrift::Differs {
                current: raw.trim().to_string(),
            },
        }
    }

    fn apply(&self, drift: &ValueDrift) -> Result<ResourceChange, ResourceError> {
        if *drift == ValueDrift::InSync {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.store.write(self.pref, self.privileged)?;
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::units::PrefValue;
    use crate::resources::{Drift, converge};
    use crate::system::fake::FakePreferences;

    fn repeat_rate() -> PreferenceSpec {
        PreferenceSpec {
            domain: "NSGlobalDomain".to_string(),
            key: "KeyRepeat".to_string(),
            value: PrefValue::Int(2),
            current_host: false,
        }
    }

    #[test]
    fn absent_key_is_missing() {
        let store = FakePreferences::default();
        let pref = repeat_rate();
        let resource = PreferenceResource::new(&pref, &store, false);
        let current = resource.probe().unwrap();
        assert!(current.is_absent());
        assert_eq!(resource.diff(&current), ValueDrift::Missing);
    }

    #[test]
    fn different_value_is_reported() {
        let store = FakePreferences::default();
        store.set("NSGlobalDomain", "KeyRepeat", "6");
        let pref = repeat_rate();
        let resource = PreferenceResource::new(&pref, &store, false);
        let drift = resource.diff(&resource.probe().unwrap());
        assert_eq!(drift.to_string(), "currently 6");
        assert!(drift.needs_change());
    }

    #[test]
    fn converge_writes_once_then_is_satisfied() {
        let store = FakePreferences::default();
        let pref = repeat_rate();
        let resource = PreferenceResource::new(&pref, &store, false);

        assert_eq!(converge(&resource).unwrap(), ResourceChange::Applied);
        assert_eq!(converge(&resource).unwrap(), ResourceChange::AlreadyCorrect);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.get("NSGlobalDomain", "KeyRepeat").as_deref(), Some("2"));
    }

    #[test]
    fn denied_write_surfaces_privilege_error() {
        let store = FakePreferences::default();
        store.deny("com.apple.loginwindow");
        let pref = PreferenceSpec {
            domain: "com.apple.loginwindow".to_string(),
            key: "GuestEnabled".to_string(),
            value: PrefValue::Bool(false),
            current_host: false,
        };
        let resource = PreferenceResource::new(&pref, &store, true);
        let err = converge(&resource).unwrap_err();
        assert!(matches!(err, ResourceError::PrivilegeDenied { .. }));
    }
}
