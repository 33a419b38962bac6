//! Idempotent resource primitives (probe + diff + apply pattern).
//!
//! Every catalog domain is a [`Resource`]: [`probe`](Resource::probe) reads
//! the live state without touching it, [`diff`](Resource::diff) compares it
//! against the desired state as plain data, and [`apply`](Resource::apply)
//! mutates only what the diff reports.
pub mod bundle;
pub mod dock;
pub mod error;
pub mod file;
pub mod installer;
pub mod login_item;
pub mod plugin;
pub mod preference;

use std::fmt;

pub use error::ResourceError;

/// Live state observed by a probe.
///
/// # Examples
///
/// ```
/// use provision_cli::resources::Probed;
///
/// let absent: Probed<String> = Probed::Absent;
/// let present = Probed::Present("1".to_string());
///
/// assert!(absent.is_absent());
/// assert_eq!(present.present(), Some(&"1".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probed<T> {
    /// Nothing has ever been set; the normal "needs initialisation" signal.
    Absent,
    /// Current value.
    Present(T),
}

impl<T> Probed<T> {
    /// Whether nothing was found.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The observed value, if any.
    #[must_use]
    pub const fn present(&self) -> Option<&T> {
        match self {
            Self::Absent => None,
            Self::Present(v) => Some(v),
        }
    }
}

impl<T> From<Option<T>> for Probed<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

/// Output of a differ: what, if anything, must change.
///
/// `Display` renders the pending change for dry-run output and the report.
pub trait Drift: fmt::Display {
    /// Whether the mutator has anything to do.
    fn needs_change(&self) -> bool;
}

/// Drift for resources whose state is a single comparable value.
///
/// # Examples
///
/// ```
/// use provision_cli::resources::{Drift, ValueDrift};
///
/// assert!(!ValueDrift::InSync.needs_change());
/// assert!(ValueDrift::Missing.needs_change());
/// assert_eq!(
///     ValueDrift::Differs { current: "0".into() }.to_string(),
///     "currently 0"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDrift {
    /// Current state equals desired state.
    InSync,
    /// Nothing is present yet.
    Missing,
    /// Something is present but different.
    Differs {
        /// Current value, for display.
        current: String,
    },
}

impl Drift for ValueDrift {
    fn needs_change(&self) -> bool {
        !matches!(self, Self::InSync)
    }
}

impl fmt::Display for ValueDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InSync => f.write_str("in sync"),
            Self::Missing => f.write_str("missing"),
            Self::Differs { current } => write!(f, "currently {current}"),
        }
    }
}

/// Result of applying a resource change.
///
/// # Examples
///
/// ```
/// use provision_cli::resources::ResourceChange;
///
/// let applied = ResourceChange::Applied;
/// let noop = ResourceChange::AlreadyCorrect;
///
/// assert_ne!(applied, noop);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created or updated.
    Applied,
    /// Some sub-steps were applied and some failed without aborting the rest.
    Partial {
        /// One line per failed sub-step.
        failures: Vec<String>,
    },
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
    /// Nothing could be applied, but the failure is not fatal.
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}

/// Unified interface for resources that can be probed, diffed, and applied.
///
/// # Examples
///
/// ```ignore
/// // Every resource follows the same probe-diff-apply cycle:
/// let current = resource.probe()?;
/// let drift = resource.diff(&current);
/// if drift.needs_change() {
///     resource.apply(&drift)?;
/// }
/// ```
pub trait Resource {
    /// Observed live state.
    type State: fmt::Debug;
    /// Differ output.
    type Drift: Drift;

    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Read the current state. Must never mutate anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined (missing tool,
    /// missing source, denied access, unreadable store).
    fn probe(&self) -> Result<Probed<Self::State>, ResourceError>;

    /// Compare the probed state with the desired state.
    fn diff(&self, current: &Probed<Self::State>) -> Self::Drift;

    /// Apply what `drift` reports.
    ///
    /// Returns [`ResourceChange::AlreadyCorrect`] without side effects when
    /// the drift reports nothing to do.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails.
    fn apply(&self, drift: &Self::Drift) -> Result<ResourceChange, ResourceError>;
}

/// Probe, diff, and apply in one step, short-circuiting when in sync.
///
/// # Errors
///
/// Propagates probe and apply errors.
pub fn converge<R: Resource>(resource: &R) -> Result<ResourceChange, ResourceError> {
    let current = resource.probe()?;
    let drift = resource.diff(&current);
    if !drift.needs_change() {
        return Ok(ResourceChange::AlreadyCorrect);
    }
    resource.apply(&drift)
}
