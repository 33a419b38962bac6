//! Reconciliation engine: drives every catalog unit through
//! probe → diff → apply and records the outcome.
//!
//! The [`Orchestrator`] walks units strictly in catalog order.  Failures are
//! classified in one place ([`tolerance`]) into either a per-unit
//! [`Outcome`] that lets the run continue, or a fatal error that halts it.
pub mod context;
pub mod orchestrator;
pub mod report;
pub mod tolerance;

use std::fmt;

use serde::Serialize;

pub use context::Context;
pub use orchestrator::Orchestrator;
pub use report::{RunReport, UnitReport};

/// Terminal state of one unit in a run.
///
/// # Examples
///
/// ```
/// use provision_cli::reconcile::Outcome;
///
/// assert!(Outcome::Satisfied.is_complete());
/// assert!(!Outcome::SkippedPrivilege.is_complete());
/// assert_eq!(Outcome::WouldApply.to_string(), "would apply");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The mutator ran and changed state.
    Applied,
    /// State already matched; nothing was touched.
    Satisfied,
    /// Dry run: the unit needs a change that was not made.
    WouldApply,
    /// The OS refused for lack of privilege; remediation was reported.
    SkippedPrivilege,
    /// A required tool, application, source, or dependency is missing.
    SkippedUnavailable,
    /// The unit failed and the run halted.
    FailedFatal,
}

impl Outcome {
    /// Whether dependants of a unit with this outcome may proceed.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Applied | Self::Satisfied | Self::WouldApply)
    }

    /// Stable machine-readable name, as serialized.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Satisfied => "satisfied",
            Self::WouldApply => "would-apply",
            Self::SkippedPrivilege => "skipped-privilege",
            Self::SkippedUnavailable => "skipped-unavailable",
            Self::FailedFatal => "failed-fatal",
        }
    }

    /// Every outcome, in summary order.
    pub const ALL: [Self; 6] = [
        Self::Applied,
        Self::Satisfied,
        Self::WouldApply,
        Self::SkippedPrivilege,
        Self::SkippedUnavailable,
        Self::FailedFatal,
    ];
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Applied => "applied",
            Self::Satisfied => "satisfied",
            Self::WouldApply => "would apply",
            Self::SkippedPrivilege => "skipped (privilege)",
            Self::SkippedUnavailable => "skipped (unavailable)",
            Self::FailedFatal => "failed",
        };
        f.write_str(label)
    }
}

/// Step of the cycle a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Reading live state.
    Probe,
    /// Mutating state.
    Apply,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe => f.write_str("probe"),
            Self::Apply => f.write_str("apply"),
        }
    }
}

/// Orchestrator state, logged at debug level on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next unit.
    Idle,
    /// A unit was dequeued and is being probed.
    ProbePending,
    /// Probe finished and the differ has run.
    Diffed,
    /// Nothing to change.
    Satisfied,
    /// The mutator is running.
    Applying,
    /// The mutator finished.
    Applied,
    /// The mutation was refused for lack of privilege.
    SkippedPrivilege,
    /// The unit failed fatally.
    FailedFatal,
    /// Restarting services whose units have all been processed.
    ServiceRestartPending,
    /// The run is over.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
