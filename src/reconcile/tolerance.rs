//! Privilege and error tolerance layer.
//!
//! The single place that decides whether a failure lets the run continue.
//! Recoverable failures become an [`Outcome`] plus a warning; anything else
//! becomes [`ReconcileError::Fatal`].
use crate::config::units::{ConfigUnit, Domain};
use crate::error::ReconcileError;
use crate::resources::{ResourceChange, ResourceError};
use crate::system::login_items::AUTOMATION_REMEDIATION;

use super::{Outcome, Step};

/// How a unit ended, before it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Diff text, remediation, or skip reason shown in the report.
    pub detail: Option<String>,
    /// Message logged as a warning, if the outcome is degraded.
    pub warning: Option<String>,
}

impl Resolution {
    /// State already matched.
    #[must_use]
    pub const fn satisfied() -> Self {
        Self {
            outcome: Outcome::Satisfied,
            detail: None,
            warning: None,
        }
    }

    /// Dry run found `diff` pending.
    #[must_use]
    pub fn would_apply(diff: String) -> Self {
        Self {
            outcome: Outcome::WouldApply,
            detail: Some(diff),
            warning: None,
        }
    }

    /// Skipped because an earlier unit did not complete.
    #[must_use]
    pub fn blocked(unit: &str, dependency: &str) -> Self {
        let reason = format!("dependency '{dependency}' did not complete");
        Self {
            outcome: Outcome::SkippedUnavailable,
            warning: Some(format!("{unit}: {reason}")),
            detail: Some(reason),
        }
    }

    fn degraded(outcome: Outcome, unit: &str, detail: String) -> Self {
        Self {
            outcome,
            warning: Some(format!("{unit}: {detail}")),
            detail: Some(detail),
        }
    }
}

/// Classify a successful mutator result; `diff` is the drift that was applied.
#[must_use]
pub fn classify_change(unit: &ConfigUnit, change: ResourceChange, diff: &str) -> Resolution {
    match change {
        ResourceChange::Applied => Resolution {
            outcome: Outcome::Applied,
            detail: Some(diff.to_string()),
            warning: None,
        },
        ResourceChange::AlreadyCorrect => Resolution::satisfied(),
        ResourceChange::Partial { failures } => Resolution::degraded(
            Outcome::Applied,
            &unit.id,
            format!("{diff}; failed: {}", failures.join("; ")),
        ),
        ResourceChange::Skipped { reason } => {
            Resolution::degraded(Outcome::SkippedUnavailable, &unit.id, reason)
        }
    }
}

/// Classify a probe or mutator failure.
///
/// # Errors
///
/// Returns [`ReconcileError::Fatal`] for failures the run cannot tolerate.
pub fn classify_error(
    unit: &ConfigUnit,
    step: Step,
    err: ResourceError,
) -> Result<Resolution, ReconcileError> {
    match err {
        ResourceError::PrivilegeDenied {
            resource,
            remediation,
        } if unit.tolerates_privilege_failure() => Ok(Resolution {
            outcome: Outcome::SkippedPrivilege,
            warning: Some(format!(
                "{}: permission denied for {resource}; {remediation}",
                unit.id
            )),
            detail: Some(remediation),
        }),
        ResourceError::ToolMissing { .. }
        | ResourceError::ApplicationMissing { .. }
        | ResourceError::SourceMissing { .. } => Ok(Resolution::degraded(
            Outcome::SkippedUnavailable,
            &unit.id,
            err.to_string(),
        )),
        // Login item registration never stops a run.
        other if unit.domain() == Domain::LoginItem => Ok(Resolution {
            outcome: Outcome::SkippedPrivilege,
            warning: Some(format!("{}: {other}; {AUTOMATION_REMEDIATION}", unit.id)),
            detail: Some(AUTOMATION_REMEDIATION.to_string()),
        }),
        other => Err(ReconcileError::Fatal {
            unit: unit.id.clone(),
            step: step.to_string(),
            source: other,
        }),
    }
}
