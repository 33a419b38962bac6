//! Typed error variants for resource probes and mutations.
//!
//! The reconcile tolerance layer classifies these variants into unit
//! outcomes, so resources must pick the variant that describes the failure
//! rather than collapsing everything into a string.

use thiserror::Error;

use crate::exec::ExecResult;

/// Stderr fragments that indicate the OS refused the operation for lack of
/// rights rather than because the operation itself was wrong.
const PRIVILEGE_MARKERS: &[&str] = &[
    "a password is required",
    "permission denied",
    "operation not permitted",
    "not authorized",
    "not allowed assistive access",
    "(-1743)",
    "(-1719)",
];

/// Errors that arise from resource probes and mutations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The OS denied the operation for lack of privilege or consent.
    #[error("permission denied for {resource}")]
    PrivilegeDenied {
        /// Resource the operation targeted.
        resource: String,
        /// What the operator has to do manually to grant access.
        remediation: String,
    },

    /// An external tool the resource needs is not installed.
    #[error("required tool '{tool}' is not installed")]
    ToolMissing {
        /// Program name looked up on `PATH`.
        tool: String,
    },

    /// The application a resource refers to is not installed.
    #[error("application not found: {path}")]
    ApplicationMissing {
        /// Expected application bundle path.
        path: String,
    },

    /// A file the catalog points at (manifest, template) does not exist.
    #[error("source file not found: {path}")]
    SourceMissing {
        /// Expected file path.
        path: String,
    },

    /// A command invoked by a resource failed with a non-zero exit code.
    #[error("command '{program}' failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code returned by the process.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// Persisted state could not be interpreted.
    #[error("invalid state for '{resource}': {reason}")]
    InvalidState {
        /// Resource whose state is unreadable.
        resource: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A property list could not be decoded or encoded.
    #[error("property list error for {domain}: {message}")]
    Codec {
        /// Preference domain the property list belongs to.
        domain: String,
        /// Decoder or encoder message.
        message: String,
    },

    /// The program could not be spawned at all.
    #[error("failed to run {program}: {message}")]
    Spawn {
        /// Program that could not be started.
        program: String,
        /// Underlying error text.
        message: String,
    },

    /// A local file operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl ResourceError {
    /// Build an error from a failed command, recognising privilege refusals.
    ///
    /// `resource` and `remediation` are only used when the failure looks like
    /// a privilege refusal.
    #[must_use]
    pub fn from_exec(program: &str, result: &ExecResult, resource: &str, remediation: &str) -> Self {
        let stderr = result.stderr.trim().to_string();
        if is_privilege_failure(&stderr) {
            Self::PrivilegeDenied {
                resource: resource.to_string(),
                remediation: remediation.to_string(),
            }
        } else {
            Self::ExecutionFailed {
                program: program.to_string(),
                exit_code: result.code.unwrap_or(-1),
                stderr,
            }
        }
    }

    /// Wrap a spawn failure from the executor.
    #[must_use]
    pub fn spawn(program: &str, err: &anyhow::Error) -> Self {
        Self::Spawn {
            program: program.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Remediation text for privilege failures.
    #[must_use]
    pub fn remediation(&self) -> Option<&str> {
        match self {
            Self::PrivilegeDenied { remediation, .. } => Some(remediation),
            _ => None,
        }
    }
}

/// Whether command stderr indicates a privilege or consent refusal.
#[must_use]
pub fn is_privilege_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    PRIVILEGE_MARKERS.iter().any(|m| lower.contains(m))
}
