//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via `?`.
//!
//! # Error hierarchy
//!
//! ```text
//! ProvisionError
//! ├── Catalog(CatalogError)    : catalog loading and validation
//! ├── Reconcile(ReconcileError): fatal unit failures, interrupts
//! ├── Resource(ResourceError)  : probe and mutation failures
//! └── Platform(PlatformError)  : unsupported host OS
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub use crate::resources::error::ResourceError;

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Catalog could not be loaded or failed validation.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The reconcile run stopped early.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// A resource operation failed outside of a reconcile run.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// The host platform cannot be provisioned.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Errors that arise while loading the desired-state catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("IO error reading catalog {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The catalog is not valid TOML or does not match the unit schema.
    #[error("Invalid catalog syntax in {origin}: {message}")]
    Parse {
        /// Where the catalog came from (a path or `<built-in>`).
        origin: String,
        /// Parser message.
        message: String,
    },

    /// The catalog parsed but violates one or more structural rules.
    #[error("{count} catalog problem(s):\n{details}")]
    Invalid {
        /// Number of problems found.
        count: usize,
        /// One problem per line.
        details: String,
    },
}

/// Errors that stop a reconcile run.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A unit failed in a way the tolerance layer does not downgrade.
    #[error("unit '{unit}' failed during {step}: {source}")]
    Fatal {
        /// Identifier of the failing unit.
        unit: String,
        /// Step that failed (`probe` or `apply`).
        step: String,
        /// Underlying resource failure.
        source: ResourceError,
    },

    /// The run was interrupted before every unit was processed.
    #[error("interrupted with {remaining} unit(s) not processed; re-run to resume")]
    Interrupted {
        /// Units that were never dequeued.
        remaining: usize,
    },
}

/// Errors that arise from platform detection.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The requested operation is not supported on the current platform.
    #[error("Operation not supported on {platform}")]
    Unsupported {
        /// Name of the platform (e.g. `"linux"`).
        platform: String,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn catalog_io_display() {
        let e = CatalogError::Io {
            path: PathBuf::from("/conf/catalog.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().contains("/conf/catalog.toml"));
        assert!(e.to_string().contains("IO error reading catalog"));
    }

    #[test]
    fn catalog_io_has_source() {
        use std::error::Error as StdError;
        let e = CatalogError::Io {
            path: PathBuf::from("catalog.toml"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.source().is_some());
    }

    #[test]
    fn catalog_invalid_lists_details() {
        let e = CatalogError::Invalid {
            count: 2,
            details: "  dup: duplicate id\n  x: empty versions".to_string(),
        };
        let text = e.to_string();
        assert!(text.starts_with("2 catalog problem(s):"));
        assert!(text.contains("duplicate id"));
    }

    #[test]
    fn reconcile_fatal_names_unit_and_step() {
        let e = ReconcileError::Fatal {
            unit: "keyboard.repeat-rate".to_string(),
            step: "apply".to_string(),
            source: ResourceError::ExecutionFailed {
                program: "defaults".to_string(),
                exit_code: 1,
                stderr: "boom".to_string(),
            },
        };
        let text = e.to_string();
        assert!(text.contains("keyboard.repeat-rate"));
        assert!(text.contains("apply"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn interrupted_display() {
        let e = ReconcileError::Interrupted { remaining: 4 };
        assert_eq!(
            e.to_string(),
            "interrupted with 4 unit(s) not processed; re-run to resume"
        );
    }

    #[test]
    fn provision_error_from_platform_error() {
        let e: ProvisionError = PlatformError::Unsupported {
            platform: "linux".to_string(),
        }
        .into();
        assert!(e.to_string().contains("Platform error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<ProvisionError>();
        assert_send_sync::<CatalogError>();
        assert_send_sync::<ReconcileError>();
        assert_send_sync::<PlatformError>();
    }

    #[test]
    fn catalog_error_converts_to_anyhow() {
        let e = CatalogError::Parse {
            origin: "<built-in>".to_string(),
            message: "bad".to_string(),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
