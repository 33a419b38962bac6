//! Host platform detection.
use std::fmt;

use crate::error::PlatformError;

/// Detected operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Apple macOS, the only supported provisioning target.
    MacOs,
    /// Any Linux distribution.
    Linux,
    /// Microsoft Windows.
    Windows,
    /// Anything else (BSDs, unknown targets).
    Other,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
            Self::Other => write!(f, "unknown"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Detected operating system.
    pub os: Os,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub const fn detect() -> Self {
        Self {
            os: Self::detect_os(),
        }
    }

    /// Create a platform with an explicit OS.
    #[must_use]
    pub const fn new(os: Os) -> Self {
        Self { os }
    }

    /// Whether the host is macOS.
    #[must_use]
    pub fn is_macos(&self) -> bool {
        self.os == Os::MacOs
    }

    /// Fail unless the host can be provisioned.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unsupported`] on anything but macOS.
    pub fn ensure_supported(&self) -> Result<(), PlatformError> {
        if self.is_macos() {
            Ok(())
        } else {
            Err(PlatformError::Unsupported {
                platform: self.os.to_string(),
            })
        }
    }

    const fn detect_os() -> Os {
        if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(target_os = "linux") {
            Os::Linux
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else {
            Os::Other
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn detect_matches_compile_target() {
        let p = Platform::detect();
        assert_eq!(p.is_macos(), cfg!(target_os = "macos"));
    }

    #[test]
    fn macos_is_supported() {
        assert!(Platform::new(Os::MacOs).ensure_supported().is_ok());
    }

    #[test]
    fn linux_is_unsupported() {
        let err = Platform::new(Os::Linux).ensure_supported().unwrap_err();
        assert_eq!(err.to_string(), "Operation not supported on linux");
    }

    #[test]
    fn os_display() {
        assert_eq!(Os::MacOs.to_string(), "macos");
        assert_eq!(Os::Windows.to_string(), "windows");
        assert_eq!(Os::Other.to_string(), "unknown");
    }
}
