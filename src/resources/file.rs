//! Whole-file overwrite, compared by SHA-256.
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest as _, Sha256};

use super::{Probed, Resource, ResourceChange, ResourceError, ValueDrift};

/// Where the desired content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Copy a file.
    Path(PathBuf),
    /// Literal text.
    Inline(String),
}

/// Digests of the current and desired content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigests {
    /// Digest of the target.
    pub current: String,
    /// Digest of the source.
    pub desired: String,
}

/// A file whose content should equal its source.
#[derive(Debug, Clone)]
pub struct FileResource {
    source: FileSource,
    target: PathBuf,
}

fn io_error(path: &Path, source: std::io::Error) -> ResourceError {
    ResourceError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

impl FileResource {
    /// Create a file resource with resolved paths.
    #[must_use]
    pub const fn new(source: FileSource, target: PathBuf) -> Self {
        Self { source, target }
    }

    fn content(&self) -> Result<Cow<'_, [u8]>, ResourceError> {
        match &self.source {
            FileSource::Inline(text) => Ok(Cow::Borrowed(text.as_bytes())),
            FileSource::Path(path) => match fs::read(path) {
                Ok(bytes) => Ok(Cow::Owned(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(ResourceError::SourceMissing {
                        path: path.display().to_string(),
                    })
                }
                Err(e) => Err(io_error(path, e)),
            },
        }
    }
}

impl Resource for FileResource {
    type State = FileDigests;
    type Drift = ValueDrift;

    fn description(&self) -> String {
        self.target.display().to_string()
    }

    fn probe(&self) -> Result<Probed<FileDigests>, ResourceError> {
        let desired = digest(&self.content()?);
        match fs::read(&self.target) {
            Ok(bytes) => Ok(Probed::Present(FileDigests {
                current: digest(&bytes),
                desired,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Probed::Absent),
            Err(e) => Err(io_error(&self.target, e)),
        }
    }

    fn diff(&self, current: &Probed<FileDigests>) -> ValueDrift {
        match current {
            Probed::Absent => ValueDrift::Missing,
            Probed::Present(d) if d.current == d.desired => ValueDrift::InSync,
            Probed::Present(d) => ValueDrift::Differs {
                current: format!("sha256 {}", d.current.get(..12).unwrap_or(&d.current)),
            },
        }
    }

    fn apply(&self, drift: &ValueDrift) -> Result<ResourceChange, ResourceError> {
        if *drift == ValueDrift::InSync {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let content = self.content()?;
        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        fs::write(&self.target, &content).map_err(|e| io_error(&self.target, e))?;
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resources::converge;

    #[test]
    fn writes_missing_target_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/.zshrc");
        let resource = FileResource::new(FileSource::Inline("export EDITOR=vim\n".into()), target.clone());

        assert_eq!(converge(&resource).unwrap(), ResourceChange::Applied);
        assert_eq!(fs::read_to_string(&target).unwrap(), "export EDITOR=vim\n");
        assert_eq!(converge(&resource).unwrap(), ResourceChange::AlreadyCorrect);
    }

    #[test]
    fn different_content_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("zshrc");
        let target = dir.path().join(".zshrc");
        fs::write(&source, "new\n").unwrap();
        fs::write(&target, "old\n").unwrap();
        let resource = FileResource::new(FileSource::Path(source), target.clone());

        let drift = resource.diff(&resource.probe().unwrap());
        assert!(matches!(drift, ValueDrift::Differs { .. }));
        resource.apply(&drift).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");
    }

    #[test]
    fn missing_source_is_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let resource = FileResource::new(
            FileSource::Path(dir.path().join("absent")),
            dir.path().join(".zshrc"),
        );
        assert!(matches!(
            resource.probe().unwrap_err(),
            ResourceError::SourceMissing { .. }
        ));
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
