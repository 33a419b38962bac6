//! TOML file loading with typed errors.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::CatalogError;

/// Read and deserialize a TOML file.
///
/// Unlike optional config fragments, a file named explicitly must exist.
///
/// # Errors
///
/// Returns [`CatalogError::Io`] if the file cannot be read and
/// [`CatalogError::Parse`] if it is not valid for `T`.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content, &path.display().to_string())
}

/// Deserialize TOML text, labelling errors with `origin`.
///
/// # Errors
///
/// Returns [`CatalogError::Parse`] if the text is not valid for `T`.
pub fn parse_str<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T, CatalogError> {
    toml::from_str(content).map_err(|e| CatalogError::Parse {
        origin: origin.to_string(),
        message: e.message().to_string(),
    })
}
