//! [`VersionManager`] backed by the `asdf` CLI.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::VersionManager;
use crate::exec::{ExecResult, Executor};
use crate::resources::error::ResourceError;

const ASDF: &str = "asdf";

/// `asdf` wrapper.
///
/// The global version is read straight from `~/.tool-versions` rather than
/// through `asdf current`, whose output format changed across releases.
#[derive(Clone)]
pub struct Asdf {
    executor: Arc<dyn Executor>,
    tool_versions: PathBuf,
}

impl std::fmt::Debug for Asdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asdf")
            .field("tool_versions", &self.tool_versions)
            .finish_non_exhaustive()
    }
}

impl Asdf {
    /// Create a wrapper for the user whose home directory is `home`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, home: &Path) -> Self {
        Self {
            executor,
            tool_versions: home.join(".tool-versions"),
        }
    }

    fn run(&self, args: &[&str], resource: &str) -> Result<ExecResult, ResourceError> {
        let result = self
            .executor
            .run_unchecked(ASDF, args)
            .map_err(|e| ResourceError::spawn(ASDF, &e))?;
        if result.success {
            Ok(result)
        } else {
            Err(ResourceError::from_exec(
                ASDF,
                &result,
                resource,
                "check ownership of ~/.asdf",
            ))
        }
    }
}

/// Parse `asdf list <name>` / `asdf plugin list` output.
///
/// Lines are indented and the current version is prefixed with `*`.
fn parse_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Find the first version listed for `name` in `.tool-versions` content.
fn parse_tool_versions(content: &str, name: &str) -> Option<String> {
    content
        .lines()
        .map(|l| l.split('#').next().unwrap_or_default())
        .find_map(|line| {
            let mut fields = line.split_whitespace();
            (fields.next() == Some(name))
                .then(|| fields.next().map(String::from))
                .flatten()
        })
}

impl VersionManager for Asdf {
    fn tool(&self) -> &'static str {
        ASDF
    }

    fn is_available(&self) -> bool {
        self.executor.which(ASDF)
    }

    fn plugin_list(&self) -> Result<Vec<String>, ResourceError> {
        let result = self
            .executor
            .run_unchecked(ASDF, &["plugin", "list"])
            .map_err(|e| ResourceError::spawn(ASDF, &e))?;
        if result.success {
            Ok(parse_list(&result.stdout))
        } else if result.stderr.contains("No plugins installed")
            || result.stdout.contains("No plugins installed")
        {
            Ok(vec![])
        } else {
            Err(ResourceError::from_exec(ASDF, &result, "plugins", ""))
        }
    }

    fn plugin_add(&self, name: &str, url: &str) -> Result<(), ResourceError> {
        self.run(&["plugin", "add", name, url], name).map(|_| ())
    }

    fn list(&self, name: &str) -> Result<Vec<String>, ResourceError> {
        let result = self
            .executor
            .run_unchecked(ASDF, &["list", name])
            .map_err(|e| ResourceError::spawn(ASDF, &e))?;
        if result.success {
            let versions = parse_list(&result.stdout);
            // Some releases print this on stdout with a zero exit code.
            if versions.iter().any(|v| v.starts_with("No versions")) {
                return Ok(vec![]);
            }
            Ok(versions)
        } else if result.stderr.contains("No versions") {
            Ok(vec![])
        } else {
            Err(ResourceError::from_exec(ASDF, &result, name, ""))
        }
    }

    fn install(&self, name: &str, version: &str) -> Result<(), ResourceError> {
        self.run(&["install", name, version], &format!("{name} {version}"))
            .map(|_| ())
    }

    fn global_get(&self, name: &str) -> Result<Option<String>, ResourceError> {
        match std::fs::read_to_string(&self.tool_versions) {
            Ok(content) => Ok(parse_tool_versions(&content, name)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ResourceError::Io {
                path: self.tool_versions.display().to_string(),
                source,
            }),
        }
    }

    fn global_set(&self, name: &str, version: &str) -> Result<(), ResourceError> {
        let result = self
            .executor
            .run_unchecked(ASDF, &["global", name, version])
            .map_err(|e| ResourceError::spawn(ASDF, &e))?;
        if result.success {
            return Ok(());
        }
        // asdf 0.16 replaced `global` with `set --home`.
        if result.stderr.contains("invalid command") || result.stderr.contains("Unknown command") {
            return self
                .run(&["set", "--home", name, version], name)
                .map(|_| ());
        }
        Err(ResourceError::from_exec(ASDF, &result, name, ""))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;

    fn asdf(mock: &Arc<MockExecutor>) -> Asdf {
        Asdf::new(mock.clone(), Path::new("/nonexistent-home"))
    }

    #[test]
    fn list_strips_current_marker() {
        let mock = Arc::new(MockExecutor::ok("  18.20.0\n *20.11.1\n"));
        let versions = asdf(&mock).list("nodejs").unwrap();
        assert_eq!(versions, vec!["18.20.0", "20.11.1"]);
        assert_eq!(mock.calls(), vec!["asdf list nodejs"]);
    }

    #[test]
    fn list_without_versions_is_empty() {
        let mock = Arc::new(MockExecutor::fail("No versions installed"));
        assert!(asdf(&mock).list("python").unwrap().is_empty());
    }

    #[test]
    fn plugin_list_without_plugins_is_empty() {
        let mock = Arc::new(MockExecutor::fail("No plugins installed"));
        assert!(asdf(&mock).plugin_list().unwrap().is_empty());
    }

    #[test]
    fn install_failure_is_execution_failed() {
        let mock = Arc::new(MockExecutor::fail("ERROR: version not found"));
        let err = asdf(&mock).install("nodejs", "99.0.0").unwrap_err();
        assert!(matches!(err, ResourceError::ExecutionFailed { .. }));
        assert_eq!(mock.calls(), vec!["asdf install nodejs 99.0.0"]);
    }

    #[test]
    fn global_set_falls_back_to_set_home() {
        let mock = Arc::new(MockExecutor::with_responses(vec![
            (false, "", "invalid command provided: global"),
            (true, "", ""),
        ]));
        asdf(&mock).global_set("nodejs", "20.11.1").unwrap();
        assert_eq!(
            mock.calls(),
            vec![
                "asdf global nodejs 20.11.1",
                "asdf set --home nodejs 20.11.1"
            ]
        );
    }

    #[test]
    fn global_get_reads_tool_versions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".tool-versions"),
            "# managed\nnodejs 20.11.1 18.20.0\npython 3.12.2\n",
        )
        .unwrap();
        let manager = Asdf::new(Arc::new(MockExecutor::default()), dir.path());
        assert_eq!(
            manager.global_get("nodejs").unwrap().as_deref(),
            Some("20.11.1")
        );
        assert_eq!(manager.global_get("ruby").unwrap(), None);
    }

    #[test]
    fn global_get_without_file_is_none() {
        let mock = Arc::new(MockExecutor::default());
        assert_eq!(asdf(&mock).global_get("nodejs").unwrap(), None);
    }

    #[test]
    fn is_available_uses_which() {
        let mock = Arc::new(MockExecutor::default().with_available(&["asdf"]));
        assert!(asdf(&mock).is_available());
    }
}
