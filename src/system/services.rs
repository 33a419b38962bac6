//! Service restarts via `killall`; launchd relaunches the process.
use std::sync::Arc;

use super::ServiceControl;
use crate::exec::Executor;
use crate::resources::error::ResourceError;

/// Restarts UI services by signalling them.
#[derive(Clone)]
pub struct Killall {
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Killall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Killall").finish_non_exhaustive()
    }
}

impl Killall {
    /// Create a controller using `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }
}

impl ServiceControl for Killall {
    fn restart(&self, service: &str) -> Result<(), ResourceError> {
        let result = self
            .executor
            .run_unchecked("killall", &[service])
            .map_err(|e| ResourceError::spawn("killall", &e))?;
        // A service that is not running picks up its preferences on launch.
        if result.success || result.stderr.contains("No matching processes") {
            Ok(())
        } else {
            Err(ResourceError::from_exec("killall", &result, service, ""))
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::MockExecutor;

    #[test]
    fn restart_signals_service() {
        let mock = Arc::new(MockExecutor::ok(""));
        Killall::new(mock.clone()).restart("Dock").unwrap();
        assert_eq!(mock.calls(), vec!["killall Dock"]);
    }

    #[test]
    fn restart_tolerates_stopped_service() {
        let mock = Arc::new(MockExecutor::fail(
            "No matching processes belonging to you were found",
        ));
        assert!(Killall::new(mock).restart("SystemUIServer").is_ok());
    }

    #[test]
    fn restart_reports_other_failures() {
        let mock = Arc::new(MockExecutor::fail("killall: bad signal"));
        assert!(Killall::new(mock).restart("Finder").is_err());
    }
}
