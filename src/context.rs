// src/context.rs

use crate::{
    constants::OUTPUT_LOG_TARGET,
    core::paths,
    models::OutputType,
    system::locator::{ExecutableLocator, SystemLocator},
};
use std::{fmt, sync::Arc, sync::OnceLock, time::Duration};
use thiserror::Error;

/// Receives every captured output line (after the output filter ran).
pub type OutputLogger = Arc<dyn Fn(OutputType, &str) + Send + Sync>;

/// Rewrites a captured line before it reaches the logger. The captured copy is untouched.
pub type OutputFilter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Errors raised while installing the process-wide context.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The context was already installed or already read.
    #[error("The process-wide tool context has already been initialized.")]
    AlreadyInitialized,
}

/// Logs standard output at `info` and standard error at `error`, under the `retype` target.
pub fn default_logger() -> OutputLogger {
    Arc::new(|kind, line| match kind {
        OutputType::Std => log::info!(target: OUTPUT_LOG_TARGET, "{}", line),
        OutputType::Err => log::error!(target: OUTPUT_LOG_TARGET, "{}", line),
    })
}

/// A logger that drops every line.
pub fn silent_logger() -> OutputLogger {
    Arc::new(|_, _| {})
}

/// Tool-wide configuration read by every invocation: the output logger, the package
/// version pin, the default timeout and the executable locator.
#[derive(Clone)]
pub struct ToolContext {
    logger: OutputLogger,
    version: Option<String>,
    timeout: Option<Duration>,
    locator: Arc<dyn ExecutableLocator>,
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("version", &self.version)
            .field("timeout", &self.timeout)
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            logger: default_logger(),
            version: None,
            timeout: None,
            locator: Arc::new(SystemLocator::new(paths::default_package_cache())),
        }
    }
}

impl ToolContext {
    /// Replaces the output logger.
    #[must_use]
    pub fn with_logger(mut self, logger: OutputLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Pins the package version used for package-cache resolution.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the timeout used by invocations that do not set their own.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the executable locator.
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn ExecutableLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// The output logger.
    pub fn logger(&self) -> &OutputLogger {
        &self.logger
    }

    /// The pinned package version, `None` for "highest available".
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The default timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The executable locator.
    pub fn locator(&self) -> &dyn ExecutableLocator {
        self.locator.as_ref()
    }
}

static GLOBAL_CONTEXT: OnceLock<ToolContext> = OnceLock::new();

/// Installs the process-wide default context.
///
/// Call this once at startup, before any invocation reads [`global`]. Once the global
/// context has been read or installed it never changes; later calls fail.
pub fn init_global(context: ToolContext) -> Result<(), ContextError> {
    GLOBAL_CONTEXT
        .set(context)
        .map_err(|_| ContextError::AlreadyInitialized)
}

/// The process-wide default context. Falls back to [`ToolContext::default`] if
/// [`init_global`] was never called.
pub fn global() -> &'static ToolContext {
    GLOBAL_CONTEXT.get_or_init(ToolContext::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_builder_methods() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let context = ToolContext::default()
            .with_version("2.4.0")
            .with_timeout(Duration::from_secs(5))
            .with_logger(Arc::new(move |kind, line| {
                sink.lock().unwrap().push((kind, line.to_string()));
            }));

        assert_eq!(context.version(), Some("2.4.0"));
        assert_eq!(context.timeout(), Some(Duration::from_secs(5)));
        (context.logger())(OutputType::Err, "boom");
        assert_eq!(
            lines.lock().unwrap().as_slice(),
            &[(OutputType::Err, "boom".to_string())]
        );
    }

    #[test]
    fn test_global_cannot_be_replaced_once_read() {
        let _ = global();
        assert!(matches!(
            init_global(ToolContext::default()),
            Err(ContextError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_debug_omits_logger() {
        let rendered = format!("{:?}", ToolContext::default().with_version("1.0.0"));
        assert!(rendered.contains("1.0.0"));
        assert!(rendered.contains("SystemLocator"));
    }
}
