//! # Retype Tasks
//!
//! The public entry points. [`RetypeTasks`] ties the pieces together: it compiles
//! settings with the descriptor, resolves the executable through the context's locator,
//! and hands both to the process executor.
//!
//! ```no_run
//! use retype_tasks::{BuildSettings, RetypeTasks};
//!
//! let tasks = RetypeTasks::new();
//! let result = tasks.build(&BuildSettings::new().set_output("dist").set_config("site"))?;
//! for line in result.std_lines() {
//!     println!("{line}");
//! }
//! # Ok::<(), retype_tasks::InvokeError>(())
//! ```

use crate::{
    CancellationToken,
    context::{self, OutputFilter, OutputLogger, ToolContext},
    core::{
        arguments::{self, CompileError, CompiledArguments},
        batch::{self, BatchError, BatchOptions, Combinations},
        descriptor::{self, DescriptorError},
        settings::{ProcessSettings, Settings},
        typed::{BuildSettings, RunSettings, WatchSettings},
    },
    models::{InvocationResult, OutputLine, ToolDescriptor},
    system::{
        executor::{self, ExecutionError, ProcessRequest},
        locator::{self, ResolutionError},
    },
};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};
use thiserror::Error;

/// Everything that can go wrong with one invocation.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// The settings could not be turned into a command line; nothing ran.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// No executable was found; nothing ran.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// The process ran and failed, timed out or was cancelled.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl InvokeError {
    /// Output captured before the failure, when the process was started.
    pub fn output(&self) -> Option<&[OutputLine]> {
        match self {
            Self::Execution(e) => e.output(),
            _ => None,
        }
    }

    /// Exit code of a process that ran and failed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Execution(e) => e.exit_code(),
            _ => None,
        }
    }

    /// Whether the process was killed for exceeding its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Timeout { .. }))
    }

    /// Whether the process was killed through the cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Cancelled { .. }))
    }
}

/// Runs Retype sub-commands.
#[derive(Clone)]
pub struct RetypeTasks {
    descriptor: Arc<ToolDescriptor>,
    context: ToolContext,
    filter: Option<OutputFilter>,
    cancellation: Option<CancellationToken>,
}

impl std::fmt::Debug for RetypeTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetypeTasks")
            .field("tool", &self.descriptor.name)
            .field("context", &self.context)
            .field("filter", &self.filter.is_some())
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl Default for RetypeTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl RetypeTasks {
    /// Uses the built-in descriptor and the process-wide context.
    pub fn new() -> Self {
        Self::with_context(context::global().clone())
    }

    /// Uses the built-in descriptor and an explicit context.
    pub fn with_context(context: ToolContext) -> Self {
        Self {
            descriptor: descriptor::retype(),
            context,
            filter: None,
            cancellation: None,
        }
    }

    /// Replaces the descriptor after validating it.
    pub fn with_descriptor(
        mut self,
        descriptor: Arc<ToolDescriptor>,
    ) -> Result<Self, DescriptorError> {
        descriptor::validate(&descriptor)?;
        self.descriptor = descriptor;
        Ok(self)
    }

    /// Sends captured output to `logger` instead of the context's logger.
    #[must_use]
    pub fn with_logger(mut self, logger: OutputLogger) -> Self {
        self.context = self.context.with_logger(logger);
        self
    }

    /// Rewrites every line before it is logged. Captured output is not affected.
    #[must_use]
    pub fn with_output_filter(mut self, filter: OutputFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Kills running invocations once `token` is set. Invocations started after that
    /// are killed on their first poll.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The descriptor settings are compiled against.
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// The context supplying the logger, version pin, timeout and locator.
    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Empty settings for `sub_command`, which must exist in the descriptor.
    pub fn settings(&self, sub_command: &str) -> Result<Settings, CompileError> {
        self.descriptor
            .sub_command(sub_command)
            .map(|spec| Settings::new(spec.name.clone()))
            .ok_or_else(|| CompileError::UnknownSubCommand(sub_command.to_string()))
    }

    /// Compiles settings into the argument vector without running anything.
    pub fn compile(&self, settings: &Settings) -> Result<CompiledArguments, CompileError> {
        let spec = self
            .descriptor
            .sub_command(settings.sub_command())
            .ok_or_else(|| CompileError::UnknownSubCommand(settings.sub_command().to_string()))?;
        arguments::compile(spec, settings)
    }

    /// The executable that would be launched: the explicit tool path when set, otherwise
    /// the result of resolution.
    pub fn resolve(&self, process: &ProcessSettings) -> Result<PathBuf, ResolutionError> {
        match &process.tool_path {
            Some(path) => Ok(path.clone()),
            None => locator::resolve_executable(
                &self.descriptor,
                self.context.locator(),
                self.context.version(),
            ),
        }
    }

    /// Runs `retype build`.
    pub fn build(&self, settings: &BuildSettings) -> Result<InvocationResult, InvokeError> {
        self.execute(settings.settings())
    }

    /// Runs `retype watch`.
    pub fn watch(&self, settings: &WatchSettings) -> Result<InvocationResult, InvokeError> {
        self.execute(settings.settings())
    }

    /// Runs `retype run`.
    pub fn run(&self, settings: &RunSettings) -> Result<InvocationResult, InvokeError> {
        self.execute(settings.settings())
    }

    /// Compiles and runs any sub-command of the descriptor.
    pub fn execute(&self, settings: &Settings) -> Result<InvocationResult, InvokeError> {
        self.execute_with_logger(settings, self.context.logger())
    }

    /// Runs the tool with a caller-supplied argument string, bypassing the compiler.
    pub fn invoke_raw(&self, arguments: &str) -> Result<InvocationResult, InvokeError> {
        self.invoke_raw_with(arguments, &ProcessSettings::default())
    }

    /// Like [`RetypeTasks::invoke_raw`], with process options.
    pub fn invoke_raw_with(
        &self,
        arguments: &str,
        process: &ProcessSettings,
    ) -> Result<InvocationResult, InvokeError> {
        let mut compiled = CompiledArguments::parse_raw(arguments)?;
        for extra in &process.extra_arguments {
            compiled.push(extra.as_str());
        }
        self.launch(&compiled, process, self.context.logger())
    }

    /// Runs one invocation per combination and pairs each result with the settings that
    /// produced it, in [`Combinations::expand`] order.
    ///
    /// With more than one concurrent invocation, each invocation's output is buffered and
    /// replayed to the logger as one block when it finishes.
    pub fn batch(
        &self,
        combinations: &Combinations,
        options: &BatchOptions,
    ) -> Result<
        Vec<(Settings, InvocationResult)>,
        BatchError<(Settings, InvocationResult), InvokeError>,
    > {
        let items = combinations.expand();
        if options.degree_of_parallelism <= 1 {
            return batch::run_batch(&items, options, |settings| {
                self.execute(settings).map(|result| (settings.clone(), result))
            });
        }

        let replay = Mutex::new(());
        batch::run_batch(&items, options, |settings| {
            let buffer = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&buffer);
            let buffered: OutputLogger = Arc::new(move |kind, line| {
                lock(&sink).push(OutputLine {
                    kind,
                    text: line.to_string(),
                });
            });

            let result = self.execute_with_logger(settings, &buffered);

            let _guard = lock(&replay);
            let logger = self.context.logger();
            for line in lock(&buffer).iter() {
                logger(line.kind, &line.text);
            }
            result.map(|result| (settings.clone(), result))
        })
    }

    fn execute_with_logger(
        &self,
        settings: &Settings,
        logger: &OutputLogger,
    ) -> Result<InvocationResult, InvokeError> {
        let compiled = self.compile(settings)?;
        self.launch(&compiled, settings.process(), logger)
    }

    fn launch(
        &self,
        arguments: &CompiledArguments,
        process: &ProcessSettings,
        logger: &OutputLogger,
    ) -> Result<InvocationResult, InvokeError> {
        let program = self.resolve(process)?;
        let request = ProcessRequest {
            program: &program,
            arguments,
            working_directory: process.working_directory.as_deref(),
            environment: &process.environment,
            timeout: process.timeout.or(self.context.timeout()),
            log_invocation: process.logs_invocation(),
            log_output: process.logs_output(),
            logger,
            filter: self.filter.as_ref(),
            cancel: self.cancellation.as_ref(),
        };
        Ok(executor::execute(&request)?)
    }
}

/// Locks a mutex, recovering the data if another invocation panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::{
        context::silent_logger,
        models::{OptionValue, OutputType},
        system::locator::ExecutableLocator,
    };
    use std::time::Duration;

    #[derive(Debug)]
    struct NothingInstalled;

    impl ExecutableLocator for NothingInstalled {
        fn lookup_environment(&self, _variable: &str) -> Option<PathBuf> {
            None
        }

        fn lookup_package_cache(
            &self,
            package_id: &str,
            _executable: &str,
            _version: Option<&str>,
        ) -> Result<PathBuf, ResolutionError> {
            Err(ResolutionError::PackageNotFound {
                package: package_id.to_string(),
                root: PathBuf::from("/nowhere"),
            })
        }

        fn lookup_path(&self, _name: &str) -> Option<PathBuf> {
            None
        }
    }

    #[derive(Debug)]
    struct Fixed(PathBuf);

    impl ExecutableLocator for Fixed {
        fn lookup_environment(&self, _variable: &str) -> Option<PathBuf> {
            Some(self.0.clone())
        }

        fn lookup_package_cache(
            &self,
            _package_id: &str,
            _executable: &str,
            _version: Option<&str>,
        ) -> Result<PathBuf, ResolutionError> {
            Ok(self.0.clone())
        }

        fn lookup_path(&self, _name: &str) -> Option<PathBuf> {
            None
        }
    }

    fn quiet_tasks() -> RetypeTasks {
        RetypeTasks::with_context(ToolContext::default().with_logger(silent_logger()))
    }

    fn sh(process: ProcessSettings) -> ProcessSettings {
        ProcessSettings {
            tool_path: Some(PathBuf::from("/bin/sh")),
            ..process
        }
    }

    #[test]
    fn test_build_passes_tokens_in_declared_order() {
        let tasks = quiet_tasks();
        let settings = BuildSettings::new()
            .enable_verbose()
            .set_config("site")
            .set_output("dist")
            .with_tool_path("/bin/echo");
        let result = tasks.build(&settings).unwrap();
        assert_eq!(
            result.std_lines().collect::<Vec<_>>(),
            vec!["build --output dist site --verbose"]
        );
    }

    #[test]
    fn test_watch_and_run_entry_points() {
        let tasks = quiet_tasks();
        let watch = WatchSettings::new()
            .set_port(5001u16)
            .enable_watch_api()
            .set_secret("key")
            .with_tool_path("/bin/echo");
        let result = tasks.watch(&watch).unwrap();
        assert_eq!(
            result.std_lines().collect::<Vec<_>>(),
            vec!["watch --secret key --api --port 5001"]
        );

        let run = RunSettings::new().set_host("localhost").with_tool_path("/bin/echo");
        let result = tasks.run(&run).unwrap();
        assert_eq!(result.std_lines().collect::<Vec<_>>(), vec!["run --host localhost"]);
    }

    #[test]
    fn test_non_zero_exit_is_surfaced_with_output() {
        let tasks = quiet_tasks();
        let err = tasks
            .invoke_raw_with(
                "-c 'echo one; sleep 0.1; echo two 1>&2; exit 3'",
                &sh(ProcessSettings::default()),
            )
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
        assert_eq!(
            err.output().unwrap(),
            &[OutputLine::std("one"), OutputLine::err("two")]
        );
    }

    #[test]
    fn test_resolution_failure_is_reported_before_any_process() {
        let tasks = RetypeTasks::with_context(
            ToolContext::default()
                .with_logger(silent_logger())
                .with_locator(Arc::new(NothingInstalled)),
        );
        let err = tasks.build(&BuildSettings::new()).unwrap_err();
        match err {
            InvokeError::Resolution(ResolutionError::NotFound { attempts, .. }) => {
                assert_eq!(attempts.len(), 3);
            }
            other => panic!("expected a resolution failure, got {other}"),
        }
    }

    #[test]
    fn test_locator_result_is_used_without_tool_path() {
        let tasks = RetypeTasks::with_context(
            ToolContext::default()
                .with_logger(silent_logger())
                .with_locator(Arc::new(Fixed(PathBuf::from("/bin/echo")))),
        );
        let result = tasks.run(&RunSettings::new().enable_verbose()).unwrap();
        assert_eq!(result.std_lines().collect::<Vec<_>>(), vec!["run --verbose"]);
    }

    #[test]
    fn test_compile_errors_stop_before_launch() {
        let tasks = quiet_tasks();
        let settings = Settings::new("build").set("outptu", "dist").with_tool_path("/bin/echo");
        assert!(matches!(
            tasks.execute(&settings),
            Err(InvokeError::Compile(CompileError::UnknownOption { .. }))
        ));
        assert!(matches!(
            tasks.settings("deploy"),
            Err(CompileError::UnknownSubCommand(_))
        ));
    }

    #[test]
    fn test_context_timeout_applies_when_settings_have_none() {
        let tasks = RetypeTasks::with_context(
            ToolContext::default()
                .with_logger(silent_logger())
                .with_timeout(Duration::from_millis(300)),
        );
        let err = tasks
            .invoke_raw_with("-c 'echo early; exec sleep 5'", &sh(ProcessSettings::default()))
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.output().unwrap(), &[OutputLine::std("early")]);
    }

    #[test]
    fn test_secrets_do_not_leak_into_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let tasks = quiet_tasks();
        let settings = BuildSettings::new()
            .set_secret("hunter2")
            .with_tool_path("/bin/sh")
            .with_working_directory(dir.path());
        let err = tasks.build(&settings).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[REDACTED]"));
        assert!(!message.contains("hunter2"));
    }

    #[test]
    fn test_logger_and_filter_are_applied() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tasks = quiet_tasks()
            .with_logger(Arc::new(move |kind, line| {
                sink.lock().unwrap().push((kind, line.to_string()));
            }))
            .with_output_filter(Arc::new(|line| line.to_uppercase()));
        let result = tasks
            .invoke_raw_with("-c 'echo quiet'", &sh(ProcessSettings::default()))
            .unwrap();
        assert_eq!(result.output, vec![OutputLine::std("quiet")]);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[(OutputType::Std, "QUIET".to_string())]
        );

        let silent = ProcessSettings {
            log_output: Some(false),
            ..sh(ProcessSettings::default())
        };
        tasks.invoke_raw_with("-c 'echo hidden'", &silent).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_parallel_batch_groups_output_per_invocation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tasks = quiet_tasks().with_logger(Arc::new(move |_, line| {
            sink.lock().unwrap().push(line.to_string());
        }));
        let combos = Combinations::new(
            Settings::new("run").with_tool_path("/bin/echo"),
        )
        .combine_with("host", ["a", "b", "c"])
        .combine_with("port", [1_i64, 2]);

        let options = BatchOptions {
            degree_of_parallelism: 3,
            complete_on_failure: false,
        };
        let results = tasks.batch(&combos, &options).unwrap();
        let lines: Vec<String> = results
            .iter()
            .flat_map(|(_, r)| r.std_lines().map(str::to_string))
            .collect();
        assert_eq!(
            lines,
            vec![
                "run --host a --port 1",
                "run --host a --port 2",
                "run --host b --port 1",
                "run --host b --port 2",
                "run --host c --port 1",
                "run --host c --port 2",
            ]
        );
        assert_eq!(seen.lock().unwrap().len(), 6);
        assert_eq!(
            results.first().map(|(settings, _)| settings.get("host").cloned()),
            Some(Some(OptionValue::from("a")))
        );
    }

    #[test]
    fn test_custom_descriptor_is_validated() {
        let mut broken = (*descriptor::retype()).clone();
        if let Some(build) = broken.sub_commands.first_mut() {
            let duplicate = build.options.first().cloned().unwrap();
            build.options.push(duplicate);
        }
        assert!(matches!(
            quiet_tasks().with_descriptor(Arc::new(broken)),
            Err(DescriptorError::DuplicateOption { .. })
        ));
    }
}
