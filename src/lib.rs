//! Typed, fluent invocation of the Retype static-site generator.
//!
//! Options are collected in immutable [`Settings`] values (or the typed
//! [`BuildSettings`], [`WatchSettings`] and [`RunSettings`] facades), compiled into an
//! argument vector in the order the tool declares them, and run as a child process whose
//! output is captured line by line. See [`RetypeTasks`] for the entry points.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Set to `true` to kill the running tool, the same way a timeout does.
pub type CancellationToken = Arc<AtomicBool>;

/// Command-line surface of the `retype-tasks` binary.
pub mod cli;
/// Names, environment variables and file locations.
pub mod constants;
/// Process-wide logger, version pin and default timeout.
pub mod context;
pub mod core;
/// Profiling helpers.
pub mod dev_utils;
/// Descriptor data, option values and captured output.
pub mod models;
pub mod system;
pub mod tasks;

pub use crate::context::{OutputFilter, OutputLogger, ToolContext};
pub use crate::core::arguments::{CompileError, CompiledArguments};
pub use crate::core::batch::{BatchError, BatchOptions, Combinations};
pub use crate::core::settings::{ProcessSettings, Settings};
pub use crate::core::typed::{BuildSettings, RunSettings, WatchSettings};
pub use crate::models::{InvocationResult, OptionValue, OutputLine, OutputType};
pub use crate::tasks::{InvokeError, RetypeTasks};
