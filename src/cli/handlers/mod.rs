// src/cli/handlers/mod.rs

/// `batch`: one invocation per combination of option values.
pub mod batch;
/// Shared helpers for the handlers.
pub mod commons;
/// `describe`: lists sub-commands and their options.
pub mod describe;
/// `raw`: passes an argument string through untouched.
pub mod raw;
/// Any sub-command of the tool (`build`, `watch`, `run`, ...).
pub mod run;
