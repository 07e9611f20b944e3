//! # System Interaction Layer
//!
//! The boundary between the invocation pipeline and the host operating system.
//!
//! ## Modules
//!
//! - **`locator`**: Finds the external executable, trying the environment override, the
//!   package cache and finally `PATH`.
//! - **`executor`**: Spawns the resolved executable, captures standard output and standard
//!   error concurrently in arrival order, and enforces the timeout.

/// Child process execution and output capture.
pub mod executor;
/// Executable resolution.
pub mod locator;
