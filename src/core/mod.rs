// src/core/mod.rs

//! Pure logic: settings, argument compilation, descriptors, configuration and batches.

/// Settings to argument vector.
pub mod arguments;
pub mod batch;
/// Small string helpers.
pub mod commons;
pub mod config;
pub mod descriptor;
/// Configuration and package cache locations.
pub mod paths;
pub mod settings;
pub mod typed;
