//! Drydock - an incremental, sandboxed build tool for a hobby OS kernel
//! and its userspace tasks.
//!
//! This crate provides the core library functionality for Drydock:
//! the target/dependency graph, staleness-driven incremental rebuilds,
//! and per-step build sandboxes.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use crate::core::manifest::Manifest;
pub use crate::core::registry::Registry;
pub use crate::core::target::{CppKind, CppSpec, Rule, Target};
pub use crate::core::BuildError;

pub use builder::engine::BuildEngine;
pub use builder::sandbox::Sandbox;
pub use builder::toolchain::Toolchain;
