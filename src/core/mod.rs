//! Core target graph types: targets, the registry, rule declarations,
//! and the project manifest.

pub mod manifest;
pub mod registry;
pub mod rules;
pub mod target;

use thiserror::Error;

/// Errors produced by graph construction, resolution, and build steps.
///
/// All of these are fail-fast: each aborts the whole build invocation and
/// none are retried or downgraded to warnings.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A dependency name did not match any registered target.
    #[error("{location}: dependency `{name}` not found")]
    DependencyNotFound { name: String, location: String },

    /// Resolution found a cycle in the dependency graph.
    #[error("dependency cycle: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },

    /// A rule declaration omitted an attribute its kind requires.
    #[error("{location}: missing required attribute `{attribute}`")]
    MissingAttribute {
        attribute: &'static str,
        location: String,
    },

    /// A source file's suffix matched no known compiler dispatch.
    #[error("{location}: unexpected source suffix `{file}`")]
    UnexpectedSuffix { file: String, location: String },

    /// A subprocess inside a sandbox exited with a non-zero status.
    #[error("command failed with exit code {code}")]
    CommandFailed { code: i32 },
}
