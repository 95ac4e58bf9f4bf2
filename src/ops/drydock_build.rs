//! Implementation of `drydock build`.
//!
//! The driver surface: load the manifest, populate a registry, resolve
//! the requested target, and run the build engine over it.

use std::path::Path;

use anyhow::{Context, Result};

use crate::builder::engine::BuildEngine;
use crate::core::manifest::{Manifest, MANIFEST_FILENAME};
use crate::core::registry::Registry;

/// A loaded project: manifest plus populated registry.
pub struct Project {
    pub manifest: Manifest,
    pub registry: Registry,
}

/// Load the manifest under `root` and declare all of its targets.
pub fn load_project(root: &Path) -> Result<Project> {
    let manifest_path = root.join(MANIFEST_FILENAME);
    let manifest = Manifest::load(&manifest_path)?;

    let mut registry = Registry::new();
    manifest.populate(&mut registry)?;
    tracing::debug!("registered {} targets", registry.len());

    Ok(Project { manifest, registry })
}

/// Resolve and build one target.
pub fn build(root: &Path, target: &str) -> Result<()> {
    let mut project = load_project(root)?;
    build_in_project(root, &mut project, target)
}

/// Resolve and build one target within an already-loaded project.
pub fn build_in_project(root: &Path, project: &mut Project, target: &str) -> Result<()> {
    project.registry.resolve(target)?;

    let engine = BuildEngine::new(&project.registry, project.manifest.toolchain(), root);
    engine
        .build(target)
        .with_context(|| format!("build of `{}` failed", target))
}
