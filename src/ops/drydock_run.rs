//! Implementation of `drydock run`.
//!
//! Command aliases from the manifest's `[command.<name>]` tables: build
//! the alias's target, then run its shell command from the project root.

use std::path::Path;

use anyhow::{bail, Result};

use crate::core::BuildError;
use crate::ops::drydock_build;
use crate::util::process::ProcessBuilder;

/// Build the aliased target and run the alias's shell command.
pub fn run(root: &Path, alias: &str) -> Result<()> {
    let mut project = drydock_build::load_project(root)?;

    let Some(command) = project.manifest.command(alias).cloned() else {
        let known: Vec<_> = project.manifest.command_names().collect();
        bail!(
            "no command alias `{}` in the manifest (available: {})",
            alias,
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        );
    };

    drydock_build::build_in_project(root, &mut project, &command.target)?;

    tracing::info!("running `{}`", command.run);
    let status = ProcessBuilder::new("sh")
        .arg("-c")
        .arg(&command.run)
        .cwd(root)
        .status()?;

    match status.code() {
        Some(0) => Ok(()),
        code => Err(BuildError::CommandFailed {
            code: code.unwrap_or(-1),
        }
        .into()),
    }
}
