//! Implementation of `drydock test`.
//!
//! Builds a test target, then executes the built artifact from the
//! project root and reports its exit status.

use std::path::Path;

use anyhow::{bail, Result};

use crate::ops::drydock_build;
use crate::util::process::ProcessBuilder;

/// Build `target`, then run `obj/<target>` and fail on a non-zero exit.
pub fn test(root: &Path, target: &str) -> Result<()> {
    let mut project = drydock_build::load_project(root)?;
    drydock_build::build_in_project(root, &mut project, target)?;

    let artifact = root.join("obj").join(target);
    tracing::info!("running test binary {}", artifact.display());

    let status = ProcessBuilder::new(&artifact).cwd(root).status()?;
    if !status.success() {
        bail!(
            "test `{}` failed with exit status {}",
            target,
            status.code().unwrap_or(-1)
        );
    }

    tracing::info!("test `{}` passed", target);
    Ok(())
}
