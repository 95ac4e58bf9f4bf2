//! `drydock build` command

use std::path::Path;

use anyhow::Result;

use crate::cli::BuildArgs;
use drydock::ops::drydock_build;

pub fn execute(root: &Path, args: BuildArgs) -> Result<()> {
    drydock_build::build(root, &args.target)
}
