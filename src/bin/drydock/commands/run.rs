//! `drydock run` command

use std::path::Path;

use anyhow::Result;

use crate::cli::RunArgs;
use drydock::ops::drydock_run;

pub fn execute(root: &Path, args: RunArgs) -> Result<()> {
    drydock_run::run(root, &args.alias)
}
