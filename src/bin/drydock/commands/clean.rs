//! `drydock clean` command

use std::path::Path;

use anyhow::Result;

use crate::cli::CleanArgs;
use drydock::util::fs::remove_dir_all_if_exists;

pub fn execute(root: &Path, _args: CleanArgs) -> Result<()> {
    let obj = root.join("obj");
    tracing::info!("removing {}", obj.display());
    remove_dir_all_if_exists(&obj)
}
