//! `drydock doctor` command

use std::path::Path;

use anyhow::{bail, Result};

use crate::cli::DoctorArgs;
use drydock::core::manifest::{Manifest, MANIFEST_FILENAME};
use drydock::ops::doctor::doctor;
use drydock::Toolchain;

pub fn execute(root: &Path, _args: DoctorArgs) -> Result<()> {
    // Doctor works without a manifest; overrides apply when one exists.
    let manifest_path = root.join(MANIFEST_FILENAME);
    let toolchain = if manifest_path.exists() {
        Manifest::load(&manifest_path)?.toolchain().clone()
    } else {
        Toolchain::default()
    };

    let report = doctor(&toolchain);
    for check in &report.checks {
        match &check.found {
            Some(path) => println!("{:12} found at {}", check.program, path.display()),
            None => println!("{:12} MISSING", check.program),
        }
    }

    if !report.all_found() {
        bail!("some toolchain programs are missing");
    }
    Ok(())
}
