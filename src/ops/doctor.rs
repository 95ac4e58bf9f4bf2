//! Implementation of `drydock doctor`.
//!
//! Checks that every program the configured toolchain invokes can be
//! found, either on PATH or as an explicit path.

use std::path::PathBuf;

use crate::builder::toolchain::Toolchain;

/// Result of probing one toolchain program.
#[derive(Debug)]
pub struct ProgramCheck {
    /// Configured program name or path.
    pub program: String,

    /// Where it was found, if anywhere.
    pub found: Option<PathBuf>,
}

/// Report on the availability of every toolchain program.
#[derive(Debug)]
pub struct DoctorReport {
    pub checks: Vec<ProgramCheck>,
}

impl DoctorReport {
    /// Whether every program was found.
    pub fn all_found(&self) -> bool {
        self.checks.iter().all(|c| c.found.is_some())
    }
}

/// Probe every program the toolchain needs.
pub fn doctor(toolchain: &Toolchain) -> DoctorReport {
    let checks = toolchain
        .programs()
        .iter()
        .map(|program| ProgramCheck {
            program: program.to_string(),
            found: which::which(program).ok(),
        })
        .collect();

    DoctorReport { checks }
}
