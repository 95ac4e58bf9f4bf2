//! High-level operations behind the CLI commands.

pub mod doctor;
pub mod drydock_build;
pub mod drydock_run;
pub mod drydock_test;
