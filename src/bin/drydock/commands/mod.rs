//! Command implementations.

pub mod build;
pub mod clean;
pub mod doctor;
pub mod run;
