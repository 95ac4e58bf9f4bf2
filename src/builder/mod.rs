//! Build execution: the incremental engine, per-step sandboxes, and the
//! static toolchain configuration.

pub mod engine;
pub mod sandbox;
pub mod toolchain;

pub use engine::BuildEngine;
pub use sandbox::Sandbox;
pub use toolchain::Toolchain;
