//! Rule declaration surface.
//!
//! Thin builders that validate a declaration and register the resulting
//! target. These are the only way targets enter a [`Registry`], whether
//! from the TOML manifest or directly from test code.

use std::collections::BTreeMap;

use crate::core::registry::Registry;
use crate::core::target::{CommandsSpec, CppKind, CppSpec, Rule, Target};
use crate::core::BuildError;

/// Arguments for the compiled-target rules (`kernel`, `task`, `lib`,
/// `test_lib`, `test`).
#[derive(Debug, Clone)]
pub struct CppArgs {
    pub srcs: Vec<String>,
    pub hdrs: Vec<String>,
    pub public_hdrs: Vec<String>,
    pub deps: Vec<String>,
    pub mode_flags: Option<BTreeMap<String, Vec<String>>>,
    pub file_transform: BTreeMap<String, String>,
    pub cmds: BTreeMap<String, String>,
    pub src_path: String,
    pub hdr_path: String,
    pub public_hdr_path: String,
}

impl Default for CppArgs {
    fn default() -> Self {
        CppArgs {
            srcs: Vec::new(),
            hdrs: Vec::new(),
            public_hdrs: Vec::new(),
            deps: Vec::new(),
            mode_flags: None,
            file_transform: BTreeMap::new(),
            cmds: BTreeMap::new(),
            src_path: "src".to_string(),
            hdr_path: "src".to_string(),
            public_hdr_path: "src".to_string(),
        }
    }
}

/// Arguments for the `commands` rule.
#[derive(Debug, Clone, Default)]
pub struct CommandsArgs {
    pub cmds: Vec<String>,
    pub data: Vec<String>,
    pub deps: Vec<String>,
}

/// Declare a freestanding kernel image target.
pub fn kernel(
    registry: &mut Registry,
    name: &str,
    location: &str,
    args: CppArgs,
) -> Result<(), BuildError> {
    declare_cpp(registry, name, location, CppKind::Kernel, args)
}

/// Declare a freestanding userspace task executable.
pub fn task(
    registry: &mut Registry,
    name: &str,
    location: &str,
    args: CppArgs,
) -> Result<(), BuildError> {
    declare_cpp(registry, name, location, CppKind::Task, args)
}

/// Declare a freestanding static library.
pub fn lib(
    registry: &mut Registry,
    name: &str,
    location: &str,
    args: CppArgs,
) -> Result<(), BuildError> {
    declare_cpp(registry, name, location, CppKind::Lib, args)
}

/// Declare a hosted static library for test builds.
pub fn test_lib(
    registry: &mut Registry,
    name: &str,
    location: &str,
    args: CppArgs,
) -> Result<(), BuildError> {
    declare_cpp(registry, name, location, CppKind::TestLib, args)
}

/// Declare a hosted test executable.
pub fn test(
    registry: &mut Registry,
    name: &str,
    location: &str,
    args: CppArgs,
) -> Result<(), BuildError> {
    declare_cpp(registry, name, location, CppKind::Test, args)
}

/// Declare an opaque shell-command target.
pub fn commands(
    registry: &mut Registry,
    name: &str,
    location: &str,
    args: CommandsArgs,
) -> Result<(), BuildError> {
    if args.cmds.is_empty() {
        return Err(BuildError::MissingAttribute {
            attribute: "cmds",
            location: location.to_string(),
        });
    }

    registry.register(Target {
        name: name.to_string(),
        location: location.to_string(),
        deps: args.deps,
        resolved: false,
        rule: Rule::Commands(CommandsSpec {
            cmds: args.cmds,
            data: args.data,
        }),
    });
    Ok(())
}

fn declare_cpp(
    registry: &mut Registry,
    name: &str,
    location: &str,
    kind: CppKind,
    args: CppArgs,
) -> Result<(), BuildError> {
    if args.srcs.is_empty() && args.cmds.is_empty() {
        return Err(BuildError::MissingAttribute {
            attribute: "srcs",
            location: location.to_string(),
        });
    }

    // An empty mode table and an absent one mean the same thing.
    let mode_flags = args.mode_flags.filter(|m| !m.is_empty());

    registry.register(Target {
        name: name.to_string(),
        location: location.to_string(),
        deps: args.deps,
        resolved: false,
        rule: Rule::Cpp(CppSpec {
            kind,
            srcs: args.srcs,
            hdrs: args.hdrs,
            public_hdrs: args.public_hdrs,
            mode_flags,
            file_transform: args.file_transform,
            cmds: args.cmds,
            src_path: args.src_path,
            hdr_path: args.hdr_path,
            public_hdr_path: args.public_hdr_path,
        }),
    });
    Ok(())
}
