//! Target graph nodes and per-kind build policy.
//!
//! A [`Target`] is a named node in the dependency graph. Its behavior is
//! carried by a closed [`Rule`] variant: either an opaque bundle of shell
//! commands, or a compiled-source target whose [`CppKind`] selects flag
//! policy and the final assembly step (link vs archive).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The build mode a target falls back to when it declares no `mode_flags`.
pub const DEFAULT_MODE: &str = "default";

/// A named, buildable node in the dependency graph.
#[derive(Debug, Clone)]
pub struct Target {
    /// Unique target name; also the artifact's base filename under `obj/`.
    pub name: String,

    /// Declaration site (`file:line`), used only for diagnostics.
    pub location: String,

    /// Names of the targets this one depends on.
    pub deps: Vec<String>,

    /// Set once resolution has verified this target's whole subgraph.
    pub resolved: bool,

    /// Kind-specific configuration and build policy.
    pub rule: Rule,
}

/// Kind-specific target configuration.
#[derive(Debug, Clone)]
pub enum Rule {
    /// An opaque bundle of shell commands producing one named output.
    Commands(CommandsSpec),

    /// A compiled-source target (library, executable, kernel image, ...).
    Cpp(CppSpec),
}

/// Configuration for an opaque shell-command target.
#[derive(Debug, Clone, Default)]
pub struct CommandsSpec {
    /// Shell commands run in sequence inside the sandbox.
    pub cmds: Vec<String>,

    /// Extra files staged into the sandbox verbatim.
    pub data: Vec<String>,
}

/// Configuration for a compiled-source target.
#[derive(Debug, Clone)]
pub struct CppSpec {
    pub kind: CppKind,

    /// Source files, relative to `src_path`.
    pub srcs: Vec<String>,

    /// Private headers, relative to `hdr_path`.
    pub hdrs: Vec<String>,

    /// Public headers, relative to `public_hdr_path`. These form the
    /// target's interface: touching one invalidates every dependent.
    pub public_hdrs: Vec<String>,

    /// Build modes and their extra compiler flags. `None` means a single
    /// implicit default mode.
    pub mode_flags: Option<BTreeMap<String, Vec<String>>>,

    /// Per-suffix shell templates run against staged files before
    /// compilation (`{infile}`/`{outfile}` placeholders). Keys include
    /// the leading dot, e.g. `".py"`.
    pub file_transform: BTreeMap<String, String>,

    /// Per-source custom build commands (`{cc_compiler}`/`{cc_flags}`/
    /// `{outfile}` placeholders), for files no built-in dispatch handles.
    pub cmds: BTreeMap<String, String>,

    pub src_path: String,
    pub hdr_path: String,
    pub public_hdr_path: String,
}

impl CppSpec {
    /// Path of a source file relative to the project root.
    pub fn source_path(&self, src: &str) -> PathBuf {
        Path::new(&self.src_path).join(src)
    }

    /// Path of a private header relative to the project root.
    pub fn header_path(&self, hdr: &str) -> PathBuf {
        Path::new(&self.hdr_path).join(hdr)
    }

    /// Path of a public header relative to the project root.
    pub fn public_header_path(&self, hdr: &str) -> PathBuf {
        Path::new(&self.public_hdr_path).join(hdr)
    }

    /// Extra compiler flags for a mode. Unknown modes contribute nothing,
    /// so a hosted test link can ask for `test` flags on any target.
    pub fn mode_flags_for(&self, mode: &str) -> &[String] {
        self.mode_flags
            .as_ref()
            .and_then(|m| m.get(mode))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// The closed set of compiled-target kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CppKind {
    /// Freestanding kernel image, linked with the project linker script.
    Kernel,

    /// Freestanding userspace task executable.
    Task,

    /// Freestanding static library.
    Lib,

    /// Hosted static library for test builds.
    TestLib,

    /// Hosted test executable.
    Test,
}

impl CppKind {
    /// Whether this kind compiles for a freestanding environment
    /// (no hosted runtime, no exceptions/RTTI, explicit target triple).
    pub fn is_freestanding(&self) -> bool {
        matches!(self, CppKind::Kernel | CppKind::Task | CppKind::Lib)
    }

    /// Whether test threading flags apply.
    pub fn is_test(&self) -> bool {
        matches!(self, CppKind::Test)
    }

    /// The final assembly step this kind performs over compiled objects.
    pub fn final_assembly(&self) -> FinalAssembly {
        match self {
            CppKind::Kernel => FinalAssembly::ScriptedLink,
            CppKind::Task => FinalAssembly::Link { dep_mode: "task" },
            CppKind::Test => FinalAssembly::Link { dep_mode: "test" },
            CppKind::Lib | CppKind::TestLib => FinalAssembly::Archive,
        }
    }
}

/// How a compiled target combines objects into its output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalAssembly {
    /// Archive this target's own objects only; dependencies are left for
    /// the eventual consumer to link.
    Archive,

    /// Link with the compiler driver, flattening in every transitive
    /// dependency's artifact staged under `dep_mode`.
    Link { dep_mode: &'static str },

    /// Link with the system linker and the project linker script,
    /// flattening in transitive dependency artifacts under `kernel` mode.
    ScriptedLink,
}

impl Target {
    /// The build modes this target produces artifacts for.
    pub fn modes(&self) -> Vec<String> {
        match &self.rule {
            Rule::Cpp(spec) => match &spec.mode_flags {
                Some(modes) => modes.keys().cloned().collect(),
                None => vec![DEFAULT_MODE.to_string()],
            },
            Rule::Commands(_) => vec![DEFAULT_MODE.to_string()],
        }
    }

    /// Whether this target builds one artifact per declared mode.
    pub fn is_multi_mode(&self) -> bool {
        matches!(&self.rule, Rule::Cpp(spec) if spec.mode_flags.is_some())
    }

    /// Artifact path relative to the project root: `obj/<name>` for
    /// single-mode targets, `obj/<mode>-<name>` for multi-mode ones.
    pub fn target_filename(&self, mode: &str) -> PathBuf {
        if self.is_multi_mode() {
            Path::new("obj").join(format!("{}-{}", mode, self.name))
        } else {
            Path::new("obj").join(&self.name)
        }
    }

    /// The tokens this target itself contributes to the content hash.
    pub fn self_hashcode(&self) -> [&str; 2] {
        [&self.name, &self.location]
    }
}
