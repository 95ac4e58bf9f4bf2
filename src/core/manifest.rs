//! Drydock.toml manifest parsing.
//!
//! The manifest declares the project's targets, optional toolchain
//! overrides, and command aliases. Each `[target.<name>]` table is turned
//! into a rule declaration against a [`Registry`]; the table's line number
//! becomes the target's diagnostic location.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::builder::toolchain::Toolchain;
use crate::core::registry::Registry;
use crate::core::rules::{self, CommandsArgs, CppArgs};

/// Canonical manifest filename.
pub const MANIFEST_FILENAME: &str = "Drydock.toml";

/// A parsed project manifest.
#[derive(Debug)]
pub struct Manifest {
    /// Path the manifest was loaded from.
    pub path: PathBuf,

    data: ManifestData,

    /// Line number of each `[target.<name>]` header, for diagnostics.
    target_lines: BTreeMap<String, usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestData {
    #[serde(default)]
    toolchain: Toolchain,

    #[serde(default)]
    target: BTreeMap<String, TargetDecl>,

    #[serde(default)]
    command: BTreeMap<String, CommandAlias>,
}

/// One `[target.<name>]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetDecl {
    kind: TargetKindDecl,

    #[serde(default)]
    srcs: Vec<String>,

    #[serde(default)]
    hdrs: Vec<String>,

    #[serde(default)]
    public_hdrs: Vec<String>,

    #[serde(default)]
    deps: Vec<String>,

    #[serde(default)]
    mode_flags: Option<BTreeMap<String, Vec<String>>>,

    #[serde(default)]
    file_transform: BTreeMap<String, String>,

    /// A list for `commands` targets, a file-to-template map for
    /// compiled targets.
    #[serde(default)]
    cmds: Option<CmdsDecl>,

    #[serde(default)]
    data: Vec<String>,

    #[serde(default = "default_src_path")]
    src_path: String,

    #[serde(default = "default_src_path")]
    hdr_path: String,

    #[serde(default = "default_src_path")]
    public_hdr_path: String,
}

fn default_src_path() -> String {
    "src".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TargetKindDecl {
    Kernel,
    Task,
    Lib,
    TestLib,
    Test,
    Commands,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CmdsDecl {
    List(Vec<String>),
    PerFile(BTreeMap<String, String>),
}

/// One `[command.<name>]` alias: build a target, then run a shell command.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandAlias {
    /// Target to build before running.
    pub target: String,

    /// Shell command executed from the project root after the build.
    pub run: String,
}

impl Manifest {
    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> Result<Manifest> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        let data: ManifestData = toml::from_str(&text)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

        let target_lines = scan_target_lines(&text);

        Ok(Manifest {
            path: path.to_path_buf(),
            data,
            target_lines,
        })
    }

    /// The toolchain configuration, with manifest overrides applied.
    pub fn toolchain(&self) -> &Toolchain {
        &self.data.toolchain
    }

    /// Look up a command alias by name.
    pub fn command(&self, name: &str) -> Option<&CommandAlias> {
        self.data.command.get(name)
    }

    /// Names of all declared command aliases.
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.data.command.keys().map(|s| s.as_str())
    }

    /// Declare every manifest target into `registry`.
    pub fn populate(&self, registry: &mut Registry) -> Result<()> {
        for (name, decl) in &self.data.target {
            let location = self.location_of(name);
            self.declare(registry, name, &location, decl)
                .with_context(|| format!("{}: invalid target `{}`", location, name))?;
        }
        Ok(())
    }

    fn location_of(&self, name: &str) -> String {
        match self.target_lines.get(name) {
            Some(line) => format!("{}:{}", self.path.display(), line),
            None => self.path.display().to_string(),
        }
    }

    fn declare(
        &self,
        registry: &mut Registry,
        name: &str,
        location: &str,
        decl: &TargetDecl,
    ) -> Result<()> {
        if decl.kind == TargetKindDecl::Commands {
            let cmds = match &decl.cmds {
                Some(CmdsDecl::List(cmds)) => cmds.clone(),
                Some(CmdsDecl::PerFile(_)) => {
                    bail!("a `commands` target takes `cmds` as a list of shell commands")
                }
                None => Vec::new(),
            };
            if !decl.srcs.is_empty() || !decl.hdrs.is_empty() || !decl.public_hdrs.is_empty() {
                bail!("a `commands` target has no sources or headers");
            }

            rules::commands(
                registry,
                name,
                location,
                CommandsArgs {
                    cmds,
                    data: decl.data.clone(),
                    deps: decl.deps.clone(),
                },
            )?;
            return Ok(());
        }

        let cmds = match &decl.cmds {
            Some(CmdsDecl::PerFile(map)) => map.clone(),
            Some(CmdsDecl::List(_)) => {
                bail!("a compiled target takes `cmds` as a map from source file to command")
            }
            None => BTreeMap::new(),
        };
        if !decl.data.is_empty() {
            bail!("`data` is only valid on `commands` targets");
        }

        let args = CppArgs {
            srcs: decl.srcs.clone(),
            hdrs: decl.hdrs.clone(),
            public_hdrs: decl.public_hdrs.clone(),
            deps: decl.deps.clone(),
            mode_flags: decl.mode_flags.clone(),
            file_transform: decl.file_transform.clone(),
            cmds,
            src_path: decl.src_path.clone(),
            hdr_path: decl.hdr_path.clone(),
            public_hdr_path: decl.public_hdr_path.clone(),
        };

        match decl.kind {
            TargetKindDecl::Kernel => rules::kernel(registry, name, location, args)?,
            TargetKindDecl::Task => rules::task(registry, name, location, args)?,
            TargetKindDecl::Lib => rules::lib(registry, name, location, args)?,
            TargetKindDecl::TestLib => rules::test_lib(registry, name, location, args)?,
            TargetKindDecl::Test => rules::test(registry, name, location, args)?,
            TargetKindDecl::Commands => unreachable!("handled above"),
        }
        Ok(())
    }
}

/// Map `[target.<name>]` header lines to their 1-based line numbers.
fn scan_target_lines(text: &str) -> BTreeMap<String, usize> {
    let mut lines = BTreeMap::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix("[target.") else {
            continue;
        };
        let Some(name) = rest.strip_suffix(']') else {
            continue;
        };
        let name = name.trim_matches('"').trim_matches('\'');
        lines.insert(name.to_string(), idx + 1);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(tmp: &TempDir, text: &str) -> Manifest {
        let path = tmp.path().join(MANIFEST_FILENAME);
        fs::write(&path, text).unwrap();
        Manifest::load(&path).unwrap()
    }

    #[test]
    fn test_populate_declares_targets_with_locations() {
        let tmp = TempDir::new().unwrap();
        let manifest = write_manifest(
            &tmp,
            r#"
[target.libc]
kind = "lib"
srcs = ["string.cc"]
public_hdrs = ["string.h"]

[target.kernel]
kind = "kernel"
srcs = ["kmain.cc"]
deps = ["libc"]
"#,
        );

        let mut registry = Registry::new();
        manifest.populate(&mut registry).unwrap();
        assert_eq!(registry.len(), 2);

        let libc = registry.find("libc").unwrap();
        assert!(libc.location.ends_with(":2"));
        let kernel = registry.find("kernel").unwrap();
        assert!(kernel.location.ends_with(":7"));
        assert_eq!(kernel.deps, ["libc"]);
    }

    #[test]
    fn test_commands_target_takes_cmd_list() {
        let tmp = TempDir::new().unwrap();
        let manifest = write_manifest(
            &tmp,
            r#"
[target.boot-image]
kind = "commands"
deps = ["kernel"]
data = ["grub.cfg"]
cmds = ["mkdir -p iso/boot", "cp kernel iso/boot/kernel"]
"#,
        );

        let mut registry = Registry::new();
        manifest.populate(&mut registry).unwrap();
        assert!(registry.find("boot-image").is_some());
    }

    #[test]
    fn test_compiled_target_takes_cmd_map() {
        let tmp = TempDir::new().unwrap();
        let manifest = write_manifest(
            &tmp,
            r#"
[target.fonts]
kind = "lib"

[target.fonts.cmds]
"font.psf" = "objcopy -O elf64-x86-64 -B i386 -I binary font.psf {outfile}"
"#,
        );

        let mut registry = Registry::new();
        manifest.populate(&mut registry).unwrap();
        assert!(registry.find("fonts").is_some());
    }

    #[test]
    fn test_commands_target_rejects_cmd_map() {
        let tmp = TempDir::new().unwrap();
        let manifest = write_manifest(
            &tmp,
            r#"
[target.broken]
kind = "commands"

[target.broken.cmds]
"a.sh" = "sh a.sh"
"#,
        );

        let mut registry = Registry::new();
        let err = manifest.populate(&mut registry).unwrap_err();
        assert!(format!("{err:#}").contains("list of shell commands"));
    }

    #[test]
    fn test_toolchain_overrides() {
        let tmp = TempDir::new().unwrap();
        let manifest = write_manifest(
            &tmp,
            r#"
[toolchain]
cc = "g++"
ld_flags = ["--gc-sections"]

[target.libc]
kind = "lib"
srcs = ["string.cc"]
"#,
        );

        assert_eq!(manifest.toolchain().cc, "g++");
        assert_eq!(manifest.toolchain().ld_flags, ["--gc-sections"]);
        assert_eq!(manifest.toolchain().asm, "nasm");
    }

    #[test]
    fn test_command_aliases() {
        let tmp = TempDir::new().unwrap();
        let manifest = write_manifest(
            &tmp,
            r#"
[target.kernel]
kind = "kernel"
srcs = ["kmain.cc"]

[command.qemu]
target = "kernel"
run = "qemu-system-x86_64 -kernel obj/kernel"
"#,
        );

        let alias = manifest.command("qemu").unwrap();
        assert_eq!(alias.target, "kernel");
        assert!(alias.run.starts_with("qemu-system-x86_64"));
        assert!(manifest.command("missing").is_none());
    }

    #[test]
    fn test_missing_srcs_reports_declaration_site() {
        let tmp = TempDir::new().unwrap();
        let manifest = write_manifest(
            &tmp,
            r#"
[target.hollow]
kind = "lib"
"#,
        );

        let mut registry = Registry::new();
        let err = manifest.populate(&mut registry).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("srcs"), "unexpected error: {message}");
        assert!(message.contains(":2"), "unexpected error: {message}");
    }
}
