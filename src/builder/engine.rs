//! The incremental build engine.
//!
//! `build()` walks the dependency graph depth-first, building every
//! dependency before checking whether a target itself is stale. A stale
//! target rebuilds inside a fresh [`Sandbox`]: dependency interfaces and
//! its own headers are staged in, each source compiles to an object named
//! by a content hash of the target's full dependency identity, and the
//! kind-specific final assembly (link or archive) produces the artifact
//! that is staged back out under `obj/`.
//!
//! Staleness runs on two clocks. The *target* timestamp is the oldest
//! artifact across the target's modes (any missing artifact means stale
//! outright); the *interface* timestamp is the oldest public header
//! anywhere in the target's dependency subtree, absent when the subtree
//! declares none. A target rebuilds when one of its own files is newer
//! than its artifact, or when its artifact predates some upstream
//! interface.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

use crate::builder::sandbox::Sandbox;
use crate::builder::toolchain::Toolchain;
use crate::core::registry::Registry;
use crate::core::target::{CommandsSpec, CppSpec, FinalAssembly, Rule, Target};
use crate::core::BuildError;
use crate::util::fs::{mtime, try_mtime};
use crate::util::hash::hash_strings;
use crate::util::subst::subst;

/// Linker script staged into kernel link steps, from the project root.
const LINKER_SCRIPT: &str = "link.ld";

/// Drives resolution results through staleness checks and sandboxed
/// build steps. Single-threaded: one target builds at a time.
pub struct BuildEngine<'a> {
    registry: &'a Registry,
    toolchain: &'a Toolchain,
    root: PathBuf,
}

impl<'a> BuildEngine<'a> {
    /// Create an engine over a resolved registry, rooted at the project
    /// directory that holds `src/`, `obj/`, and the linker script.
    pub fn new(registry: &'a Registry, toolchain: &'a Toolchain, root: &Path) -> Self {
        BuildEngine {
            registry,
            toolchain,
            root: root.to_path_buf(),
        }
    }

    /// Build `name`, dependencies first.
    ///
    /// Every dependency's `build` runs before this target's staleness
    /// check, so a dependency rebuilt on this walk is seen with its fresh
    /// timestamp.
    pub fn build(&self, name: &str) -> Result<()> {
        let target = self.registry.find(name).ok_or_else(|| {
            BuildError::DependencyNotFound {
                name: name.to_string(),
                location: "(command line)".to_string(),
            }
        })?;

        for dep in &target.deps {
            self.build(dep)?;
        }

        if self.is_up_to_date(target)? {
            tracing::debug!("`{}` is up to date", target.name);
            return Ok(());
        }

        tracing::info!("building `{}`", target.name);
        self.build_self(target)
            .with_context(|| format!("failed to build target `{}`", target.name))
    }

    /// Whether the target's artifact(s) are current with respect to its
    /// own files and every upstream public interface.
    pub fn is_up_to_date(&self, target: &Target) -> Result<bool> {
        let target_ts = self.target_timestamp(target);

        match &target.rule {
            Rule::Commands(_) => {
                // A missing output still counts as infinitely old here, so
                // a command bundle with no dependencies is vacuously
                // current and never runs on its own.
                for dep in &target.deps {
                    let dep_target = self.registry.dep(target, dep)?;
                    if self.target_timestamp(dep_target) > target_ts {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Rule::Cpp(spec) => {
                let Some(target_ts) = target_ts else {
                    tracing::debug!("`{}` stale: artifact missing", target.name);
                    return Ok(false);
                };

                let files = spec
                    .srcs
                    .iter()
                    .map(|f| spec.source_path(f))
                    .chain(spec.hdrs.iter().map(|f| spec.header_path(f)))
                    .chain(spec.public_hdrs.iter().map(|f| spec.public_header_path(f)));

                for file in files {
                    if mtime(&self.root.join(&file)) > target_ts {
                        tracing::debug!(
                            "`{}` stale: {} is newer than artifact",
                            target.name,
                            file.display()
                        );
                        return Ok(false);
                    }
                }

                match self.interface_timestamp(target)? {
                    Some(interface_ts) => Ok(target_ts >= interface_ts),
                    None => Ok(true),
                }
            }
        }
    }

    /// Oldest artifact timestamp across the target's modes, or `None`
    /// when any mode's artifact is missing.
    pub fn target_timestamp(&self, target: &Target) -> Option<SystemTime> {
        target
            .modes()
            .iter()
            .map(|mode| try_mtime(&self.root.join(target.target_filename(mode))))
            .min()
            .flatten()
    }

    /// Oldest public-header timestamp in this target's dependency
    /// subtree, or `None` when the subtree declares no public headers at
    /// all. A target with no public headers of its own contributes
    /// nothing to the fold: it never forces rebuilds through this clock,
    /// and it cannot mask a sibling's headers either, but it still passes
    /// its dependencies' interface ages along.
    pub fn interface_timestamp(&self, target: &Target) -> Result<Option<SystemTime>> {
        let spec = match &target.rule {
            // Command bundles expose no interface.
            Rule::Commands(_) => return Ok(None),
            Rule::Cpp(spec) => spec,
        };

        let mut ts = spec
            .public_hdrs
            .iter()
            .map(|hdr| mtime(&self.root.join(spec.public_header_path(hdr))))
            .min();

        for dep in &target.deps {
            let dep_target = self.registry.dep(target, dep)?;
            if let Some(dep_ts) = self.interface_timestamp(dep_target)? {
                ts = Some(match ts {
                    Some(ts) => ts.min(dep_ts),
                    None => dep_ts,
                });
            }
        }

        Ok(ts)
    }

    /// The content-hash object name for compiling `src` in `mode`:
    /// a digest of the target's full transitive identity plus the source
    /// file and mode. Deterministic; doubles as the rebuild cache key.
    pub fn object_name(&self, target: &Target, src: &str, mode: &str) -> Result<String> {
        let mut tokens = self.registry.hashcode(&target.name)?;
        tokens.push(src.to_string());
        tokens.push(mode.to_string());
        Ok(hash_strings(&tokens))
    }

    fn build_self(&self, target: &Target) -> Result<()> {
        match &target.rule {
            Rule::Commands(spec) => self.build_commands(target, spec),
            Rule::Cpp(spec) => {
                for mode in target.modes() {
                    self.build_cpp_mode(target, spec, &mode)?;
                }
                Ok(())
            }
        }
    }

    fn build_commands(&self, target: &Target, spec: &CommandsSpec) -> Result<()> {
        let sb = Sandbox::new()?;

        for dep in &target.deps {
            let dep_target = self.registry.dep(target, dep)?;
            self.copy_targets_to_sandbox(dep_target, "default", &sb)?;
        }

        for data in &spec.data {
            sb.copy_in(&self.root.join(data), data)?;
        }

        for cmd in &spec.cmds {
            sb.run_shell(cmd)?;
        }

        sb.copy_out(&target.name, &self.root.join(target.target_filename("default")))
    }

    fn build_cpp_mode(&self, target: &Target, spec: &CppSpec, mode: &str) -> Result<()> {
        let sb = Sandbox::new()?;

        // Ancestor headers must land before our own so that header
        // transforms can see them.
        for dep in &target.deps {
            let dep_target = self.registry.dep(target, dep)?;
            self.copy_interfaces_to_sandbox(dep_target, &sb)?;
        }

        for hdr in &spec.public_hdrs {
            sb.copy_in(&self.root.join(spec.public_header_path(hdr)), hdr)?;
        }
        for hdr in &spec.hdrs {
            sb.copy_in(&self.root.join(spec.header_path(hdr)), hdr)?;
            self.maybe_transform(&sb, spec, hdr, ".h")?;
        }

        let mut objects = Vec::new();

        for src in &spec.srcs {
            sb.copy_in(&self.root.join(spec.source_path(src)), src)?;
            self.maybe_transform(&sb, spec, src, ".cc")?;

            let object = self.object_name(target, src, mode)?;
            self.compile_source(target, spec, mode, &sb, src, &object)?;

            objects.push(object);
            sb.delete(src)?;
        }

        for (src, cmd) in &spec.cmds {
            sb.copy_in(&self.root.join(spec.source_path(src)), src)?;
            self.maybe_transform(&sb, spec, src, ".cc")?;

            let object = self.object_name(target, src, mode)?;
            let cc_flags = self.cc_flags(spec, mode).join(" ");
            sb.run_shell(&subst(
                cmd,
                &[
                    ("cc_compiler", self.toolchain.cc.as_str()),
                    ("cc_flags", cc_flags.as_str()),
                    ("outfile", object.as_str()),
                ],
            ))?;

            objects.push(object);
            sb.delete(src)?;
        }

        self.final_assembly(target, spec, &sb, &objects)?;
        sb.copy_out(&target.name, &self.root.join(target.target_filename(mode)))
    }

    /// Run the configured transform for the file's suffix, if any,
    /// producing a sibling with `new_suffix`.
    fn maybe_transform(
        &self,
        sb: &Sandbox,
        spec: &CppSpec,
        filename: &str,
        new_suffix: &str,
    ) -> Result<()> {
        let (base, suffix) = split_suffix(filename);
        let Some(template) = spec.file_transform.get(suffix) else {
            return Ok(());
        };

        let outfile = format!("{}{}", base, new_suffix);
        sb.run_shell(&subst(
            template,
            &[("infile", filename), ("outfile", outfile.as_str())],
        ))
    }

    /// Dispatch one staged source to its compiler by suffix.
    fn compile_source(
        &self,
        target: &Target,
        spec: &CppSpec,
        mode: &str,
        sb: &Sandbox,
        src: &str,
        object: &str,
    ) -> Result<()> {
        let (_, suffix) = split_suffix(src);
        match suffix {
            ".s" => {
                let mut args = self.toolchain.asm_flags.clone();
                args.extend([src.to_string(), "-o".to_string(), object.to_string()]);
                sb.run(&self.toolchain.asm, &args)
            }
            ".cc" => {
                let mut args = self.cc_flags(spec, mode);
                args.extend([
                    "-c".to_string(),
                    src.to_string(),
                    "-o".to_string(),
                    object.to_string(),
                ]);
                sb.run(&self.toolchain.cc, &args)
            }
            ".c" => {
                let mut args = self.c_flags(spec);
                args.extend([
                    "-c".to_string(),
                    src.to_string(),
                    "-o".to_string(),
                    object.to_string(),
                ]);
                sb.run(&self.toolchain.c, &args)
            }
            _ => Err(BuildError::UnexpectedSuffix {
                file: src.to_string(),
                location: target.location.clone(),
            }
            .into()),
        }
    }

    /// Combine compiled objects into the target's artifact, named after
    /// the target inside the sandbox.
    fn final_assembly(
        &self,
        target: &Target,
        spec: &CppSpec,
        sb: &Sandbox,
        objects: &[String],
    ) -> Result<()> {
        match spec.kind.final_assembly() {
            FinalAssembly::Archive => {
                // Own objects only; consumers link dependencies themselves.
                let mut args = self.toolchain.ar_flags.clone();
                args.push(target.name.clone());
                args.extend(objects.iter().cloned());
                sb.run(&self.toolchain.ar, &args)
            }
            FinalAssembly::Link { dep_mode } => {
                let inputs = self.stage_transitive_artifacts(target, dep_mode, sb)?;

                let mut args = if spec.kind.is_freestanding() {
                    let mut flags = self.toolchain.ld_flags.clone();
                    flags.extend(self.toolchain.freestanding_ld_flags());
                    flags
                } else {
                    self.cc_flags(spec, dep_mode)
                };
                args.extend(objects.iter().cloned());
                args.extend(inputs);
                args.extend(["-o".to_string(), target.name.clone()]);
                sb.run(&self.toolchain.cc, &args)
            }
            FinalAssembly::ScriptedLink => {
                let inputs = self.stage_transitive_artifacts(target, "kernel", sb)?;

                sb.copy_in(&self.root.join(LINKER_SCRIPT), LINKER_SCRIPT)?;

                let mut args = self.toolchain.ld_flags.clone();
                // '-n' turns off section alignment, as the boot layout expects.
                args.extend(["-n".to_string(), "-T".to_string(), LINKER_SCRIPT.to_string()]);
                args.extend(objects.iter().cloned());
                args.extend(inputs);
                args.extend(["-o".to_string(), target.name.clone()]);
                sb.run(&self.toolchain.ld, &args)
            }
        }
    }

    /// Stage every transitively reachable dependency's artifact into the
    /// sandbox under `dep_mode`, returning their staged names in link
    /// order. Diamond duplicates stage idempotently and are passed to the
    /// linker as-is.
    fn stage_transitive_artifacts(
        &self,
        target: &Target,
        dep_mode: &str,
        sb: &Sandbox,
    ) -> Result<Vec<String>> {
        let mut inputs = Vec::new();
        for dep in self.registry.transitive_deps(&target.name)? {
            let dep_target = self.registry.dep(target, &dep)?;
            inputs.extend(self.copy_targets_to_sandbox(dep_target, dep_mode, sb)?);
        }
        Ok(inputs)
    }

    /// Stage a target's built artifact into a dependent's sandbox under
    /// the target's bare name, reporting the names it contributes to the
    /// dependent's link/archive inputs.
    fn copy_targets_to_sandbox(
        &self,
        target: &Target,
        mode: &str,
        sb: &Sandbox,
    ) -> Result<Vec<String>> {
        sb.copy_in(&self.root.join(target.target_filename(mode)), &target.name)?;
        Ok(vec![target.name.clone()])
    }

    /// Stage a target's public interface into a dependent's sandbox,
    /// ancestors first.
    fn copy_interfaces_to_sandbox(&self, target: &Target, sb: &Sandbox) -> Result<()> {
        let spec = match &target.rule {
            Rule::Commands(_) => return Ok(()),
            Rule::Cpp(spec) => spec,
        };

        for dep in &target.deps {
            let dep_target = self.registry.dep(target, dep)?;
            self.copy_interfaces_to_sandbox(dep_target, sb)?;
        }

        for hdr in &spec.public_hdrs {
            sb.copy_in(&self.root.join(spec.public_header_path(hdr)), hdr)?;
        }
        Ok(())
    }

    fn cc_flags(&self, spec: &CppSpec, mode: &str) -> Vec<String> {
        let mut flags = vec!["-I.".to_string()];
        flags.extend(self.toolchain.cc_flags.iter().cloned());
        flags.extend(spec.mode_flags_for(mode).iter().cloned());
        if spec.kind.is_freestanding() {
            flags.extend(self.toolchain.freestanding_flags(&self.toolchain.cc));
        }
        if spec.kind.is_test() {
            flags.push("-pthread".to_string());
        }
        flags
    }

    fn c_flags(&self, spec: &CppSpec) -> Vec<String> {
        let mut flags = vec!["-I.".to_string()];
        flags.extend(self.toolchain.c_flags.iter().cloned());
        if spec.kind.is_freestanding() {
            flags.extend(self.toolchain.freestanding_flags(&self.toolchain.c));
        }
        flags
    }
}

/// Split a filename into (stem, suffix-with-dot). No dot yields an empty
/// suffix, which fails compilation dispatch.
fn split_suffix(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) => filename.split_at(idx),
        None => (filename, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{self, CppArgs};
    use std::collections::BTreeMap;

    fn engine_fixture(kind: &str) -> (Registry, Toolchain) {
        let mut registry = Registry::new();
        let mut args = CppArgs {
            srcs: vec!["a.cc".into()],
            ..Default::default()
        };
        let mut modes = BTreeMap::new();
        modes.insert("kernel".to_string(), vec!["-DKERNEL".to_string()]);
        modes.insert("task".to_string(), vec!["-DTASK".to_string()]);
        args.mode_flags = Some(modes);

        match kind {
            "lib" => rules::lib(&mut registry, "t", "BUILD:1", args).unwrap(),
            "test" => rules::test(&mut registry, "t", "BUILD:1", args).unwrap(),
            other => panic!("unknown fixture kind {other}"),
        }
        registry.resolve("t").unwrap();
        (registry, Toolchain::default())
    }

    fn spec_of(registry: &Registry) -> &CppSpec {
        match &registry.find("t").unwrap().rule {
            Rule::Cpp(spec) => spec,
            other => panic!("expected Cpp rule, got {other:?}"),
        }
    }

    #[test]
    fn test_split_suffix() {
        assert_eq!(split_suffix("boot.s"), ("boot", ".s"));
        assert_eq!(split_suffix("string.cc"), ("string", ".cc"));
        assert_eq!(split_suffix("a.b.c"), ("a.b", ".c"));
        assert_eq!(split_suffix("Makefile"), ("Makefile", ""));
    }

    #[test]
    fn test_cc_flags_include_mode_and_freestanding_flags() {
        let (registry, toolchain) = engine_fixture("lib");
        let engine = BuildEngine::new(&registry, &toolchain, Path::new("."));
        let flags = engine.cc_flags(spec_of(&registry), "kernel");

        assert_eq!(flags[0], "-I.");
        assert!(flags.contains(&"-DKERNEL".to_string()));
        assert!(!flags.contains(&"-DTASK".to_string()));
        assert!(flags.contains(&"-ffreestanding".to_string()));
        assert!(flags.contains(&"--target=x86_64-pc-none-elf".to_string()));
        assert!(!flags.contains(&"-pthread".to_string()));
    }

    #[test]
    fn test_test_kind_is_hosted_and_threaded() {
        let (registry, toolchain) = engine_fixture("test");
        let engine = BuildEngine::new(&registry, &toolchain, Path::new("."));
        let flags = engine.cc_flags(spec_of(&registry), "test");

        assert!(flags.contains(&"-pthread".to_string()));
        assert!(!flags.contains(&"-ffreestanding".to_string()));
    }

    #[test]
    fn test_unknown_mode_contributes_no_flags() {
        let (registry, toolchain) = engine_fixture("lib");
        let engine = BuildEngine::new(&registry, &toolchain, Path::new("."));
        let flags = engine.cc_flags(spec_of(&registry), "test");
        assert!(!flags.contains(&"-DKERNEL".to_string()));
        assert!(!flags.contains(&"-DTASK".to_string()));
    }

    #[test]
    fn test_object_name_varies_by_source_and_mode() {
        let (registry, toolchain) = engine_fixture("lib");
        let engine = BuildEngine::new(&registry, &toolchain, Path::new("."));
        let target = registry.find("t").unwrap();

        let a_kernel = engine.object_name(target, "a.cc", "kernel").unwrap();
        assert_eq!(a_kernel, engine.object_name(target, "a.cc", "kernel").unwrap());
        assert_ne!(a_kernel, engine.object_name(target, "a.cc", "task").unwrap());
        assert_ne!(a_kernel, engine.object_name(target, "b.cc", "kernel").unwrap());
    }
}
