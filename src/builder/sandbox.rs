//! Per-build-step sandboxes.
//!
//! Every build step runs inside an ephemeral working directory: inputs
//! are staged in, compiler/linker/shell commands run with the sandbox as
//! their working directory, and outputs are staged back out. The backing
//! temporary directory is removed when the sandbox is dropped, on every
//! exit path.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::BuildError;
use crate::util::fs::copy_file;
use crate::util::process::ProcessBuilder;

/// An isolated, disposable working directory for one build step.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    /// Create a fresh sandbox directory.
    pub fn new() -> Result<Sandbox> {
        let dir = tempfile::Builder::new()
            .prefix("drydock-sandbox")
            .tempdir()
            .context("failed to create sandbox directory")?;
        tracing::debug!(path = %dir.path().display(), "created sandbox");
        Ok(Sandbox { dir })
    }

    /// The sandbox's root directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Stage a file into the sandbox under a sandbox-relative name,
    /// creating intermediate directories as needed.
    pub fn copy_in(&self, src: &Path, dst: &str) -> Result<()> {
        tracing::debug!(src = %src.display(), dst, "copy in");
        copy_file(src, &self.dir.path().join(dst))
            .with_context(|| format!("failed to stage `{}` into sandbox", src.display()))
    }

    /// Stage a sandbox file back out to the real filesystem.
    pub fn copy_out(&self, src: &str, dst: &Path) -> Result<()> {
        tracing::debug!(src, dst = %dst.display(), "copy out");
        copy_file(&self.dir.path().join(src), dst)
            .with_context(|| format!("failed to stage `{}` out of sandbox", src))
    }

    /// Delete a staged file.
    pub fn delete(&self, file: &str) -> Result<()> {
        fs::remove_file(self.dir.path().join(file))
            .with_context(|| format!("failed to delete `{}` from sandbox", file))
    }

    /// Run a program with arguments inside the sandbox.
    pub fn run<I, S>(&self, program: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let cmd = ProcessBuilder::new(program).args(args).cwd(self.path());
        tracing::info!("running {} {}", program, cmd.get_args().join(" "));

        let status = cmd.status()?;
        self.check_status(status.code())
    }

    /// Run a shell command line inside the sandbox.
    pub fn run_shell(&self, cmd: &str) -> Result<()> {
        tracing::info!("running `{}`", cmd);
        let status = ProcessBuilder::new("sh")
            .arg("-c")
            .arg(cmd)
            .cwd(self.path())
            .status()?;
        self.check_status(status.code())
    }

    fn check_status(&self, code: Option<i32>) -> Result<()> {
        match code {
            Some(0) => Ok(()),
            // A terminating signal leaves no exit code.
            code => Err(BuildError::CommandFailed {
                code: code.unwrap_or(-1),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_in_and_out() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("string.cc");
        fs::write(&src, "int f();").unwrap();

        let sb = Sandbox::new().unwrap();
        sb.copy_in(&src, "string.cc").unwrap();
        assert!(sb.path().join("string.cc").exists());

        let out = tmp.path().join("obj/out");
        sb.copy_out("string.cc", &out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "int f();");
    }

    #[test]
    fn test_copy_in_creates_subdirectories() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("grub.cfg");
        fs::write(&src, "menuentry").unwrap();

        let sb = Sandbox::new().unwrap();
        sb.copy_in(&src, "iso/boot/grub.cfg").unwrap();
        assert!(sb.path().join("iso/boot/grub.cfg").exists());
    }

    #[test]
    fn test_delete() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.cc");
        fs::write(&src, "").unwrap();

        let sb = Sandbox::new().unwrap();
        sb.copy_in(&src, "a.cc").unwrap();
        sb.delete("a.cc").unwrap();
        assert!(!sb.path().join("a.cc").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_shell_reports_exit_code() {
        let sb = Sandbox::new().unwrap();
        sb.run_shell("true").unwrap();

        let err = sb.run_shell("exit 7").unwrap_err();
        let build_err = err.downcast::<BuildError>().unwrap();
        match build_err {
            BuildError::CommandFailed { code } => assert_eq!(code, 7),
            other => panic!("expected CommandFailed, got {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_commands_run_in_sandbox_cwd() {
        let sb = Sandbox::new().unwrap();
        sb.run_shell("echo marker > made-here").unwrap();
        assert!(sb.path().join("made-here").exists());
    }

    #[test]
    fn test_sandbox_removed_on_drop() {
        let path = {
            let sb = Sandbox::new().unwrap();
            sb.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
