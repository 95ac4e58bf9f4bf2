//! Static compiler/linker/archiver configuration.
//!
//! The engine only ever appends mode- and kind-specific flags to the
//! baseline sets configured here. Defaults target the kernel project's
//! usual toolchain (nasm + clang); any field can be overridden from the
//! manifest's `[toolchain]` section.

use serde::Deserialize;

/// Programs and baseline flag sets for every build step.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Toolchain {
    /// Assembler for `.s` sources.
    #[serde(default = "default_asm")]
    pub asm: String,

    #[serde(default = "default_asm_flags")]
    pub asm_flags: Vec<String>,

    /// C++ compiler, also used as the link driver for task/test binaries.
    #[serde(default = "default_cc")]
    pub cc: String,

    #[serde(default = "default_cc_flags")]
    pub cc_flags: Vec<String>,

    /// C compiler for `.c` sources.
    #[serde(default = "default_c")]
    pub c: String,

    #[serde(default = "default_c_flags")]
    pub c_flags: Vec<String>,

    /// Static archiver.
    #[serde(default = "default_ar")]
    pub ar: String,

    #[serde(default = "default_ar_flags")]
    pub ar_flags: Vec<String>,

    /// System linker, used for the kernel image.
    #[serde(default = "default_ld")]
    pub ld: String,

    #[serde(default = "default_ld_flags")]
    pub ld_flags: Vec<String>,
}

fn default_asm() -> String {
    "nasm".to_string()
}

fn default_asm_flags() -> Vec<String> {
    svec(&["-f", "elf64"])
}

fn default_cc() -> String {
    "clang++".to_string()
}

fn default_cc_flags() -> Vec<String> {
    let mut flags = svec(&[
        "-std=c++14",
        "-Wall",
        "-Wextra",
        "-Werror",
        "-Wno-unused-parameter",
        "-Wno-unused-const-variable",
        "-Wno-missing-field-initializers",
        "-Wno-unused-function",
    ]);
    flags.extend(debug_flags());
    flags
}

fn default_c() -> String {
    "clang".to_string()
}

fn default_c_flags() -> Vec<String> {
    debug_flags()
}

fn default_ar() -> String {
    "ar".to_string()
}

fn default_ar_flags() -> Vec<String> {
    svec(&["-rv"])
}

fn default_ld() -> String {
    "ld".to_string()
}

fn default_ld_flags() -> Vec<String> {
    Vec::new()
}

// TODO: make the debug/optimization level a manifest parameter.
fn debug_flags() -> Vec<String> {
    svec(&["-g", "-O0"])
}

fn svec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Toolchain {
    fn default() -> Self {
        Toolchain {
            asm: default_asm(),
            asm_flags: default_asm_flags(),
            cc: default_cc(),
            cc_flags: default_cc_flags(),
            c: default_c(),
            c_flags: default_c_flags(),
            ar: default_ar(),
            ar_flags: default_ar_flags(),
            ld: default_ld(),
            ld_flags: default_ld_flags(),
        }
    }
}

impl Toolchain {
    /// Extra compiler flags for freestanding (kernel/task/lib) code:
    /// no hosted runtime, no stack protection, no red zone, no
    /// exceptions/RTTI. Clang additionally needs the explicit bare-metal
    /// target triple.
    pub fn freestanding_flags(&self, compiler: &str) -> Vec<String> {
        let mut flags = Vec::new();
        if compiler.contains("clang") {
            flags.push("--target=x86_64-pc-none-elf".to_string());
        }
        flags.extend(svec(&[
            "-march=x86-64",
            "-ffreestanding",
            "-fno-builtin",
            "-fno-stack-protector",
            "-mno-red-zone",
            "-mcmodel=large",
            "-mno-mmx",
            "-mno-sse",
            "-mno-sse2",
            "-fomit-frame-pointer",
            "-fno-rtti",
            "-fno-exceptions",
            "-fno-asynchronous-unwind-tables",
            "-fno-unwind-tables",
        ]));
        flags
    }

    /// Extra link flags for freestanding executables.
    pub fn freestanding_ld_flags(&self) -> Vec<String> {
        svec(&["-nostdlib"])
    }

    /// Every program this toolchain invokes, for `drydock doctor`.
    pub fn programs(&self) -> [&str; 5] {
        [&self.asm, &self.cc, &self.c, &self.ar, &self.ld]
    }
}
