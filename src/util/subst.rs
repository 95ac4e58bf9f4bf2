//! Placeholder substitution for shell-command templates.
//!
//! File transforms and custom per-file build commands are declared as
//! shell templates with `{name}` placeholders (`{infile}`, `{outfile}`,
//! `{cc_compiler}`, `{cc_flags}`).

/// Replace every `{key}` in `template` with its value.
///
/// Unknown placeholders are left untouched so a template error surfaces
/// verbatim in the failing shell command rather than vanishing silently.
pub fn subst(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}
