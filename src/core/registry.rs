//! The target registry and dependency-graph resolution.
//!
//! The registry is an explicit graph-construction context owned by the
//! driver for the duration of one invocation. Rule declarations insert
//! targets; resolution then verifies that every dependency edge names a
//! registered target and that the graph is acyclic.

use std::collections::BTreeMap;

use crate::core::target::Target;
use crate::core::BuildError;

/// Location reported when the missing name came straight from the driver
/// rather than from a declared dependency edge.
const REQUESTED_LOCATION: &str = "(command line)";

/// Mapping from target name to target, plus resolution state.
#[derive(Debug, Default)]
pub struct Registry {
    targets: BTreeMap<String, Target>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// Insert a target by name. On a name collision the last registration
    /// wins; the collision is logged rather than rejected.
    pub fn register(&mut self, target: Target) {
        if let Some(previous) = self.targets.get(&target.name) {
            tracing::warn!(
                "target `{}` declared at {} shadows earlier declaration at {}",
                target.name,
                target.location,
                previous.location
            );
        }
        self.targets.insert(target.name.clone(), target);
    }

    /// Look up a target by name.
    pub fn find(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the registry has no targets.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Look up a dependency of `parent`, reporting the parent's
    /// declaration site on failure.
    pub fn dep<'a>(&'a self, parent: &Target, name: &str) -> Result<&'a Target, BuildError> {
        self.targets
            .get(name)
            .ok_or_else(|| BuildError::DependencyNotFound {
                name: name.to_string(),
                location: parent.location.clone(),
            })
    }

    /// Resolve the dependency subgraph rooted at `name`.
    ///
    /// Idempotent: targets already marked resolved are skipped. Resolution
    /// is post-order, so every dependency is resolved before its dependent.
    /// A dependency name with no registered target fails with
    /// [`BuildError::DependencyNotFound`]; a cycle fails with
    /// [`BuildError::DependencyCycle`] naming the cycle path.
    pub fn resolve(&mut self, name: &str) -> Result<(), BuildError> {
        if !self.targets.contains_key(name) {
            return Err(BuildError::DependencyNotFound {
                name: name.to_string(),
                location: REQUESTED_LOCATION.to_string(),
            });
        }
        let mut path = Vec::new();
        self.resolve_inner(name, &mut path)
    }

    fn resolve_inner(&mut self, name: &str, path: &mut Vec<String>) -> Result<(), BuildError> {
        if self.targets[name].resolved {
            return Ok(());
        }

        if let Some(start) = path.iter().position(|n| n == name) {
            let mut cycle: Vec<String> = path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(BuildError::DependencyCycle { path: cycle });
        }

        path.push(name.to_string());

        let (deps, location) = {
            let target = &self.targets[name];
            (target.deps.clone(), target.location.clone())
        };

        for dep in &deps {
            if !self.targets.contains_key(dep) {
                return Err(BuildError::DependencyNotFound {
                    name: dep.clone(),
                    location,
                });
            }
            self.resolve_inner(dep, path)?;
        }

        path.pop();
        if let Some(target) = self.targets.get_mut(name) {
            target.resolved = true;
        }
        Ok(())
    }

    /// Every dependency reachable from `name`, depth-first with parents
    /// before children, *including duplicates* along diamond paths.
    ///
    /// Duplicate entries are deliberate: duplicate objects are harmless to
    /// linkers and archivers, and sandbox staging by fixed name makes the
    /// repeated copy-ins idempotent.
    pub fn transitive_deps(&self, name: &str) -> Result<Vec<String>, BuildError> {
        let target = self.targets.get(name).ok_or_else(|| {
            BuildError::DependencyNotFound {
                name: name.to_string(),
                location: REQUESTED_LOCATION.to_string(),
            }
        })?;

        let mut result = Vec::new();
        for dep in &target.deps {
            self.dep(target, dep)?;
            result.push(dep.clone());
            result.extend(self.transitive_deps(dep)?);
        }
        Ok(result)
    }

    /// The flattened, order-sensitive token sequence identifying `name`
    /// and its entire dependency subtree: an open parenthesis, each
    /// dependency's hashcode in declaration order, a close parenthesis,
    /// then this target's own name and location.
    pub fn hashcode(&self, name: &str) -> Result<Vec<String>, BuildError> {
        let target = self.targets.get(name).ok_or_else(|| {
            BuildError::DependencyNotFound {
                name: name.to_string(),
                location: REQUESTED_LOCATION.to_string(),
            }
        })?;

        let mut tokens = vec!["(".to_string()];
        for dep in &target.deps {
            tokens.extend(self.hashcode(dep)?);
        }
        tokens.push(")".to_string());
        for token in target.self_hashcode() {
            tokens.push(token.to_string());
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::{CppKind, CppSpec, Rule, Target};
    use std::collections::BTreeMap;

    fn lib(name: &str, deps: &[&str]) -> Target {
        Target {
            name: name.to_string(),
            location: format!("BUILD:{}", name.len()),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            resolved: false,
            rule: Rule::Cpp(CppSpec {
                kind: CppKind::Lib,
                srcs: vec!["a.cc".into()],
                hdrs: vec![],
                public_hdrs: vec![],
                mode_flags: None,
                file_transform: BTreeMap::new(),
                cmds: BTreeMap::new(),
                src_path: "src".into(),
                hdr_path: "src".into(),
                public_hdr_path: "src".into(),
            }),
        }
    }

    #[test]
    fn test_register_and_find() {
        let mut registry = Registry::new();
        registry.register(lib("libc", &[]));
        assert!(registry.find("libc").is_some());
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn test_register_last_wins() {
        let mut registry = Registry::new();
        let mut first = lib("libc", &[]);
        first.location = "BUILD:1".into();
        let mut second = lib("libc", &["base"]);
        second.location = "BUILD:2".into();

        registry.register(first);
        registry.register(second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("libc").unwrap().location, "BUILD:2");
    }

    #[test]
    fn test_resolve_marks_deps_before_dependents() {
        let mut registry = Registry::new();
        registry.register(lib("base", &[]));
        registry.register(lib("libc", &["base"]));
        registry.register(lib("kernel", &["libc"]));

        registry.resolve("kernel").unwrap();
        assert!(registry.find("base").unwrap().resolved);
        assert!(registry.find("libc").unwrap().resolved);
        assert!(registry.find("kernel").unwrap().resolved);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut registry = Registry::new();
        registry.register(lib("base", &[]));
        registry.register(lib("libc", &["base"]));

        registry.resolve("libc").unwrap();
        registry.resolve("libc").unwrap();
        assert!(registry.find("libc").unwrap().resolved);
    }

    #[test]
    fn test_resolve_missing_root() {
        let mut registry = Registry::new();
        let err = registry.resolve("ghost").unwrap_err();
        match err {
            BuildError::DependencyNotFound { name, .. } => assert_eq!(name, "ghost"),
            other => panic!("expected DependencyNotFound, got {other}"),
        }
    }

    #[test]
    fn test_resolve_missing_dep_names_declaring_target() {
        let mut registry = Registry::new();
        registry.register(lib("libc", &["missing"]));

        let err = registry.resolve("libc").unwrap_err();
        match err {
            BuildError::DependencyNotFound { name, location } => {
                assert_eq!(name, "missing");
                assert_eq!(location, registry.find("libc").unwrap().location);
            }
            other => panic!("expected DependencyNotFound, got {other}"),
        }
    }

    #[test]
    fn test_resolve_detects_self_cycle() {
        let mut registry = Registry::new();
        registry.register(lib("narcissus", &["narcissus"]));

        let err = registry.resolve("narcissus").unwrap_err();
        match err {
            BuildError::DependencyCycle { path } => {
                assert_eq!(path, ["narcissus", "narcissus"]);
            }
            other => panic!("expected DependencyCycle, got {other}"),
        }
    }

    #[test]
    fn test_resolve_detects_longer_cycle() {
        let mut registry = Registry::new();
        registry.register(lib("a", &["b"]));
        registry.register(lib("b", &["c"]));
        registry.register(lib("c", &["a"]));

        let err = registry.resolve("a").unwrap_err();
        match err {
            BuildError::DependencyCycle { path } => {
                assert_eq!(path.first().unwrap(), path.last().unwrap());
                assert_eq!(path.len(), 4);
            }
            other => panic!("expected DependencyCycle, got {other}"),
        }
    }

    #[test]
    fn test_transitive_deps_keeps_diamond_duplicates() {
        let mut registry = Registry::new();
        registry.register(lib("base", &[]));
        registry.register(lib("left", &["base"]));
        registry.register(lib("right", &["base"]));
        registry.register(lib("top", &["left", "right"]));
        registry.resolve("top").unwrap();

        let deps = registry.transitive_deps("top").unwrap();
        assert_eq!(deps, ["left", "base", "right", "base"]);
    }

    #[test]
    fn test_transitive_deps_parent_before_children() {
        let mut registry = Registry::new();
        registry.register(lib("leaf", &[]));
        registry.register(lib("mid", &["leaf"]));
        registry.register(lib("root", &["mid"]));
        registry.resolve("root").unwrap();

        assert_eq!(registry.transitive_deps("root").unwrap(), ["mid", "leaf"]);
    }

    #[test]
    fn test_hashcode_brackets_dependencies() {
        let mut registry = Registry::new();
        registry.register(lib("base", &[]));
        registry.register(lib("libc", &["base"]));
        registry.resolve("libc").unwrap();

        let base_location = registry.find("base").unwrap().location.clone();
        let libc_location = registry.find("libc").unwrap().location.clone();

        let tokens = registry.hashcode("libc").unwrap();
        assert_eq!(
            tokens,
            [
                "(",
                "(",
                ")",
                "base",
                base_location.as_str(),
                ")",
                "libc",
                libc_location.as_str(),
            ]
        );
    }

    #[test]
    fn test_hashcode_changes_with_ancestor_identity() {
        let mut a = Registry::new();
        a.register(lib("base", &[]));
        a.register(lib("libc", &["base"]));

        let mut b = Registry::new();
        let mut moved = lib("base", &[]);
        moved.location = "BUILD:99".into();
        b.register(moved);
        b.register(lib("libc", &["base"]));

        assert_ne!(a.hashcode("libc").unwrap(), b.hashcode("libc").unwrap());
    }
}
