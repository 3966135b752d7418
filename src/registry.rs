//! The read-only capability the resolvers consume: loaded namespaces, their
//! methods, and where each was defined.

use std::path::PathBuf;

/// Name of the namespace that owns top-level constants and methods.
pub const ROOT_NAMESPACE: &str = "Object";

/// One step of a method lookup chain: look for methods of `scope` defined on `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ancestor {
    /// Qualified name of the namespace searched at this step.
    pub owner: String,
    /// Which method table of `owner` is searched.
    pub scope: MethodScope,
}

/// A loaded constant: a class, a module, or a plain value.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Instance-method lookup chain, most specific first. Empty for values.
    pub ancestors: Vec<Ancestor>,
    /// What kind of constant this is.
    pub kind: EntityKind,
    /// Canonical qualified name, e.g. `IRB::Context`.
    pub name: String,
    /// Where the constant was first defined.
    pub origin: Origin,
    /// Class-method lookup chain, most specific first. Empty for values.
    pub singleton_ancestors: Vec<Ancestor>,
    /// Superclass chain, nearest first, excluding the class itself. Empty for modules and values.
    pub superclasses: Vec<String>,
}

impl Entity {
    /// The lookup chain searched for methods of `scope`.
    pub fn lookup_chain(&self, scope: MethodScope) -> &[Ancestor] {
        return match scope {
            MethodScope::Class => &self.singleton_ancestors,
            MethodScope::Instance => &self.ancestors,
        };
    }

    /// Whether this constant is a class or module rather than a plain value.
    pub const fn is_namespace(&self) -> bool {
        return matches!(self.kind, EntityKind::Class | EntityKind::Module);
    }
}

/// Kind of a loaded constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Defined with `class`.
    Class,
    /// Defined with `module`.
    Module,
    /// Any other constant, e.g. `VERSION = "1.0"`.
    Value,
}

/// Which method table a method lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodScope {
    /// Singleton methods (`def self.x`), referenced as `Owner.x`.
    Class,
    /// Instance methods (`def x`), referenced as `Owner#x`.
    Instance,
}

/// Where an entity or method came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Natively compiled: only the binary's identity is known.
    Native {
        /// Path of the shared object or binary.
        file: PathBuf,
    },
    /// Defined in readable source.
    Sourced {
        /// Source file path.
        file: PathBuf,
        /// One-based line where the definition starts.
        line: u32,
    },
    /// Loaded, but nothing is known about where it was defined.
    Unknown,
}

/// Read-only lookups over the set of loaded entities.
pub trait Registry {
    /// Resolve an absolute constant path. An empty path is the root namespace.
    fn constant(&self, path: &[String]) -> Option<&Entity>;

    /// The origin of a method defined directly on `owner` (no ancestor lookup).
    fn method(&self, owner: &str, scope: MethodScope, name: &str) -> Option<&Origin>;
}
