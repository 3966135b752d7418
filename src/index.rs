//! In-memory registry built from raw declarations.
//!
//! Declarations arrive in load order (core manifest, configured natives,
//! then source files). Linking merges reopened namespaces, resolves constant
//! references lexically, and precomputes every lookup chain so resolution is
//! a walk over a flat list.

use std::collections::{HashMap, HashSet};

use crate::registry::{Ancestor, Entity, EntityKind, MethodScope, Origin, ROOT_NAMESPACE, Registry};

/// Root of the superclass hierarchy; never gets an implicit superclass.
const BASIC_OBJECT: &str = "BasicObject";

/// Namespace whose instance chain ends every class's singleton chain.
const CLASS: &str = "Class";

/// Namespace whose instance chain ends every module's singleton chain.
const MODULE: &str = "Module";

/// A constant as written at some point in the source, resolved at link time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstRef {
    /// Whether the name was written with a leading `::`.
    pub absolute: bool,
    /// The name as written, without a leading `::` (may contain `::`).
    pub name: String,
    /// Qualified names of the enclosing namespaces, innermost first.
    pub nesting: Vec<String>,
}

impl ConstRef {
    /// A reference to an already-qualified name.
    pub fn absolute(name: &str) -> Self {
        return Self {
            absolute: true,
            name: name.trim_start_matches("::").to_string(),
            nesting: Vec::new(),
        };
    }

    /// A reference written inside `nesting` (innermost first).
    pub fn lexical(name: &str, nesting: &[String]) -> Self {
        let trimmed = name.trim();
        if trimmed.starts_with("::") {
            return Self::absolute(trimmed);
        }
        return Self {
            absolute: false,
            name: trimmed.to_string(),
            nesting: nesting.to_vec(),
        };
    }

    /// Qualified names to try, in lookup order.
    fn candidates(&self) -> Vec<String> {
        if self.absolute {
            return vec![self.name.clone()];
        }
        let mut candidates: Vec<String> = self
            .nesting
            .iter()
            .map(|scope| return format!("{scope}::{}", self.name))
            .collect();
        candidates.push(self.name.clone());
        return candidates;
    }
}

/// Everything the indexer found, in load order.
#[derive(Debug, Default)]
pub struct Declarations {
    /// Method definitions.
    pub methods: Vec<MethodDecl>,
    /// `include` / `extend` / `prepend` calls.
    pub mixins: Vec<MixinDecl>,
    /// `class` / `module` openings.
    pub namespaces: Vec<NamespaceDecl>,
    /// Plain constant assignments.
    pub values: Vec<ValueDecl>,
}

impl Declarations {
    /// Append all of `other` after the declarations already collected.
    pub fn extend(&mut self, other: Self) {
        self.methods.extend(other.methods);
        self.mixins.extend(other.mixins);
        self.namespaces.extend(other.namespaces);
        self.values.extend(other.values);
    }
}

/// One method definition.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    /// Method name.
    pub name: String,
    /// Where the method is defined.
    pub origin: Origin,
    /// Namespace the method is defined on.
    pub owner: ConstRef,
    /// Instance or singleton method.
    pub scope: MethodScope,
}

/// How a module is mixed into a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixinKind {
    /// `extend M`: M's instance methods become singleton methods.
    Extend,
    /// `include M`: M goes after the namespace in its chain.
    Include,
    /// `prepend M`: M goes before the namespace in its chain.
    Prepend,
}

/// One `include` / `extend` / `prepend`.
#[derive(Debug, Clone)]
pub struct MixinDecl {
    /// Which mixin operation.
    pub kind: MixinKind,
    /// The module being mixed in.
    pub module: ConstRef,
    /// Qualified name of the namespace receiving the mixin.
    pub target: String,
}

/// One `class` or `module` opening.
#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    /// Class or module.
    pub kind: EntityKind,
    /// Qualified name.
    pub name: String,
    /// Where this opening is.
    pub origin: Origin,
    /// Explicit superclass, classes only.
    pub superclass: Option<ConstRef>,
}

/// One plain constant assignment.
#[derive(Debug, Clone)]
pub struct ValueDecl {
    /// Qualified name.
    pub name: String,
    /// Where the assignment is.
    pub origin: Origin,
}

/// A namespace with all of its openings merged.
#[derive(Debug)]
struct MergedNamespace {
    /// Modules extended, in call order.
    extends: Vec<String>,
    /// Modules included, in call order.
    includes: Vec<String>,
    /// Kind from the first opening.
    kind: EntityKind,
    /// Origin of the first opening.
    origin: Origin,
    /// Modules prepended, in call order.
    prepends: Vec<String>,
    /// First explicit superclass, unresolved.
    superclass: Option<ConstRef>,
}

/// The linked, read-only registry.
#[derive(Debug, Default)]
pub struct Index {
    /// Constants by qualified name.
    entities: HashMap<String, Entity>,
    /// Method origins by (owner, scope, name).
    methods: HashMap<(String, MethodScope, String), Origin>,
}

impl Registry for Index {
    fn constant(&self, path: &[String]) -> Option<&Entity> {
        let Some((last, parent_path)) = path.split_last() else {
            return self.entities.get(ROOT_NAMESPACE);
        };
        if let Some(entity) = self.entities.get(&path.join("::")) {
            return Some(entity);
        }
        if parent_path.is_empty() {
            return None;
        }

        // `Square::SIDES` also finds constants defined on Square's ancestors.
        let parent = self.constant(parent_path)?;
        let inherited = parent
            .ancestors
            .iter()
            .find_map(|ancestor| return self.entities.get(&format!("{}::{last}", ancestor.owner)));
        if let Some(entity) = inherited {
            tracing::trace!(constant = %last, owner = %parent.name, found = %entity.name, "inherited constant");
        }
        return inherited;
    }

    fn method(&self, owner: &str, scope: MethodScope, name: &str) -> Option<&Origin> {
        return self
            .methods
            .get(&(owner.to_string(), scope, name.to_string()));
    }
}

impl Index {
    /// All indexed constants, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        return self.entities.values();
    }

    /// Link declarations into an index.
    pub fn link(decls: Declarations) -> Self {
        let mut linker = Linker::new(&decls);
        linker.merge_mixins(&decls.mixins);

        let mut entities = HashMap::new();
        let names: Vec<String> = linker.namespaces.keys().cloned().collect();
        for name in names {
            let entity = linker.build_entity(&name);
            entities.insert(name, entity);
        }

        // Reassigned values take the latest assignment; namespaces are never shadowed.
        for value in &decls.values {
            if entities.get(&value.name).is_some_and(|existing: &Entity| return existing.is_namespace()) {
                continue;
            }
            entities.insert(value.name.clone(), Entity {
                ancestors: Vec::new(),
                kind: EntityKind::Value,
                name: value.name.clone(),
                origin: value.origin.clone(),
                singleton_ancestors: Vec::new(),
                superclasses: Vec::new(),
            });
        }

        let mut methods = HashMap::new();
        for method in &decls.methods {
            let Some(owner) = linker.resolve(&method.owner) else {
                tracing::debug!(owner = %method.owner.name, method = %method.name, "dropping method on unknown owner");
                continue;
            };
            methods.insert((owner, method.scope, method.name.clone()), method.origin.clone());
        }

        tracing::debug!(constants = entities.len(), methods = methods.len(), "linked index");
        return Self { entities, methods };
    }

    /// All indexed methods as (owner, scope, name), in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = (&str, MethodScope, &str)> {
        return self
            .methods
            .keys()
            .map(|(owner, scope, name)| return (owner.as_str(), *scope, name.as_str()));
    }
}

/// Working state while linking.
struct Linker {
    /// Memoized instance chains by namespace name.
    linearized: HashMap<String, Vec<String>>,
    /// Merged namespaces by qualified name.
    namespaces: HashMap<String, MergedNamespace>,
}

impl Linker {
    /// Merge every namespace opening; first origin and first superclass win.
    fn new(decls: &Declarations) -> Self {
        let mut namespaces: HashMap<String, MergedNamespace> = HashMap::new();
        for decl in &decls.namespaces {
            let merged = namespaces
                .entry(decl.name.clone())
                .or_insert_with(|| {
                    return MergedNamespace {
                        extends: Vec::new(),
                        includes: Vec::new(),
                        kind: decl.kind,
                        origin: decl.origin.clone(),
                        prepends: Vec::new(),
                        superclass: None,
                    };
                });
            if merged.superclass.is_none() {
                merged.superclass.clone_from(&decl.superclass);
            }
        }
        return Self {
            linearized: HashMap::new(),
            namespaces,
        };
    }

    /// Build the entity for a merged namespace.
    fn build_entity(&mut self, name: &str) -> Entity {
        let superclasses = self.superclass_chain(name);
        let ancestors = self
            .linearize(name, &mut HashSet::new())
            .into_iter()
            .map(|owner| return Ancestor { owner, scope: MethodScope::Instance })
            .collect();
        let singleton_ancestors = self.singleton_chain(name, &superclasses);
        let (kind, origin) = self
            .namespaces
            .get(name)
            .map_or((EntityKind::Module, Origin::Unknown), |ns| return (ns.kind, ns.origin.clone()));

        return Entity {
            ancestors,
            kind,
            name: name.to_string(),
            origin,
            singleton_ancestors,
            superclasses,
        };
    }

    /// Instance chain of `name`: prepends, itself, includes, then the superclass chain.
    fn linearize(&mut self, name: &str, visiting: &mut HashSet<String>) -> Vec<String> {
        if let Some(cached) = self.linearized.get(name) {
            return cached.clone();
        }
        if !visiting.insert(name.to_string()) {
            tracing::debug!(namespace = name, "cutting ancestor cycle");
            return Vec::new();
        }

        let (kind, prepends, includes) = match self.namespaces.get(name) {
            Some(ns) => (ns.kind, ns.prepends.clone(), ns.includes.clone()),
            None => {
                visiting.remove(name);
                return Vec::new();
            },
        };

        let inherited = match kind {
            EntityKind::Class => match self.superclass_of(name) {
                Some(parent) => self.linearize(&parent, visiting),
                None => Vec::new(),
            },
            EntityKind::Module | EntityKind::Value => Vec::new(),
        };

        let mut chain: Vec<String> = Vec::new();
        for module in prepends.iter().rev() {
            chain.extend(self.linearize(module, visiting));
        }
        chain.push(name.to_string());
        for module in includes.iter().rev() {
            for ancestor in self.linearize(module, visiting) {
                // An include of something the superclass already has is a no-op.
                if !inherited.contains(&ancestor) {
                    chain.push(ancestor);
                }
            }
        }
        chain.extend(inherited);
        dedup_keep_first(&mut chain);

        visiting.remove(name);
        self.linearized.insert(name.to_string(), chain.clone());
        return chain;
    }

    /// Resolve and record every mixin on its target namespace.
    fn merge_mixins(&mut self, mixins: &[MixinDecl]) {
        for mixin in mixins {
            let Some(module) = self.resolve(&mixin.module) else {
                tracing::debug!(module = %mixin.module.name, target = %mixin.target, "dropping mixin of unknown module");
                continue;
            };
            let Some(target) = self.namespaces.get_mut(&mixin.target) else {
                tracing::debug!(target = %mixin.target, "dropping mixin into unknown namespace");
                continue;
            };
            let list = match mixin.kind {
                MixinKind::Extend => &mut target.extends,
                MixinKind::Include => &mut target.includes,
                MixinKind::Prepend => &mut target.prepends,
            };
            if !list.contains(&module) {
                list.push(module);
            }
        }
    }

    /// Resolve a constant reference to a known namespace.
    fn resolve(&self, reference: &ConstRef) -> Option<String> {
        return reference
            .candidates()
            .into_iter()
            .find(|candidate| return self.namespaces.contains_key(candidate));
    }

    /// Class-method chain: each class's singleton and extends, then `Class`/`Module`.
    fn singleton_chain(&mut self, name: &str, superclasses: &[String]) -> Vec<Ancestor> {
        let Some(kind) = self.namespaces.get(name).map(|ns| return ns.kind) else {
            return Vec::new();
        };

        let mut owners = vec![name.to_string()];
        if kind == EntityKind::Class {
            owners.extend(superclasses.iter().cloned());
        }

        let mut chain = Vec::new();
        for owner in &owners {
            chain.push(Ancestor { owner: owner.clone(), scope: MethodScope::Class });
            let extends = self
                .namespaces
                .get(owner)
                .map(|ns| return ns.extends.clone())
                .unwrap_or_default();
            for module in extends.iter().rev() {
                for ancestor in self.linearize(module, &mut HashSet::new()) {
                    chain.push(Ancestor { owner: ancestor, scope: MethodScope::Instance });
                }
            }
        }

        let meta = if kind == EntityKind::Class { CLASS } else { MODULE };
        for ancestor in self.linearize(meta, &mut HashSet::new()) {
            chain.push(Ancestor { owner: ancestor, scope: MethodScope::Instance });
        }

        dedup_keep_first(&mut chain);
        return chain;
    }

    /// Superclasses of `name`, nearest first. Cycles are cut.
    fn superclass_chain(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([name.to_string()]);
        let mut current = self.superclass_of(name);
        while let Some(parent) = current {
            if !seen.insert(parent.clone()) {
                break;
            }
            current = self.superclass_of(&parent);
            chain.push(parent);
        }
        return chain;
    }

    /// Direct superclass: the explicit one if it resolves, else `Object` for ordinary classes.
    fn superclass_of(&self, name: &str) -> Option<String> {
        let ns = self.namespaces.get(name)?;
        if ns.kind != EntityKind::Class {
            return None;
        }
        if let Some(explicit) = &ns.superclass {
            let resolved = self.resolve(explicit);
            if resolved.is_none() {
                tracing::debug!(class = name, superclass = %explicit.name, "unresolved superclass");
            }
            return resolved;
        }
        if name == BASIC_OBJECT || name == ROOT_NAMESPACE || !self.namespaces.contains_key(ROOT_NAMESPACE) {
            return None;
        }
        return Some(ROOT_NAMESPACE.to_string());
    }
}

/// Remove later duplicates, keeping each element's first position.
fn dedup_keep_first<T: Clone + Eq + std::hash::Hash>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| return seen.insert(item.clone()));
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn at(line: u32) -> Origin {
        Origin::Sourced { file: PathBuf::from("lib/shapes.rb"), line }
    }

    fn class(name: &str, superclass: Option<&str>) -> NamespaceDecl {
        NamespaceDecl {
            kind: EntityKind::Class,
            name: name.to_string(),
            origin: at(1),
            superclass: superclass.map(ConstRef::absolute),
        }
    }

    fn module(name: &str) -> NamespaceDecl {
        NamespaceDecl { kind: EntityKind::Module, name: name.to_string(), origin: at(1), superclass: None }
    }

    fn mixin(kind: MixinKind, target: &str, module: &str) -> MixinDecl {
        MixinDecl { kind, module: ConstRef::absolute(module), target: target.to_string() }
    }

    fn owners(chain: &[Ancestor]) -> Vec<&str> {
        chain.iter().map(|a| a.owner.as_str()).collect()
    }

    fn core() -> Declarations {
        let mut decls = Declarations::default();
        decls.namespaces.push(class("BasicObject", None));
        decls.namespaces.push(module("Kernel"));
        decls.namespaces.push(class("Object", Some("BasicObject")));
        decls.namespaces.push(class("Module", None));
        decls.namespaces.push(class("Class", Some("Module")));
        decls.mixins.push(mixin(MixinKind::Include, "Object", "Kernel"));
        decls
    }

    #[test]
    fn classes_inherit_from_object_by_default() {
        let mut decls = core();
        decls.namespaces.push(class("Shape", None));
        let index = Index::link(decls);

        let shape = index.constant(&["Shape".to_string()]).unwrap();
        assert_eq!(owners(&shape.ancestors), ["Shape", "Object", "Kernel", "BasicObject"]);
        assert_eq!(shape.superclasses, ["Object", "BasicObject"]);
    }

    #[test]
    fn mixins_are_linearized_like_ruby() {
        let mut decls = core();
        for name in ["A", "B", "P"] {
            decls.namespaces.push(module(name));
        }
        decls.namespaces.push(class("Base", None));
        decls.namespaces.push(class("Leaf", Some("Base")));
        decls.mixins.push(mixin(MixinKind::Include, "Base", "A"));
        decls.mixins.push(mixin(MixinKind::Include, "Leaf", "A"));
        decls.mixins.push(mixin(MixinKind::Include, "Leaf", "B"));
        decls.mixins.push(mixin(MixinKind::Prepend, "Leaf", "P"));
        let index = Index::link(decls);

        let leaf = index.constant(&["Leaf".to_string()]).unwrap();
        assert_eq!(
            owners(&leaf.ancestors),
            ["P", "Leaf", "B", "Base", "A", "Object", "Kernel", "BasicObject"]
        );
    }

    #[test]
    fn singleton_chain_walks_superclass_singletons_then_class() {
        let mut decls = core();
        decls.namespaces.push(module("Helpers"));
        decls.namespaces.push(class("Base", None));
        decls.namespaces.push(class("Leaf", Some("Base")));
        decls.mixins.push(mixin(MixinKind::Extend, "Leaf", "Helpers"));
        let index = Index::link(decls);

        let leaf = index.constant(&["Leaf".to_string()]).unwrap();
        let chain: Vec<(&str, MethodScope)> =
            leaf.singleton_ancestors.iter().map(|a| (a.owner.as_str(), a.scope)).collect();
        assert_eq!(chain[..5], [
            ("Leaf", MethodScope::Class),
            ("Helpers", MethodScope::Instance),
            ("Base", MethodScope::Class),
            ("Object", MethodScope::Class),
            ("BasicObject", MethodScope::Class),
        ]);
        assert_eq!(chain[5], ("Class", MethodScope::Instance));
        assert_eq!(chain[6], ("Module", MethodScope::Instance));
    }

    #[test]
    fn superclass_cycles_are_cut() {
        let mut decls = Declarations::default();
        decls.namespaces.push(class("A", Some("B")));
        decls.namespaces.push(class("B", Some("A")));
        let index = Index::link(decls);

        let a = index.constant(&["A".to_string()]).unwrap();
        assert_eq!(a.superclasses, ["B"]);
        assert!(owners(&a.ancestors).contains(&"A"));
    }

    #[test]
    fn lexical_references_prefer_innermost_scope() {
        let mut decls = core();
        decls.namespaces.push(module("Geo"));
        decls.namespaces.push(class("Base", None));
        decls.namespaces.push(class("Geo::Base", None));
        decls.namespaces.push(NamespaceDecl {
            kind: EntityKind::Class,
            name: "Geo::Circle".to_string(),
            origin: at(3),
            superclass: Some(ConstRef::lexical("Base", &["Geo".to_string()])),
        });
        let index = Index::link(decls);

        let circle = index.constant(&["Geo".to_string(), "Circle".to_string()]).unwrap();
        assert_eq!(circle.superclasses.first().map(String::as_str), Some("Geo::Base"));
    }

    #[test]
    fn reopened_namespace_keeps_first_origin_and_last_method() {
        let mut decls = core();
        decls.namespaces.push(class("Shape", None));
        decls.namespaces.push(NamespaceDecl { origin: at(40), ..class("Shape", None) });
        for line in [5, 42] {
            decls.methods.push(MethodDecl {
                name: "area".to_string(),
                origin: at(line),
                owner: ConstRef::absolute("Shape"),
                scope: MethodScope::Instance,
            });
        }
        let index = Index::link(decls);

        assert_eq!(index.constant(&["Shape".to_string()]).unwrap().origin, at(1));
        assert_eq!(index.method("Shape", MethodScope::Instance, "area"), Some(&at(42)));
    }

    #[test]
    fn empty_path_is_the_root_namespace() {
        let index = Index::link(core());
        assert_eq!(index.constant(&[]).map(|e| e.name.as_str()), Some("Object"));
    }

    #[test]
    fn values_do_not_shadow_namespaces() {
        let mut decls = core();
        decls.namespaces.push(class("Shape", None));
        decls.values.push(ValueDecl { name: "Shape".to_string(), origin: at(9) });
        decls.values.push(ValueDecl { name: "Shape::SIDES".to_string(), origin: at(2) });
        let index = Index::link(decls);

        assert_eq!(index.constant(&["Shape".to_string()]).unwrap().kind, EntityKind::Class);
        let sides = index.constant(&["Shape".to_string(), "SIDES".to_string()]).unwrap();
        assert_eq!(sides.kind, EntityKind::Value);
        assert!(sides.ancestors.is_empty());
    }

    #[test]
    fn constants_resolve_through_ancestors() {
        let mut decls = core();
        decls.namespaces.push(class("Shape", None));
        decls.namespaces.push(module("Sided"));
        decls.namespaces.push(class("Square", Some("Shape")));
        decls.mixins.push(mixin(MixinKind::Include, "Square", "Sided"));
        decls.values.push(ValueDecl { name: "Shape::SIDES".to_string(), origin: at(2) });
        decls.values.push(ValueDecl { name: "Sided::EDGES".to_string(), origin: at(5) });
        let index = Index::link(decls);
        let path = |segments: &[&str]| segments.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(index.constant(&path(&["Square", "SIDES"])).unwrap().name, "Shape::SIDES");
        assert_eq!(index.constant(&path(&["Square", "EDGES"])).unwrap().name, "Sided::EDGES");
        assert!(index.constant(&path(&["Square", "MISSING"])).is_none());
        assert!(index.constant(&path(&["Shape", "EDGES"])).is_none());
        assert!(index.constant(&path(&["SIDES"])).is_none());
    }

    #[test]
    fn reassigned_value_keeps_latest_assignment() {
        let mut decls = core();
        decls.namespaces.push(class("Shape", None));
        decls.values.push(ValueDecl { name: "Shape::SIDES".to_string(), origin: at(2) });
        decls.values.push(ValueDecl { name: "Shape::SIDES".to_string(), origin: at(7) });
        let index = Index::link(decls);

        let sides = index.constant(&["Shape".to_string(), "SIDES".to_string()]).unwrap();
        assert_eq!(sides.origin, at(7));
    }
}
