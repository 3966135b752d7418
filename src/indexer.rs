//! Builds declarations from native manifests and Ruby sources, and walks the
//! project tree to produce the `Index`.

use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};
use walkdir::WalkDir;

use crate::config::{Config, NativeEntry, NativeManifest};
use crate::error::Error;
use crate::grammar;
use crate::index::{ConstRef, Declarations, Index, MethodDecl, MixinDecl, MixinKind, NamespaceDecl, ValueDecl};
use crate::registry::{EntityKind, MethodScope, Origin, ROOT_NAMESPACE};

/// Maximum source file size (16 MiB).
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// The built-in manifest of core classes and modules.
const CORE_MANIFEST: &str = include_str!("core.toml");

/// Build the index for a project: core manifest, configured natives, then every source file.
///
/// # Errors
///
/// Returns errors from manifest parsing, file reading, or tree-sitter parsing.
pub fn build(root: &Path, config: &Config) -> Result<Index, Error> {
    let mut decls = Declarations::default();

    if config.core {
        decls.extend(native_declarations(&core_manifest()?));
    }
    decls.extend(native_declarations(&config.native));

    for file in source_files(root, config) {
        let disk_path = root.join(&file);
        let source = match read_source(&disk_path) {
            Ok(source) => source,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!(file = %disk_path.display(), "skipping file that is not valid UTF-8");
                continue;
            },
            Err(e) => return Err(e),
        };
        let origin_path = if root == Path::new(".") { file } else { disk_path };
        tracing::debug!(file = %origin_path.display(), "indexing");
        index_source(&origin_path, &source, &mut decls)?;
    }

    return Ok(Index::link(decls));
}

/// Parse the built-in core manifest.
///
/// # Errors
///
/// Returns `Error::TomlDe` if the embedded manifest is malformed.
pub fn core_manifest() -> Result<Vec<NativeEntry>, Error> {
    let manifest: NativeManifest = toml::from_str(CORE_MANIFEST)?;
    return Ok(manifest.native);
}

/// Collect declarations from one Ruby source file.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for non-Ruby paths or
/// `Error::ParseFailed` if tree-sitter cannot parse the source.
pub fn index_source(file: &Path, source: &str, decls: &mut Declarations) -> Result<(), Error> {
    let tree = parse_ruby(file, source)?;
    let mut walker = Walker { decls, file, source };
    walker.visit(tree.root_node(), &Scope::top_level());
    return Ok(());
}

/// Convert native entries into declarations. Entries with a `file` get a
/// binary origin; entries without one are known but unlocated.
pub fn native_declarations(entries: &[NativeEntry]) -> Declarations {
    let mut decls = Declarations::default();

    for entry in entries {
        let origin = entry
            .file
            .clone()
            .map_or(Origin::Unknown, |file| return Origin::Native { file });
        let name = entry.name.trim_start_matches("::").to_string();

        if entry.kind == EntityKind::Value {
            decls.values.push(ValueDecl { name, origin });
            continue;
        }

        decls.namespaces.push(NamespaceDecl {
            kind: entry.kind,
            name: name.clone(),
            origin: origin.clone(),
            superclass: entry.superclass.as_deref().map(ConstRef::absolute),
        });

        let mixins = [
            (MixinKind::Extend, &entry.extend),
            (MixinKind::Include, &entry.include),
            (MixinKind::Prepend, &entry.prepend),
        ];
        for (kind, modules) in mixins {
            for module in modules {
                decls.mixins.push(MixinDecl { kind, module: ConstRef::absolute(module), target: name.clone() });
            }
        }

        let methods = [
            (MethodScope::Class, &entry.class_methods),
            (MethodScope::Instance, &entry.instance_methods),
        ];
        for (scope, names) in methods {
            for method in names {
                decls.methods.push(MethodDecl {
                    name: method.clone(),
                    origin: origin.clone(),
                    owner: ConstRef::absolute(&name),
                    scope,
                });
            }
        }
    }

    return decls;
}

/// Parse Ruby source into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for non-Ruby paths or
/// `Error::ParseFailed` if the language cannot be set or parsing fails.
pub fn parse_ruby(file: &Path, source: &str) -> Result<Tree, Error> {
    let language = grammar::language_for_path(file)?;
    let mut parser = Parser::new();
    parser.set_language(&language).map_err(|e| {
        return Error::ParseFailed {
            file: file.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file.to_path_buf(),
            reason: "tree-sitter returned None".to_string(),
        };
    });
}

/// Read a source file, refusing anything over `MAX_FILE_SIZE`.
///
/// # Errors
///
/// Returns `Error::FileTooLarge` or `Error::Io`.
pub fn read_source(path: &Path) -> Result<String, Error> {
    let size_bytes = std::fs::metadata(path)?.len();
    if size_bytes > MAX_FILE_SIZE {
        return Err(Error::FileTooLarge {
            file: path.to_path_buf(),
            max_bytes: MAX_FILE_SIZE,
            size_bytes,
        });
    }
    return Ok(std::fs::read_to_string(path)?);
}

/// Indexable source files under `root`, relative to it, in sorted order.
/// Hidden directories are skipped.
fn source_files(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && grammar::is_indexable(e.path()))
        .filter_map(|e| return e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|relative| return config.should_index(&relative.to_string_lossy()))
        .collect();
    files.sort();
    return files;
}

/// One-based line of a node's start.
fn line_of(node: Node<'_>) -> u32 {
    return u32::try_from(node.start_position().row)
        .unwrap_or(u32::MAX)
        .saturating_add(1);
}

// ── Ruby walker ───────────────────────────────────────────────────────

/// Lexical position while walking: enclosing namespaces and whether we are in `class << self`.
#[derive(Debug, Clone)]
struct Scope {
    /// Qualified names of enclosing namespaces, innermost first.
    nesting: Vec<String>,
    /// Inside `class << self`: plain `def` defines singleton methods.
    singleton: bool,
}

impl Scope {
    /// The namespace that owns definitions at this point.
    fn current(&self) -> &str {
        return self.nesting.first().map_or(ROOT_NAMESPACE, String::as_str);
    }

    /// A scope nested one namespace deeper.
    fn enter(&self, qualified: &str) -> Self {
        let mut nesting = Vec::with_capacity(self.nesting.len().saturating_add(1));
        nesting.push(qualified.to_string());
        nesting.extend(self.nesting.iter().cloned());
        return Self { nesting, singleton: false };
    }

    /// Qualify a constant name written at this point.
    fn qualify(&self, written: &str) -> String {
        if let Some(absolute) = written.strip_prefix("::") {
            return absolute.to_string();
        }
        return match self.nesting.first() {
            Some(outer) => format!("{outer}::{written}"),
            None => written.to_string(),
        };
    }

    /// The scope every file starts in.
    const fn top_level() -> Self {
        return Self { nesting: Vec::new(), singleton: false };
    }
}

/// Walks one file's tree, appending declarations.
struct Walker<'a> {
    /// Where declarations go.
    decls: &'a mut Declarations,
    /// Path recorded in origins.
    file: &'a Path,
    /// The file's text.
    source: &'a str,
}

impl Walker<'_> {
    /// Record a method on the namespace that owns the current scope.
    fn define_method(&mut self, name: &str, node: Node<'_>, scope: &Scope, method_scope: MethodScope) {
        self.decls.methods.push(MethodDecl {
            name: name.to_string(),
            origin: self.origin(node),
            owner: ConstRef::absolute(scope.current()),
            scope: method_scope,
        });
    }

    /// The method table plain definitions go into at this point.
    const fn method_scope(scope: &Scope) -> MethodScope {
        return if scope.singleton { MethodScope::Class } else { MethodScope::Instance };
    }

    /// Origin of a node in this file.
    fn origin(&self, node: Node<'_>) -> Origin {
        return Origin::Sourced {
            file: self.file.to_path_buf(),
            line: line_of(node),
        };
    }

    /// Symbol arguments of a call, e.g. `attr_reader :a, :b` gives `["a", "b"]`.
    fn symbol_arguments(&self, call: Node<'_>) -> Vec<String> {
        let Some(arguments) = call.child_by_field_name("arguments") else {
            return Vec::new();
        };
        let mut cursor = arguments.walk();
        return arguments
            .named_children(&mut cursor)
            .filter(|arg| return arg.kind() == "simple_symbol")
            .map(|arg| return self.text(arg).trim_start_matches(':').to_string())
            .collect();
    }

    /// Constant arguments of a call, e.g. `include A, B::C`.
    fn constant_arguments<'t>(call: Node<'t>) -> Vec<Node<'t>> {
        let Some(arguments) = call.child_by_field_name("arguments") else {
            return Vec::new();
        };
        let mut cursor = arguments.walk();
        return arguments
            .named_children(&mut cursor)
            .filter(|arg| return is_constant_node(*arg))
            .collect();
    }

    /// Source text of a node.
    fn text(&self, node: Node<'_>) -> &str {
        return node.utf8_text(self.source.as_bytes()).unwrap_or("").trim();
    }

    /// Dispatch on node kind.
    fn visit(&mut self, node: Node<'_>, scope: &Scope) {
        match node.kind() {
            "assignment" => self.visit_assignment(node, scope),
            "call" => self.visit_call(node, scope),
            "class" | "module" => self.visit_namespace(node, scope),
            "method" => self.visit_method(node, scope),
            "singleton_class" => self.visit_singleton_class(node, scope),
            "singleton_method" => self.visit_singleton_method(node, scope),
            _ => self.visit_children(node, scope, &[]),
        }
    }

    /// `NAME = value`, including `Name = Class.new(Base) do ... end` and `Struct.new`.
    fn visit_assignment(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if !is_constant_node(left) {
            self.visit_children(node, scope, &[left.id()]);
            return;
        }

        let qualified = scope.qualify(self.text(left));
        let opened_namespace = node
            .child_by_field_name("right")
            .filter(|right| return right.kind() == "call")
            .is_some_and(|call| return self.visit_anonymous_namespace(&qualified, node, call, scope));
        if opened_namespace {
            return;
        }

        self.decls.values.push(ValueDecl { name: qualified, origin: self.origin(node) });
    }

    /// Treat `Class.new(Base)`, `Module.new`, and `Struct.new(:a)` on the right of a
    /// constant assignment as a namespace opening. Returns false for any other call.
    fn visit_anonymous_namespace(&mut self, qualified: &str, assignment: Node<'_>, call: Node<'_>, scope: &Scope) -> bool {
        let receiver = call.child_by_field_name("receiver").map(|r| return self.text(r).to_string());
        let method = call.child_by_field_name("method").map(|m| return self.text(m).to_string());
        if method.as_deref() != Some("new") {
            return false;
        }

        let (kind, superclass) = match receiver.as_deref() {
            Some("Class") => {
                let base = Self::constant_arguments(call)
                    .first()
                    .map(|arg| return ConstRef::lexical(self.text(*arg), &scope.nesting));
                (EntityKind::Class, base)
            },
            Some("Module") => (EntityKind::Module, None),
            Some("Struct") => (EntityKind::Class, Some(ConstRef::absolute("Struct"))),
            _ => return false,
        };

        self.decls.namespaces.push(NamespaceDecl {
            kind,
            name: qualified.to_string(),
            origin: self.origin(assignment),
            superclass,
        });

        let inner = scope.enter(qualified);
        if receiver.as_deref() == Some("Struct") {
            for member in self.symbol_arguments(call) {
                self.define_method(&member, assignment, &inner, MethodScope::Instance);
                self.define_method(&format!("{member}="), assignment, &inner, MethodScope::Instance);
            }
        }
        if let Some(block) = call.child_by_field_name("block") {
            self.visit_children(block, &inner, &[]);
        }
        return true;
    }

    /// Mixins, attribute macros, and `define_method`; anything else is walked for nested definitions.
    fn visit_call(&mut self, node: Node<'_>, scope: &Scope) {
        let has_receiver = node.child_by_field_name("receiver").is_some();
        let method = node.child_by_field_name("method").map(|m| return self.text(m).to_string());
        let Some(method) = method.filter(|_| return !has_receiver) else {
            self.visit_children(node, scope, &[]);
            return;
        };

        let mixin = match method.as_str() {
            "extend" => Some(MixinKind::Extend),
            // Inside `class << self`, include behaves like extend on the outer namespace.
            "include" if scope.singleton => Some(MixinKind::Extend),
            "include" => Some(MixinKind::Include),
            "prepend" => Some(MixinKind::Prepend),
            _ => None,
        };
        if let Some(kind) = mixin {
            for arg in Self::constant_arguments(node) {
                self.decls.mixins.push(MixinDecl {
                    kind,
                    module: ConstRef::lexical(self.text(arg), &scope.nesting),
                    target: scope.current().to_string(),
                });
            }
            return;
        }

        let method_scope = Self::method_scope(scope);
        let (readers, writers) = match method.as_str() {
            "attr_accessor" => (true, true),
            "attr_reader" => (true, false),
            "attr_writer" => (false, true),
            "define_method" => {
                if let Some(name) = self.symbol_arguments(node).first() {
                    self.define_method(name, node, scope, method_scope);
                }
                return;
            },
            _ => {
                self.visit_children(node, scope, &[]);
                return;
            },
        };
        for attribute in self.symbol_arguments(node) {
            if readers {
                self.define_method(&attribute, node, scope, method_scope);
            }
            if writers {
                self.define_method(&format!("{attribute}="), node, scope, method_scope);
            }
        }
    }

    /// Visit named children, skipping the given node ids.
    fn visit_children(&mut self, node: Node<'_>, scope: &Scope, skip: &[usize]) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            if !skip.contains(&child.id()) {
                self.visit(child, scope);
            }
        }
    }

    /// `def name`.
    fn visit_method(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        self.define_method(&name, node, scope, Self::method_scope(scope));
    }

    /// `class Name < Base` or `module Name`, then its body one level deeper.
    fn visit_namespace(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.visit_children(node, scope, &[]);
            return;
        };
        let qualified = scope.qualify(self.text(name_node));
        let superclass_node = node.child_by_field_name("superclass");
        let superclass = superclass_node
            .and_then(|s| return s.named_child(0))
            .filter(|expr| return is_constant_node(*expr))
            .map(|expr| return ConstRef::lexical(self.text(expr), &scope.nesting));

        let kind = if node.kind() == "module" { EntityKind::Module } else { EntityKind::Class };
        self.decls.namespaces.push(NamespaceDecl {
            kind,
            name: qualified.clone(),
            origin: self.origin(node),
            superclass,
        });

        let mut skip = vec![name_node.id()];
        skip.extend(superclass_node.map(|s| return s.id()));
        self.visit_children(node, &scope.enter(&qualified), &skip);
    }

    /// `class << self`: plain `def` inside defines singleton methods.
    fn visit_singleton_class(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(value) = node.child_by_field_name("value") else {
            return;
        };
        if self.text(value) != "self" {
            tracing::trace!(line = line_of(node), "skipping singleton class of non-self object");
            return;
        }
        let inner = Scope { nesting: scope.nesting.clone(), singleton: true };
        self.visit_children(node, &inner, &[value.id()]);
    }

    /// `def self.name` or `def Const.name`.
    fn visit_singleton_method(&mut self, node: Node<'_>, scope: &Scope) {
        let (Some(object), Some(name_node)) = (node.child_by_field_name("object"), node.child_by_field_name("name")) else {
            return;
        };
        let owner = if object.kind() == "self" {
            ConstRef::absolute(scope.current())
        } else if is_constant_node(object) {
            ConstRef::lexical(self.text(object), &scope.nesting)
        } else {
            return;
        };
        self.decls.methods.push(MethodDecl {
            name: self.text(name_node).to_string(),
            origin: self.origin(node),
            owner,
            scope: MethodScope::Class,
        });
    }
}

/// Whether a node is a constant name (`Foo` or `Foo::Bar`).
fn is_constant_node(node: Node<'_>) -> bool {
    return matches!(node.kind(), "constant" | "scope_resolution");
}
