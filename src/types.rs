/// Core domain types for showsrc references, locations, and doc paths.
use std::fmt;
use std::path::PathBuf;

use crate::error::Error;

/// Documentation path relative to the docs site root, e.g. `String.html#method-i-upcase`.
/// Newtype prevents mixing with arbitrary strings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DocPath(
    /// The relative path, including an optional `#anchor`.
    pub String,
);

impl fmt::Display for DocPath {
    /// Write the raw path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

/// Both halves of a lookup. The two resolutions are independent: either
/// may fail while the other succeeds.
#[derive(Debug)]
pub struct Lookup {
    /// Documentation path for the direct definition, if the owner exists.
    pub doc_path: Option<DocPath>,
    /// The parsed reference both resolutions ran against.
    pub reference: Reference,
    /// Source location, or `DefinitionNotFound` / `SuperNotFound`.
    pub source: Result<SourceLocation, Error>,
}

/// Parsed intent extracted from a raw reference string such as `Foo::Bar#baz -s`.
/// `member_name` is `Some` exactly when `kind` is a method kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// What the reference points at.
    pub kind: TargetKind,
    /// Method name for method references.
    pub member_name: Option<String>,
    /// Namespace segments, outermost first. Empty means the top level.
    pub owner_path: Vec<String>,
    /// How many ancestor steps to walk before resolving. Zero is the definition itself.
    pub super_levels: usize,
}

impl Reference {
    /// The reference in its canonical typed form, without the super modifier.
    pub fn display_name(&self) -> String {
        let owner = self.owner_path.join("::");
        return match (&self.kind, &self.member_name) {
            (TargetKind::ClassMethod, Some(member)) => format!("{owner}.{member}"),
            (TargetKind::InstanceMethod, Some(member)) => format!("{owner}#{member}"),
            _ => owner,
        };
    }
}

/// Where a definition lives. Constructed fresh per resolution and owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Full text of the defining region. `None` for binaries or unreadable files.
    pub content: Option<String>,
    /// File the definition came from.
    pub file_path: PathBuf,
    /// True when only the file identity is known (natively compiled origin).
    pub is_binary: bool,
    /// One-based line of the definition. `None` for binary origins.
    pub line_number: Option<u32>,
}

/// The kind of entity a reference names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// `Foo.bar`: a method on the singleton.
    ClassMethod,
    /// `Foo`, `Foo::Bar`, `Foo::BAR`.
    Constant,
    /// `Foo#bar`: a method on instances.
    InstanceMethod,
}
