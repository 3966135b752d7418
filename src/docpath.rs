//! Documentation paths: the page and anchor a reference would have on the docs site.
//!
//! Only the owner's existence is checked. Whether the page or the method
//! actually has documentation cannot be known from the registry.

use crate::registry::Registry;
use crate::types::{DocPath, Reference, TargetKind};

/// Anchor fragment for a method name, as the docs generator writes it:
/// `-` becomes `-2D`, the result is percent-encoded, `%` becomes `-`, and one
/// leading `-` is dropped. `upcase` stays `upcase`; `==` becomes `3D-3D`.
pub fn method_anchor(name: &str) -> String {
    let escaped = urlencoding::encode(&name.replace('-', "-2D")).replace('%', "-");
    return match escaped.strip_prefix('-') {
        Some(rest) => rest.to_string(),
        None => escaped,
    };
}

/// Page for a constant: `IRB::Context` lives at `IRB/Context.html`.
fn page(name: &str) -> String {
    return format!("{}.html", name.replace("::", "/"));
}

/// Derive the documentation path for a reference. `super_levels` is ignored:
/// links always point at the direct definition.
///
/// Returns `None` when the owner (or the constant itself) isn't loaded. For
/// methods, a path is produced whenever the owner exists, whether or not the
/// method does.
pub fn resolve_doc_path<R: Registry>(reference: &Reference, registry: &R) -> Option<DocPath> {
    let owner = registry.constant(&reference.owner_path)?;

    let path = match (reference.kind, reference.member_name.as_deref()) {
        (TargetKind::ClassMethod, Some(member)) => {
            format!("{}#method-c-{}", page(&owner.name), method_anchor(member))
        },
        (TargetKind::Constant, _) => page(&owner.name),
        (TargetKind::InstanceMethod, Some(member)) => {
            format!("{}#method-i-{}", page(&owner.name), method_anchor(member))
        },
        (TargetKind::ClassMethod | TargetKind::InstanceMethod, None) => return None,
    };
    return Some(DocPath(path));
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::index::Index;
    use crate::indexer::{core_manifest, index_source, native_declarations};
    use crate::reference::parse;

    fn index() -> Index {
        let mut decls = native_declarations(&core_manifest().unwrap());
        let source = "module IRB\n  class Context\n    LIMIT = 1\n  end\nend\nTOP = 2\n";
        index_source(Path::new("lib/irb.rb"), source, &mut decls).unwrap();
        Index::link(decls)
    }

    fn doc(index: &Index, raw: &str) -> Option<String> {
        resolve_doc_path(&parse(raw).unwrap(), index).map(|p| p.0)
    }

    #[test]
    fn constants_map_to_pages() {
        let index = index();
        assert_eq!(doc(&index, "String").as_deref(), Some("String.html"));
        assert_eq!(doc(&index, "::String").as_deref(), Some("String.html"));
        assert_eq!(doc(&index, "IRB::Context").as_deref(), Some("IRB/Context.html"));
    }

    #[test]
    fn methods_map_to_anchors() {
        let index = index();
        assert_eq!(doc(&index, "String#upcase").as_deref(), Some("String.html#method-i-upcase"));
        assert_eq!(doc(&index, "String.new").as_deref(), Some("String.html#method-c-new"));
        assert_eq!(doc(&index, "IRB::Context#eval").as_deref(), Some("IRB/Context.html#method-i-eval"));
    }

    #[test]
    fn missing_owner_has_no_path() {
        let index = index();
        assert_eq!(doc(&index, "NonexistentConstant"), None);
        assert_eq!(doc(&index, "Nonexistent#upcase"), None);
    }

    #[test]
    fn missing_method_on_existing_owner_still_has_path() {
        let index = index();
        assert_eq!(
            doc(&index, "String#nonexistent_method").as_deref(),
            Some("String.html#method-i-nonexistent_method")
        );
    }

    #[test]
    fn super_modifier_is_ignored() {
        let index = index();
        assert_eq!(doc(&index, "String#upcase -ss"), doc(&index, "String#upcase"));
    }

    #[test]
    fn value_constants_link_to_their_own_page() {
        let index = index();
        assert_eq!(doc(&index, "IRB::Context::LIMIT").as_deref(), Some("IRB/Context/LIMIT.html"));
        assert_eq!(doc(&index, "TOP").as_deref(), Some("TOP.html"));
        assert_eq!(doc(&index, "::TOP").as_deref(), Some("TOP.html"));
    }

    #[test]
    fn top_level_methods_document_object() {
        let index = index();
        assert_eq!(doc(&index, "#puts").as_deref(), Some("Object.html#method-i-puts"));
    }

    #[test]
    fn operator_anchors_are_escaped() {
        assert_eq!(method_anchor("upcase"), "upcase");
        assert_eq!(method_anchor("=="), "3D-3D");
        assert_eq!(method_anchor("empty?"), "empty-3F");
        assert_eq!(method_anchor("[]"), "5B-5D");
        assert_eq!(method_anchor("-@"), "2D-40");
        assert_eq!(method_anchor("<=>"), "3C-3D-3E");
        assert_eq!(method_anchor("each_slice"), "each_slice");
    }
}
