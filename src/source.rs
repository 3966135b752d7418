//! Source resolution: reference → definition (after the optional super-walk)
//! → file, line, and the text of the whole definition.

use std::path::Path;

use tree_sitter::Node;

use crate::error::Error;
use crate::indexer;
use crate::registry::{Entity, MethodScope, Origin, Registry};
use crate::types::{Reference, SourceLocation, TargetKind};

/// Node kinds that wrap statements and never count as a definition themselves.
const CONTAINER_KINDS: &[&str] = &["body_statement", "program"];

/// Resolve a reference to the source location of its definition.
///
/// For methods with `super_levels > 0` the ancestor chain is walked that many
/// definitions up before the location is taken. Constants ignore the modifier.
///
/// # Errors
///
/// Returns `Error::DefinitionNotFound` when the owner, member, or its location
/// is unknown, and `Error::SuperNotFound` when the chain ends before the
/// requested depth. No other errors are produced.
pub fn resolve<R: Registry>(reference: &Reference, registry: &R) -> Result<SourceLocation, Error> {
    let symbol = reference.display_name();
    let origin = find_origin(reference, registry, &symbol)?;

    return match origin {
        Origin::Native { file } => Ok(SourceLocation {
            content: None,
            file_path: file.clone(),
            is_binary: true,
            line_number: None,
        }),
        Origin::Sourced { file, line } => Ok(SourceLocation {
            content: read_definition(file, *line),
            file_path: file.clone(),
            is_binary: false,
            line_number: Some(*line),
        }),
        Origin::Unknown => {
            tracing::debug!(symbol = %symbol, "definition has no known location");
            Err(Error::DefinitionNotFound { symbol })
        },
    };
}

/// Line range of the definition starting on `row` (zero-based), found as the
/// outermost non-container node that starts on that row.
fn definition_rows(node: Node<'_>, row: usize) -> Option<(usize, usize)> {
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();

    for child in children {
        let start = child.start_position().row;
        let end = child.end_position().row;
        if start == row && !CONTAINER_KINDS.contains(&child.kind()) {
            return Some((start, end));
        }
        if start <= row && row <= end {
            return definition_rows(child, row);
        }
    }
    return None;
}

/// Text of the definition starting on one-based `line`: the full node when the
/// source parses, else just that line. `None` if the line doesn't exist.
pub fn extract_definition(file: &Path, source: &str, line: u32) -> Option<String> {
    let row = usize::try_from(line).ok()?.checked_sub(1)?;
    let lines: Vec<&str> = source.lines().collect();
    if row >= lines.len() {
        return None;
    }

    let end_row = indexer::parse_ruby(file, source)
        .ok()
        .and_then(|tree| return definition_rows(tree.root_node(), row))
        .map_or(row, |(_, end)| return end.max(row));

    let region = lines.get(row..=end_row).unwrap_or_default();
    let mut text = region.join("\n");
    text.push('\n');
    return Some(text);
}

/// Identify the definition the reference names (after the super-walk) and return its origin.
///
/// # Errors
///
/// Returns `Error::DefinitionNotFound` or `Error::SuperNotFound`.
fn find_origin<'r, R: Registry>(reference: &Reference, registry: &'r R, symbol: &str) -> Result<&'r Origin, Error> {
    let not_found = || return Error::DefinitionNotFound { symbol: symbol.to_string() };

    let Some(owner) = registry.constant(&reference.owner_path) else {
        tracing::debug!(symbol, "owner not loaded");
        return Err(not_found());
    };

    return match (reference.kind, reference.member_name.as_deref()) {
        (TargetKind::ClassMethod, Some(member)) => {
            method_origin(owner, MethodScope::Class, member, reference.super_levels, registry, symbol)
        },
        (TargetKind::Constant, _) => {
            if reference.super_levels > 0 {
                tracing::debug!(symbol, "super modifier ignored for constants");
            }
            Ok(&owner.origin)
        },
        (TargetKind::InstanceMethod, Some(member)) => {
            method_origin(owner, MethodScope::Instance, member, reference.super_levels, registry, symbol)
        },
        (TargetKind::ClassMethod | TargetKind::InstanceMethod, None) => Err(not_found()),
    };
}

/// Find the `levels`-th definition of `name` along the owner's lookup chain.
/// Level 0 is the definition normal dispatch would call; each further level is
/// the next ancestor that defines the method.
///
/// # Errors
///
/// Returns `Error::DefinitionNotFound` if nothing defines the method,
/// or `Error::SuperNotFound` if fewer than `levels` ancestors redefine it.
fn method_origin<'r, R: Registry>(
    owner: &'r Entity,
    scope: MethodScope,
    name: &str,
    levels: usize,
    registry: &'r R,
    symbol: &str,
) -> Result<&'r Origin, Error> {
    let mut definitions = owner
        .lookup_chain(scope)
        .iter()
        .filter_map(|ancestor| {
            return registry
                .method(&ancestor.owner, ancestor.scope, name)
                .map(|origin| return (ancestor, origin));
        });

    for depth in 0..=levels {
        let Some((ancestor, origin)) = definitions.next() else {
            if depth == 0 {
                return Err(Error::DefinitionNotFound { symbol: symbol.to_string() });
            }
            return Err(Error::SuperNotFound { depth, symbol: symbol.to_string() });
        };
        tracing::trace!(depth, owner = %ancestor.owner, method = name, "super-walk step");
        if depth == levels {
            return Ok(origin);
        }
    }

    // `0..=levels` always reaches `depth == levels`.
    return Err(Error::DefinitionNotFound { symbol: symbol.to_string() });
}

/// Read the definition text; `None` if the file can't be read.
fn read_definition(file: &Path, line: u32) -> Option<String> {
    let source = match indexer::read_source(file) {
        Ok(source) => source,
        Err(e) => {
            tracing::debug!(file = %file.display(), error = %e, "source not available");
            return None;
        },
    };
    return extract_definition(file, &source, line);
}
