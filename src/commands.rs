//! Core CLI commands for showsrc: show, doc, list, info.

use std::fmt::Write as _;
use std::io::IsTerminal as _;
use std::path::Path;
use std::process::ExitCode;

use crate::config::Config;
use crate::diagnostics;
use crate::docpath;
use crate::error::Error;
use crate::index::Index;
use crate::indexer;
use crate::reference;
use crate::registry::{MethodScope, Origin, Registry};
use crate::source;
use crate::types::{Lookup, SourceLocation};

/// A loaded project: its configuration and the index built from it.
pub struct Project {
    /// Configuration read from `.showsrc.toml`.
    pub config: Config,
    /// Index of every loaded constant and method.
    pub index: Index,
}

/// Print the documentation URL for a reference.
///
/// # Errors
///
/// Returns errors from config loading, indexing, or reference parsing.
pub fn doc(root: &Path, raw: &str) -> Result<ExitCode, Error> {
    let project = load(root)?;
    let result = lookup(raw, &project.index)?;

    let Some(path) = &result.doc_path else {
        diagnostics::print_not_found(&result);
        return Ok(ExitCode::from(1));
    };
    println!("{}{path}", project.config.docs_url);
    return Ok(ExitCode::SUCCESS);
}

/// Output a comprehensive reference document for showsrc.
pub fn info(root: &Path, json: bool) {
    return crate::info::run(root, json);
}

/// List every indexed constant and method in reference syntax, sorted.
/// With `sourced_only`, entries without a readable source location are skipped.
///
/// # Errors
///
/// Returns errors from config loading or indexing.
pub fn list(root: &Path, sourced_only: bool) -> Result<(), Error> {
    let project = load(root)?;
    for line in listing(&project.index, sourced_only) {
        println!("{line}");
    }
    return Ok(());
}

/// Reference-syntax lines for the index, sorted.
fn listing(index: &Index, sourced_only: bool) -> Vec<String> {
    let keep = |origin: &Origin| return !sourced_only || matches!(origin, Origin::Sourced { .. });

    let mut lines: Vec<String> = index
        .entities()
        .filter(|entity| return keep(&entity.origin))
        .map(|entity| return entity.name.clone())
        .collect();

    for (owner, scope, name) in index.methods() {
        if !index.method(owner, scope, name).is_some_and(keep) {
            continue;
        }
        let separator = match scope {
            MethodScope::Class => '.',
            MethodScope::Instance => '#',
        };
        lines.push(format!("{owner}{separator}{name}"));
    }

    lines.sort();
    return lines;
}

/// Load config and build the index for the project at `root`.
///
/// # Errors
///
/// Returns errors from config loading or indexing.
pub fn load(root: &Path) -> Result<Project, Error> {
    let config = Config::load(root)?;
    let index = indexer::build(root, &config)?;
    return Ok(Project { config, index });
}

/// Resolve a raw reference into both outcomes: source location and doc path.
/// The two are independent; either, both, or neither may be present.
///
/// # Errors
///
/// Returns `Error::InvalidReference` if the reference cannot be parsed.
pub fn lookup<R: Registry>(raw: &str, registry: &R) -> Result<Lookup, Error> {
    let reference = reference::parse(raw)?;
    let doc_path = docpath::resolve_doc_path(&reference, registry);
    let source = source::resolve(&reference, registry);
    if let Err(e) = &source {
        tracing::debug!(reference = %raw, error = %e, "no source location");
    }
    return Ok(Lookup { doc_path, reference, source });
}

/// Render the `show` output for a lookup, or `None` if nothing was found.
fn render_show(result: &Lookup, docs_url: &str, terminal: bool) -> Option<String> {
    let location = result.source.as_ref().ok();
    if result.doc_path.is_none() && location.is_none() {
        return None;
    }

    let mut out = String::new();
    if let Some(path) = &result.doc_path {
        let _ = writeln!(out, "[Experimental] View on Ruby docs: {docs_url}{path}");
    }
    if let Some(location) = location {
        if !out.is_empty() {
            out.push('\n');
        }
        render_location(&mut out, location, terminal);
    }
    return Some(out);
}

/// Append the location block: `From:` header and definition, or the binary notice.
fn render_location(out: &mut String, location: &SourceLocation, terminal: bool) {
    let file = location.file_path.display();
    if location.is_binary {
        let _ = writeln!(out, "{} {file}", diagnostics::bold("Defined in binary file:", terminal));
        return;
    }

    let from = diagnostics::bold("From:", terminal);
    match location.line_number {
        Some(line) => {
            let _ = writeln!(out, "{from} {file}:{line}");
        },
        None => {
            let _ = writeln!(out, "{from} {file}");
        },
    }
    out.push('\n');
    match &location.content {
        Some(content) => {
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
        },
        None => out.push_str("Source not available\n"),
    }
    return;
}

/// Show the docs link and definition for a reference.
///
/// # Errors
///
/// Returns errors from config loading, indexing, or reference parsing.
pub fn show(root: &Path, raw: &str) -> Result<ExitCode, Error> {
    let project = load(root)?;
    let result = lookup(raw, &project.index)?;
    let terminal = std::io::stdout().is_terminal();

    let Some(rendered) = render_show(&result, &project.config.docs_url, terminal) else {
        diagnostics::print_not_found(&result);
        return Ok(ExitCode::from(1));
    };
    print!("{rendered}");
    diagnostics::print_missing_super(&result);
    return Ok(ExitCode::SUCCESS);
}
