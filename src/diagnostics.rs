use std::io::IsTerminal as _;

use crate::error::Error;
use crate::grammar::RUBY_EXTENSIONS;
use crate::types::Lookup;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Wrap text in bold when the stream is a terminal.
pub fn bold(text: &str, terminal: bool) -> String {
    if terminal {
        return format!("{BOLD}{text}{RESET}");
    }
    return text.to_string();
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let terminal = std::io::stderr().is_terminal();
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{}", bold(line, terminal));
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

/// Print the one-line message for a reference that resolved to nothing.
pub fn print_not_found(result: &Lookup) {
    eprintln!("{}", not_found_message(result));
    return;
}

/// Note on stderr that a docs link was found but the requested super definition wasn't.
pub fn print_missing_super(result: &Lookup) {
    if let Err(e @ Error::SuperNotFound { .. }) = &result.source {
        eprintln!("note: {e}");
    }
    return;
}

/// The message shown when neither a source location nor a doc path was found.
/// Super lookups name the level where the ancestor chain ran out, when known.
pub fn not_found_message(result: &Lookup) -> String {
    let symbol = result.reference.display_name();
    if result.reference.super_levels == 0 {
        return format!("Error: Couldn't locate a definition for {symbol}");
    }
    return match &result.source {
        Err(Error::SuperNotFound { depth, .. }) => {
            format!("Error: Couldn't locate a super definition for {symbol} (no definition at level {depth})")
        },
        _ => format!("Error: Couldn't locate a super definition for {symbol}"),
    };
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::DefinitionNotFound { .. } | Error::SuperNotFound { .. } => format!("\
# Error: Not Found

{e}
"),

        Error::FileTooLarge { file, max_bytes, size_bytes } => format!("\
# Error: File Too Large

`{}` is {size_bytes} bytes (max {max_bytes}).

## Fix

Exclude it in `.showsrc.toml`:

    exclude = [\"{}\"]
", file.display(), file.display()),

        Error::InvalidReference { input, reason } => render_invalid_reference(input, reason),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `.showsrc.toml`. Allowed keys: `core`, `docs_url`, `exclude`, `include`, `[[native]]`.
"),

        Error::UnsupportedLanguage { ext } => render_unsupported_language(ext),
    };
}

fn render_invalid_reference(input: &str, reason: &str) -> String {
    return format!("\
# Error: Invalid Reference

`{input}`: {reason}

## Reference syntax

    Foo::Bar          constant
    Foo::Bar#baz      instance method
    Foo::Bar.baz      class method
    Foo::Bar#baz -s   one level up the ancestor chain (repeat `s` for more)
");
}

fn render_unsupported_language(ext: &str) -> String {
    let supported = RUBY_EXTENSIONS
        .iter()
        .map(|e| return format!("`.{e}`"))
        .collect::<Vec<_>>()
        .join(", ");
    return format!("\
# Error: Unsupported Language

No tree-sitter grammar for `.{ext}` files.

## Supported extensions

{supported}
");
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn missing(raw: &str, source: Error) -> Lookup {
        Lookup { doc_path: None, reference: crate::reference::parse(raw).unwrap(), source: Err(source) }
    }

    #[test]
    fn not_found_message_distinguishes_super_lookups() {
        let plain = missing("Foo#bar", Error::DefinitionNotFound { symbol: "Foo#bar".to_string() });
        assert_eq!(not_found_message(&plain), "Error: Couldn't locate a definition for Foo#bar");

        let owner_missing = missing("Foo#bar -ss", Error::DefinitionNotFound { symbol: "Foo#bar".to_string() });
        assert_eq!(not_found_message(&owner_missing), "Error: Couldn't locate a super definition for Foo#bar");
    }

    #[test]
    fn not_found_message_reports_super_depth() {
        let chain_ends = missing("Foo#bar -sss", Error::SuperNotFound { depth: 2, symbol: "Foo#bar".to_string() });
        assert_eq!(
            not_found_message(&chain_ends),
            "Error: Couldn't locate a super definition for Foo#bar (no definition at level 2)"
        );
    }

    #[test]
    fn lookup_errors_render_their_message() {
        let md = render_error(&Error::SuperNotFound { depth: 3, symbol: "Foo#bar".to_string() });
        assert!(md.starts_with("# Error: Not Found"));
        assert!(md.contains("at depth 3"));
    }

    #[test]
    fn invalid_reference_lists_syntax() {
        let md = render_error(&Error::InvalidReference {
            input: "Foo#".to_string(),
            reason: "empty method name".to_string(),
        });
        assert!(md.starts_with("# Error: Invalid Reference"));
        assert!(md.contains("Foo::Bar#baz -s"));
    }

    #[test]
    fn file_too_large_suggests_exclude() {
        let md = render_error(&Error::FileTooLarge {
            file: PathBuf::from("vendor/huge.rb"),
            max_bytes: 10,
            size_bytes: 20,
        });
        assert!(md.contains("exclude = [\"vendor/huge.rb\"]"));
    }

    #[test]
    fn bold_only_on_terminals() {
        assert_eq!(bold("From:", false), "From:");
        assert_eq!(bold("From:", true), "\x1b[1mFrom:\x1b[0m");
    }
}
