/// Tree-sitter grammar resolution by file extension.
use std::path::Path;

use tree_sitter::Language;

use crate::error::Error;

/// File extensions the indexer treats as Ruby source.
pub const RUBY_EXTENSIONS: &[&str] = &["gemspec", "rake", "rb"];

/// Map a file extension to its tree-sitter language.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for unknown extensions.
pub fn language_for_path(path: &Path) -> Result<Language, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    if RUBY_EXTENSIONS.contains(&ext) {
        return Ok(tree_sitter_ruby::LANGUAGE.into());
    }
    return Err(Error::UnsupportedLanguage {
        ext: ext.to_string(),
    });
}

/// Whether a path has one of the indexed source extensions.
pub fn is_indexable(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|ext| return RUBY_EXTENSIONS.contains(&ext));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ruby_extensions_are_supported() {
        assert!(language_for_path(Path::new("lib/foo.rb")).is_ok());
        assert!(language_for_path(Path::new("Rakefile.rake")).is_ok());
        assert!(is_indexable(Path::new("foo.gemspec")));
    }

    #[test]
    fn other_extensions_are_rejected() {
        let err = language_for_path(Path::new("src/lib.rs")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { ext } if ext == "rs"));
        assert!(!is_indexable(Path::new("README")));
    }
}
