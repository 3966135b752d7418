/// Crate-level error types for showsrc diagnostics.
use std::path::PathBuf;

/// All errors in showsrc carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, reference, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The owner, member, or its source location could not be found.
    #[error("couldn't locate a definition for `{symbol}`")]
    DefinitionNotFound {
        /// Reference as typed, without the super modifier.
        symbol: String,
    },

    /// Source file exceeds the size limit.
    #[error("file too large ({size_bytes} bytes, max {max_bytes}): {}", file.display())]
    FileTooLarge {
        /// File that exceeded the size limit.
        file: PathBuf,
        /// Maximum allowed file size in bytes.
        max_bytes: u64,
        /// Actual file size in bytes.
        size_bytes: u64,
    },

    /// The raw reference string cannot be split into a structured reference.
    #[error("invalid reference `{input}`: {reason}")]
    InvalidReference {
        /// The raw input as given.
        input: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The definition exists but the ancestor chain ends before the requested depth.
    #[error("couldn't locate a super definition for `{symbol}` at depth {depth}")]
    SuperNotFound {
        /// The first super level that had no definition.
        depth: usize,
        /// Reference as typed, without the super modifier.
        symbol: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No tree-sitter grammar registered for this file extension.
    #[error("no grammar for extension: .{ext}")]
    UnsupportedLanguage {
        /// File extension without the leading dot.
        ext: String,
    },
}
