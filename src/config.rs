use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::registry::EntityKind;

/// Documentation site the doc paths are relative to.
pub const DEFAULT_DOCS_URL: &str = "https://docs.ruby-lang.org/en/master/";

/// Name of the project config file, looked up in the root directory.
pub const CONFIG_FILE: &str = ".showsrc.toml";

/// Project configuration loaded from `.showsrc.toml`.
/// Include/exclude patterns are path prefixes applied to indexed source files.
#[derive(Debug)]
pub struct Config {
    /// Seed the index with the built-in core manifest.
    pub core: bool,
    /// Base URL doc paths are appended to.
    pub docs_url: String,
    /// Path prefixes never indexed.
    pub exclude: Vec<String>,
    /// Path prefixes indexed; empty means everything.
    pub include: Vec<String>,
    /// Natively compiled entities declared by the project.
    pub native: Vec<NativeEntry>,
}

/// Raw TOML structure for `.showsrc.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ShowsrcTomlConfig {
    /// See `Config::core`.
    #[serde(default = "default_core")]
    core: bool,
    /// See `Config::docs_url`.
    docs_url: Option<String>,
    /// See `Config::exclude`.
    #[serde(default)]
    exclude: Vec<String>,
    /// See `Config::include`.
    #[serde(default)]
    include: Vec<String>,
    /// See `Config::native`.
    #[serde(default)]
    native: Vec<NativeEntry>,
}

/// A natively compiled class, module, or constant.
///
/// With a `file`, its methods resolve to "defined in binary file"; without
/// one they are known to exist but have no location.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NativeEntry {
    /// Singleton method names.
    #[serde(default)]
    pub class_methods: Vec<String>,
    /// Modules extended into the singleton.
    #[serde(default)]
    pub extend: Vec<String>,
    /// Shared object or binary that defines it.
    pub file: Option<PathBuf>,
    /// Modules included.
    #[serde(default)]
    pub include: Vec<String>,
    /// Instance method names.
    #[serde(default)]
    pub instance_methods: Vec<String>,
    /// Class, module, or value.
    pub kind: EntityKind,
    /// Qualified constant name.
    pub name: String,
    /// Modules prepended.
    #[serde(default)]
    pub prepend: Vec<String>,
    /// Explicit superclass; classes only.
    pub superclass: Option<String>,
}

/// A list of native entries, the format of the built-in core manifest.
#[derive(serde::Deserialize)]
pub struct NativeManifest {
    /// The entries, in load order.
    pub native: Vec<NativeEntry>,
}

/// Serde default for `core`.
const fn default_core() -> bool {
    return true;
}

impl Config {
    /// Load config from `.showsrc.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; a config file the
    /// user wrote is never silently replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::index_everything_by_default());
            },
            Err(e) => return Err(Error::Io(e)),
        };

        return Self::parse(&content);
    }

    /// Default config that indexes everything with the core manifest.
    fn index_everything_by_default() -> Self {
        return Self {
            core: true,
            docs_url: DEFAULT_DOCS_URL.to_string(),
            exclude: Vec::new(),
            include: Vec::new(),
            native: Vec::new(),
        };
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: ShowsrcTomlConfig = toml::from_str(content)?;
        let mut docs_url = raw.docs_url.unwrap_or_else(|| return DEFAULT_DOCS_URL.to_string());
        if !docs_url.ends_with('/') {
            docs_url.push('/');
        }
        return Ok(Self {
            core: raw.core,
            docs_url,
            exclude: raw.exclude,
            include: raw.include,
            native: raw.native,
        });
    }

    /// Check whether a source file path should be indexed.
    ///
    /// A path is included if no include patterns are set (index everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_index(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.core);
        assert_eq!(config.docs_url, DEFAULT_DOCS_URL);
        assert!(config.should_index("lib/anything.rb"));
    }

    #[test]
    fn include_and_exclude_prefixes() {
        let config = Config::parse("include = [\"lib/\"]\nexclude = [\"lib/vendor/\"]\n").unwrap();
        assert!(config.should_index("lib/shapes.rb"));
        assert!(!config.should_index("lib/vendor/gem.rb"));
        assert!(!config.should_index("spec/shapes_spec.rb"));
    }

    #[test]
    fn native_entries_and_docs_url() {
        let config = Config::parse(
            r#"
core = false
docs_url = "https://example.test/docs"

[[native]]
name = "Zlib"
kind = "module"
file = "ext/zlib.so"
class_methods = ["crc32"]
"#,
        )
        .unwrap();
        assert!(!config.core);
        assert_eq!(config.docs_url, "https://example.test/docs/");
        assert_eq!(config.native.len(), 1);
        assert_eq!(config.native[0].kind, EntityKind::Module);
        assert_eq!(config.native[0].file, Some(PathBuf::from("ext/zlib.so")));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "include = 3").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("inclde = []").is_err());
    }
}
