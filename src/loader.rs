//! Grammar loading utilities
//!
//! This module provides `GrammarLoader` - a utility for loading rule-set documents from
//! files or strings in JSON or YAML form, compiling them, and publishing them in the
//! catalog. This is used by both host integrations and tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use scopeline::loader::GrammarLoader;
//!
//! // From file (format picked by extension)
//! let grammar = GrammarLoader::from_path("demo.yaml")?.register()?;
//!
//! // From string
//! let grammar = GrammarLoader::from_json(r#"{ "name": "demo" }"#)?.register()?;
//! ```

use crate::grammar::definition::GrammarDef;
use crate::grammar::{CompileError, CompileWarning, Grammar};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Error that can occur when loading a rule-set document.
#[derive(Debug)]
pub enum LoadError {
    /// IO error when reading a file.
    Io(String),
    /// The document is not valid JSON/YAML for a grammar definition.
    Parse(String),
    /// The document parsed but did not compile.
    Compile(CompileError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(msg) => write!(f, "IO error: {}", msg),
            LoadError::Parse(msg) => write!(f, "parse error: {}", msg),
            LoadError::Compile(err) => write!(f, "compile error: {}", err),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::Io(err.to_string())
    }
}

impl From<CompileError> for LoadError {
    fn from(err: CompileError) -> Self {
        LoadError::Compile(err)
    }
}

/// Rule-set document loader with compile and register shortcuts.
pub struct GrammarLoader {
    def: GrammarDef,
}

impl GrammarLoader {
    /// Parse a JSON rule-set document.
    pub fn from_json(source: &str) -> Result<Self, LoadError> {
        let def = serde_json::from_str(source).map_err(|e| LoadError::Parse(e.to_string()))?;
        Ok(GrammarLoader { def })
    }

    /// Parse a YAML rule-set document.
    pub fn from_yaml(source: &str) -> Result<Self, LoadError> {
        let def = serde_yaml::from_str(source).map_err(|e| LoadError::Parse(e.to_string()))?;
        Ok(GrammarLoader { def })
    }

    /// Read a rule-set document from a file. `.json` files parse as JSON,
    /// anything else as YAML (which also accepts JSON).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&source),
            _ => Self::from_yaml(&source),
        }
    }

    /// Wrap an already-built definition.
    pub fn from_def(def: GrammarDef) -> Self {
        GrammarLoader { def }
    }

    /// The parsed definition.
    pub fn def(&self) -> &GrammarDef {
        &self.def
    }

    /// Compile without registering.
    pub fn compile(&self) -> Result<(Arc<Grammar>, Vec<CompileWarning>), CompileError> {
        Grammar::compile(&self.def)
    }

    /// Compile and publish in the process-wide catalog. Warnings are logged
    /// by the compiler; use [`compile`](Self::compile) to inspect them.
    pub fn register(&self) -> Result<Arc<Grammar>, LoadError> {
        let (grammar, _warnings) = Grammar::compile_and_register(&self.def)?;
        Ok(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::catalog;

    const JSON_DOC: &str = r##"{
        "name": "loader-json",
        "scope": "source.loader",
        "patterns": [
            { "match": "\\d+", "scope": "number" }
        ]
    }"##;

    const YAML_DOC: &str = r#"
name: loader-yaml
scope: source.loader
patterns:
  - begin: '\('
    end: '\)'
    scope: parens
"#;

    #[test]
    fn test_from_json() {
        let loader = GrammarLoader::from_json(JSON_DOC).unwrap();
        assert_eq!(loader.def().name, "loader-json");
        let (grammar, warnings) = loader.compile().unwrap();
        assert_eq!(grammar.base_scope(), "source.loader");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_from_yaml() {
        let loader = GrammarLoader::from_yaml(YAML_DOC).unwrap();
        let (grammar, _) = loader.compile().unwrap();
        assert_eq!(grammar.name(), "loader-yaml");
        assert_eq!(grammar.top().len(), 1);
    }

    #[test]
    fn test_register_publishes_in_catalog() {
        let loader = GrammarLoader::from_json(
            r#"{ "name": "loader-registered", "patterns": [] }"#,
        )
        .unwrap();
        let grammar = loader.register().unwrap();
        let found = catalog::lookup("loader-registered").expect("registered");
        assert!(Arc::ptr_eq(&grammar, &found));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        assert!(matches!(
            GrammarLoader::from_json("{ not json"),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn test_bad_pattern_is_compile_error() {
        let loader = GrammarLoader::from_json(
            r#"{ "name": "loader-bad", "patterns": [ { "match": "(oops", "scope": "x" } ] }"#,
        )
        .unwrap();
        assert!(matches!(loader.register(), Err(LoadError::Compile(_))));
    }

    #[test]
    fn test_from_path_nonexistent() {
        assert!(matches!(
            GrammarLoader::from_path("no-such-grammar.yaml"),
            Err(LoadError::Io(_))
        ));
    }
}
