//! End-to-end rule-set document loading
//!
//! Grammars arrive as JSON or YAML documents, compile into the catalog, and
//! drive tokenization, including a delegate grammar defined in a different
//! document format than its host.

use scopeline::{Document, GrammarLoader, LoadError, ScopeStack};

const HOST_YAML: &str = r#"
name: gd-host
scope: source.host
patterns:
  - match: '\b(let|fn)\b'
    scope: keyword
  - begin: 'sql«'
    end: '»'
    scope: embedded.sql
    delegate: gd-sql
  - include: '#strings'
repository:
  strings:
    - begin: '"'
      end: '"'
      scope: string.quoted
      patterns:
        - match: '\\.'
          scope: constant.escape
"#;

const SQL_JSON: &str = r##"{
    "name": "gd-sql",
    "scope": "source.sql",
    "patterns": [
        { "match": "\\b(?i:select|from|where)\\b", "scope": "sql.keyword" },
        { "match": "\\d+", "scope": "sql.number" }
    ]
}"##;

#[test]
fn test_yaml_host_with_json_delegate() {
    GrammarLoader::from_json(SQL_JSON).unwrap().register().unwrap();
    let host = GrammarLoader::from_yaml(HOST_YAML).unwrap().register().unwrap();

    let text = "let q = sql«SELECT 1 FROM t»\nfn next() { }";
    let doc = Document::new(&host, text).unwrap();

    let line = doc.line(0).unwrap().to_string();
    let tokens = doc.tokens(0).unwrap();
    let scopes_of = |text: &str| {
        tokens
            .iter()
            .find(|t| t.text(&line) == text)
            .map(|t| t.scopes.clone())
            .unwrap_or_else(|| panic!("no token `{}`", text))
    };

    assert_eq!(scopes_of("let"), vec!["source.host", "keyword"]);
    assert_eq!(
        scopes_of("SELECT"),
        vec!["source.host", "embedded.sql", "sql.keyword"]
    );
    assert_eq!(
        scopes_of("1"),
        vec!["source.host", "embedded.sql", "sql.number"]
    );
    // The delegate does not know `let`; the host's end marker returned
    // control to the host grammar.
    assert_eq!(doc.entry_stack(1).unwrap().depth(), 1);
    let second = doc.line(1).unwrap().to_string();
    let fn_token = doc
        .tokens(1)
        .unwrap()
        .iter()
        .find(|t| t.text(&second) == "fn")
        .unwrap();
    assert_eq!(fn_token.scopes, vec!["source.host", "keyword"]);
}

#[test]
fn test_repository_strings_from_document() {
    let host = GrammarLoader::from_yaml(HOST_YAML)
        .unwrap()
        .compile()
        .unwrap()
        .0;
    let stack = ScopeStack::base(&host).unwrap();
    let line = r#"let s = "a\"b""#;
    let run = scopeline::tokenize_line(line, &stack).unwrap();

    let escape = run.tokens.iter().find(|t| t.text(line) == r#"\""#).unwrap();
    assert_eq!(
        escape.scopes,
        vec!["source.host", "string.quoted", "constant.escape"]
    );
    assert_eq!(run.stack.depth(), 1);
}

#[test]
fn test_capture_warning_surfaces_through_loader() {
    let doc = r##"{
        "name": "gd-warning",
        "patterns": [
            { "match": "(a)", "scope": "a", "captures": { "3": "ghost" } }
        ]
    }"##;
    let loader = GrammarLoader::from_json(doc).unwrap();
    let (_, warnings) = loader.compile().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].to_string().contains("out of range"));
}

#[test]
fn test_missing_region_end_rejects_document() {
    let doc = r#"
name: gd-broken
patterns:
  - begin: '\{'
    scope: block
"#;
    let loader = GrammarLoader::from_yaml(doc).unwrap();
    assert!(matches!(loader.register(), Err(LoadError::Compile(_))));
}

#[test]
fn test_unknown_repository_reference_rejects_document() {
    let doc = r#"
name: gd-unknown-repo
patterns:
  - include: '#missing'
"#;
    let loader = GrammarLoader::from_yaml(doc).unwrap();
    assert!(matches!(loader.register(), Err(LoadError::Compile(_))));
}
