//! Scenario tests for single-line tokenization
//!
//! Exercises the scope stack machine through the public `tokenize_line` entry
//! point: keyword matching, capture segmentation, back-referencing end
//! patterns, zero-width rules, and the coverage/purity/balance properties.

use rstest::rstest;
use scopeline::testing::{
    captured_match_rule, compile, grammar_def, match_rule, region_rule,
};
use scopeline::{tokenize_line, Document, ScopeStack, Token};

fn assert_covers(line: &str, tokens: &[Token]) {
    let mut expected = 0;
    for token in tokens {
        assert_eq!(token.span.start, expected, "tokens must be contiguous");
        assert!(token.span.start < token.span.end, "tokens must be non-empty");
        expected = token.span.end;
    }
    assert_eq!(expected, line.len(), "tokens must cover the line");
}

#[test]
fn test_keyword_line() {
    let grammar = compile(grammar_def(
        "scn-keyword",
        "base",
        vec![match_rule(r"\bif\b", "keyword")],
    ));
    let stack = ScopeStack::base(&grammar).unwrap();
    let run = tokenize_line("if (x) y", &stack).unwrap();

    assert_covers("if (x) y", &run.tokens);
    assert_eq!(run.tokens[0].text("if (x) y"), "if");
    assert_eq!(run.tokens[0].scopes, vec!["base", "keyword"]);
    // Text the grammar says nothing about stays base-scoped.
    for token in &run.tokens[1..] {
        assert_eq!(token.scopes, vec!["base"]);
    }
    assert_eq!(run.stack.depth(), 1);
}

#[test]
fn test_backreference_end_pattern() {
    let mut region = region_rule(r"<(\w+)>", r"</\1>", "tag.block", vec![]);
    region
        .begin_captures
        .insert("1".to_string(), "tag.name".to_string());
    let grammar = compile(grammar_def("scn-backref", "base", vec![region]));
    let stack = ScopeStack::base(&grammar).unwrap();

    let line = "<tag>text</tag>";
    let run = tokenize_line(line, &stack).unwrap();
    assert_covers(line, &run.tokens);

    // The begin match is split at the capture boundary.
    let name = run.tokens.iter().find(|t| t.text(line) == "tag").unwrap();
    assert_eq!(name.scopes, vec!["base", "tag.block", "tag.name"]);
    let text = run.tokens.iter().find(|t| t.text(line) == "text").unwrap();
    assert_eq!(text.scopes, vec!["base", "tag.block"]);
    // The resolved end pattern closed the region.
    assert_eq!(run.stack.depth(), 1);
}

#[test]
fn test_backreference_does_not_close_on_other_marker() {
    let grammar = compile(grammar_def(
        "scn-backref-other",
        "base",
        vec![region_rule(r"<(\w+)>", r"</\1>", "tag.block", vec![])],
    ));
    let stack = ScopeStack::base(&grammar).unwrap();
    let run = tokenize_line("<tag>text</other>", &stack).unwrap();
    // `</other>` is not the captured marker, so the region stays open.
    assert_eq!(run.stack.depth(), 2);
}

#[test]
fn test_zero_width_rule_on_empty_line() {
    let grammar = compile(grammar_def(
        "scn-zero-width",
        "base",
        vec![match_rule(r"\b", "boundary")],
    ));
    let stack = ScopeStack::base(&grammar).unwrap();
    let run = tokenize_line("", &stack).unwrap();
    assert!(run.tokens.is_empty());
    assert_eq!(run.stack, stack);
}

#[test]
fn test_capture_segmentation_covers_match() {
    let grammar = compile(grammar_def(
        "scn-captures",
        "base",
        vec![captured_match_rule(
            r"(\w+)\s*=\s*(\w+)",
            "assignment",
            &[(1, "key"), (2, "value")],
        )],
    ));
    let stack = ScopeStack::base(&grammar).unwrap();
    let line = "width = 80; x";
    let run = tokenize_line(line, &stack).unwrap();
    assert_covers(line, &run.tokens);

    let key = run.tokens.iter().find(|t| t.text(line) == "width").unwrap();
    assert_eq!(key.scopes, vec!["base", "assignment", "key"]);
    let value = run.tokens.iter().find(|t| t.text(line) == "80").unwrap();
    assert_eq!(value.scopes, vec!["base", "assignment", "value"]);
}

#[rstest]
#[case::plain("nothing matches here")]
#[case::keywords("if if if")]
#[case::region_open("a { b { c")]
#[case::region_closed("{ 1 } { 2 }")]
#[case::unbalanced_close("} } }")]
#[case::empty("")]
#[case::unicode("héllo { wörld }")]
fn test_token_coverage(#[case] line: &str) {
    let grammar = compile(grammar_def(
        &format!("scn-coverage-{}", line.len()),
        "base",
        vec![
            match_rule(r"\bif\b", "keyword"),
            region_rule(r"\{", r"\}", "block", vec![match_rule(r"\d+", "number")]),
        ],
    ));
    let stack = ScopeStack::base(&grammar).unwrap();
    let run = tokenize_line(line, &stack).unwrap();
    assert_covers(line, &run.tokens);
}

#[test]
fn test_tokenize_line_is_pure() {
    let grammar = compile(grammar_def(
        "scn-pure",
        "base",
        vec![region_rule(r"\{", r"\}", "block", vec![match_rule(r"\w+", "word")])],
    ));
    let stack = ScopeStack::base(&grammar).unwrap();
    let opened = tokenize_line("start {", &stack).unwrap();
    let first = tokenize_line("inside words", &opened.stack).unwrap();
    let second = tokenize_line("inside words", &opened.stack).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_stack_balance_over_document() {
    let grammar = compile(grammar_def(
        "scn-balance",
        "base",
        vec![region_rule(
            r"\{",
            r"\}",
            "block",
            vec![match_rule(r"\d+", "number")],
        )],
    ));
    let text = "start {\n1 {\n2\n}\n3\n}\nend";
    let doc = Document::new(&grammar, text).unwrap();
    // Every begin has its end, so the final stack is the base stack again.
    assert_eq!(doc.end_stack(), &ScopeStack::base(&grammar).unwrap());
}

#[test]
fn test_interior_lines_carry_region_scope() {
    let grammar = compile(grammar_def(
        "scn-interior",
        "base",
        vec![region_rule(r"/\*", r"\*/", "comment", vec![])],
    ));
    let doc = Document::new(&grammar, "code /* first\nmiddle\nlast */ code").unwrap();

    let middle = &doc.tokens(1).unwrap()[0];
    assert_eq!(middle.scopes, vec!["base", "comment"]);
    assert_eq!(doc.entry_stack(1).unwrap().depth(), 2);
    assert_eq!(doc.end_stack().depth(), 1);
}
