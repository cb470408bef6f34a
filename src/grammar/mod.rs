//! Grammar Compilation
//!
//!     A rule-set document is compiled once into an immutable [`Grammar`] and shared via
//!     `Arc` across every document that tokenizes with it. Compilation lowers each rule
//!     definition into the arena (see [`rule`](crate::rule)), validates patterns and
//!     region shape, checks repository references, and resolves capture-scope maps.
//!
//! Reference Resolution
//!
//!     Repository references (`#name`) must resolve within the grammar being compiled;
//!     a miss is a fatal compile error. References to other grammars are deferred: they
//!     are looked up in the process-wide [`catalog`] when a frame actually needs the
//!     rules, and only then does an unresolved name become fatal. This allows rule sets
//!     that embed each other to be loaded in any order.
//!
//! Validation Severity
//!
//!     Malformed patterns and malformed rule shapes reject the grammar. A capture index
//!     outside the pattern's capture count does not: the capture is simply left unscoped
//!     and the compiler records a [`CompileWarning`] so hosts can surface it.

pub mod catalog;
pub mod definition;

use crate::pattern::{EndTemplate, Pattern, PatternError};
use crate::rule::{
    CaptureScopes, EndPattern, IncludeRef, MatchRule, RegionRule, Rule, RuleId,
};
use definition::{GrammarDef, RuleDef};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error that rejects a grammar at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A pattern did not compile.
    Pattern(PatternError),
    /// A region rule is missing its begin or end pattern.
    IncompleteRegion { grammar: String, detail: String },
    /// A rule is neither a match, a region, nor an include (or several at once).
    MalformedRule { grammar: String, detail: String },
    /// A `#name` reference has no repository entry.
    UnknownRepositoryEntry { grammar: String, entry: String },
    /// A capture map key is not a capture group number.
    InvalidCaptureKey { grammar: String, key: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Pattern(err) => write!(f, "{}", err),
            CompileError::IncompleteRegion { grammar, detail } => {
                write!(f, "incomplete region in grammar `{}`: {}", grammar, detail)
            }
            CompileError::MalformedRule { grammar, detail } => {
                write!(f, "malformed rule in grammar `{}`: {}", grammar, detail)
            }
            CompileError::UnknownRepositoryEntry { grammar, entry } => {
                write!(
                    f,
                    "grammar `{}` references unknown repository entry `#{}`",
                    grammar, entry
                )
            }
            CompileError::InvalidCaptureKey { grammar, key } => {
                write!(
                    f,
                    "grammar `{}` has non-numeric capture key `{}`",
                    grammar, key
                )
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<PatternError> for CompileError {
    fn from(err: PatternError) -> Self {
        CompileError::Pattern(err)
    }
}

/// Non-fatal finding recorded while compiling a grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileWarning {
    /// A scope map names a capture group the pattern does not have.
    /// The capture stays unscoped.
    CaptureOutOfRange {
        grammar: String,
        pattern: String,
        index: usize,
        capture_count: usize,
    },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::CaptureOutOfRange {
                grammar,
                pattern,
                index,
                capture_count,
            } => write!(
                f,
                "grammar `{}`: capture {} of `{}` is out of range ({} groups); left unscoped",
                grammar, index, pattern, capture_count
            ),
        }
    }
}

/// Error raised when a cross-grammar reference is still unresolved at use time.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedReference {
    /// Grammar whose rule made the reference.
    pub grammar: String,
    /// The referenced name.
    pub reference: String,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grammar `{}` references `{}`, which is not in the catalog",
            self.grammar, self.reference
        )
    }
}

impl std::error::Error for UnresolvedReference {}

/// A compiled, immutable grammar.
pub struct Grammar {
    name: String,
    base_scope: String,
    rules: Vec<Rule>,
    top: Vec<RuleId>,
    repository: HashMap<String, Vec<RuleId>>,
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("name", &self.name)
            .field("base_scope", &self.base_scope)
            .field("rules", &self.rules.len())
            .field("top", &self.top.len())
            .field("repository", &self.repository.keys())
            .finish()
    }
}

impl Grammar {
    /// Compile a rule-set document. Does not register the result; see
    /// [`compile_and_register`].
    pub fn compile(def: &GrammarDef) -> Result<(Arc<Grammar>, Vec<CompileWarning>), CompileError> {
        let mut compiler = Compiler {
            def,
            rules: Vec::new(),
            warnings: Vec::new(),
        };
        let top = compiler.lower_list(&def.patterns)?;
        let mut repository = HashMap::new();
        for (entry, rules) in &def.repository {
            let ids = compiler.lower_list(rules)?;
            repository.insert(entry.clone(), ids);
        }

        let grammar = Grammar {
            name: def.name.clone(),
            base_scope: def.scope.clone().unwrap_or_else(|| def.name.clone()),
            rules: compiler.rules,
            top,
            repository,
        };
        debug!(
            grammar = %grammar.name,
            rules = grammar.rules.len(),
            warnings = compiler.warnings.len(),
            "compiled grammar"
        );
        for warning in &compiler.warnings {
            warn!(grammar = %grammar.name, "{}", warning);
        }
        Ok((Arc::new(grammar), compiler.warnings))
    }

    /// Compile a rule-set document and publish it in the process-wide catalog,
    /// replacing any prior grammar of the same name.
    pub fn compile_and_register(
        def: &GrammarDef,
    ) -> Result<(Arc<Grammar>, Vec<CompileWarning>), CompileError> {
        let (grammar, warnings) = Grammar::compile(def)?;
        catalog::register(grammar.clone());
        Ok((grammar, warnings))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope tag carried by the bottom frame of every stack over this grammar.
    pub fn base_scope(&self) -> &str {
        &self.base_scope
    }

    /// Top-level rule list, highest priority first.
    pub fn top(&self) -> &[RuleId] {
        &self.top
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn repository_list(&self, entry: &str) -> Option<&[RuleId]> {
        self.repository.get(entry).map(Vec::as_slice)
    }
}

struct Compiler<'a> {
    def: &'a GrammarDef,
    rules: Vec<Rule>,
    warnings: Vec<CompileWarning>,
}

impl Compiler<'_> {
    fn lower_list(&mut self, defs: &[RuleDef]) -> Result<Vec<RuleId>, CompileError> {
        defs.iter().map(|def| self.lower_rule(def)).collect()
    }

    fn lower_rule(&mut self, def: &RuleDef) -> Result<RuleId, CompileError> {
        let rule = match (&def.match_pattern, &def.begin, &def.include) {
            (Some(source), None, None) => {
                let pattern = Pattern::new(source, def.case_insensitive)?;
                let captures = self.lower_captures(&def.captures, &pattern)?;
                Rule::Match(MatchRule {
                    pattern,
                    scope: def.scope.clone(),
                    captures,
                })
            }
            (None, Some(begin_source), None) => {
                let end_source = def.end.as_ref().ok_or_else(|| {
                    CompileError::IncompleteRegion {
                        grammar: self.def.name.clone(),
                        detail: format!("begin `{}` has no end pattern", begin_source),
                    }
                })?;
                let begin = Pattern::new(begin_source, def.case_insensitive)?;
                let template = EndTemplate::parse(end_source, def.case_insensitive)?;
                let end = if template.has_backrefs() {
                    EndPattern::Template(template)
                } else {
                    EndPattern::Static(Arc::new(Pattern::new(
                        end_source,
                        def.case_insensitive,
                    )?))
                };
                let begin_captures = self.lower_captures(&def.begin_captures, &begin)?;
                // End capture count is only known once back-references are
                // substituted; probe with empty text for the range check.
                let end_probe = end.resolve(&[])?;
                let end_captures = self.lower_captures(&def.end_captures, &end_probe)?;
                let children = self.lower_list(&def.patterns)?;
                Rule::Region(RegionRule {
                    begin,
                    end,
                    scope: def.scope.clone(),
                    begin_captures,
                    end_captures,
                    children,
                    delegate: def.delegate.clone(),
                })
            }
            (None, None, Some(reference)) => {
                let include = match reference.strip_prefix('#') {
                    Some(entry) => {
                        if !self.def.repository.contains_key(entry) {
                            return Err(CompileError::UnknownRepositoryEntry {
                                grammar: self.def.name.clone(),
                                entry: entry.to_string(),
                            });
                        }
                        IncludeRef::Repository(entry.to_string())
                    }
                    // External grammars resolve lazily at first use.
                    None => IncludeRef::Grammar(reference.clone()),
                };
                Rule::Include(include)
            }
            _ => {
                return Err(CompileError::MalformedRule {
                    grammar: self.def.name.clone(),
                    detail: "rule must be exactly one of match, begin/end, or include"
                        .to_string(),
                });
            }
        };

        let id = RuleId(self.rules.len());
        self.rules.push(rule);
        Ok(id)
    }

    fn lower_captures(
        &mut self,
        map: &BTreeMap<String, String>,
        pattern: &Pattern,
    ) -> Result<CaptureScopes, CompileError> {
        let mut entries = Vec::new();
        for (key, scope) in map {
            let index: usize =
                key.parse()
                    .map_err(|_| CompileError::InvalidCaptureKey {
                        grammar: self.def.name.clone(),
                        key: key.clone(),
                    })?;
            if index >= pattern.capture_count() {
                self.warnings.push(CompileWarning::CaptureOutOfRange {
                    grammar: self.def.name.clone(),
                    pattern: pattern.source().to_string(),
                    index,
                    capture_count: pattern.capture_count(),
                });
                continue;
            }
            entries.push((index, scope.clone()));
        }
        Ok(CaptureScopes::new(entries))
    }
}

/// A live handle to one rule of a grammar.
#[derive(Debug, Clone)]
pub struct RuleHandle {
    pub grammar: Arc<Grammar>,
    pub id: RuleId,
}

impl RuleHandle {
    pub fn rule(&self) -> &Rule {
        self.grammar.rule(self.id)
    }

    /// Identity comparison: same rule of the same grammar instance.
    pub fn same_rule(&self, other: &RuleHandle) -> bool {
        Arc::ptr_eq(&self.grammar, &other.grammar) && self.id == other.id
    }
}

/// Expand a rule list into live handles, resolving includes by indirection.
///
/// Each repository entry and grammar top level expands at most once, so
/// cyclic and self-referential inclusion terminates. External grammar
/// references are deferred until a frame needs them; one that is still
/// absent from the catalog here is fatal.
pub(crate) fn flatten_rules(
    grammar: &Arc<Grammar>,
    ids: &[RuleId],
) -> Result<Arc<[RuleHandle]>, UnresolvedReference> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    flatten_into(grammar, ids, &mut out, &mut seen)?;
    Ok(out.into())
}

fn flatten_into(
    grammar: &Arc<Grammar>,
    ids: &[RuleId],
    out: &mut Vec<RuleHandle>,
    seen: &mut HashSet<(usize, String)>,
) -> Result<(), UnresolvedReference> {
    for &id in ids {
        match grammar.rule(id) {
            Rule::Include(IncludeRef::Repository(entry)) => {
                let key = (Arc::as_ptr(grammar) as usize, format!("#{}", entry));
                if seen.insert(key) {
                    let list = grammar.repository_list(entry).ok_or_else(|| {
                        UnresolvedReference {
                            grammar: grammar.name().to_string(),
                            reference: format!("#{}", entry),
                        }
                    })?;
                    flatten_into(grammar, list, out, seen)?;
                }
            }
            Rule::Include(IncludeRef::Grammar(name)) => {
                let target =
                    catalog::lookup(name).ok_or_else(|| UnresolvedReference {
                        grammar: grammar.name().to_string(),
                        reference: name.clone(),
                    })?;
                let key = (Arc::as_ptr(&target) as usize, String::new());
                if seen.insert(key) {
                    let top = target.top().to_vec();
                    flatten_into(&target, &top, out, seen)?;
                }
            }
            _ => out.push(RuleHandle {
                grammar: grammar.clone(),
                id,
            }),
        }
    }
    Ok(())
}
