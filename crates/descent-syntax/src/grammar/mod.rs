//! # Grammar - Compiled Rule Tables
//!
//! Grammars arrive as a compact integer-encoded [`GrammarDescriptor`]:
//!
//! ```text
//! rules_offset: 12
//! rules_names:  ["start", "%frag"]
//! grammar:      [ [[10, 13]],          // start ::= A %frag
//!                 [[11], [0]] ]        // %frag ::= B | ε
//! ```
//!
//! Rule `i` of the descriptor gets id `rules_offset + i`; ids below the offset
//! are terminals. [`Grammar::compile`] turns this into name/id maps, the
//! fragment set, the negative-lookahead veto table and the first-terminal
//! [`Lookahead`] table the parser uses for pruning.
//!
//! Branches are stored verbatim. Compilation does not check that the symbols
//! a branch references exist, that the grammar is free of left recursion, or
//! anything else about its well-formedness; a reference to a missing rule
//! simply never matches. [`Grammar::dangling_symbols`] is available for
//! callers that want to audit a grammar explicitly.
//!
//! A compiled grammar is immutable and can be shared between any number of
//! parsers, including parsers on other threads.

mod lookahead;

pub use lookahead::Lookahead;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::symbol::{EPSILON, SymbolId, is_fragment_name};

/// One alternative of a rule: an ordered sequence of symbols.
pub type Branch = Vec<SymbolId>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Grammar declares {names} rule names but {bodies} rule bodies")]
    LengthMismatch { names: usize, bodies: usize },

    #[error("Rules offset must be above the epsilon symbol 0")]
    OffsetCollidesWithEpsilon,

    #[error("Rule ids starting at {offset} overflow the symbol id space")]
    IdSpaceOverflow { offset: SymbolId },

    #[error("Rule {name:?} is declared more than once")]
    DuplicateRule { name: String },

    #[error("Veto refers to unknown rule {rule:?}")]
    UnknownVetoRule { rule: String },

    #[error("Start rule {rule:?} is not declared")]
    UnknownStartRule { rule: String },

    #[error("Start rule {rule:?} is a fragment and cannot be the root of a tree")]
    FragmentStartRule { rule: String },
}

/// The serialized form of a grammar.
///
/// `rules_names` and `grammar` are aligned by index. Fragment rule names
/// carry a leading `%`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarDescriptor {
    pub rules_offset: SymbolId,
    pub rules_names: Vec<String>,
    pub grammar: Vec<Vec<Branch>>,

    /// Rule `parse()` starts from. Defaults to the first declared rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_rule: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vetoes: Vec<Veto>,
}

/// Negative lookahead: a branch of `rule` that matched is rejected if the
/// next pending token has id `token`.
///
/// The grammar format has no right-context construct, so constraints like
/// "a bare select statement must not be followed by `INTO`" are expressed
/// here instead of in the rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Veto {
    pub rule: String,
    pub token: SymbolId,
}

impl Veto {
    pub fn new(rule: impl Into<String>, token: SymbolId) -> Self {
        Self {
            rule: rule.into(),
            token,
        }
    }
}

/// Knobs for [`Grammar::compile_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Upper bound on lookahead iteration rounds. `None` iterates until a
    /// round resolves nothing new.
    pub lookahead_round_cap: Option<usize>,
}

/// A compiled, read-only grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    lowest_non_terminal_id: SymbolId,
    names: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, SymbolId>,
    rules: Vec<Vec<Branch>>,
    fragments: HashSet<SymbolId>,
    lookahead: HashMap<SymbolId, Lookahead>,
    vetoes: HashMap<SymbolId, Vec<SymbolId>>,
    start_rule: Option<SymbolId>,
}

/// Borrowed view of one rule, see [`Grammar::rules`].
#[derive(Debug, Clone, Copy)]
pub struct Rule<'g> {
    pub id: SymbolId,
    pub name: &'g str,
    pub branches: &'g [Branch],
    pub is_fragment: bool,
}

impl Grammar {
    pub fn compile(descriptor: GrammarDescriptor) -> Result<Self, GrammarError> {
        Self::compile_with(descriptor, &CompileOptions::default())
    }

    pub fn compile_with(
        descriptor: GrammarDescriptor,
        options: &CompileOptions,
    ) -> Result<Self, GrammarError> {
        let GrammarDescriptor {
            rules_offset,
            rules_names,
            grammar: rules,
            start_rule,
            vetoes: veto_list,
        } = descriptor;

        if rules_names.len() != rules.len() {
            return Err(GrammarError::LengthMismatch {
                names: rules_names.len(),
                bodies: rules.len(),
            });
        }
        if rules_offset == EPSILON {
            return Err(GrammarError::OffsetCollidesWithEpsilon);
        }
        if SymbolId::try_from(rules.len())
            .ok()
            .and_then(|count| rules_offset.checked_add(count))
            .is_none()
        {
            return Err(GrammarError::IdSpaceOverflow {
                offset: rules_offset,
            });
        }

        let mut names = Vec::with_capacity(rules_names.len());
        let mut ids = HashMap::with_capacity(rules_names.len());
        let mut fragments = HashSet::new();
        for (name, rule_id) in rules_names.into_iter().zip(rules_offset..) {
            let name: Arc<str> = name.into();
            if ids.insert(Arc::clone(&name), rule_id).is_some() {
                return Err(GrammarError::DuplicateRule {
                    name: name.to_string(),
                });
            }
            if is_fragment_name(&name) {
                fragments.insert(rule_id);
            }
            names.push(name);
        }

        let mut vetoes: HashMap<SymbolId, Vec<SymbolId>> = HashMap::new();
        for Veto { rule, token } in veto_list {
            let Some(&rule_id) = ids.get(rule.as_str()) else {
                return Err(GrammarError::UnknownVetoRule { rule });
            };
            let tokens = vetoes.entry(rule_id).or_default();
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }

        let start_rule = match start_rule {
            Some(rule) => match ids.get(rule.as_str()) {
                Some(&rule_id) => Some(rule_id),
                None => return Err(GrammarError::UnknownStartRule { rule }),
            },
            None if names.is_empty() => None,
            None => Some(rules_offset),
        };
        if let Some(rule_id) = start_rule.filter(|id| fragments.contains(id)) {
            let rule = names[(rule_id - rules_offset) as usize].to_string();
            return Err(GrammarError::FragmentStartRule { rule });
        }

        let table = lookahead::compute(&rules, rules_offset, options.lookahead_round_cap);
        if table.truncated > 0 {
            log::warn!(
                "Lookahead iteration stopped after {} rounds with {} rules unresolved",
                table.rounds,
                table.truncated
            );
        }
        log::debug!(
            "Compiled grammar: {} rules ({} fragments), {} lookahead sets in {} rounds",
            names.len(),
            fragments.len(),
            table.sets.len(),
            table.rounds
        );

        Ok(Grammar {
            lowest_non_terminal_id: rules_offset,
            names,
            ids,
            rules,
            fragments,
            lookahead: table.sets,
            vetoes,
            start_rule,
        })
    }

    /// First rule id. Everything below is a terminal.
    pub fn lowest_non_terminal_id(&self) -> SymbolId {
        self.lowest_non_terminal_id
    }

    pub fn highest_terminal_id(&self) -> SymbolId {
        self.lowest_non_terminal_id - 1
    }

    pub fn is_terminal(&self, id: SymbolId) -> bool {
        id < self.lowest_non_terminal_id
    }

    pub fn is_fragment(&self, id: SymbolId) -> bool {
        self.fragments.contains(&id)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_id(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    pub fn rule_name(&self, id: SymbolId) -> Option<&str> {
        self.shared_rule_name(id).map(|name| &**name)
    }

    pub(crate) fn shared_rule_name(&self, id: SymbolId) -> Option<&Arc<str>> {
        self.rule_index(id).map(|index| &self.names[index])
    }

    /// Branches of rule `id`, empty for terminals and unknown ids.
    pub fn branches(&self, id: SymbolId) -> &[Branch] {
        self.rule_index(id)
            .map(|index| self.rules[index].as_slice())
            .unwrap_or(&[])
    }

    /// Precomputed first terminals of rule `id`, if they could be resolved.
    pub fn lookahead(&self, id: SymbolId) -> Option<&Lookahead> {
        self.lookahead.get(&id)
    }

    /// Token ids that reject a completed branch of rule `id`.
    pub fn vetoes(&self, id: SymbolId) -> &[SymbolId] {
        self.vetoes.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn start_rule(&self) -> Option<SymbolId> {
        self.start_rule
    }

    pub fn rules(&self) -> impl Iterator<Item = Rule<'_>> {
        self.names
            .iter()
            .zip(&self.rules)
            .zip(self.lowest_non_terminal_id..)
            .map(|((name, branches), id)| Rule {
                id,
                name: &**name,
                branches,
                is_fragment: self.fragments.contains(&id),
            })
    }

    /// `(rule, symbol)` pairs where a branch of `rule` references a symbol in
    /// the rule id range that names no rule.
    pub fn dangling_symbols(&self) -> Vec<(SymbolId, SymbolId)> {
        self.rules()
            .flat_map(|rule| {
                rule.branches
                    .iter()
                    .flatten()
                    .filter(|&&symbol| {
                        !self.is_terminal(symbol) && self.rule_index(symbol).is_none()
                    })
                    .map(move |&symbol| (rule.id, symbol))
            })
            .collect()
    }

    fn rule_index(&self, id: SymbolId) -> Option<usize> {
        let index = id.checked_sub(self.lowest_non_terminal_id)? as usize;
        (index < self.rules.len()).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const A: SymbolId = 10;
    const B: SymbolId = 11;
    const START: SymbolId = 12;
    const FRAG: SymbolId = 13;

    fn fragment_descriptor() -> GrammarDescriptor {
        GrammarDescriptor {
            rules_offset: 12,
            rules_names: vec!["start".into(), "%frag".into()],
            grammar: vec![vec![vec![A, FRAG]], vec![vec![B], vec![EPSILON]]],
            start_rule: None,
            vetoes: Vec::new(),
        }
    }

    #[test]
    fn assigns_ids_from_offset() {
        let grammar = Grammar::compile(fragment_descriptor()).unwrap();

        assert_eq!(grammar.rule_id("start"), Some(START));
        assert_eq!(grammar.rule_id("%frag"), Some(FRAG));
        assert_eq!(grammar.rule_id("missing"), None);
        assert_eq!(grammar.rule_name(START), Some("start"));
        assert_eq!(grammar.rule_name(FRAG), Some("%frag"));
        assert_eq!(grammar.rule_name(A), None);
        assert_eq!(grammar.rule_name(99), None);
        assert_eq!(grammar.rule_count(), 2);
    }

    #[test]
    fn terminal_boundary() {
        let grammar = Grammar::compile(fragment_descriptor()).unwrap();

        assert_eq!(grammar.lowest_non_terminal_id(), 12);
        assert_eq!(grammar.highest_terminal_id(), 11);
        assert!(grammar.is_terminal(EPSILON));
        assert!(grammar.is_terminal(B));
        assert!(!grammar.is_terminal(START));
    }

    #[test]
    fn marks_fragments_by_prefix() {
        let grammar = Grammar::compile(fragment_descriptor()).unwrap();
        assert!(grammar.is_fragment(FRAG));
        assert!(!grammar.is_fragment(START));

        let fragments: Vec<_> = grammar
            .rules()
            .filter(|rule| rule.is_fragment)
            .map(|rule| rule.name)
            .collect();
        assert_eq!(fragments, ["%frag"]);
    }

    #[test]
    fn stores_branches_verbatim() {
        let grammar = Grammar::compile(fragment_descriptor()).unwrap();
        assert_eq!(grammar.branches(FRAG), &[vec![B], vec![EPSILON]]);
        assert!(grammar.branches(A).is_empty());
        assert!(grammar.branches(500).is_empty());
    }

    #[test]
    fn computes_lookahead() {
        let grammar = Grammar::compile(fragment_descriptor()).unwrap();
        assert_eq!(grammar.lookahead(START).map(Lookahead::sorted), Some(vec![A]));
        assert_eq!(
            grammar.lookahead(FRAG).map(Lookahead::sorted),
            Some(vec![EPSILON, B])
        );
    }

    #[test]
    fn compiling_twice_is_idempotent() {
        let first = Grammar::compile(fragment_descriptor()).unwrap();
        let second = Grammar::compile(fragment_descriptor()).unwrap();

        assert_eq!(first.ids, second.ids);
        assert_eq!(first.names, second.names);
        assert_eq!(first.fragments, second.fragments);
        assert_eq!(first.lookahead, second.lookahead);
        assert_eq!(first.lowest_non_terminal_id, second.lowest_non_terminal_id);
    }

    #[test]
    fn start_rule_defaults_to_first_rule() {
        let grammar = Grammar::compile(fragment_descriptor()).unwrap();
        assert_eq!(grammar.start_rule(), Some(START));
    }

    #[test]
    fn empty_grammar_has_no_start_rule() {
        let descriptor = GrammarDescriptor {
            rules_offset: 5,
            rules_names: Vec::new(),
            grammar: Vec::new(),
            start_rule: None,
            vetoes: Vec::new(),
        };
        let grammar = Grammar::compile(descriptor).unwrap();
        assert_eq!(grammar.start_rule(), None);
        assert_eq!(grammar.rules().count(), 0);
    }

    #[test]
    fn vetoes_resolve_rule_names() {
        let mut descriptor = fragment_descriptor();
        descriptor.vetoes = vec![
            Veto::new("start", B),
            Veto::new("start", B),
            Veto::new("start", A),
        ];
        let grammar = Grammar::compile(descriptor).unwrap();

        assert_eq!(grammar.vetoes(START), &[B, A]);
        assert!(grammar.vetoes(FRAG).is_empty());
    }

    #[rstest]
    #[case::length_mismatch(
        |d: &mut GrammarDescriptor| { d.grammar.pop(); },
        GrammarError::LengthMismatch { names: 2, bodies: 1 }
    )]
    #[case::zero_offset(
        |d: &mut GrammarDescriptor| d.rules_offset = 0,
        GrammarError::OffsetCollidesWithEpsilon
    )]
    #[case::overflow(
        |d: &mut GrammarDescriptor| d.rules_offset = SymbolId::MAX,
        GrammarError::IdSpaceOverflow { offset: SymbolId::MAX }
    )]
    #[case::duplicate(
        |d: &mut GrammarDescriptor| d.rules_names[1] = "start".into(),
        GrammarError::DuplicateRule { name: "start".into() }
    )]
    #[case::unknown_veto_rule(
        |d: &mut GrammarDescriptor| d.vetoes.push(Veto::new("nope", A)),
        GrammarError::UnknownVetoRule { rule: "nope".into() }
    )]
    #[case::unknown_start_rule(
        |d: &mut GrammarDescriptor| d.start_rule = Some("nope".into()),
        GrammarError::UnknownStartRule { rule: "nope".into() }
    )]
    #[case::fragment_start_rule(
        |d: &mut GrammarDescriptor| d.start_rule = Some("%frag".into()),
        GrammarError::FragmentStartRule { rule: "%frag".into() }
    )]
    #[case::fragment_declared_first(
        |d: &mut GrammarDescriptor| d.rules_names.swap(0, 1),
        GrammarError::FragmentStartRule { rule: "%frag".into() }
    )]
    fn rejects_unbuildable_descriptors(
        #[case] corrupt: fn(&mut GrammarDescriptor),
        #[case] expected: GrammarError,
    ) {
        let mut descriptor = fragment_descriptor();
        corrupt(&mut descriptor);
        assert_eq!(Grammar::compile(descriptor).unwrap_err(), expected);
    }

    #[test]
    fn dangling_symbols_are_reported_not_rejected() {
        let mut descriptor = fragment_descriptor();
        descriptor.grammar[0].push(vec![A, 40]);
        let grammar = Grammar::compile(descriptor).unwrap();

        assert_eq!(grammar.dangling_symbols(), vec![(START, 40)]);
        assert!(Grammar::compile(fragment_descriptor())
            .unwrap()
            .dangling_symbols()
            .is_empty());
    }

    #[test]
    fn round_cap_of_zero_disables_lookahead() {
        let options = CompileOptions {
            lookahead_round_cap: Some(0),
        };
        let grammar = Grammar::compile_with(fragment_descriptor(), &options).unwrap();
        assert!(grammar.lookahead(START).is_none());
        assert!(grammar.lookahead(FRAG).is_none());
    }

    #[test]
    fn descriptor_deserializes_with_optional_fields() {
        let json = r#"{
            "rules_offset": 12,
            "rules_names": ["start", "%frag"],
            "grammar": [[[10, 13]], [[11], [0]]]
        }"#;
        let descriptor: GrammarDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor, fragment_descriptor());
    }

    #[test]
    fn grammar_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Grammar>();
    }
}
