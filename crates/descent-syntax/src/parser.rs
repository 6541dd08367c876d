//! # Parser - Backtracking Recursive Descent
//!
//! The parser walks a compiled [`Grammar`] over a token slice. It has no
//! generated code and no parse table beyond the grammar itself: every rule is
//! matched by trying its branches in declaration order, recursing into each
//! symbol, and rewinding the cursor when a branch fails.
//!
//! ## Matching a Rule
//!
//! ```text
//! terminal    -> compare with the current token, consume on match
//! epsilon     -> succeed, consume nothing
//! rule        -> lookahead says no?            fail without trying branches
//!                for each branch:
//!                    rewind to entry position
//!                    match every symbol         any failure: next branch
//!                    next token vetoed?         next branch
//!                    accept                     first success wins
//!                no branch left                 rewind, fail
//! ```
//!
//! The first branch that matches wins, even if a later one would consume more
//! input. Failure is a plain `None` that only travels up to the enclosing
//! branch loop; a failed top-level match makes [`Parser::parse`] return
//! `None` without any diagnostics.
//!
//! ## Building the Tree
//!
//! Each branch attempt builds a fresh [`Node`]. Children are appended as they
//! match, so the tree is in source order. Three kinds of match contribute
//! nothing to the parent: epsilon, a rule that matched only epsilon, and a
//! fragment rule, whose children are spliced into the parent instead. Nodes
//! of abandoned branches are dropped, nothing of a failed attempt survives.
//!
//! ## Example
//!
//! ```
//! use descent_syntax::{Grammar, GrammarDescriptor, Parser, Source, Token, EPSILON};
//!
//! const A: u32 = 10;
//! const B: u32 = 11;
//!
//! // start ::= A %frag ; %frag ::= B | ε
//! let grammar = Grammar::compile(GrammarDescriptor {
//!     rules_offset: 12,
//!     rules_names: vec!["start".into(), "%frag".into()],
//!     grammar: vec![vec![vec![A, 13]], vec![vec![B], vec![EPSILON]]],
//!     start_rule: None,
//!     vetoes: Vec::new(),
//! })
//! .unwrap();
//!
//! let source = Source::from("ab");
//! let tokens = [Token::new(A, 0, 1, &source), Token::new(B, 1, 1, &source)];
//!
//! let tree = Parser::new(&grammar, &tokens).parse().unwrap();
//! assert_eq!(tree.rule_name(), "start");
//! assert_eq!(tree.descendant_tokens(None).count(), 2);
//! assert!(tree.descendant_nodes(Some("%frag")).next().is_none());
//! ```

use std::sync::Arc;

use crate::grammar::Grammar;
use crate::node::Node;
use crate::symbol::{EPSILON, SymbolId};
use crate::token::Token;

/// A saved cursor position.
///
/// Obtained from [`Parser::checkpoint`] and handed back to
/// [`Parser::rewind`] to undo everything consumed since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint {
    position: usize,
}

impl Checkpoint {
    pub fn position(self) -> usize {
        self.position
    }
}

/// Outcome of a successful match.
#[derive(Debug)]
enum Match {
    /// Matched without consuming a token and without producing a node.
    Epsilon,
    Token(Token),
    Node(Node),
}

/// Backtracking matcher over one token stream.
///
/// Holds a shared reference to the grammar and owns nothing but its cursor,
/// so any number of parsers can use the same grammar at once.
pub struct Parser<'g, 't> {
    grammar: &'g Grammar,
    tokens: &'t [Token],
    position: usize,
}

impl<'g, 't> Parser<'g, 't> {
    pub fn new(grammar: &'g Grammar, tokens: &'t [Token]) -> Self {
        Self {
            grammar,
            tokens,
            position: 0,
        }
    }

    /// Parse from the grammar's start rule.
    ///
    /// Returns `None` if the start rule does not match. Trailing tokens are
    /// not an error; grammars that require all input to be consumed end their
    /// start rule with an end-of-input terminal, or callers check
    /// [`Parser::is_at_end`] afterwards.
    pub fn parse(&mut self) -> Option<Node> {
        let start = self.grammar.start_rule()?;
        self.parse_from(start)
    }

    /// Parse from the rule called `rule_name`.
    ///
    /// `None` if there is no such rule or it is a fragment, which has no node
    /// of its own to root a tree.
    pub fn parse_rule(&mut self, rule_name: &str) -> Option<Node> {
        let rule_id = self.grammar.rule_id(rule_name)?;
        if self.grammar.is_fragment(rule_id) {
            return None;
        }
        self.parse_from(rule_id)
    }

    fn parse_from(&mut self, rule_id: SymbolId) -> Option<Node> {
        self.position = 0;
        match self.match_rule(rule_id)? {
            Match::Node(node) => Some(node),
            // The whole input derived nothing; still a successful parse.
            Match::Epsilon => {
                let name = self.grammar.shared_rule_name(rule_id)?;
                Some(Node::new(rule_id, Arc::clone(name)))
            }
            Match::Token(_) => None,
        }
    }

    /// The grammar this parser matches against.
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn tokens(&self) -> &'t [Token] {
        self.tokens
    }

    /// Number of tokens consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.position)
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            position: self.position,
        }
    }

    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        debug_assert!(
            checkpoint.position <= self.tokens.len(),
            "Checkpoint past the end of input. Checkpoint from another parser?"
        );
        self.position = checkpoint.position;
    }

    /// Id of the next pending token, `None` at end of input.
    fn peek(&self) -> Option<SymbolId> {
        self.tokens.get(self.position).map(Token::id)
    }

    fn match_rule(&mut self, rule_id: SymbolId) -> Option<Match> {
        let grammar = self.grammar;
        if grammar.is_terminal(rule_id) {
            return self.match_terminal(rule_id);
        }

        let branches = grammar.branches(rule_id);
        let Some(rule_name) = grammar.shared_rule_name(rule_id) else {
            log::trace!("Symbol {rule_id} names no rule, treating it as a mismatch");
            return None;
        };
        if branches.is_empty() {
            return None;
        }
        if let Some(lookahead) = grammar.lookahead(rule_id) {
            if !lookahead.admits(self.peek()) {
                return None;
            }
        }

        let entry = self.checkpoint();
        'branches: for branch in branches {
            self.rewind(entry);
            let mut node = Node::new(rule_id, Arc::clone(rule_name));

            for &symbol in branch {
                match self.match_rule(symbol) {
                    None => continue 'branches,
                    Some(Match::Epsilon) => {}
                    Some(Match::Token(token)) => node.append_child(token),
                    Some(Match::Node(child)) => {
                        if grammar.is_fragment(child.rule_id()) {
                            node.merge_fragment(child);
                        } else if !child.is_empty() {
                            node.append_child(child);
                        }
                    }
                }
            }

            if self.is_vetoed(rule_id) {
                log::trace!(
                    "Rejecting matched branch of {rule_name}: vetoed by next token {:?}",
                    self.peek()
                );
                continue;
            }

            return Some(if node.is_empty() {
                Match::Epsilon
            } else {
                Match::Node(node)
            });
        }

        self.rewind(entry);
        None
    }

    fn match_terminal(&mut self, terminal: SymbolId) -> Option<Match> {
        if terminal == EPSILON {
            return Some(Match::Epsilon);
        }
        let token = self.tokens.get(self.position)?;
        if token.id() != terminal {
            return None;
        }
        self.position += 1;
        Some(Match::Token(token.clone()))
    }

    fn is_vetoed(&self, rule_id: SymbolId) -> bool {
        let vetoes = self.grammar.vetoes(rule_id);
        !vetoes.is_empty() && self.peek().is_some_and(|next| vetoes.contains(&next))
    }
}
