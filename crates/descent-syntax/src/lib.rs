//! # descent-syntax
//!
//! A grammar-table driven, backtracking recursive-descent parser. Grammars
//! are plain integer tables, compiled once at startup; token streams come
//! from whatever tokenizer the host uses.
//!
//! ## Architecture Overview
//!
//! ```text
//! GrammarDescriptor → Grammar::compile → Grammar ─┐
//!                                                 ├→ Parser::parse → Node tree
//! Source → (external tokenizer) → [Token] ────────┘
//! ```
//!
//! ### 1. Grammar ([`grammar`] module)
//!
//! A descriptor lists rule names and, for every rule, its branches as
//! sequences of symbol ids. Ids below `rules_offset` are terminals, ids from
//! `rules_offset` on are rules, and id `0` is epsilon. Compilation assigns
//! ids, marks `%`-prefixed fragment rules and precomputes for each rule the
//! set of terminals a match can start with.
//!
//! ### 2. Tokens ([`token`] module)
//!
//! A [`Token`] is a terminal id and a byte range into a shared [`Source`].
//! The text is only sliced out when somebody asks for it.
//!
//! ### 3. Parser ([`parser`] module)
//!
//! [`Parser`] tries the branches of each rule in order and keeps the first
//! that matches, rewinding the cursor after every failed attempt. Lookahead
//! sets let it skip branches that cannot start with the current token, and
//! a configurable veto table rejects matches followed by a forbidden token.
//!
//! ### 4. Tree ([`node`] module)
//!
//! The result is a [`Node`] tree in source order. Fragment rules never show
//! up in it: their children are spliced into the parent.
//!
//! ## Module Structure
//!
//! ```text
//! descent-syntax/
//! ├── lib.rs           # This file - public API and tree snapshot tests
//! ├── symbol.rs        # SymbolId, EPSILON, fragment naming
//! ├── span.rs          # Byte ranges
//! ├── token.rs         # Source buffer and Token leaves
//! ├── node.rs          # Node, NodeOrToken and tree queries
//! ├── parser.rs        # Backtracking matcher
//! └── grammar/
//!     ├── mod.rs       # Descriptor, compilation, rule tables, vetoes
//!     └── lookahead.rs # First-terminal sets, fixed point iteration
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use descent_syntax::{Grammar, GrammarDescriptor, Parser, Source, Token};
//!
//! const NUMBER: u32 = 1;
//! const PLUS: u32 = 2;
//!
//! // sum ::= NUMBER %more ; %more ::= PLUS NUMBER %more | ε
//! let descriptor: GrammarDescriptor = serde_json::from_str(r#"{
//!     "rules_offset": 3,
//!     "rules_names": ["sum", "%more"],
//!     "grammar": [ [[1, 4]], [[2, 1, 4], [0]] ]
//! }"#).unwrap();
//! let grammar = Grammar::compile(descriptor).unwrap();
//!
//! let source = Source::from("1+2");
//! let tokens = [
//!     Token::new(NUMBER, 0, 1, &source),
//!     Token::new(PLUS, 1, 1, &source),
//!     Token::new(NUMBER, 2, 1, &source),
//! ];
//!
//! let tree = Parser::new(&grammar, &tokens).parse().unwrap();
//! assert_eq!(tree.rule_name(), "sum");
//! assert_eq!(tree.children().count(), 3);
//! assert_eq!(tree.value().as_deref(), Some("1+2"));
//! ```

pub mod grammar;
pub mod node;
pub mod parser;
pub mod span;
pub mod symbol;
pub mod token;

pub use grammar::{
    Branch, CompileOptions, Grammar, GrammarDescriptor, GrammarError, Lookahead, Rule, Veto,
};
pub use node::{Descendants, Element, ElementRef, Node, NodeOrToken};
pub use parser::{Checkpoint, Parser};
pub use span::Span;
pub use symbol::{EPSILON, FRAGMENT_PREFIX, SymbolId, is_fragment_name};
pub use token::{Source, Token};
