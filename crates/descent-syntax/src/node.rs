//! # Nodes - Interior Parse Tree
//!
//! A [`Node`] is one successfully matched rule: its id, its name and the
//! ordered children the matching branch produced. Children are either nodes
//! or tokens, modelled as [`NodeOrToken`].
//!
//! ## Source Order
//!
//! Children are appended in exactly the order the parser consumed them from
//! the token stream. A pre-order walk over a tree ([`Node::descendants`])
//! therefore visits tokens in increasing byte offset, and the span of a node
//! is simply the range from its first to its last descendant token.
//!
//! ## Filters
//!
//! Query methods take an optional filter. Node queries filter on the rule
//! name, token queries on the terminal id; `None` accepts everything:
//!
//! ```ignore
//! let select = tree.first_descendant_node(Some("selectStatement"));
//! let all_idents = tree.descendant_tokens(Some(IDENTIFIER));
//! ```

use std::borrow::Cow;
use std::fmt::Write;
use std::sync::Arc;

use crate::span::Span;
use crate::symbol::SymbolId;
use crate::token::Token;

/// Either a node or a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeOrToken<N, T> {
    Node(N),
    Token(T),
}

impl<N, T> NodeOrToken<N, T> {
    pub fn as_node(&self) -> Option<&N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }

    pub fn into_node(self) -> Option<N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn into_token(self) -> Option<T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }

    pub fn as_ref(&self) -> NodeOrToken<&N, &T> {
        match self {
            NodeOrToken::Node(node) => NodeOrToken::Node(node),
            NodeOrToken::Token(token) => NodeOrToken::Token(token),
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, NodeOrToken::Node(_))
    }

    pub fn is_token(&self) -> bool {
        matches!(self, NodeOrToken::Token(_))
    }
}

/// An owned child of a [`Node`].
pub type Element = NodeOrToken<Node, Token>;

/// A borrowed child or descendant of a [`Node`].
pub type ElementRef<'a> = NodeOrToken<&'a Node, &'a Token>;

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        NodeOrToken::Node(node)
    }
}

impl From<Token> for Element {
    fn from(token: Token) -> Self {
        NodeOrToken::Token(token)
    }
}

/// A matched rule and the children its branch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    rule_id: SymbolId,
    rule_name: Arc<str>,
    children: Vec<Element>,
}

impl Node {
    pub fn new(rule_id: SymbolId, rule_name: impl Into<Arc<str>>) -> Self {
        Self {
            rule_id,
            rule_name: rule_name.into(),
            children: Vec::new(),
        }
    }

    pub fn rule_id(&self) -> SymbolId {
        self.rule_id
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Returns true if the node has no children at all.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn append_child(&mut self, child: impl Into<Element>) {
        self.children.push(child.into());
    }

    /// Splice the children of `fragment` onto the end of this node's children.
    ///
    /// This is how fragment rules disappear from the tree: the fragment node
    /// itself is dropped and only what it matched remains, in order.
    pub fn merge_fragment(&mut self, fragment: Node) {
        self.children.extend(fragment.children);
    }

    // Shallow queries

    pub fn has_child(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn has_child_node(&self, rule_name: Option<&str>) -> bool {
        self.first_child_node(rule_name).is_some()
    }

    pub fn has_child_token(&self, token_id: Option<SymbolId>) -> bool {
        self.first_child_token(token_id).is_some()
    }

    pub fn first_child(&self) -> Option<ElementRef<'_>> {
        self.children.first().map(Element::as_ref)
    }

    pub fn first_child_node(&self, rule_name: Option<&str>) -> Option<&Node> {
        self.children
            .iter()
            .filter_map(Element::as_node)
            .find(|node| node_matches(node, rule_name))
    }

    pub fn first_child_token(&self, token_id: Option<SymbolId>) -> Option<&Token> {
        self.child_tokens(token_id).next()
    }

    pub fn children(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.children.iter().map(Element::as_ref)
    }

    /// Direct child nodes, optionally only those of rule `rule_name`.
    pub fn child_nodes<'a>(&'a self, rule_name: Option<&'a str>) -> impl Iterator<Item = &'a Node> {
        self.children
            .iter()
            .filter_map(Element::as_node)
            .filter(move |node| node_matches(node, rule_name))
    }

    /// Direct child tokens, optionally only those with id `token_id`.
    pub fn child_tokens(&self, token_id: Option<SymbolId>) -> impl Iterator<Item = &Token> {
        self.children
            .iter()
            .filter_map(Element::as_token)
            .filter(move |token| token_matches(token, token_id))
    }

    // Deep queries

    /// All nodes and tokens below this node, depth-first pre-order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    pub fn descendant_nodes<'a>(
        &'a self,
        rule_name: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Node> {
        self.descendants()
            .filter_map(|element| match element {
                NodeOrToken::Node(node) => Some(node),
                NodeOrToken::Token(_) => None,
            })
            .filter(move |node| node_matches(node, rule_name))
    }

    pub fn descendant_tokens(&self, token_id: Option<SymbolId>) -> impl Iterator<Item = &Token> {
        self.descendants()
            .filter_map(|element| match element {
                NodeOrToken::Node(_) => None,
                NodeOrToken::Token(token) => Some(token),
            })
            .filter(move |token| token_matches(token, token_id))
    }

    pub fn first_descendant_node(&self, rule_name: Option<&str>) -> Option<&Node> {
        self.descendants()
            .filter_map(NodeOrToken::into_node)
            .find(|node| node_matches(node, rule_name))
    }

    pub fn first_descendant_token(&self, token_id: Option<SymbolId>) -> Option<&Token> {
        self.descendant_tokens(token_id).next()
    }

    // Spans

    /// Start byte offset of the first descendant token.
    ///
    /// `None` if the node covers no tokens, which can only happen for nodes
    /// built by hand since the parser never returns an empty node below the
    /// root.
    pub fn start(&self) -> Option<usize> {
        self.first_token().map(Token::start)
    }

    /// Byte length from the first to the end of the last descendant token.
    pub fn length(&self) -> Option<usize> {
        self.span().map(Span::len)
    }

    pub fn span(&self) -> Option<Span> {
        let first = self.first_token()?;
        let last = self.last_token()?;
        Some(first.span().cover(last.span()))
    }

    /// Source text covered by this node, including any bytes between tokens.
    pub fn value(&self) -> Option<Cow<'_, str>> {
        let span = self.span()?;
        self.first_token()?.source().text(span)
    }

    fn first_token(&self) -> Option<&Token> {
        self.children.iter().find_map(|child| match child {
            NodeOrToken::Node(node) => node.first_token(),
            NodeOrToken::Token(token) => Some(token),
        })
    }

    fn last_token(&self) -> Option<&Token> {
        self.children.iter().rev().find_map(|child| match child {
            NodeOrToken::Node(node) => node.last_token(),
            NodeOrToken::Token(token) => Some(token),
        })
    }

    /// Render the tree, one element per line, indented by depth.
    ///
    /// Nodes print their rule name, tokens print `id@start..end "text"`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = writeln!(out, "{indent}{}", self.rule_name);
        for child in &self.children {
            match child {
                NodeOrToken::Node(node) => node.dump_into(out, depth + 1),
                NodeOrToken::Token(token) => {
                    let _ = writeln!(
                        out,
                        "{indent}  {}@{}..{} {:?}",
                        token.id(),
                        token.start(),
                        token.end(),
                        token.value()
                    );
                }
            }
        }
    }
}

fn node_matches(node: &Node, rule_name: Option<&str>) -> bool {
    rule_name.is_none_or(|name| node.rule_name() == name)
}

fn token_matches(token: &Token, token_id: Option<SymbolId>) -> bool {
    token_id.is_none_or(|id| token.id() == id)
}

/// Pre-order iterator over everything below a node.
///
/// Keeps one child iterator per open level instead of recursing, so deep
/// trees don't grow the call stack while being walked.
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Element>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = ElementRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(child) => {
                    if let NodeOrToken::Node(node) = child {
                        self.stack.push(node.children.iter());
                    }
                    return Some(child.as_ref());
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
