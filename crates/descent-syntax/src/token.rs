//! # Tokens - Leaves of the Parse Tree
//!
//! A [`Token`] is what an external tokenizer hands to the parser: a terminal
//! symbol id and a byte range into the input. The input itself lives once in
//! a shared [`Source`] buffer and every token keeps a cheap reference to it.
//!
//! ## Lazy Text
//!
//! Token text is never copied out of the source up front. During backtracking
//! most tokens are matched, discarded and matched again without anybody ever
//! looking at their text, so [`Token::bytes`] and [`Token::value`] slice the
//! source only when asked:
//!
//! ```
//! use descent_syntax::{Source, Token};
//!
//! let source = Source::from("SELECT 1");
//! let token = Token::new(7, 0, 6, &source);
//!
//! assert_eq!(token.bytes(), b"SELECT");
//! assert_eq!(token.value(), "SELECT");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::span::Span;
use crate::symbol::SymbolId;

/// Shared, immutable input buffer.
///
/// Cloning is a reference-count bump. Input is kept as raw bytes since the
/// engine never needs it to be valid UTF-8.
#[derive(Clone, PartialEq, Eq)]
pub struct Source(Arc<[u8]>);

impl Source {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bytes covered by `span`, or `None` if the span is out of bounds.
    pub fn slice(&self, span: Span) -> Option<&[u8]> {
        self.0.get(span.range())
    }

    /// Text covered by `span`, replacing invalid UTF-8 sequences.
    pub fn text(&self, span: Span) -> Option<Cow<'_, str>> {
        self.slice(span).map(String::from_utf8_lossy)
    }

    /// Returns true if both handles point at the same buffer.
    pub fn ptr_eq(&self, other: &Source) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Source(Arc::from(text.as_bytes()))
    }
}

impl From<String> for Source {
    fn from(text: String) -> Self {
        Source(Arc::from(text.into_bytes()))
    }
}

impl From<&[u8]> for Source {
    fn from(bytes: &[u8]) -> Self {
        Source(Arc::from(bytes))
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source(Arc::from(bytes))
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Source({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// A terminal matched against the grammar.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    id: SymbolId,
    start: usize,
    length: usize,
    source: Source,
}

impl Token {
    /// Create a token covering `length` bytes of `source` from `start`.
    ///
    /// # Panics
    ///
    /// Panics if the range does not lie inside `source`.
    pub fn new(id: SymbolId, start: usize, length: usize, source: &Source) -> Self {
        assert!(
            start
                .checked_add(length)
                .is_some_and(|end| end <= source.len()),
            "token range {start}+{length} exceeds source of {} bytes",
            source.len()
        );
        Self {
            id,
            start,
            length,
            source: source.clone(),
        }
    }

    /// Terminal symbol id.
    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Exclusive end byte offset.
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end())
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Raw bytes of this token.
    pub fn bytes(&self) -> &[u8] {
        &self.source.as_bytes()[self.start..self.end()]
    }

    /// Token text, with invalid UTF-8 replaced.
    pub fn value(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.bytes())
    }
}

// Leaves the source out: hashing it would walk the whole shared buffer.
impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.start.hash(state);
        self.length.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({}@{}..{} {:?})",
            self.id,
            self.start,
            self.end(),
            self.value()
        )
    }
}
