use std::ops::Range;

/// A byte range `[start, end)` into the shared source.
///
/// Tokens and nodes report spans rather than copied text, so slicing the
/// source with any span reproduces the exact input it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length in bytes. Uses saturating subtraction for safety.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty (start >= end).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_and_empty() {
        assert_eq!(Span::new(3, 7).len(), 4);
        assert!(Span::new(5, 5).is_empty());
        assert!(!Span::new(0, 1).is_empty());
    }

    #[test]
    fn inverted_span_has_zero_len() {
        let span = Span { start: 9, end: 2 };
        assert_eq!(span.len(), 0);
        assert!(span.is_empty());
    }

    #[test]
    fn cover_merges_disjoint_spans() {
        let a = Span::new(2, 4);
        let b = Span::new(10, 12);
        assert_eq!(a.cover(b), Span::new(2, 12));
        assert_eq!(b.cover(a), Span::new(2, 12));
    }

    #[test]
    fn converts_from_range() {
        let span: Span = (1..6).into();
        assert_eq!(span.range(), 1..6);
    }
}
