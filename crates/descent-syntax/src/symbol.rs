//! Symbol ids shared by grammars, tokens and tree nodes.
//!
//! A grammar partitions one integer space in two: every id below its
//! `lowest_non_terminal_id` is a terminal (a token kind produced by some
//! external tokenizer), every id at or above it names a rule.

/// Terminal or rule identifier.
pub type SymbolId = u32;

/// The zero-width rule. Matches without consuming a token.
///
/// Optional and repeated constructs are expanded into plain alternatives by
/// offering this symbol as one branch, e.g. `opt ::= X | ε`.
pub const EPSILON: SymbolId = 0;

/// Rule names starting with this prefix are fragments.
pub const FRAGMENT_PREFIX: char = '%';

/// Returns true if `name` names a fragment rule.
///
/// Fragments are factored-out helper rules. The parser splices their children
/// into the enclosing node, so they never show up in a finished tree.
pub fn is_fragment_name(name: &str) -> bool {
    name.starts_with(FRAGMENT_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_names() {
        assert!(is_fragment_name("%selectTail"));
        assert!(!is_fragment_name("selectStatement"));
        assert!(!is_fragment_name("select%"));
        assert!(!is_fragment_name(""));
    }
}
