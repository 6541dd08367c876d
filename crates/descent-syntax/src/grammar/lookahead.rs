//! First-terminal lookahead sets.
//!
//! For a rule R the lookahead set holds every terminal that can be the first
//! token of a successful match of R, plus [`EPSILON`] if R can match without
//! consuming anything. The parser checks the set before trying any branch,
//! which throws away most doomed branches without recursing into them.
//!
//! Sets are only computed when they can be resolved from the first symbol of
//! every branch. A rule whose branches start with a rule that never resolves
//! (a cycle through first symbols, or a symbol that names no rule) gets no
//! set at all and is always tried in full.

use std::collections::{HashMap, HashSet};

use crate::symbol::{EPSILON, SymbolId};

use super::Branch;

/// Terminals that may start a match of some rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookahead {
    terminals: HashSet<SymbolId>,
}

impl Lookahead {
    pub fn contains(&self, id: SymbolId) -> bool {
        self.terminals.contains(&id)
    }

    /// Returns true if the rule can match without consuming a token.
    pub fn is_nullable(&self) -> bool {
        self.contains(EPSILON)
    }

    /// Returns true if a match may start at a token with id `next`.
    ///
    /// `None` stands for the end of input, which only nullable rules accept.
    pub fn admits(&self, next: Option<SymbolId>) -> bool {
        self.is_nullable() || next.is_some_and(|id| self.contains(id))
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    /// Members in ascending order.
    pub fn sorted(&self) -> Vec<SymbolId> {
        let mut ids: Vec<_> = self.terminals.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<SymbolId> for Lookahead {
    fn from_iter<I: IntoIterator<Item = SymbolId>>(iter: I) -> Self {
        Lookahead {
            terminals: iter.into_iter().collect(),
        }
    }
}

/// Result of the fixed point iteration.
pub(super) struct LookaheadTable {
    pub sets: HashMap<SymbolId, Lookahead>,
    pub rounds: usize,
    /// Rules still unresolved when the round cap stopped the iteration.
    pub truncated: usize,
}

/// Resolve lookahead sets until a round makes no progress.
///
/// `rules[i]` holds the branches of rule `offset + i`. Every round visits
/// the still-unresolved rules once; resolved sets never change afterwards.
/// `round_cap` bounds the number of rounds for pathological grammars.
pub(super) fn compute(
    rules: &[Vec<Branch>],
    offset: SymbolId,
    round_cap: Option<usize>,
) -> LookaheadTable {
    let mut sets: HashMap<SymbolId, Lookahead> = HashMap::with_capacity(rules.len());
    let mut pending: Vec<SymbolId> = (offset..).take(rules.len()).collect();
    let mut rounds = 0;

    while !pending.is_empty() {
        if round_cap.is_some_and(|cap| rounds >= cap) {
            break;
        }
        rounds += 1;

        let before = pending.len();
        pending.retain(|&rule_id| {
            let branches = &rules[(rule_id - offset) as usize];
            match first_terminals(branches, offset, &sets) {
                Some(set) => {
                    sets.insert(rule_id, set);
                    false
                }
                None => true,
            }
        });

        if pending.len() == before {
            // Nothing resolved this round, nothing will resolve next round.
            return LookaheadTable {
                sets,
                rounds,
                truncated: 0,
            };
        }
    }

    LookaheadTable {
        sets,
        rounds,
        truncated: pending.len(),
    }
}

/// Union of the first symbols of all branches, or `None` if any branch
/// starts with a rule that has no resolved set yet.
fn first_terminals(
    branches: &[Branch],
    offset: SymbolId,
    resolved: &HashMap<SymbolId, Lookahead>,
) -> Option<Lookahead> {
    let mut terminals = HashSet::new();
    for branch in branches {
        match branch.first() {
            // An empty branch matches nothing, same as an explicit epsilon.
            None => {
                terminals.insert(EPSILON);
            }
            Some(&symbol) if symbol < offset => {
                terminals.insert(symbol);
            }
            Some(symbol) => {
                terminals.extend(resolved.get(symbol)?.terminals.iter().copied());
            }
        }
    }
    Some(Lookahead { terminals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const OFFSET: SymbolId = 10;
    const A: SymbolId = 1;
    const B: SymbolId = 2;
    const C: SymbolId = 3;

    fn sorted(table: &LookaheadTable, rule: SymbolId) -> Option<Vec<SymbolId>> {
        table.sets.get(&rule).map(Lookahead::sorted)
    }

    #[test]
    fn terminal_first_symbols_resolve_in_one_round() {
        let rules = vec![vec![vec![A, 11], vec![B]], vec![vec![C]]];
        let table = compute(&rules, OFFSET, None);

        assert_eq!(sorted(&table, 10), Some(vec![A, B]));
        assert_eq!(sorted(&table, 11), Some(vec![C]));
        assert_eq!(table.rounds, 1);
    }

    #[test]
    fn rules_resolve_through_chains_regardless_of_declaration_order() {
        // 10 ::= 11 ; 11 ::= 12 ; 12 ::= 13 ; 13 ::= A
        let rules = vec![
            vec![vec![11]],
            vec![vec![12]],
            vec![vec![13]],
            vec![vec![A]],
        ];
        let table = compute(&rules, OFFSET, None);

        for rule in 10..14 {
            assert_eq!(sorted(&table, rule), Some(vec![A]), "rule {rule}");
        }
        assert_eq!(table.truncated, 0);
    }

    #[test]
    fn epsilon_propagates_from_nullable_first_symbol() {
        // 10 ::= 11 B ; 11 ::= A | ε
        let rules = vec![vec![vec![11, B]], vec![vec![A], vec![EPSILON]]];
        let table = compute(&rules, OFFSET, None);

        assert_eq!(sorted(&table, 11), Some(vec![EPSILON, A]));
        assert_eq!(sorted(&table, 10), Some(vec![EPSILON, A]));
        assert!(table.sets[&OFFSET].is_nullable());
    }

    #[test]
    fn empty_branch_counts_as_epsilon() {
        let rules = vec![vec![vec![A], vec![]]];
        let table = compute(&rules, OFFSET, None);
        assert_eq!(sorted(&table, 10), Some(vec![EPSILON, A]));
    }

    #[test]
    fn cycle_through_first_symbols_stays_unresolved() {
        // 10 ::= 11 | A ; 11 ::= 10 B ; 12 ::= C
        let rules = vec![vec![vec![11], vec![A]], vec![vec![10, B]], vec![vec![C]]];
        let table = compute(&rules, OFFSET, None);

        assert_eq!(sorted(&table, 10), None);
        assert_eq!(sorted(&table, 11), None);
        assert_eq!(sorted(&table, 12), Some(vec![C]));
        assert_eq!(table.truncated, 0);
    }

    #[test]
    fn dangling_first_symbol_stays_unresolved() {
        let rules = vec![vec![vec![99]]];
        let table = compute(&rules, OFFSET, None);
        assert!(table.sets.is_empty());
    }

    #[test]
    fn rule_without_branches_resolves_to_empty_set() {
        let rules: Vec<Vec<Branch>> = vec![vec![]];
        let table = compute(&rules, OFFSET, None);
        assert_eq!(sorted(&table, 10), Some(vec![]));
    }

    #[test]
    fn round_cap_truncates_iteration() {
        // 10 ::= 11 ; 11 ::= 12 ; 12 ::= A, visited in declaration order, so
        // each round only resolves rules whose dependencies precede them.
        let rules = vec![vec![vec![11]], vec![vec![12]], vec![vec![A]]];

        let table = compute(&rules, OFFSET, Some(1));
        assert_eq!(sorted(&table, 12), Some(vec![A]));
        assert_eq!(sorted(&table, 10), None);
        assert_eq!(table.truncated, 2);

        let table = compute(&rules, OFFSET, Some(0));
        assert!(table.sets.is_empty());
        assert_eq!(table.truncated, 3);
    }

    #[test]
    fn admits_checks_token_and_nullability() {
        let strict: Lookahead = [A, B].into_iter().collect();
        assert!(strict.admits(Some(A)));
        assert!(!strict.admits(Some(C)));
        assert!(!strict.admits(None));

        let nullable: Lookahead = [A, EPSILON].into_iter().collect();
        assert!(nullable.admits(Some(C)));
        assert!(nullable.admits(None));
    }
}
