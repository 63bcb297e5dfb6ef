//! Rewrites a deterministic Rabin automaton into an equivalent min-even
//! parity automaton over the same structure, when one exists.
//!
//! The construction recurses over nested component decompositions: states
//! that cannot satisfy any pair infinitely often get a fixed odd level, and
//! inside each component a pair with an unvisited Fin set is peeled off into
//! two fresh levels. The rewrite fails (returns `None`) exactly when some
//! component has no such pair; the language may still be parity-recognizable
//! on a different structure.

use std::collections::HashMap;

use log::debug;

use crate::acceptance::{split_on_pair, Acceptance, Parity, RabinPair};
use crate::automaton::{assignment_cube, SymbolicAutomaton};
use crate::bitset::BitSet;
use crate::error::SynthesisError;
use crate::reference::Ref;
use crate::scc::SccDecomposition;
use crate::vars::{bdd_var, VarKind};

pub struct RabinToParity<'a> {
    automaton: &'a SymbolicAutomaton,
    pairs: Vec<RabinPair>,
}

impl<'a> RabinToParity<'a> {
    pub fn new(automaton: &'a SymbolicAutomaton) -> Result<Self, SynthesisError> {
        if !automaton.properties().deterministic {
            return Err(SynthesisError::NotDeterministic);
        }
        let pairs = automaton.acceptance().rabin_pairs()?;
        Ok(Self { automaton, pairs })
    }

    /// The parity automaton, or `None` if this structure admits no
    /// equivalent parity condition.
    pub fn try_to_parity(&self) -> Option<SymbolicAutomaton> {
        let levels = self.parity_sets(self.automaton.reachable_states(), &self.pairs)?;
        Some(self.with_parity_levels(levels))
    }

    /// Configurations whose incoming transition carries at least one of the
    /// given acceptance colours.
    fn colours(&self, colours: &BitSet) -> Ref {
        let bdd = self.automaton.bdd();
        bdd.apply_or_many(
            colours
                .iter()
                .map(|c| bdd.mk_var(self.automaton.colour_variable(c))),
        )
    }

    /// Configurations in `restricted_to` from which no pair can be
    /// satisfied infinitely often.
    fn hopeless_states(&self, restricted_to: Ref, pairs: &[RabinPair]) -> Ref {
        let bdd = self.automaton.bdd();
        let decomposition = SccDecomposition::of(self.automaton);

        let mut hopeless = restricted_to;
        for pair in pairs {
            let fin = self.colours(&pair.fin);
            let inf = self.colours(&pair.inf);

            let sccs = decomposition.sccs(bdd.apply_and(restricted_to, -fin));
            let mut hopeless_for_pair = fin;
            for &scc in &sccs {
                if decomposition.is_trivial(scc) || bdd.is_zero(bdd.apply_and(scc, inf)) {
                    hopeless_for_pair = bdd.apply_or(hopeless_for_pair, scc);
                }
            }
            hopeless = bdd.apply_and(hopeless, hopeless_for_pair);
        }
        hopeless
    }

    /// Level sets for `restricted_to`, lowest level first.
    fn parity_sets(&self, restricted_to: Ref, pairs: &[RabinPair]) -> Option<Vec<Ref>> {
        let bdd = self.automaton.bdd();

        let hopeless = self.hopeless_states(restricted_to, pairs);
        debug_assert!(bdd.is_implies(hopeless, restricted_to));

        let sccs = SccDecomposition::of(self.automaton)
            .sccs(bdd.apply_and(restricted_to, -hopeless));
        let mut scc_sets = Vec::with_capacity(sccs.len());
        for &scc in &sccs {
            scc_sets.push(self.parity_sets_for_scc(scc, pairs)?);
        }

        let mut sets = vec![bdd.zero, hopeless];
        sets.extend(merge_parity_sets(self.automaton, scc_sets));
        Some(sets)
    }

    /// Level sets for a component free of hopeless configurations.
    fn parity_sets_for_scc(&self, scc: Ref, pairs: &[RabinPair]) -> Option<Vec<Ref>> {
        let bdd = self.automaton.bdd();

        if pairs.len() == 1 {
            return Some(self.single_pair_to_parity(scc, &pairs[0]));
        }

        // A pair whose Fin colours never occur here can be peeled off; if
        // there is none, no equivalent parity condition exists.
        let chosen = pairs
            .iter()
            .find(|pair| bdd.is_zero(bdd.apply_and(scc, self.colours(&pair.fin))))?
            .clone();

        let new_pairs = split_on_pair(pairs, &chosen);
        let hopeless = self.hopeless_states(scc, &new_pairs);
        debug_assert!(bdd.is_implies(hopeless, scc));

        let sccs =
            SccDecomposition::of(self.automaton).sccs(bdd.apply_and(scc, -hopeless));
        let mut scc_sets = Vec::with_capacity(sccs.len());
        for &inner in &sccs {
            debug_assert!(bdd.is_implies(inner, scc));
            scc_sets.push(self.parity_sets_for_scc(inner, &new_pairs)?);
        }

        let inf = self.colours(&chosen.inf);
        let mut sets = vec![
            bdd.apply_and(inf, scc),
            bdd.apply_and_many([-inf, hopeless, scc]),
        ];
        sets.extend(merge_parity_sets(self.automaton, scc_sets));
        Some(sets)
    }

    /// Base case: one pair yields at most four levels.
    fn single_pair_to_parity(&self, restricted_to: Ref, pair: &RabinPair) -> Vec<Ref> {
        let bdd = self.automaton.bdd();
        let fin = self.colours(&pair.fin);
        let inf = self.colours(&pair.inf);
        vec![
            bdd.zero,
            bdd.apply_and(fin, restricted_to),
            bdd.apply_and_many([inf, -fin, restricted_to]),
            bdd.apply_and_many([-fin, -inf, restricted_to]),
        ]
    }

    /// Attaches one fresh one-hot colour per level to every transition,
    /// selected by the level of the transition's successor.
    fn with_parity_levels(&self, levels: Vec<Ref>) -> SymbolicAutomaton {
        let bdd = self.automaton.bdd();
        let allocation = self.automaton.allocation();

        // Every reachable configuration sits on exactly one level.
        debug_assert_eq!(
            bdd.apply_or_many(levels.iter().copied()),
            self.automaton.reachable_states()
        );
        debug_assert!(levels
            .iter()
            .enumerate()
            .all(|(i, &a)| levels[..i].iter().all(|&b| bdd.is_zero(bdd.apply_and(a, b)))));

        let colours_needed = levels.len();
        let offset = allocation.num_variables();
        let extended = allocation.extend_with_colours(colours_needed);
        let parity_colour_globals: BitSet = (offset..offset + colours_needed).collect();

        let state_to_successor: HashMap<u32, u32> = (0..allocation
            .variables(&[VarKind::State])
            .len())
            .map(|local| {
                (
                    bdd_var(allocation.local_to_global(local, VarKind::State)),
                    bdd_var(allocation.local_to_global(local, VarKind::SuccessorState)),
                )
            })
            .collect();

        let mut parity_colours = bdd.zero;
        for (i, &level) in levels.iter().enumerate() {
            let one_hot = assignment_cube(
                bdd,
                &[offset + i].into_iter().collect(),
                &parity_colour_globals,
            );
            let successor_level = bdd.relabel(level, &state_to_successor);
            parity_colours =
                bdd.apply_or(parity_colours, bdd.apply_and(one_hot, successor_level));
        }

        debug!(
            "parity transform: {} levels, {} -> {} variables",
            colours_needed,
            allocation.num_variables(),
            extended.num_variables()
        );

        SymbolicAutomaton::new(
            self.automaton.bdd().clone(),
            self.automaton.atomic_propositions().to_vec(),
            self.automaton.initial_states(),
            bdd.apply_and(self.automaton.transition_relation(), parity_colours),
            Acceptance::Parity {
                parity: Parity::MinEven,
                sets: colours_needed,
            },
            extended,
            self.automaton.properties(),
            allocation.variables(&[VarKind::Colour]).len(),
        )
    }
}

/// Index-wise union of per-component level lists. Components are pairwise
/// disjoint, so the union keeps every level intact.
fn merge_parity_sets(automaton: &SymbolicAutomaton, scc_sets: Vec<Vec<Ref>>) -> Vec<Ref> {
    let bdd = automaton.bdd();
    let max_len = scc_sets.iter().map(Vec::len).max().unwrap_or(0);
    (0..max_len)
        .map(|i| bdd.apply_or_many(scc_sets.iter().filter_map(|sets| sets.get(i).copied())))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::acceptance::Formula;
    use crate::bdd::Bdd;
    use crate::explicit::{Edge, EdgeTree, TableAutomaton};
    use crate::solver::{solve, Winner};

    /// One state; colour 0 on `a` transitions, colour 1 on `¬a`.
    fn single_pair_dra() -> SymbolicAutomaton {
        let automaton = TableAutomaton::new(
            vec!["a".to_string()],
            vec![0],
            vec![EdgeTree::node(
                0,
                EdgeTree::leaf([Edge::new(0, [1])]),
                EdgeTree::leaf([Edge::new(0, [0])]),
            )],
            Acceptance::EmersonLei {
                formula: Formula::rabin([(1, 0)]),
                sets: 2,
            },
        );
        SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &automaton)
    }

    #[test]
    fn test_single_pair_scc_levels() {
        let dra = single_pair_dra();
        let bdd = dra.bdd().clone();
        let construction = RabinToParity::new(&dra).unwrap();

        let restriction = dra.reachable_states();
        let levels =
            construction.single_pair_to_parity(restriction, &construction.pairs[0]);

        assert_eq!(levels.len(), 4);
        assert!(bdd.is_zero(levels[0]));
        // The four levels partition the restriction.
        assert_eq!(bdd.apply_or_many(levels.iter().copied()), restriction);
        for (i, &a) in levels.iter().enumerate() {
            for &b in &levels[..i] {
                assert!(bdd.is_zero(bdd.apply_and(a, b)));
            }
        }
    }

    #[test]
    fn test_to_parity_shape() {
        let dra = single_pair_dra();
        let bdd = dra.bdd().clone();
        let dpa = RabinToParity::new(&dra).unwrap().try_to_parity().unwrap();

        let sets = match dpa.acceptance() {
            Acceptance::Parity {
                parity: Parity::MinEven,
                sets,
            } => *sets,
            other => panic!("expected min-even parity, got {other:?}"),
        };
        assert_eq!(dpa.colour_offset(), 2);
        assert_eq!(
            dpa.allocation().variables(&[VarKind::Colour]).len(),
            2 + sets
        );
        assert_eq!(dpa.properties(), dra.properties());
        assert_eq!(dpa.initial_states(), dra.initial_states());

        // Exactly one parity colour per transition.
        let relation = dpa.transition_relation();
        let mut any = bdd.zero;
        for i in 0..sets {
            let colour_i = bdd.mk_var(dpa.colour_variable(i));
            any = bdd.apply_or(any, colour_i);
            for j in 0..i {
                let colour_j = bdd.mk_var(dpa.colour_variable(j));
                assert!(bdd.is_zero(bdd.apply_and_many([relation, colour_i, colour_j])));
            }
        }
        assert!(bdd.is_implies(relation, any));
    }

    #[test]
    fn test_idempotent() {
        let dra = single_pair_dra();
        let construction = RabinToParity::new(&dra).unwrap();
        let first = construction.try_to_parity().unwrap();
        let second = construction.try_to_parity().unwrap();
        assert_eq!(first.transition_relation(), second.transition_relation());
        assert_eq!(first.initial_states(), second.initial_states());
    }

    /// Two interleaved pairs on one component, neither Fin set avoidable.
    fn parity_incompatible_dra() -> SymbolicAutomaton {
        let automaton = TableAutomaton::new(
            vec!["a".to_string()],
            vec![0],
            vec![EdgeTree::node(
                0,
                EdgeTree::leaf([Edge::new(0, [2, 1])]),
                EdgeTree::leaf([Edge::new(0, [0, 3])]),
            )],
            Acceptance::EmersonLei {
                formula: Formula::rabin([(0, 1), (2, 3)]),
                sets: 4,
            },
        );
        SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &automaton)
    }

    #[test]
    fn test_structural_impossibility() {
        let dra = parity_incompatible_dra();
        let construction = RabinToParity::new(&dra).unwrap();
        assert!(construction.try_to_parity().is_none());
    }

    /// One state, two pairs; neither Fin colour ever occurs, so each pair
    /// can be peeled off in turn.
    fn two_pair_dra() -> SymbolicAutomaton {
        let automaton = TableAutomaton::new(
            vec!["a".to_string()],
            vec![0],
            vec![EdgeTree::node(
                0,
                EdgeTree::leaf([Edge::new(0, [3])]),
                EdgeTree::leaf([Edge::new(0, [1])]),
            )],
            Acceptance::EmersonLei {
                formula: Formula::rabin([(0, 1), (2, 3)]),
                sets: 4,
            },
        );
        SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &automaton)
    }

    #[test]
    fn test_two_pair_levels() {
        let dra = two_pair_dra();
        let bdd = dra.bdd().clone();
        let construction = RabinToParity::new(&dra).unwrap();

        let reachable = dra.reachable_states();
        let levels = construction
            .parity_sets(reachable, &construction.pairs)
            .unwrap();

        // Peeling the first pair adds two levels on top of the four from
        // the remaining single-pair component, plus the two outermost ones.
        assert_eq!(levels.len(), 8);
        assert_eq!(bdd.apply_or_many(levels.iter().copied()), reachable);
        for (i, &a) in levels.iter().enumerate() {
            for &b in &levels[..i] {
                assert!(bdd.is_zero(bdd.apply_and(a, b)));
            }
        }

        // The Inf colours of both pairs land on even levels.
        let inf_first = construction.colours(&construction.pairs[0].inf);
        let inf_second = construction.colours(&construction.pairs[1].inf);
        assert!(bdd.is_implies(bdd.apply_and(inf_first, reachable), levels[2]));
        assert!(bdd.is_implies(bdd.apply_and(inf_second, reachable), levels[6]));
    }

    #[test]
    fn test_two_pair_winner() {
        let dra = two_pair_dra();
        let bdd = dra.bdd().clone();
        let dpa = RabinToParity::new(&dra).unwrap().try_to_parity().unwrap();

        let sets = match dpa.acceptance() {
            Acceptance::Parity {
                parity: Parity::MinEven,
                sets,
            } => *sets,
            other => panic!("expected min-even parity, got {other:?}"),
        };
        assert_eq!(sets, 8);
        assert_eq!(dpa.colour_offset(), 4);

        // Every infinite run satisfies one of the two pairs, so the
        // controller wins even without any controlled proposition.
        let solution = solve(&dpa, &BitSet::empty()).unwrap();
        assert_eq!(solution.winner, Winner::Controller);
        let initial = bdd.apply_and(
            dpa.initial_states(),
            bdd.cube(
                dpa.variables(&[VarKind::Colour])
                    .iter()
                    .map(|v| -(v as i32)),
            ),
        );
        assert!(bdd.is_implies(initial, solution.winning_region));
    }

    #[test]
    fn test_all_hopeless_winner() {
        // Every transition carries a Fin colour, so no pair is ever
        // satisfiable; the rewrite still succeeds with every configuration
        // hopeless and the environment wins the resulting game.
        let automaton = TableAutomaton::new(
            vec!["a".to_string()],
            vec![0],
            vec![EdgeTree::node(
                0,
                EdgeTree::leaf([Edge::new(0, [2])]),
                EdgeTree::leaf([Edge::new(0, [0])]),
            )],
            Acceptance::EmersonLei {
                formula: Formula::rabin([(0, 1), (2, 3)]),
                sets: 4,
            },
        );
        let dra = SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &automaton);
        let dpa = RabinToParity::new(&dra).unwrap().try_to_parity().unwrap();

        assert_eq!(dpa.acceptance().sets(), 2);
        let solution = solve(&dpa, &BitSet::empty()).unwrap();
        assert_eq!(solution.winner, Winner::Environment);
    }

    #[test]
    fn test_rejects_nondeterministic() {
        let automaton = TableAutomaton::new(
            vec![],
            vec![0],
            vec![EdgeTree::leaf([Edge::new(0, [0]), Edge::new(0, [1])])],
            Acceptance::EmersonLei {
                formula: Formula::rabin([(0, 1)]),
                sets: 2,
            },
        );
        let dra = SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &automaton);
        assert!(matches!(
            RabinToParity::new(&dra),
            Err(SynthesisError::NotDeterministic)
        ));
    }
}
