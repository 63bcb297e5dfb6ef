//! Symbolic representation of ω-automata.
//!
//! A configuration pairs a state with the colours of the transition it was
//! reached by, so state sets range over the STATE and COLOUR variables. The
//! transition relation ranges over STATE, ATOMIC_PROPOSITION,
//! SUCCESSOR_STATE and COLOUR variables, the colours being those of the
//! transition itself.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::rc::Rc;

use log::debug;

use crate::acceptance::{Acceptance, Formula};
use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::error::SynthesisError;
use crate::explicit::{Automaton, EdgeTree, StateNumbering};
use crate::reference::Ref;
use crate::vars::{bdd_var, bdd_vars, VarAlloc, VarKind};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Properties {
    pub deterministic: bool,
    pub complete: bool,
}

/// A fully materialized transition, all components as local indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitEdge {
    pub state: BitSet,
    pub valuation: BitSet,
    pub successor: BitSet,
    pub colours: BitSet,
}

pub struct SymbolicAutomaton {
    bdd: Rc<Bdd>,
    atomic_propositions: Vec<String>,
    initial_states: Ref,
    transition_relation: Ref,
    acceptance: Acceptance,
    allocation: VarAlloc,
    properties: Properties,
    /// First colour local index owned by the acceptance condition.
    colour_offset: usize,
    // STATE <-> SUCCESSOR_STATE involution on manager variables.
    swap: HashMap<u32, u32>,
    reachable: RefCell<Option<Ref>>,
}

impl std::fmt::Debug for SymbolicAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolicAutomaton")
            .field("atomic_propositions", &self.atomic_propositions)
            .field("acceptance", &self.acceptance)
            .field("properties", &self.properties)
            .field("variables", &self.allocation.num_variables())
            .finish_non_exhaustive()
    }
}

impl SymbolicAutomaton {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        bdd: Rc<Bdd>,
        atomic_propositions: Vec<String>,
        initial_states: Ref,
        transition_relation: Ref,
        acceptance: Acceptance,
        allocation: VarAlloc,
        properties: Properties,
        colour_offset: usize,
    ) -> Self {
        let states = allocation.variables(&[VarKind::State]);
        let successors = allocation.variables(&[VarKind::SuccessorState]);
        assert_eq!(states.len(), successors.len());
        assert!(
            colour_offset + acceptance.sets()
                <= allocation.variables(&[VarKind::Colour]).len()
        );

        let mut swap = HashMap::new();
        for local in 0..states.len() {
            let s = bdd_var(allocation.local_to_global(local, VarKind::State));
            let x = bdd_var(allocation.local_to_global(local, VarKind::SuccessorState));
            swap.insert(s, x);
            swap.insert(x, s);
        }

        Self {
            bdd,
            atomic_propositions,
            initial_states,
            transition_relation,
            acceptance,
            allocation,
            properties,
            colour_offset,
            swap,
            reachable: RefCell::new(None),
        }
    }

    /// Encodes an explicit automaton, exploring from its initial states.
    pub fn from_explicit<S, A>(bdd: Rc<Bdd>, automaton: &A) -> Self
    where
        S: Clone + Eq + Hash,
        A: Automaton<S>,
    {
        let atomic_propositions = automaton.atomic_propositions().to_vec();
        let acceptance = automaton.acceptance().clone();
        let numbering = StateNumbering::new(automaton);
        let allocation = VarAlloc::ranged(
            [
                VarKind::AtomicProposition,
                VarKind::State,
                VarKind::Colour,
                VarKind::SuccessorState,
            ],
            [
                atomic_propositions.len(),
                numbering.state_variables(),
                acceptance.sets(),
                numbering.state_variables(),
            ],
        );

        let mut initial_states = bdd.zero;
        let mut work_list = VecDeque::new();
        let mut explored = HashSet::new();
        for state in automaton.initial_states() {
            let assignment =
                allocation.local_to_global_set(&numbering.encode(&state), VarKind::State);
            initial_states = bdd.apply_or(
                initial_states,
                assignment_cube(&bdd, &assignment, allocation.variables(&[VarKind::State])),
            );
            if explored.insert(state.clone()) {
                work_list.push_back(state);
            }
        }

        let mut transition_relation = bdd.zero;
        let mut deterministic = true;
        let mut complete = true;

        while let Some(state) = work_list.pop_front() {
            let edge_tree = automaton.edge_tree(&state);

            let state_cube = assignment_cube(
                &bdd,
                &allocation.local_to_global_set(&numbering.encode(&state), VarKind::State),
                allocation.variables(&[VarKind::State]),
            );
            let edges = encode_edge_tree(&bdd, &edge_tree, &numbering, &allocation);
            transition_relation =
                bdd.apply_or(transition_relation, bdd.apply_and(state_cube, edges));

            for edge in edge_tree.edges() {
                if explored.insert(edge.successor.clone()) {
                    work_list.push_back(edge.successor.clone());
                }
            }
            check_leaves(&edge_tree, &mut deterministic, &mut complete);
        }

        debug!(
            "encoded automaton: {} explored states, {} variables",
            explored.len(),
            allocation.num_variables()
        );

        Self::new(
            bdd,
            atomic_propositions,
            initial_states,
            transition_relation,
            acceptance,
            allocation,
            Properties {
                deterministic,
                complete,
            },
            0,
        )
    }

    pub fn bdd(&self) -> &Rc<Bdd> {
        &self.bdd
    }
    pub fn atomic_propositions(&self) -> &[String] {
        &self.atomic_propositions
    }
    pub fn initial_states(&self) -> Ref {
        self.initial_states
    }
    pub fn transition_relation(&self) -> Ref {
        self.transition_relation
    }
    pub fn acceptance(&self) -> &Acceptance {
        &self.acceptance
    }
    pub fn allocation(&self) -> &VarAlloc {
        &self.allocation
    }
    pub fn properties(&self) -> Properties {
        self.properties
    }
    pub fn colour_offset(&self) -> usize {
        self.colour_offset
    }

    /// Manager variables of the given kinds.
    pub fn variables(&self, kinds: &[VarKind]) -> BitSet {
        bdd_vars(self.allocation.variables(kinds))
    }

    /// Manager variable of an acceptance colour.
    pub fn colour_variable(&self, colour: usize) -> u32 {
        bdd_var(
            self.allocation
                .local_to_global(self.colour_offset + colour, VarKind::Colour),
        )
    }

    /// Exchanges the STATE and SUCCESSOR_STATE variables of `set`.
    pub fn swap_state_successor(&self, set: Ref) -> Ref {
        self.bdd.relabel(set, &self.swap)
    }

    /// Configurations reachable from `set` in one transition. The result's
    /// colours are those of the transition taken.
    pub fn successors(&self, set: Ref) -> Ref {
        let source = self.bdd.exists(set, &self.variables(&[VarKind::Colour]));
        let image = self.bdd.and_exists(
            source,
            self.transition_relation,
            &self.variables(&[VarKind::State, VarKind::AtomicProposition]),
        );
        self.swap_state_successor(image)
    }

    /// States with a transition into `set`. The result does not constrain
    /// the colour variables.
    pub fn predecessors(&self, set: Ref) -> Ref {
        let target = self.swap_state_successor(set);
        self.bdd.and_exists(
            target,
            self.transition_relation,
            &self.variables(&[
                VarKind::SuccessorState,
                VarKind::AtomicProposition,
                VarKind::Colour,
            ]),
        )
    }

    /// Forward fixpoint from the initial states. Initial configurations
    /// carry no colour. Memoized.
    pub fn reachable_states(&self) -> Ref {
        if let Some(reachable) = *self.reachable.borrow() {
            return reachable;
        }

        let no_colours = self.bdd.cube(
            self.allocation
                .variables(&[VarKind::Colour])
                .iter()
                .map(|g| -(bdd_var(g) as i32)),
        );
        let mut reachable = self.bdd.apply_and(self.initial_states, no_colours);
        loop {
            let next = self.bdd.apply_or(reachable, self.successors(reachable));
            if next == reachable {
                break;
            }
            reachable = next;
        }

        debug!("reachable states: {} nodes", self.bdd.size(reachable));
        *self.reachable.borrow_mut() = Some(reachable);
        reachable
    }

    /// Product under an arbitrary boolean combination of the factors.
    ///
    /// `operator` ranges over factor indices `0..automata.len()`. All
    /// factors must be complete, share the manager and the alphabet, and
    /// carry an Emerson-Lei condition.
    pub fn deterministic_product(
        operator: &Formula,
        automata: &[&SymbolicAutomaton],
    ) -> Result<SymbolicAutomaton, SynthesisError> {
        if automata.is_empty() {
            return Err(SynthesisError::EmptyProduct);
        }
        let bdd = automata[0].bdd.clone();
        for automaton in automata {
            if !Rc::ptr_eq(&bdd, &automaton.bdd) {
                return Err(SynthesisError::FactoryMismatch);
            }
            if !automaton.properties.complete {
                return Err(SynthesisError::NotComplete);
            }
            if automaton.atomic_propositions != automata[0].atomic_propositions {
                return Err(SynthesisError::IncompatibleAlphabets);
            }
            if !matches!(automaton.acceptance, Acceptance::EmersonLei { .. }) {
                return Err(SynthesisError::WrongAcceptance(
                    "product factors must carry an Emerson-Lei condition".to_owned(),
                ));
            }
            // Factors have their whole colour block in the acceptance
            // condition; products of parity-extended automata are not
            // supported.
            assert_eq!(automaton.colour_offset, 0);
        }

        let allocations: Vec<&VarAlloc> = automata.iter().map(|a| &a.allocation).collect();
        let (allocation, embeddings) = VarAlloc::combine_sequential(&allocations)?;

        let mut initial_states = bdd.one;
        let mut transition_relation = bdd.one;
        for (automaton, embedding) in automata.iter().zip(&embeddings) {
            let map: HashMap<u32, u32> = embedding
                .iter()
                .enumerate()
                .map(|(from, &to)| (bdd_var(from), bdd_var(to)))
                .collect();
            initial_states =
                bdd.apply_and(initial_states, bdd.relabel(automaton.initial_states, &map));
            transition_relation = bdd.apply_and(
                transition_relation,
                bdd.relabel(automaton.transition_relation, &map),
            );
        }

        let mut colour_offsets = Vec::with_capacity(automata.len());
        let mut sets = 0;
        for automaton in automata {
            colour_offsets.push(sets);
            sets += automaton.acceptance.sets();
        }
        let formula = operator.substitute(&|factor| {
            let Acceptance::EmersonLei { formula, .. } = &automata[factor].acceptance else {
                unreachable!("checked above");
            };
            formula.shift(colour_offsets[factor])
        });

        let deterministic = automata.iter().all(|a| a.properties.deterministic);

        Ok(SymbolicAutomaton::new(
            bdd,
            automata[0].atomic_propositions.clone(),
            initial_states,
            transition_relation,
            Acceptance::EmersonLei { formula, sets },
            allocation,
            Properties {
                deterministic,
                complete: true,
            },
            0,
        ))
    }

    /// Product accepting the intersection of the factor languages.
    pub fn intersection(
        automata: &[&SymbolicAutomaton],
    ) -> Result<SymbolicAutomaton, SynthesisError> {
        let operator = Formula::And((0..automata.len()).map(Formula::Var).collect());
        Self::deterministic_product(&operator, automata)
    }

    /// Product accepting the union of the factor languages.
    pub fn deterministic_union(
        automata: &[&SymbolicAutomaton],
    ) -> Result<SymbolicAutomaton, SynthesisError> {
        let operator = Formula::Or((0..automata.len()).map(Formula::Var).collect());
        Self::deterministic_product(&operator, automata)
    }

    /// Materializes every transition of the relation.
    pub fn to_explicit(&self) -> Vec<ExplicitEdge> {
        let all = self.variables(&VarKind::ALL);
        let order: Vec<usize> = all.iter().collect();
        self.bdd
            .assignments(self.transition_relation, &all)
            .map(|assignment| {
                let globals: BitSet = order
                    .iter()
                    .zip(&assignment)
                    .filter(|(_, &set)| set)
                    .map(|(&v, _)| v - 1)
                    .collect();
                ExplicitEdge {
                    state: self
                        .allocation
                        .global_to_local_set(&globals, VarKind::State),
                    valuation: self
                        .allocation
                        .global_to_local_set(&globals, VarKind::AtomicProposition),
                    successor: self
                        .allocation
                        .global_to_local_set(&globals, VarKind::SuccessorState),
                    colours: self
                        .allocation
                        .global_to_local_set(&globals, VarKind::Colour),
                }
            })
            .collect()
    }
}

/// Cube fixing every variable in `mask` (global indices), true iff it is in
/// `assignment`.
pub(crate) fn assignment_cube(bdd: &Bdd, assignment: &BitSet, mask: &BitSet) -> Ref {
    debug_assert!(assignment.is_subset_of(mask));
    bdd.cube(mask.iter().map(|g| {
        let v = bdd_var(g) as i32;
        if assignment.contains(g) {
            v
        } else {
            -v
        }
    }))
}

fn encode_edge_tree<S: Clone + Eq + Hash>(
    bdd: &Bdd,
    tree: &EdgeTree<S>,
    numbering: &StateNumbering<S>,
    allocation: &VarAlloc,
) -> Ref {
    match tree {
        EdgeTree::Leaf(edges) => {
            let mask = allocation
                .variables(&[VarKind::SuccessorState, VarKind::Colour])
                .clone();
            let mut result = bdd.zero;
            for edge in edges {
                let mut assignment = allocation.local_to_global_set(
                    &numbering.encode(&edge.successor),
                    VarKind::SuccessorState,
                );
                assignment
                    .union_with(&allocation.local_to_global_set(&edge.colours, VarKind::Colour));
                result = bdd.apply_or(result, assignment_cube(bdd, &assignment, &mask));
            }
            result
        }
        EdgeTree::Node { ap, low, high } => {
            let ap_var = bdd.mk_var(bdd_var(
                allocation.local_to_global(*ap, VarKind::AtomicProposition),
            ));
            let low = encode_edge_tree(bdd, low, numbering, allocation);
            let high = encode_edge_tree(bdd, high, numbering, allocation);
            bdd.apply_ite(ap_var, high, low)
        }
    }
}

fn check_leaves<S>(tree: &EdgeTree<S>, deterministic: &mut bool, complete: &mut bool) {
    match tree {
        EdgeTree::Leaf(edges) => {
            if edges.len() > 1 {
                *deterministic = false;
            }
            if edges.is_empty() {
                *complete = false;
            }
        }
        EdgeTree::Node { low, high, .. } => {
            check_leaves(low, deterministic, complete);
            check_leaves(high, deterministic, complete);
        }
    }
}
