//! Explicit automaton interface used to build symbolic automata.

use std::collections::HashMap;
use std::hash::Hash;

use crate::acceptance::Acceptance;
use crate::bitset::BitSet;

/// A transition with its acceptance marks (local colour indices).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<S> {
    pub successor: S,
    pub colours: BitSet,
}

impl<S> Edge<S> {
    pub fn new(successor: S, colours: impl IntoIterator<Item = usize>) -> Self {
        Self {
            successor,
            colours: colours.into_iter().collect(),
        }
    }
}

/// Edges of one state as a decision tree over atomic propositions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeTree<S> {
    Leaf(Vec<Edge<S>>),
    Node {
        ap: usize,
        low: Box<EdgeTree<S>>,
        high: Box<EdgeTree<S>>,
    },
}

impl<S> EdgeTree<S> {
    pub fn leaf(edges: impl IntoIterator<Item = Edge<S>>) -> Self {
        EdgeTree::Leaf(edges.into_iter().collect())
    }

    pub fn node(ap: usize, low: EdgeTree<S>, high: EdgeTree<S>) -> Self {
        EdgeTree::Node {
            ap,
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    /// All edges in the tree, leaves left to right.
    pub fn edges(&self) -> Vec<&Edge<S>> {
        match self {
            EdgeTree::Leaf(edges) => edges.iter().collect(),
            EdgeTree::Node { low, high, .. } => {
                let mut edges = low.edges();
                edges.extend(high.edges());
                edges
            }
        }
    }
}

/// An explicit automaton over infinite words, the input of the symbolic
/// encoding.
pub trait Automaton<S> {
    fn atomic_propositions(&self) -> &[String];

    fn states(&self) -> Vec<S>;

    fn initial_states(&self) -> Vec<S>;

    fn edge_tree(&self, state: &S) -> EdgeTree<S>;

    fn acceptance(&self) -> &Acceptance;
}

/// Assigns each state a `⌈log₂ n⌉`-bit code, numbered in `states()` order.
pub struct StateNumbering<S> {
    codes: HashMap<S, usize>,
    state_variables: usize,
}

impl<S: Clone + Eq + Hash> StateNumbering<S> {
    pub fn new(automaton: &impl Automaton<S>) -> Self {
        let states = automaton.states();
        let mut codes = HashMap::with_capacity(states.len());
        for (i, state) in states.into_iter().enumerate() {
            let prev = codes.insert(state, i);
            assert!(prev.is_none(), "duplicate state");
        }
        let state_variables = codes.len().max(2).next_power_of_two().trailing_zeros() as usize;
        Self {
            codes,
            state_variables,
        }
    }

    pub fn state_variables(&self) -> usize {
        self.state_variables
    }

    /// Binary code of a state over local state indices, bit 0 least
    /// significant.
    pub fn encode(&self, state: &S) -> BitSet {
        let number = self.codes[state];
        (0..self.state_variables)
            .filter(|bit| number >> bit & 1 != 0)
            .collect()
    }
}

/// A vector-backed automaton with `usize` states.
pub struct TableAutomaton {
    atomic_propositions: Vec<String>,
    initial_states: Vec<usize>,
    edge_trees: Vec<EdgeTree<usize>>,
    acceptance: Acceptance,
}

impl TableAutomaton {
    pub fn new(
        atomic_propositions: Vec<String>,
        initial_states: Vec<usize>,
        edge_trees: Vec<EdgeTree<usize>>,
        acceptance: Acceptance,
    ) -> Self {
        assert!(!edge_trees.is_empty());
        assert!(initial_states.iter().all(|&s| s < edge_trees.len()));
        Self {
            atomic_propositions,
            initial_states,
            edge_trees,
            acceptance,
        }
    }
}

impl Automaton<usize> for TableAutomaton {
    fn atomic_propositions(&self) -> &[String] {
        &self.atomic_propositions
    }

    fn states(&self) -> Vec<usize> {
        (0..self.edge_trees.len()).collect()
    }

    fn initial_states(&self) -> Vec<usize> {
        self.initial_states.clone()
    }

    fn edge_tree(&self, state: &usize) -> EdgeTree<usize> {
        self.edge_trees[*state].clone()
    }

    fn acceptance(&self) -> &Acceptance {
        &self.acceptance
    }
}
