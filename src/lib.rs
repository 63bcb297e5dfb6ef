//! # symsynt: Symbolic Reactive Synthesis in Rust
//!
//! **`symsynt`** turns ω-automata specifications into reactive controllers,
//! entirely symbolically: states, transitions, winning regions and
//! strategies are all binary decision diagrams.
//!
//! ## The Pipeline
//!
//! 1. **Encode** an explicit automaton as a [`SymbolicAutomaton`][crate::automaton::SymbolicAutomaton]
//!    over a typed variable allocation (state bits, colours, atomic
//!    propositions, successor bits).
//! 2. **Combine** deterministic automata with boolean products, producing a
//!    single automaton with an Emerson-Lei acceptance condition.
//! 3. **Normalize** a Rabin-shaped condition to a min-even parity condition
//!    with [`RabinToParity`][crate::parity::RabinToParity], using symbolic
//!    strongly connected component analysis.
//! 4. **Solve** the induced two-player game with the distraction fixpoint
//!    iteration in [`solver`][crate::solver]: the environment picks the
//!    uncontrolled propositions, the controller answers with the rest.
//! 5. **Extract** the winning strategy as an and-inverter graph with
//!    [`write_aiger`][crate::aiger::write_aiger].
//!
//! All sets live in one [`Bdd`][crate::bdd::Bdd] manager with complement
//! edges, so negation is free and equality is pointer comparison.
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use symsynt::acceptance::{Acceptance, Parity};
//! use symsynt::automaton::SymbolicAutomaton;
//! use symsynt::bdd::Bdd;
//! use symsynt::bitset::BitSet;
//! use symsynt::explicit::{Edge, EdgeTree, TableAutomaton};
//! use symsynt::solver::{solve, Winner};
//!
//! // A one-state specification: emitting `g` earns the even colour.
//! let automaton = TableAutomaton::new(
//!     vec!["g".to_string()],
//!     vec![0],
//!     vec![EdgeTree::node(
//!         0,
//!         EdgeTree::leaf([Edge::new(0, [1])]),
//!         EdgeTree::leaf([Edge::new(0, [0])]),
//!     )],
//!     Acceptance::Parity { parity: Parity::MinEven, sets: 2 },
//! );
//! let dpa = SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &automaton);
//!
//! // The controller owns `g`, so it wins by always granting.
//! let controlled: BitSet = [0].into_iter().collect();
//! let solution = solve(&dpa, &controlled).unwrap();
//! assert_eq!(solution.winner, Winner::Controller);
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: the decision diagram manager and its algorithms.
//! - **[`vars`]**: typed variable allocations and their combination.
//! - **[`automaton`]**: symbolic automata, image operations and products.
//! - **[`scc`]**: lockstep strongly connected component decomposition.
//! - **[`parity`]**: the Rabin to parity acceptance transformation.
//! - **[`solver`]**: the symbolic parity game solver.
//! - **[`aiger`]**: strategy extraction to AIGER circuits.

pub mod acceptance;
pub mod aiger;
pub mod automaton;
pub mod bdd;
pub mod bitset;
pub mod cache;
pub mod error;
pub mod explicit;
pub mod parity;
pub mod reference;
pub mod scc;
pub mod solver;
pub mod table;
pub mod utils;
pub mod vars;
