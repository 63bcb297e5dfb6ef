//! Symbolic solver for the reactive synthesis game induced by a
//! deterministic min-even parity automaton.
//!
//! Distraction fixpoint iteration with freezing, run directly on the
//! symbolic automaton instead of an explicit game graph. The environment
//! moves first by fixing the uncontrolled propositions, then the controller
//! answers with the controlled ones; the round follows the unique
//! transition and the controller wins if the least colour seen infinitely
//! often is even.

use log::{debug, trace};

use crate::automaton::SymbolicAutomaton;
use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::error::SynthesisError;
use crate::reference::Ref;
use crate::vars::{bdd_vars, VarKind};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Winner {
    Controller,
    Environment,
}

/// Outcome of the game: who wins from the initial states, their winning
/// region and a positional strategy (a subset of the transition relation
/// for the controller, of the environment's choices otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub winner: Winner,
    pub winning_region: Ref,
    pub strategy: Ref,
}

/// What the iteration does after processing one priority.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Step {
    /// The distraction sets are stable at this priority, move down.
    Descend,
    /// Something changed, freeze the affected states and start over from
    /// the highest priority.
    Restart,
}

/// Solves the synthesis game on `dpa`, with `controlled_aps` the local
/// indices of the atomic propositions the controller may choose.
pub fn solve(dpa: &SymbolicAutomaton, controlled_aps: &BitSet) -> Result<Solution, SynthesisError> {
    if !dpa.acceptance().is_min_even_parity() {
        return Err(SynthesisError::WrongAcceptance(
            "expected a min-even parity condition".to_owned(),
        ));
    }
    if controlled_aps.len() > dpa.atomic_propositions().len() {
        return Err(SynthesisError::TooManyControlledAps {
            given: controlled_aps.len(),
            available: dpa.atomic_propositions().len(),
        });
    }
    if !dpa.properties().complete {
        return Err(SynthesisError::NotComplete);
    }
    if !dpa.properties().deterministic {
        return Err(SynthesisError::NotDeterministic);
    }

    let bdd = dpa.bdd();
    let allocation = dpa.allocation();
    let reachable = dpa.reachable_states();

    let colour_vars = dpa.variables(&[VarKind::Colour]);
    let ap_colour_successor_vars = dpa.variables(&[
        VarKind::AtomicProposition,
        VarKind::Colour,
        VarKind::SuccessorState,
    ]);

    // The controller sees the environment's proposition choice, so its
    // decision points range over states and uncontrolled propositions.
    let mut controller_projection =
        bdd_vars(&allocation.local_to_global_set(controlled_aps, VarKind::AtomicProposition));
    controller_projection.union_with(&dpa.variables(&[VarKind::SuccessorState, VarKind::Colour]));

    let sets = dpa.acceptance().sets();
    let max_priority = sets + (1 - sets % 2);
    debug_assert!(max_priority % 2 == 1);

    let priority_states = states_of_priority(dpa, max_priority);
    let higher_priority_states = states_of_higher_priority(bdd, &priority_states, max_priority);
    let even_priority_states =
        bdd.apply_or_many((0..max_priority).step_by(2).map(|p| priority_states[p]));

    let mut frozen_controller = vec![bdd.zero; max_priority + 1];
    let mut frozen_environment = vec![bdd.zero; max_priority + 1];
    let mut distractions_controller = bdd.zero;
    let mut distractions_environment = bdd.zero;
    let mut strategy_controller = bdd.zero;
    let mut strategy_environment = bdd.zero;

    let mut priority = max_priority;
    loop {
        let controller_parity = priority % 2 == 0;

        // Controller decision points are only reconsidered at the top
        // priority; they carry no colour of their own.
        let candidates_controller = if priority == max_priority {
            bdd.apply_and_many([
                reachable,
                -bdd.apply_or_many(frozen_controller.iter().copied()),
                -distractions_controller,
            ])
        } else {
            bdd.zero
        };

        let candidates_environment = bdd.apply_and_many([
            priority_states[priority],
            -bdd.apply_or_many(frozen_environment.iter().copied()),
            -distractions_environment,
            reachable,
        ]);

        // Decision points from which some controlled choice enters an
        // even environment configuration.
        let even_successors = bdd.exists(
            bdd.apply_and(
                dpa.swap_state_successor(even(
                    bdd,
                    reachable,
                    even_priority_states,
                    distractions_environment,
                )),
                dpa.transition_relation(),
            ),
            &controller_projection,
        );
        let mut new_distractions_controller = bdd.apply_and(candidates_controller, even_successors);

        // Configurations whose every proposition choice runs into a
        // controller distraction.
        let escape = bdd.exists(
            bdd.apply_and(
                dpa.transition_relation(),
                -bdd.exists(distractions_controller, &colour_vars),
            ),
            &ap_colour_successor_vars,
        );
        let mut new_distractions_environment = bdd.apply_and(candidates_environment, -escape);

        if controller_parity {
            new_distractions_controller =
                bdd.apply_and(-new_distractions_controller, candidates_controller);
            new_distractions_environment =
                bdd.apply_and(-new_distractions_environment, candidates_environment);
        }

        let old_distractions_controller = distractions_controller;
        let old_distractions_environment = distractions_environment;
        distractions_controller =
            bdd.apply_or(distractions_controller, new_distractions_controller);
        distractions_environment =
            bdd.apply_or(distractions_environment, new_distractions_environment);

        // Reconsidered controller decision points move towards an even
        // environment configuration when they can.
        let considered_controller = bdd.exists(candidates_controller, &colour_vars);
        strategy_controller = bdd.apply_or(
            bdd.apply_and(strategy_controller, -considered_controller),
            bdd.apply_and_many([
                considered_controller,
                dpa.transition_relation(),
                bdd.exists(
                    dpa.swap_state_successor(even(
                        bdd,
                        reachable,
                        even_priority_states,
                        distractions_environment,
                    )),
                    &dpa.variables(&[VarKind::State]),
                ),
            ]),
        );

        // Reconsidered environment configurations move to a
        // distraction-free controller decision point when they can.
        let considered_environment = bdd.exists(candidates_environment, &colour_vars);
        strategy_environment = bdd.apply_or(
            bdd.apply_and(strategy_environment, -considered_environment),
            bdd.exists(
                bdd.apply_and_many([
                    considered_environment,
                    dpa.transition_relation(),
                    -distractions_controller,
                ]),
                &controller_projection,
            ),
        );

        let step = if distractions_controller == old_distractions_controller
            && distractions_environment == old_distractions_environment
        {
            Step::Descend
        } else {
            Step::Restart
        };
        trace!("priority {priority}: {step:?}");

        match step {
            Step::Descend => {
                if priority != max_priority {
                    frozen_controller[priority] = bdd.zero;
                }
                frozen_environment[priority] = bdd.apply_and(
                    frozen_environment[priority],
                    -higher_priority_states[priority],
                );
                if priority == 0 {
                    break;
                }
                priority -= 1;
            }
            Step::Restart => {
                let thaw_controller = if priority == max_priority {
                    bdd.zero
                } else {
                    bdd.apply_and(
                        reachable,
                        -bdd.apply_or_many(frozen_controller.iter().copied()),
                    )
                };
                let keep_controller = bdd.apply_and(
                    thaw_controller,
                    if controller_parity {
                        distractions_controller
                    } else {
                        -distractions_controller
                    },
                );
                frozen_controller[priority] = bdd.apply_or(
                    frozen_controller[priority],
                    bdd.apply_and(thaw_controller, -keep_controller),
                );

                let thaw_environment = bdd.apply_and_many([
                    higher_priority_states[priority],
                    -bdd.apply_or_many(frozen_environment.iter().copied()),
                    reachable,
                ]);
                let keep_environment = bdd.apply_and(
                    thaw_environment,
                    if controller_parity {
                        even(
                            bdd,
                            reachable,
                            even_priority_states,
                            distractions_environment,
                        )
                    } else {
                        odd(
                            bdd,
                            reachable,
                            even_priority_states,
                            distractions_environment,
                        )
                    },
                );
                frozen_environment[priority] = bdd.apply_or(
                    frozen_environment[priority],
                    bdd.apply_and(thaw_environment, -keep_environment),
                );

                distractions_controller = bdd.apply_and(distractions_controller, -keep_controller);
                distractions_environment =
                    bdd.apply_and(distractions_environment, -keep_environment);

                priority = max_priority;
            }
        }
    }

    let winning_region_controller = even(
        bdd,
        reachable,
        even_priority_states,
        distractions_environment,
    );
    let initial = bdd.apply_and(
        dpa.initial_states(),
        bdd.cube(colour_vars.iter().map(|v| -(v as i32))),
    );
    let solution = if bdd.is_implies(initial, winning_region_controller) {
        Solution {
            winner: Winner::Controller,
            winning_region: winning_region_controller,
            strategy: strategy_controller,
        }
    } else {
        Solution {
            winner: Winner::Environment,
            winning_region: odd(
                bdd,
                reachable,
                even_priority_states,
                distractions_controller,
            ),
            strategy: strategy_environment,
        }
    };
    debug!("game solved, winner {:?}", solution.winner);
    Ok(solution)
}

/// Configurations classified even: even priority and no distraction, or
/// odd priority and a distraction.
fn even(bdd: &Bdd, reachable: Ref, even_priority: Ref, distractions: Ref) -> Ref {
    bdd.apply_and(
        bdd.apply_or(
            bdd.apply_and(even_priority, -distractions),
            bdd.apply_and(-even_priority, distractions),
        ),
        reachable,
    )
}

fn odd(bdd: &Bdd, reachable: Ref, even_priority: Ref, distractions: Ref) -> Ref {
    bdd.apply_and(
        bdd.apply_or(
            bdd.apply_and(even_priority, distractions),
            -bdd.apply_or(even_priority, distractions),
        ),
        reachable,
    )
}

/// Per-priority configuration sets. Transitions carry a one-hot colour, so
/// the priority of a configuration is the index of its set colour. The
/// all-colours-clear configurations (only the initial ones) take the padded
/// top priority, which is odd.
fn states_of_priority(dpa: &SymbolicAutomaton, max_priority: usize) -> Vec<Ref> {
    let bdd = dpa.bdd();
    let sets = dpa.acceptance().sets();

    let mut priority_states = vec![bdd.zero; max_priority + 1];
    for (i, slot) in priority_states.iter_mut().enumerate().take(sets) {
        *slot = bdd.mk_var(dpa.colour_variable(i));
    }
    priority_states[max_priority] =
        bdd.cube((0..sets).map(|i| -(dpa.colour_variable(i) as i32)));
    priority_states
}

/// Suffix unions of `states_of_priority`, indexed by the strictly lower
/// priority.
fn states_of_higher_priority(
    bdd: &Bdd,
    priority_states: &[Ref],
    max_priority: usize,
) -> Vec<Ref> {
    let mut higher = vec![bdd.zero; max_priority + 1];
    for priority in (0..max_priority).rev() {
        higher[priority] = bdd.apply_or(higher[priority + 1], priority_states[priority + 1]);
    }
    higher
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::acceptance::{Acceptance, Parity};
    use crate::bdd::Bdd;
    use crate::explicit::{Edge, EdgeTree, TableAutomaton};
    use crate::vars::bdd_var;

    /// One state over one proposition; choosing the proposition emits
    /// colour `high`, refusing it emits colour `low`.
    fn one_state_dpa(low: usize, high: usize, sets: usize) -> SymbolicAutomaton {
        let automaton = TableAutomaton::new(
            vec!["p".to_string()],
            vec![0],
            vec![EdgeTree::node(
                0,
                EdgeTree::leaf([Edge::new(0, [low])]),
                EdgeTree::leaf([Edge::new(0, [high])]),
            )],
            Acceptance::Parity {
                parity: Parity::MinEven,
                sets,
            },
        );
        SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &automaton)
    }

    fn no_colours(dpa: &SymbolicAutomaton) -> Ref {
        let bdd = dpa.bdd();
        bdd.cube(
            dpa.variables(&[VarKind::Colour])
                .iter()
                .map(|v| -(v as i32)),
        )
    }

    #[test]
    fn test_controller_wins_with_controlled_ap() {
        // The controller owns `p` and earns the even colour by setting it.
        let dpa = one_state_dpa(1, 0, 2);
        let bdd = dpa.bdd().clone();
        let controlled: BitSet = [0].into_iter().collect();

        let solution = solve(&dpa, &controlled).unwrap();
        assert_eq!(solution.winner, Winner::Controller);

        let initial = bdd.apply_and(dpa.initial_states(), no_colours(&dpa));
        assert!(bdd.is_implies(initial, solution.winning_region));

        // The strategy picks transitions and prefers the even colour.
        assert!(!bdd.is_zero(solution.strategy));
        assert!(bdd.is_implies(solution.strategy, dpa.transition_relation()));
        let p = bdd.mk_var(bdd_var(
            dpa.allocation()
                .local_to_global(0, VarKind::AtomicProposition),
        ));
        assert!(bdd.is_implies(solution.strategy, p));
    }

    #[test]
    fn test_environment_wins_with_uncontrolled_ap() {
        // The environment owns `p` and forces the odd colour forever.
        let dpa = one_state_dpa(0, 1, 2);
        let bdd = dpa.bdd().clone();

        let solution = solve(&dpa, &BitSet::empty()).unwrap();
        assert_eq!(solution.winner, Winner::Environment);

        let initial = bdd.apply_and(dpa.initial_states(), no_colours(&dpa));
        assert!(bdd.is_implies(initial, solution.winning_region));
    }

    #[test]
    fn test_controller_wins_without_choice() {
        // Both choices emit the even colour, nothing to decide.
        let dpa = one_state_dpa(0, 0, 1);
        let solution = solve(&dpa, &BitSet::empty()).unwrap();
        assert_eq!(solution.winner, Winner::Controller);
    }

    /// Two states over request/grant propositions. Granting a pending
    /// request emits the even colour, leaving it pending the odd one.
    fn request_grant_dpa() -> SymbolicAutomaton {
        let automaton = TableAutomaton::new(
            vec!["r".to_string(), "g".to_string()],
            vec![0],
            vec![
                EdgeTree::node(
                    0,
                    EdgeTree::leaf([Edge::new(0, [0])]),
                    EdgeTree::node(
                        1,
                        EdgeTree::leaf([Edge::new(1, [1])]),
                        EdgeTree::leaf([Edge::new(0, [0])]),
                    ),
                ),
                EdgeTree::node(
                    1,
                    EdgeTree::leaf([Edge::new(1, [1])]),
                    EdgeTree::leaf([Edge::new(0, [0])]),
                ),
            ],
            Acceptance::Parity {
                parity: Parity::MinEven,
                sets: 2,
            },
        );
        SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &automaton)
    }

    #[test]
    fn test_two_state_strategy_stays_winning() {
        // The controller owns `g` and wins from everywhere by granting.
        let dpa = request_grant_dpa();
        let bdd = dpa.bdd().clone();
        let controlled: BitSet = [1].into_iter().collect();

        let solution = solve(&dpa, &controlled).unwrap();
        assert_eq!(solution.winner, Winner::Controller);
        assert_eq!(solution.winning_region, dpa.reachable_states());

        assert!(!bdd.is_zero(solution.strategy));
        assert!(bdd.is_implies(solution.strategy, dpa.transition_relation()));

        // A pending request is always granted.
        let pending = bdd.mk_var(bdd_var(dpa.allocation().local_to_global(0, VarKind::State)));
        let grant = bdd.mk_var(bdd_var(
            dpa.allocation()
                .local_to_global(1, VarKind::AtomicProposition),
        ));
        assert!(bdd.is_implies(bdd.apply_and(solution.strategy, pending), grant));

        // Following the strategy never leaves the winning region.
        let colour_vars = dpa.variables(&[VarKind::Colour]);
        let state_ap_vars = dpa.variables(&[VarKind::State, VarKind::AtomicProposition]);
        let mut closed = bdd.apply_and(dpa.initial_states(), no_colours(&dpa));
        loop {
            let source = bdd.exists(closed, &colour_vars);
            let image = dpa.swap_state_successor(bdd.and_exists(
                source,
                solution.strategy,
                &state_ap_vars,
            ));
            let next = bdd.apply_or(closed, image);
            if next == closed {
                break;
            }
            closed = next;
        }
        assert!(bdd.is_implies(closed, solution.winning_region));
    }

    #[test]
    fn test_two_state_environment_wins_without_control() {
        // The environment owns both propositions and keeps the request
        // pending forever.
        let dpa = request_grant_dpa();
        let bdd = dpa.bdd().clone();

        let solution = solve(&dpa, &BitSet::empty()).unwrap();
        assert_eq!(solution.winner, Winner::Environment);

        let initial = bdd.apply_and(dpa.initial_states(), no_colours(&dpa));
        assert!(bdd.is_implies(initial, solution.winning_region));
    }

    #[test]
    fn test_rejects_wrong_inputs() {
        let dpa = one_state_dpa(0, 1, 2);
        let too_many: BitSet = [0, 1].into_iter().collect();
        assert_eq!(
            solve(&dpa, &too_many).unwrap_err(),
            SynthesisError::TooManyControlledAps {
                given: 2,
                available: 1,
            }
        );

        let incomplete = TableAutomaton::new(
            vec!["p".to_string()],
            vec![0],
            vec![EdgeTree::leaf([])],
            Acceptance::Parity {
                parity: Parity::MinEven,
                sets: 1,
            },
        );
        let incomplete = SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &incomplete);
        assert_eq!(
            solve(&incomplete, &BitSet::empty()).unwrap_err(),
            SynthesisError::NotComplete
        );

        let max_odd = TableAutomaton::new(
            vec![],
            vec![0],
            vec![EdgeTree::leaf([Edge::new(0, [0])])],
            Acceptance::Parity {
                parity: Parity::MinOdd,
                sets: 1,
            },
        );
        let max_odd = SymbolicAutomaton::from_explicit(Rc::new(Bdd::default()), &max_odd);
        assert!(matches!(
            solve(&max_odd, &BitSet::empty()).unwrap_err(),
            SynthesisError::WrongAcceptance(_)
        ));
    }
}
