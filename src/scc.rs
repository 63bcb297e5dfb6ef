//! Symbolic decomposition of configuration sets into strongly connected
//! components, using only image operations.

use log::debug;

use crate::automaton::SymbolicAutomaton;
use crate::reference::Ref;
use crate::vars::VarKind;

pub struct SccDecomposition<'a> {
    automaton: &'a SymbolicAutomaton,
}

impl<'a> SccDecomposition<'a> {
    pub fn of(automaton: &'a SymbolicAutomaton) -> Self {
        Self { automaton }
    }

    /// Partitions `restriction` into strongly connected components, in no
    /// particular order.
    ///
    /// Lockstep doubling: grow the forward and backward closures of a pivot
    /// configuration simultaneously, stop the race once one side converges,
    /// and finish the other side inside the converged closure.
    pub fn sccs(&self, restriction: Ref) -> Vec<Ref> {
        let bdd = self.automaton.bdd();
        let config_vars = self
            .automaton
            .variables(&[VarKind::State, VarKind::Colour]);

        let mut sccs = Vec::new();
        let mut stack = vec![restriction];

        while let Some(considered) = stack.pop() {
            if bdd.is_zero(considered) {
                continue;
            }

            let pivot_literals = bdd
                .one_sat_in(considered, &config_vars)
                .expect("considered set is non-empty");
            let pivot = bdd.cube(pivot_literals);
            debug!("scc pivot = {}", pivot);

            let mut forward = pivot;
            let mut backward = pivot;
            let mut fw_frontier = pivot;
            let mut bw_frontier = pivot;

            // Race both closures until one converges.
            while !bdd.is_zero(fw_frontier) && !bdd.is_zero(bw_frontier) {
                fw_frontier = bdd.apply_and_many([
                    self.automaton.successors(fw_frontier),
                    considered,
                    -forward,
                ]);
                forward = bdd.apply_or(forward, fw_frontier);

                bw_frontier = bdd.apply_and_many([
                    self.automaton.predecessors(bw_frontier),
                    considered,
                    -backward,
                ]);
                backward = bdd.apply_or(backward, bw_frontier);
            }

            // Finish the unconverged side, but only as far as the converged
            // closure reaches.
            let converged = if bdd.is_zero(fw_frontier) {
                while !bdd.is_zero(bdd.apply_and(bw_frontier, forward)) {
                    bw_frontier = bdd.apply_and_many([
                        self.automaton.predecessors(bw_frontier),
                        considered,
                        -backward,
                    ]);
                    backward = bdd.apply_or(backward, bw_frontier);
                }
                forward
            } else {
                while !bdd.is_zero(bdd.apply_and(fw_frontier, backward)) {
                    fw_frontier = bdd.apply_and_many([
                        self.automaton.successors(fw_frontier),
                        considered,
                        -forward,
                    ]);
                    forward = bdd.apply_or(forward, fw_frontier);
                }
                backward
            };

            let scc = bdd.apply_and(forward, backward);
            sccs.push(scc);

            let inside = bdd.apply_and(converged, -scc);
            if !bdd.is_zero(inside) {
                stack.push(inside);
            }
            let outside = bdd.apply_and(considered, -converged);
            if !bdd.is_zero(outside) {
                stack.push(outside);
            }
        }

        debug!("found {} sccs", sccs.len());
        sccs
    }

    /// A component is trivial if it cannot reach itself.
    pub fn is_trivial(&self, scc: Ref) -> bool {
        let bdd = self.automaton.bdd();
        bdd.is_zero(bdd.apply_and(self.automaton.successors(scc), scc))
    }
}
