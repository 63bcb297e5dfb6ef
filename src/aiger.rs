//! Serializes a winning controller strategy as an and-inverter graph in the
//! ASCII AIGER (`aag`) format.
//!
//! The circuit reads the uncontrolled propositions as inputs, keeps one
//! latch per state bit plus a reset latch that is zero exactly in the first
//! step, and drives one output per controlled proposition. Each strategy
//! node becomes at most three AND gates; complemented edges map to inverted
//! literals for free.

use std::collections::HashMap;

use log::debug;

use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::reference::Ref;
use crate::vars::{bdd_var, bdd_vars, VarAlloc, VarKind};

/// Writes the strategy as an `aag` circuit.
///
/// `strategy` must be deterministic: for every state and uncontrolled
/// valuation it allows at most one transition. `controlled_aps` and
/// `initial` hold local proposition and state-bit indices.
pub fn write_aiger(
    bdd: &Bdd,
    strategy: Ref,
    allocation: &VarAlloc,
    controlled_aps: &BitSet,
    atomic_propositions: &[String],
    initial: &BitSet,
) -> String {
    debug_assert!(is_deterministic(bdd, strategy, allocation, controlled_aps));

    let number_of_aps = allocation.variables(&[VarKind::AtomicProposition]).len();
    let number_of_outputs = controlled_aps.len();
    let number_of_inputs = number_of_aps - number_of_outputs;
    let number_of_latches = allocation.variables(&[VarKind::State]).len();

    let mut body = String::new();

    // Inputs, one per uncontrolled proposition.
    write_literals(&mut body, number_of_inputs, 1);
    // State bit latches; the next-state drivers come after the outputs.
    write_latches(
        &mut body,
        number_of_latches,
        number_of_inputs + 1,
        number_of_latches + number_of_outputs + 1,
    );
    // The reset latch is 0 in the first step and 1 forever after.
    let reset_latch = number_of_inputs + number_of_latches + 1;
    body.push_str(&format!("{} 1\n", 2 * reset_latch));
    write_literals(
        &mut body,
        number_of_outputs,
        number_of_inputs + number_of_latches + 2,
    );

    // State bits set in the initial state read through `¬(reset ∧ ¬latch)`,
    // so they are 1 in the first step and follow the latch afterwards.
    let reset_gate_offset = number_of_aps + 2 * number_of_latches + 2;
    for (count, bit) in initial.iter().enumerate() {
        write_gate(
            &mut body,
            reset_gate_offset + count,
            2 * reset_latch,
            2 * (number_of_inputs + 1 + bit) + 1,
        );
    }

    let mut writer = GateWriter {
        bdd,
        allocation,
        controlled_aps,
        initial,
        latch_offset: number_of_inputs + 1,
        reset_gate_offset,
        next_gate: reset_gate_offset + initial.len(),
        memo: HashMap::new(),
    };

    // The strategy constrains the successor bits and the controlled
    // propositions; cofactor each one out and quantify the rest away.
    let mut quantified = bdd_vars(allocation.variables(&[
        VarKind::SuccessorState,
        VarKind::Colour,
    ]));
    let controlled_globals =
        allocation.local_to_global_set(controlled_aps, VarKind::AtomicProposition);
    quantified.union_with(&bdd_vars(&controlled_globals));

    for bit in 0..number_of_latches {
        let variable = bdd_var(allocation.local_to_global(bit, VarKind::SuccessorState));
        let function = output_function(bdd, strategy, variable, &quantified);
        let root = writer.literal(&mut body, function);
        let latch_next = number_of_aps + number_of_latches + bit + 2;
        write_gate(&mut body, latch_next, root, root);
    }
    for (count, ap) in controlled_aps.iter().enumerate() {
        let variable = bdd_var(allocation.local_to_global(ap, VarKind::AtomicProposition));
        let function = output_function(bdd, strategy, variable, &quantified);
        let root = writer.literal(&mut body, function);
        let output = number_of_inputs + number_of_latches + 2 + count;
        write_gate(&mut body, output, root, root);
    }
    let max_index = writer.next_gate;

    let mut input_counter = 0;
    let mut output_counter = 0;
    for (i, ap) in atomic_propositions.iter().enumerate() {
        if controlled_aps.contains(i) {
            body.push_str(&format!("o{output_counter} {ap}\n"));
            output_counter += 1;
        } else {
            body.push_str(&format!("i{input_counter} {ap}\n"));
            input_counter += 1;
        }
    }

    let gates = max_index - number_of_inputs - number_of_latches - 2;
    debug!(
        "aiger circuit: {number_of_inputs} inputs, {} latches, {number_of_outputs} outputs, \
         {gates} gates",
        number_of_latches + 1
    );
    format!(
        "aag {} {} {} {} {}\n{}",
        max_index - 1,
        number_of_inputs,
        number_of_latches + 1,
        number_of_outputs,
        gates,
        body
    )
}

/// The value of `variable` as a function of the states and the uncontrolled
/// propositions.
fn output_function(bdd: &Bdd, strategy: Ref, variable: u32, quantified: &BitSet) -> Ref {
    let positive = bdd.restrict(strategy, &HashMap::from([(variable, true)]));
    bdd.exists(positive, quantified)
}

fn write_literals(out: &mut String, count: usize, offset: usize) {
    for i in offset..offset + count {
        out.push_str(&format!("{}\n", 2 * i));
    }
}

fn write_latches(out: &mut String, count: usize, latch_offset: usize, next_offset: usize) {
    for i in latch_offset..latch_offset + count {
        out.push_str(&format!("{} {}\n", 2 * i, 2 * (i + next_offset)));
    }
}

fn write_gate(out: &mut String, gate: usize, arg0: usize, arg1: usize) {
    out.push_str(&format!("{} {} {}\n", 2 * gate, arg0, arg1));
}

struct GateWriter<'a> {
    bdd: &'a Bdd,
    allocation: &'a VarAlloc,
    controlled_aps: &'a BitSet,
    initial: &'a BitSet,
    latch_offset: usize,
    reset_gate_offset: usize,
    next_gate: usize,
    // Regular node index to literal.
    memo: HashMap<u32, usize>,
}

impl GateWriter<'_> {
    /// The AIG literal computing `f`, appending fresh gates to `out`.
    fn literal(&mut self, out: &mut String, f: Ref) -> usize {
        if self.bdd.is_one(f) {
            return 1;
        }
        if self.bdd.is_zero(f) {
            return 0;
        }
        if f.is_negated() {
            return self.literal(out, -f) ^ 1;
        }
        if let Some(&literal) = self.memo.get(&f.index()) {
            return literal;
        }

        let low = self.literal(out, self.bdd.low_node(f));
        let high = self.literal(out, self.bdd.high_node(f));
        let variable = self.variable_literal(self.bdd.variable(f.index()));

        let literal = match (low, high) {
            (0, 0) => 0,
            (0, 1) => variable,
            (1, 0) => variable ^ 1,
            (1, 1) => 1,
            (0, high) => {
                // v ∧ high
                let gate = self.fresh_gate();
                write_gate(out, gate, variable, high);
                2 * gate
            }
            (1, high) => {
                // ¬(v ∧ ¬(v ∧ high))
                let inner = self.fresh_gate();
                let outer = self.fresh_gate();
                write_gate(out, inner, variable, high);
                write_gate(out, outer, variable, 2 * inner + 1);
                2 * outer + 1
            }
            (low, 0) => {
                // ¬v ∧ low
                let gate = self.fresh_gate();
                write_gate(out, gate, variable ^ 1, low);
                2 * gate
            }
            (low, 1) => {
                // ¬(¬(¬v ∧ low) ∧ ¬v)
                let inner = self.fresh_gate();
                let outer = self.fresh_gate();
                write_gate(out, inner, variable ^ 1, low);
                write_gate(out, outer, 2 * inner + 1, variable ^ 1);
                2 * outer + 1
            }
            (low, high) => {
                // ¬(¬(¬v ∧ low) ∧ ¬(v ∧ high))
                let low_part = self.fresh_gate();
                let high_part = self.fresh_gate();
                let combined = self.fresh_gate();
                write_gate(out, low_part, variable ^ 1, low);
                write_gate(out, high_part, variable, high);
                write_gate(out, combined, 2 * low_part + 1, 2 * high_part + 1);
                2 * combined + 1
            }
        };
        self.memo.insert(f.index(), literal);
        literal
    }

    fn fresh_gate(&mut self) -> usize {
        let gate = self.next_gate;
        self.next_gate += 1;
        gate
    }

    /// Maps a manager variable to the AIG literal reading its current value.
    fn variable_literal(&self, variable: u32) -> usize {
        let global = (variable - 1) as usize;
        if self.allocation.variables(&[VarKind::State]).contains(global) {
            let local = self.allocation.global_to_local(global);
            if self.initial.contains(local) {
                2 * (self.reset_gate_offset + self.initial.rank(local)) + 1
            } else {
                2 * (self.latch_offset + local)
            }
        } else {
            debug_assert!(self
                .allocation
                .variables(&[VarKind::AtomicProposition])
                .contains(global));
            let local = self.allocation.global_to_local(global);
            debug_assert!(!self.controlled_aps.contains(local));
            let uncontrolled_rank = local - self.controlled_aps.rank(local);
            2 * (uncontrolled_rank + 1)
        }
    }
}

/// Every state and uncontrolled valuation allows at most one transition.
/// Exponential in the inputs, so only run on small instances.
fn is_deterministic(
    bdd: &Bdd,
    strategy: Ref,
    allocation: &VarAlloc,
    controlled_aps: &BitSet,
) -> bool {
    let mut inputs = allocation
        .variables(&[VarKind::State, VarKind::AtomicProposition])
        .clone();
    inputs.subtract(&allocation.local_to_global_set(controlled_aps, VarKind::AtomicProposition));
    let inputs = bdd_vars(&inputs);
    if inputs.len() >= 20 {
        return true;
    }

    let all = bdd_vars(&(0..allocation.num_variables()).collect());
    for valuation in 0u64..1 << inputs.len() {
        let cube = bdd.cube(inputs.iter().enumerate().map(|(i, v)| {
            if valuation >> i & 1 != 0 {
                v as i32
            } else {
                -(v as i32)
            }
        }));
        if bdd
            .assignments(bdd.apply_and(strategy, cube), &all)
            .take(2)
            .count()
            > 1
        {
            return false;
        }
    }
    true
}
