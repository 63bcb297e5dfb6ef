//! Variable allocation for symbolic automata.
//!
//! A [`VarAlloc`] is an immutable bijection between *global* variable indices
//! (positions in the manager's variable order, 0-based) and *local* indices
//! (per-kind, 0-based). The three construction strategies (contiguous ranges,
//! sequential combination with a shared alphabet, colour extension) all
//! produce plain values; queries never allocate.

use crate::bitset::BitSet;
use crate::error::SynthesisError;

/// The role a variable plays in the transition relation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VarKind {
    State,
    Colour,
    AtomicProposition,
    SuccessorState,
}

impl VarKind {
    pub const ALL: [VarKind; 4] = [
        VarKind::State,
        VarKind::Colour,
        VarKind::AtomicProposition,
        VarKind::SuccessorState,
    ];

    pub fn ordinal(self) -> usize {
        match self {
            VarKind::State => 0,
            VarKind::Colour => 1,
            VarKind::AtomicProposition => 2,
            VarKind::SuccessorState => 3,
        }
    }

    /// One-letter prefix used in variable names.
    pub fn symbol(self) -> char {
        match self {
            VarKind::State => 's',
            VarKind::Colour => 'c',
            VarKind::AtomicProposition => 'a',
            VarKind::SuccessorState => 'x',
        }
    }
}

/// Maps a 0-based global index to the manager's 1-based variable index.
pub fn bdd_var(global: usize) -> u32 {
    (global + 1) as u32
}

/// Shifts a set of global indices into manager variable indices.
pub fn bdd_vars(globals: &BitSet) -> BitSet {
    globals.iter().map(|g| g + 1).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarAlloc {
    kinds: Vec<VarKind>,
    global_to_local: Vec<usize>,
    local_to_global: [Vec<usize>; 4],
    // One entry per subset of the four kinds, indexed by kind bitmask.
    variables_cache: Vec<BitSet>,
}

impl VarAlloc {
    /// An allocation with the given kind at every global index, in order.
    pub fn from_kinds(kinds: Vec<VarKind>) -> Self {
        let mut global_to_local = vec![0; kinds.len()];
        let mut local_to_global: [Vec<usize>; 4] = Default::default();
        for (global, &kind) in kinds.iter().enumerate() {
            let per_kind = &mut local_to_global[kind.ordinal()];
            global_to_local[global] = per_kind.len();
            per_kind.push(global);
        }

        let variables_cache = (0..16)
            .map(|mask| {
                kinds
                    .iter()
                    .enumerate()
                    .filter(|(_, kind)| mask & (1 << kind.ordinal()) != 0)
                    .map(|(global, _)| global)
                    .collect()
            })
            .collect();

        Self {
            kinds,
            global_to_local,
            local_to_global,
            variables_cache,
        }
    }

    /// Four contiguous blocks, in the given order. `counts` is parallel to
    /// `order`.
    pub fn ranged(order: [VarKind; 4], counts: [usize; 4]) -> Self {
        let mut kinds = Vec::new();
        for (kind, count) in order.into_iter().zip(counts) {
            kinds.extend(std::iter::repeat(kind).take(count));
        }
        Self::from_kinds(kinds)
    }

    /// Combines allocations over a shared alphabet into one variable space.
    ///
    /// The combined order is the shared atomic propositions first, then each
    /// input allocation's non-AP variables in input order. The second result
    /// maps, per input allocation, its global indices to combined global
    /// indices.
    pub fn combine_sequential(
        allocations: &[&VarAlloc],
    ) -> Result<(VarAlloc, Vec<Vec<usize>>), SynthesisError> {
        if allocations.is_empty() {
            return Err(SynthesisError::EmptyProduct);
        }
        let num_aps = allocations[0].variables(&[VarKind::AtomicProposition]).len();
        if allocations
            .iter()
            .any(|a| a.variables(&[VarKind::AtomicProposition]).len() != num_aps)
        {
            return Err(SynthesisError::IncompatibleAlphabets);
        }

        let mut kinds = vec![VarKind::AtomicProposition; num_aps];
        let mut embeddings = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            let offset = kinds.len();
            let mut embedding = vec![0; allocation.num_variables()];
            let mut placed = 0;
            for (global, &kind) in allocation.kinds.iter().enumerate() {
                if kind == VarKind::AtomicProposition {
                    embedding[global] = allocation.global_to_local[global];
                } else {
                    embedding[global] = offset + placed;
                    kinds.push(kind);
                    placed += 1;
                }
            }
            embeddings.push(embedding);
        }

        Ok((Self::from_kinds(kinds), embeddings))
    }

    /// A copy with `n` fresh colour variables appended after all existing
    /// ones. Existing global indices are unchanged.
    pub fn extend_with_colours(&self, n: usize) -> Self {
        let mut kinds = self.kinds.clone();
        kinds.extend(std::iter::repeat(VarKind::Colour).take(n));
        Self::from_kinds(kinds)
    }

    pub fn num_variables(&self) -> usize {
        self.kinds.len()
    }

    pub fn kind_of(&self, global: usize) -> VarKind {
        self.kinds[global]
    }

    /// Global indices of all variables of the given kinds.
    pub fn variables(&self, kinds: &[VarKind]) -> &BitSet {
        let mut mask = 0usize;
        for kind in kinds {
            mask |= 1 << kind.ordinal();
        }
        &self.variables_cache[mask]
    }

    pub fn local_to_global(&self, local: usize, kind: VarKind) -> usize {
        self.local_to_global[kind.ordinal()][local]
    }

    pub fn global_to_local(&self, global: usize) -> usize {
        assert!(global < self.num_variables());
        self.global_to_local[global]
    }

    pub fn local_to_global_set(&self, locals: &BitSet, kind: VarKind) -> BitSet {
        locals
            .iter()
            .map(|local| self.local_to_global(local, kind))
            .collect()
    }

    /// Projects a set of global indices onto local indices of one kind.
    pub fn global_to_local_set(&self, globals: &BitSet, kind: VarKind) -> BitSet {
        globals
            .iter()
            .filter(|&g| self.kinds[g] == kind)
            .map(|g| self.global_to_local[g])
            .collect()
    }

    /// `s_0, c_0, a_0, x_0, ...` style names, per kind counter.
    pub fn variable_names(&self) -> Vec<String> {
        let mut counts = [0usize; 4];
        self.kinds
            .iter()
            .map(|kind| {
                let local = counts[kind.ordinal()];
                counts[kind.ordinal()] += 1;
                format!("{}_{}", kind.symbol(), local)
            })
            .collect()
    }
}
