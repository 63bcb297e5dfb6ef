use std::cell::RefCell;
use std::cmp::min;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;
use num_bigint::BigUint;

use crate::bitset::BitSet;
use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing2, pairing3, CacheHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::new(0),
            high: Ref::new(0),
        }
    }
}

impl CacheHash for Node {
    fn hash(&self) -> u64 {
        pairing3(self.variable as u64, self.low.hash(), self.high.hash())
    }
}

type Storage = Table<Node>;

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum OpKey {
    Ite(Ref, Ref, Ref),
    Exists(Ref, Ref),
    AndExists(Ref, Ref, Ref),
}

impl CacheHash for OpKey {
    fn hash(&self) -> u64 {
        match *self {
            // Cross-variant collisions only cost an eviction; the cache
            // compares full keys.
            OpKey::Ite(f, g, h) => pairing3(f.hash(), g.hash(), h.hash()),
            OpKey::Exists(f, c) => pairing2(f.hash(), c.hash()),
            OpKey::AndExists(f, g, c) => pairing3(g.hash(), f.hash(), c.hash()),
        }
    }
}

/// A BDD manager with complement edges.
///
/// Variables are `u32` indices starting at 1 (0 is reserved for terminals);
/// a smaller index is closer to the root. Negation is free (`-f`).
pub struct Bdd {
    storage: RefCell<Storage>,
    cache: RefCell<Cache<OpKey, Ref>>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let cache_bits = min(storage_bits, 16);

        let mut storage = Storage::new(storage_bits);

        // Allocate the terminal node at index 1.
        let one = storage.put(Node::default());
        assert_eq!(one, 1);
        let one = Ref::new(one as i32);
        let zero = -one;

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(cache_bits)),
            zero,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(21)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .finish()
    }
}

impl Bdd {
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn cache_hits(&self) -> usize {
        self.cache.borrow().hits()
    }
    pub fn cache_misses(&self) -> usize {
        self.cache.borrow().misses()
    }

    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).high
    }

    /// Low child with the complement edge of `node` pushed through.
    pub fn low_node(&self, node: Ref) -> Ref {
        node.apply_sign(self.low(node.index()))
    }
    /// High child with the complement edge of `node` pushed through.
    pub fn high_node(&self, node: Ref) -> Ref {
        node.apply_sign(self.high(node.index()))
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        self.is_zero(node) || self.is_one(node)
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        // Canonicity: the high edge is never complemented.
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        if low == high {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::new(i as i32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    /// Conjunction of literals. Positive literal `v`, negative `-v`.
    pub fn cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&v| v.abs());
        debug!("cube(literals = {:?})", literals);
        literals.reverse();
        let mut current = self.one;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            current = if lit < 0 {
                self.mk_node(-lit as u32, current, self.zero)
            } else {
                self.mk_node(lit as u32, self.zero, current)
            };
        }
        current
    }

    /// Positive cube over a variable set.
    pub fn cube_vars(&self, vars: &BitSet) -> Ref {
        self.cube(vars.iter().map(|v| v as i32))
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        let i = node.index();
        if self.is_terminal(node) || v < self.variable(i) {
            return (node, node);
        }
        assert_eq!(v, self.variable(i));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        assert!(!self.is_terminal(f));
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        let g = if g == f {
            self.one
        } else if g == -f {
            self.zero
        } else {
            g
        };
        let h = if h == f {
            self.zero
        } else if h == -f {
            self.one
        } else {
            h
        };
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Normalize to a regular f:
        //   ite(~F,G,H) => ite(F,H,G)
        let (mut f, mut g, mut h) = (f, g, h);
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }

        // Normalize to a regular g:
        //   ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let (f, g, h) = (f, g, h);

        let key = OpKey::Ite(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return if n { -res } else { res };
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        assert_ne!(i, 0);

        // Top variable among the non-terminal arguments:
        let mut m = i;
        if j != 0 {
            m = m.min(j);
        }
        if k != 0 {
            m = m.min(k);
        }

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        debug!(
            "computed: apply_ite(f = {}, g = {}, h = {}) -> {}",
            f, g, h, res
        );
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes.into_iter() {
            res = self.apply_and(res, node);
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes.into_iter() {
            res = self.apply_or(res, node);
        }
        res
    }

    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.apply_imply(f, g) == self.one
    }

    /// Existentially quantify the variables in `vars`.
    pub fn exists(&self, f: Ref, vars: &BitSet) -> Ref {
        debug!("exists(f = {}, |vars| = {})", f, vars.len());
        let cube = self.cube_vars(vars);
        self.exists_cube(f, cube)
    }

    /// Existentially quantify the variables of a positive cube.
    pub fn exists_cube(&self, f: Ref, cube: Ref) -> Ref {
        if self.is_terminal(f) || self.is_one(cube) {
            return f;
        }
        assert!(!cube.is_negated());

        let top = self.variable(f.index());

        // Quantified variables above the top of f cannot occur in f.
        let mut cube = cube;
        while !self.is_one(cube) && self.variable(cube.index()) < top {
            cube = self.high(cube.index());
        }
        if self.is_one(cube) {
            return f;
        }

        let key = OpKey::Exists(f, cube);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res;
        }

        let f0 = self.low_node(f);
        let f1 = self.high_node(f);

        let res = if self.variable(cube.index()) == top {
            let rest = self.high(cube.index());
            let r0 = self.exists_cube(f0, rest);
            if self.is_one(r0) {
                self.one
            } else {
                self.apply_or(r0, self.exists_cube(f1, rest))
            }
        } else {
            let low = self.exists_cube(f0, cube);
            let high = self.exists_cube(f1, cube);
            self.apply_ite(self.mk_var(top), high, low)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    /// Relational product: `∃ vars. f ∧ g` in one recursion.
    pub fn and_exists(&self, f: Ref, g: Ref, vars: &BitSet) -> Ref {
        debug!("and_exists(f = {}, g = {}, |vars| = {})", f, g, vars.len());
        let cube = self.cube_vars(vars);
        self.and_exists_cube(f, g, cube)
    }

    fn and_exists_cube(&self, f: Ref, g: Ref, cube: Ref) -> Ref {
        if self.is_zero(f) || self.is_zero(g) || f == -g {
            return self.zero;
        }
        if self.is_one(f) && self.is_one(g) {
            return self.one;
        }
        if self.is_one(f) {
            return self.exists_cube(g, cube);
        }
        if self.is_one(g) || f == g {
            return self.exists_cube(f, cube);
        }
        if self.is_one(cube) {
            return self.apply_and(f, g);
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let top = match (i, j) {
            (0, j) => j,
            (i, 0) => i,
            (i, j) => i.min(j),
        };
        assert_ne!(top, 0);

        let mut cube = cube;
        while !self.is_one(cube) && self.variable(cube.index()) < top {
            cube = self.high(cube.index());
        }
        if self.is_one(cube) {
            return self.apply_and(f, g);
        }

        let key = OpKey::AndExists(f, g, cube);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, top);
        let (g0, g1) = self.top_cofactors(g, top);

        let res = if self.variable(cube.index()) == top {
            let rest = self.high(cube.index());
            let r0 = self.and_exists_cube(f0, g0, rest);
            if self.is_one(r0) {
                self.one
            } else {
                self.apply_or(r0, self.and_exists_cube(f1, g1, rest))
            }
        } else {
            let low = self.and_exists_cube(f0, g0, cube);
            let high = self.and_exists_cube(f1, g1, cube);
            self.apply_ite(self.mk_var(top), high, low)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    /// Rebuild `f` with every variable replaced through `map`.
    ///
    /// Variables absent from `map` are kept. The map must be injective on
    /// `support(f) ∪ image(map)`; the rebuild goes through ITE, so maps that
    /// do not respect the variable order are fine.
    pub fn relabel(&self, f: Ref, map: &HashMap<u32, u32>) -> Ref {
        debug!("relabel(f = {}, map = {} entries)", f, map.len());
        let mut memo = HashMap::new();
        self.relabel_(f, map, &mut memo)
    }

    fn relabel_(&self, f: Ref, map: &HashMap<u32, u32>, memo: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        // Structure-preserving: relabel(~f) = ~relabel(f).
        let r = f.regular();
        if let Some(&res) = memo.get(&r) {
            return f.apply_sign(res);
        }

        let v = self.variable(r.index());
        let w = map.get(&v).copied().unwrap_or(v);

        let low = self.relabel_(self.low_node(r), map, memo);
        let high = self.relabel_(self.high_node(r), map, memo);
        let res = self.apply_ite(self.mk_var(w), high, low);

        memo.insert(r, res);
        f.apply_sign(res)
    }

    /// Cofactor by a partial assignment.
    pub fn restrict(&self, f: Ref, values: &HashMap<u32, bool>) -> Ref {
        debug!("restrict(f = {}, values = {:?})", f, values);
        let mut memo = HashMap::new();
        self.restrict_(f, values, &mut memo)
    }

    fn restrict_(
        &self,
        f: Ref,
        values: &HashMap<u32, bool>,
        memo: &mut HashMap<Ref, Ref>,
    ) -> Ref {
        if self.is_terminal(f) || values.is_empty() {
            return f;
        }

        let r = f.regular();
        if let Some(&res) = memo.get(&r) {
            return f.apply_sign(res);
        }

        let v = self.variable(r.index());
        let res = if let Some(&b) = values.get(&v) {
            let child = if b {
                self.high_node(r)
            } else {
                self.low_node(r)
            };
            self.restrict_(child, values, memo)
        } else {
            let low = self.restrict_(self.low_node(r), values, memo);
            let high = self.restrict_(self.high_node(r), values, memo);
            self.mk_node(v, low, high)
        };

        memo.insert(r, res);
        f.apply_sign(res)
    }

    /// One satisfying assignment of `f`, total over `vars`, as signed
    /// literals. Variables not forced by the chosen path are set to false.
    /// Returns `None` iff `f` is unsatisfiable.
    pub fn one_sat_in(&self, f: Ref, vars: &BitSet) -> Option<Vec<i32>> {
        if self.is_zero(f) {
            return None;
        }

        let mut forced: HashMap<u32, bool> = HashMap::new();
        let mut cur = f;
        while !self.is_terminal(cur) {
            let v = self.variable(cur.index());
            let low = self.low_node(cur);
            if !self.is_zero(low) {
                forced.insert(v, false);
                cur = low;
            } else {
                forced.insert(v, true);
                cur = self.high_node(cur);
            }
        }
        assert!(self.is_one(cur));

        Some(
            vars.iter()
                .map(|v| {
                    let v = v as i32;
                    if forced.get(&(v as u32)).copied().unwrap_or(false) {
                        v
                    } else {
                        -v
                    }
                })
                .collect(),
        )
    }

    /// All satisfying assignments of `f`, total over `vars`.
    ///
    /// Requires `support(f) ⊆ vars`. Each item is parallel to the ascending
    /// iteration order of `vars`.
    pub fn assignments(&self, f: Ref, vars: &BitSet) -> Assignments<'_> {
        let vars: Vec<u32> = vars.iter().map(|v| v as u32).collect();
        debug_assert!(self
            .support(f)
            .is_subset_of(&vars.iter().map(|&v| v as usize).collect()));
        let stack = if self.is_zero(f) {
            vec![]
        } else {
            vec![(f, Vec::new())]
        };
        Assignments {
            bdd: self,
            vars,
            stack,
        }
    }

    /// Number of satisfying assignments over the universe of variables
    /// `1..=num_vars`.
    pub fn sat_count(&self, f: Ref, num_vars: u32) -> BigUint {
        debug!("sat_count(f = {}, num_vars = {})", f, num_vars);
        let mut memo = HashMap::new();
        self.sat_count_(f, 1, num_vars, &mut memo)
    }

    // Counts assignments over vars `from..=num_vars`.
    fn sat_count_(
        &self,
        f: Ref,
        from: u32,
        num_vars: u32,
        memo: &mut HashMap<Ref, BigUint>,
    ) -> BigUint {
        if self.is_zero(f) {
            return BigUint::ZERO;
        }
        if self.is_one(f) {
            return BigUint::from(1u32) << (num_vars + 1 - from);
        }

        let v = self.variable(f.index());
        assert!(v >= from);
        assert!(v <= num_vars);

        // Memo holds the count from f's own level.
        let at_level = if let Some(cached) = memo.get(&f) {
            cached.clone()
        } else {
            let low = self.sat_count_(self.low_node(f), v + 1, num_vars, memo);
            let high = self.sat_count_(self.high_node(f), v + 1, num_vars, memo);
            let count = low + high;
            memo.insert(f, count.clone());
            count
        };
        at_level << (v - from)
    }

    /// The set of variables `f` depends on.
    pub fn support(&self, f: Ref) -> BitSet {
        let mut support = BitSet::empty();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([f.index()]);

        while let Some(i) = queue.pop_front() {
            if !visited.insert(i) {
                continue;
            }
            let v = self.variable(i);
            if v == 0 {
                continue;
            }
            support.insert(v as usize);
            queue.push_back(self.low(i).index());
            queue.push_back(self.high(i).index());
        }

        support
    }

    /// Number of distinct nodes reachable from `f` (terminal included).
    pub fn size(&self, f: Ref) -> u64 {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([f.index()]);
        while let Some(i) = queue.pop_front() {
            if visited.insert(i) && self.variable(i) != 0 {
                queue.push_back(self.low(i).index());
                queue.push_back(self.high(i).index());
            }
        }
        visited.len() as u64
    }
}

pub struct Assignments<'a> {
    bdd: &'a Bdd,
    vars: Vec<u32>,
    stack: Vec<(Ref, Vec<bool>)>,
}

impl Iterator for Assignments<'_> {
    type Item = Vec<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, assign)) = self.stack.pop() {
            if assign.len() == self.vars.len() {
                assert!(self.bdd.is_one(node));
                return Some(assign);
            }

            let target = self.vars[assign.len()];
            let (low, high) = if self.bdd.is_terminal(node)
                || self.bdd.variable(node.index()) > target
            {
                // Don't-care: expand both branches.
                (node, node)
            } else {
                assert_eq!(self.bdd.variable(node.index()), target);
                (self.bdd.low_node(node), self.bdd.high_node(node))
            };

            if !self.bdd.is_zero(high) {
                let mut a = assign.clone();
                a.push(true);
                self.stack.push((high, a));
            }
            if !self.bdd.is_zero(low) {
                let mut a = assign;
                a.push(false);
                self.stack.push((low, a));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);

        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one);
        assert_eq!(bdd.low_node(x), bdd.zero);

        let not_x = -x;
        assert_eq!(bdd.high_node(not_x), bdd.zero);
        assert_eq!(bdd.low_node(not_x), bdd.one);
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        assert_eq!(-bdd.apply_and(x, y), bdd.apply_or(-x, -y));
        assert_eq!(-bdd.apply_or(x, y), bdd.apply_and(-x, -y));
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();

        let g = bdd.mk_var(2);
        let h = bdd.mk_var(3);
        assert_eq!(bdd.apply_ite(bdd.one, g, h), g);
        assert_eq!(bdd.apply_ite(bdd.zero, g, h), h);

        let f = bdd.mk_var(1);
        assert_eq!(bdd.apply_ite(f, g, g), g);
        assert_eq!(bdd.apply_ite(f, bdd.one, bdd.zero), f);
        assert_eq!(bdd.apply_ite(f, bdd.zero, bdd.one), -f);

        assert_eq!(bdd.apply_ite(f, f, h), bdd.apply_or(f, h));
        assert_eq!(bdd.apply_ite(f, g, f), bdd.apply_and(f, g));

        let result = bdd.mk_node(1, -g, -h);
        assert_eq!(bdd.apply_ite(-f, -g, -h), result);
    }

    #[test]
    fn test_cube() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and_many([x1, -x2, x3]);
        assert_eq!(f, bdd.cube([1, -2, 3]));
        assert_eq!(f, bdd.cube([3, 1, -2]));
    }

    #[test]
    fn test_exists() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // ∃x2. (x1 ∧ x2) ∨ (x2 ∧ x3) = x1 ∨ x3
        let f = bdd.apply_or(bdd.apply_and(x1, x2), bdd.apply_and(x2, x3));
        let vars: BitSet = [2].into_iter().collect();
        assert_eq!(bdd.exists(f, &vars), bdd.apply_or(x1, x3));

        // ∃x1 x3. x1 ∧ ~x3 = 1
        let g = bdd.apply_and(x1, -x3);
        let vars: BitSet = [1, 3].into_iter().collect();
        assert_eq!(bdd.exists(g, &vars), bdd.one);

        // Negated argument: ∃x1. ~(x1 ∧ x2) = 1
        let vars: BitSet = [1].into_iter().collect();
        assert_eq!(bdd.exists(-bdd.apply_and(x1, x2), &vars), bdd.one);
        assert_eq!(bdd.exists(bdd.apply_and(x1, x2), &vars), x2);
    }

    #[test]
    fn test_and_exists_matches_two_step() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);
        let x4 = bdd.mk_var(4);

        let f = bdd.apply_or(bdd.apply_and(x1, x2), bdd.apply_xor(x3, x4));
        let g = bdd.apply_or(bdd.apply_eq(x1, x3), -x2);
        let vars: BitSet = [2, 3].into_iter().collect();

        let fused = bdd.and_exists(f, g, &vars);
        let two_step = bdd.exists(bdd.apply_and(f, g), &vars);
        assert_eq!(fused, two_step);
    }

    #[test]
    fn test_relabel_swap() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and(x1, bdd.apply_or(x2, x3));
        // Swap 1 <-> 3 (order-reversing, exercises the ITE rebuild).
        let map = HashMap::from([(1, 3), (3, 1)]);
        let g = bdd.relabel(f, &map);
        assert_eq!(g, bdd.apply_and(x3, bdd.apply_or(x2, x1)));

        // Involution.
        assert_eq!(bdd.relabel(g, &map), f);
    }

    #[test]
    fn test_restrict() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_or(bdd.apply_eq(x1, x2), x3);
        let values = HashMap::from([(2, false)]);
        assert_eq!(bdd.restrict(f, &values), bdd.apply_or(-x1, x3));
    }

    #[test]
    fn test_one_sat_in() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_and(x1, -x3);
        let vars: BitSet = [1, 2, 3].into_iter().collect();
        let lits = bdd.one_sat_in(f, &vars).unwrap();
        // Don't-care x2 resolves to false.
        assert_eq!(lits, vec![1, -2, -3]);

        assert_eq!(bdd.one_sat_in(bdd.zero, &vars), None);
        assert_eq!(bdd.one_sat_in(bdd.one, &vars), Some(vec![-1, -2, -3]));
    }

    #[test]
    fn test_assignments() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // x1 ∧ (x2 ∨ x3): 3 assignments.
        let f = bdd.apply_and(x1, bdd.apply_or(x2, x3));
        let vars: BitSet = [1, 2, 3].into_iter().collect();
        let mut found: Vec<Vec<bool>> = bdd.assignments(f, &vars).collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                vec![true, false, true],
                vec![true, true, false],
                vec![true, true, true],
            ]
        );

        assert_eq!(bdd.assignments(bdd.zero, &vars).count(), 0);
        assert_eq!(bdd.assignments(bdd.one, &vars).count(), 8);
    }

    #[test]
    fn test_sat_count() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        assert_eq!(bdd.sat_count(bdd.one, 3), BigUint::from(8u32));
        assert_eq!(bdd.sat_count(bdd.zero, 3), BigUint::ZERO);
        assert_eq!(bdd.sat_count(x1, 3), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(bdd.apply_and(x1, x2), 3), BigUint::from(2u32));
        assert_eq!(bdd.sat_count(bdd.apply_or(x1, x2), 3), BigUint::from(6u32));
        assert_eq!(bdd.sat_count(-bdd.apply_and(x1, x2), 3), BigUint::from(6u32));
    }

    #[test]
    fn test_support() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x3 = bdd.mk_var(3);

        let f = bdd.apply_xor(x1, x3);
        let support: Vec<_> = bdd.support(f).iter().collect();
        assert_eq!(support, vec![1, 3]);

        assert!(bdd.support(bdd.one).is_empty());
    }

    #[test]
    fn test_is_implies() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        let f = bdd.apply_and(x1, x2);
        assert!(bdd.is_implies(f, x1));
        assert!(bdd.is_implies(f, bdd.apply_or(x1, x2)));
        assert!(!bdd.is_implies(x1, f));
        assert!(bdd.is_implies(bdd.zero, f));
    }

    #[test]
    fn test_apply_not() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        let f = bdd.apply_xor(x, y);
        assert_eq!(bdd.apply_not(f), -f);
        assert_eq!(bdd.apply_not(bdd.apply_not(f)), f);
        assert_eq!(bdd.apply_not(bdd.one), bdd.zero);
        assert_eq!(bdd.apply_not(bdd.zero), bdd.one);
    }

    #[test]
    fn test_node_and_cache_counters() {
        let bdd = Bdd::default();
        let initial_nodes = bdd.num_nodes();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);
        assert!(bdd.num_nodes() > initial_nodes);
        assert!(bdd.cache_misses() > 0);

        // The repeated operation is answered from the cache without
        // allocating new nodes.
        let nodes = bdd.num_nodes();
        let hits = bdd.cache_hits();
        assert_eq!(bdd.apply_and(x, y), f);
        assert_eq!(bdd.num_nodes(), nodes);
        assert!(bdd.cache_hits() > hits);
    }
}
