use crate::reference::Ref;

/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: https://en.wikipedia.org/wiki/Pairing_function
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Hash function used for node-table buckets and op-cache slots.
pub trait CacheHash {
    fn hash(&self) -> u64;
}

impl CacheHash for Ref {
    fn hash(&self) -> u64 {
        self.inner().unsigned_abs() as u64 * 2 + self.is_negated() as u64
    }
}

impl CacheHash for (Ref, Ref) {
    fn hash(&self) -> u64 {
        pairing2(self.0.hash(), self.1.hash())
    }
}

impl CacheHash for (Ref, Ref, Ref) {
    fn hash(&self) -> u64 {
        pairing3(self.0.hash(), self.1.hash(), self.2.hash())
    }
}
