use std::cell::Cell;

use crate::utils::CacheHash;

struct Entry<K, V> {
    key: K,
    value: V,
}

/// Direct-mapped operation cache.
///
/// Stores the full key, not just its hash: a slot collision evicts, it never
/// aliases two distinct operations.
pub struct Cache<K, V> {
    data: Vec<Option<Entry<K, V>>>,
    bitmask: u64,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<K, V> Cache<K, V> {
    /// Create a new cache of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");

        let size = 1 << bits;
        let bitmask = (size - 1) as u64;

        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask,
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    pub fn clear(&mut self) {
        self.data.fill_with(|| None);
    }

    fn index(&self, key: &K) -> usize
    where
        K: CacheHash,
    {
        (key.hash() & self.bitmask) as usize
    }

    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: CacheHash + Eq,
    {
        let index = self.index(key);
        match &self.data[index] {
            Some(entry) if &entry.key == key => {
                self.hits.set(self.hits.get() + 1);
                Some(&entry.value)
            }
            _ => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V)
    where
        K: CacheHash,
    {
        let index = self.index(&key);
        self.data[index] = Some(Entry { key, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Ref;

    #[test]
    fn test_cache() {
        let mut cache = Cache::<(Ref, Ref), i32>::new(3);

        let a = Ref::new(1);
        let b = Ref::new(2);
        let c = Ref::new(3);

        cache.insert((a, b), 3);
        cache.insert((b, c), 1);
        cache.insert((a, c), 2);

        assert_eq!(cache.get(&(a, b)), Some(&3));
        assert_eq!(cache.get(&(b, c)), Some(&1));
        assert_eq!(cache.get(&(a, c)), Some(&2));
        assert_eq!(cache.get(&(b, a)), None);
        assert_eq!(cache.get(&(c, a)), None);
    }

    #[test]
    fn test_no_aliasing_on_collision() {
        // One slot: every insert evicts, gets on the evicted key must miss.
        let mut cache = Cache::<(Ref, Ref), i32>::new(0);

        let a = Ref::new(1);
        let b = Ref::new(2);

        cache.insert((a, b), 10);
        cache.insert((b, a), 20);
        assert_eq!(cache.get(&(a, b)), None);
        assert_eq!(cache.get(&(b, a)), Some(&20));
    }
}
