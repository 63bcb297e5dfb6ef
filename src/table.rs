use std::cmp::min;
use std::ops::Index;

use crate::utils::CacheHash;

struct Entry<T> {
    value: T,
    next: usize,
}

/// Hash-consing storage with bucket chains.
///
/// Cell 0 is a sentry and never holds a value. Values are append-only:
/// every run of the pipeline is single-shot, so nothing is ever freed.
pub struct Table<T> {
    data: Vec<Entry<T>>,
    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table of capacity `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let capacity = 1 << bits;
        let mut data: Vec<Entry<T>> = Vec::with_capacity(capacity);
        // Sentry.
        data.push(Entry {
            value: T::default(),
            next: 0,
        });

        let buckets_bits = min(bits, 16);
        let buckets_size = 1 << buckets_bits;
        let buckets = vec![0; buckets_size];
        let bitmask = (buckets_size - 1) as u64;

        Self {
            data,
            buckets,
            bitmask,
        }
    }
}

impl<T> Table<T> {
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Number of stored values (sentry excluded).
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }

    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }

    fn set_next(&mut self, index: usize, next: usize) {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next = next;
    }

    /// Append a new value and return its index.
    fn add(&mut self, value: T) -> usize {
        if self.data.len() == self.data.capacity() {
            panic!("Storage is full");
        }
        self.data.push(Entry { value, next: 0 });
        self.data.len() - 1
    }
}

impl<T> Table<T>
where
    T: CacheHash,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Find or insert a value, returning its index.
    pub fn put(&mut self, value: T) -> usize
    where
        T: Eq,
    {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return i;
        }

        loop {
            assert!(index > 0);

            if &value == self.value(index) {
                return index;
            }

            let next = self.next(index);

            if next == 0 {
                let i = self.add(value);
                self.set_next(index, i);
                return i;
            } else {
                index = next;
            }
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl CacheHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_put_dedup() {
        let mut storage = Table::new(4);
        let index1 = storage.put(Item(5));
        let index2 = storage.put(Item(5));
        assert_eq!(index1, index2);
        assert_eq!(storage.size(), 1);
    }

    #[test]
    fn test_put_collision_chain() {
        let mut storage = Table::new(4);
        // Same hash, different values.
        let index1 = storage.put(Item(5));
        let index2 = storage.put(Item(-5));
        assert_ne!(index1, index2);
        assert_eq!(storage[index1], Item(5));
        assert_eq!(storage[index2], Item(-5));
        assert_eq!(storage.next(index1), index2);
    }

    #[test]
    #[should_panic(expected = "Storage is full")]
    fn test_full() {
        let mut storage = Table::new(1);
        storage.put(Item(1));
        storage.put(Item(2));
    }
}
