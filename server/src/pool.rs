//! Fixed-cardinality item pools.
//!
//! Items are never removed, only swapped for a replacement, so the pool size
//! set at initialization holds for the lifetime of the pool.

/// An item addressable by a string id.
pub trait PoolItem: Clone {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct FixedPool<T> {
    prefix: &'static str,
    items: Vec<T>,
    next_serial: u64,
}

impl<T: PoolItem> FixedPool<T> {
    /// Create a pool of `count` items. `make` receives the id for each slot;
    /// ids run `<prefix>-0` through `<prefix>-(count-1)`.
    pub fn initialize(prefix: &'static str, count: usize, mut make: impl FnMut(String) -> T) -> Self {
        let mut pool = Self {
            prefix,
            items: Vec::with_capacity(count),
            next_serial: 0,
        };
        for _ in 0..count {
            let id = pool.next_id();
            pool.items.push(make(id));
        }
        pool
    }

    /// Allocate a fresh id. Ids are never handed out twice.
    pub fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next_serial);
        self.next_serial += 1;
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    /// Swap the item with `id` for `replacement`, keeping its slot.
    /// Returns the removed item, or `None` (dropping `replacement`) if `id` is unknown.
    pub fn replace(&mut self, id: &str, replacement: T) -> Option<T> {
        let slot = self.items.iter_mut().find(|item| item.id() == id)?;
        Some(std::mem::replace(slot, replacement))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
