//! A growable list that remembers whether anything was inserted since it was recycled

use std::ops::Deref;

use super::recycler::{Pooled, Recycler};
use crate::error::CleanupResult;
use crate::registry::CleanupRegistry;

/// Capacity a freshly created list starts with
pub const DEFAULT_INITIAL_CAPACITY: usize = 8;

/// List whose `insert_since_recycled` flag is raised by every successful
/// insertion and lowered by [`recycle`](Self::recycle).
///
/// # Examples
///
/// ```
/// use lifeline::pool::RecyclableList;
///
/// let mut list = RecyclableList::new();
/// assert!(!list.insert_since_recycled());
///
/// list.push("a");
/// assert!(list.insert_since_recycled());
///
/// list.recycle();
/// assert!(list.is_empty());
/// assert!(!list.insert_since_recycled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecyclableList<T> {
    items: Vec<T>,
    insert_since_recycled: bool,
}

impl<T> RecyclableList<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            insert_since_recycled: false,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.insert_since_recycled = true;
    }

    /// Insert at `index`, shifting later items right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index, item);
        self.insert_since_recycled = true;
    }

    /// Replace the item at `index`, returning the old one, or `None` if out of bounds.
    pub fn set(&mut self, index: usize, item: T) -> Option<T> {
        let slot = self.items.get_mut(index)?;
        let old = std::mem::replace(slot, item);
        self.insert_since_recycled = true;
        Some(old)
    }

    /// Append every item from `iter`. Returns whether anything was added.
    pub fn extend_from<I>(&mut self, iter: I) -> bool
    where
        I: IntoIterator<Item = T>,
    {
        let before = self.items.len();
        self.items.extend(iter);
        let added = self.items.len() > before;
        if added {
            self.insert_since_recycled = true;
        }
        added
    }

    /// Insert every item from `iter` at `index`, keeping their order. Returns
    /// whether anything was inserted.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_all<I>(&mut self, index: usize, iter: I) -> bool
    where
        I: IntoIterator<Item = T>,
    {
        let before = self.items.len();
        self.items.splice(index..index, iter);
        let inserted = self.items.len() > before;
        if inserted {
            self.insert_since_recycled = true;
        }
        inserted
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn insert_since_recycled(&self) -> bool {
        self.insert_since_recycled
    }

    /// Clear the contents and lower the insertion flag, keeping the allocation.
    pub fn recycle(&mut self) {
        self.items.clear();
        self.insert_since_recycled = false;
    }

    pub fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Send + 'static> RecyclableList<T> {
    /// Pool of lists that are recycled on release.
    pub fn pool(capacity: usize, registry: &CleanupRegistry) -> Recycler<RecyclableList<T>> {
        Recycler::new(capacity, registry, RecyclableList::new, RecyclableList::recycle)
    }

    /// Acquire a list from `pool` with room for at least `min_capacity` items.
    pub fn acquire_with_capacity(
        pool: &Recycler<RecyclableList<T>>,
        min_capacity: usize,
    ) -> CleanupResult<Pooled<RecyclableList<T>>> {
        let mut list = pool.acquire()?;
        let len = list.len();
        if list.capacity() < min_capacity {
            list.reserve(min_capacity - len);
        }
        Ok(list)
    }
}

impl<T> Default for RecyclableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for RecyclableList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> Extend<T> for RecyclableList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.extend_from(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaperConfig;
    use proptest::prelude::*;

    #[test]
    fn add_all_reports_success() {
        let mut list = RecyclableList::new();
        assert!(list.extend_from(["A", "B", "C", "D"]));
        assert_eq!(list.as_slice(), &["A", "B", "C", "D"]);
        assert!(list.insert_since_recycled());
    }

    #[test]
    fn empty_extend_leaves_flag_down() {
        let mut list: RecyclableList<u8> = RecyclableList::new();
        assert!(!list.extend_from(std::iter::empty()));
        assert!(!list.insert_since_recycled());
    }

    #[test]
    fn positional_add_all_keeps_order_and_reports_success() {
        let mut list = RecyclableList::new();
        assert!(!list.insert_all(0, Vec::new()));
        assert!(!list.insert_since_recycled());

        assert!(list.insert_all(0, ["A", "D"]));
        assert!(list.insert_all(1, vec!["B", "C"]));
        assert_eq!(list.as_slice(), &["A", "B", "C", "D"]);
        assert!(list.insert_since_recycled());
    }

    #[test]
    #[should_panic]
    fn positional_add_all_past_the_end_panics() {
        let mut list = RecyclableList::new();
        list.push(1);
        list.insert_all(3, [2]);
    }

    #[test]
    fn set_and_insert_raise_the_flag() {
        let mut list = RecyclableList::new();
        list.push(1);
        list.recycle();

        assert_eq!(list.set(0, 5), None);
        assert!(!list.insert_since_recycled());

        list.insert(0, 2);
        list.recycle();
        list.push(3);
        list.recycle();
        list.push(4);
        assert_eq!(list.set(0, 9), Some(4));
        assert!(list.insert_since_recycled());
        assert_eq!(list.remove(0), Some(9));
        assert_eq!(list.remove(0), None);
    }

    #[test]
    fn recycle_keeps_allocation() {
        let mut list = RecyclableList::with_capacity(32);
        list.extend(0..20);
        list.recycle();
        assert!(list.is_empty());
        assert!(list.capacity() >= 32);
    }

    #[test]
    fn pooled_lists_come_back_clean() {
        let registry = CleanupRegistry::manual(ReaperConfig::default());
        let pool = RecyclableList::<String>::pool(4, &registry);

        let mut list = RecyclableList::acquire_with_capacity(&pool, 64).unwrap();
        assert!(list.capacity() >= 64);
        list.push("frame".to_string());
        assert!(pool.release(list));

        let list = pool.acquire().unwrap();
        assert!(list.is_empty());
        assert!(!list.insert_since_recycled());
        assert!(list.capacity() >= 64);
    }

    proptest! {
        #[test]
        fn flag_tracks_insertions_since_last_recycle(ops in prop::collection::vec(0u8..4, 0..64)) {
            let mut list = RecyclableList::new();
            let mut expected = false;
            for op in ops {
                match op {
                    0 => { list.push(op); expected = true; }
                    1 => { list.insert(0, op); expected = true; }
                    2 => {
                        if list.set(0, op).is_some() {
                            expected = true;
                        }
                    }
                    _ => { list.recycle(); expected = false; }
                }
                prop_assert_eq!(list.insert_since_recycled(), expected);
            }
        }
    }
}
