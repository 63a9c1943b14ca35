//! An immutable, sparse map from chunk index to the column at which the
//! following line begins. Small and persistent enough that
//! copy-on-write is the right tradeoff: `add` is `O(size)`, not the
//! `O(1)` a true persistent trie would give, but every `SplitSet` in the
//! search is bounded by the batch's chunk count, which is small.

use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct SplitSet {
    entries: Rc<HashMap<usize, usize>>,
}

impl SplitSet {
    pub fn empty() -> Self {
        Self { entries: Rc::new(HashMap::new()) }
    }

    /// Returns a new `SplitSet` identical to `self` except that `index`
    /// now maps to `column`. `index` need not be contiguous with existing
    /// entries; gaps simply mean "no split there".
    pub fn add(&self, index: usize, column: usize) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(index, column);
        Self { entries: Rc::new(entries) }
    }

    pub fn should_split_at(&self, i: usize) -> bool {
        self.entries.contains_key(&i)
    }

    /// Panics (in debug builds) if `!should_split_at(i)`; callers are
    /// expected to check first, so this indicates a programmer error.
    pub fn get_column(&self, i: usize) -> usize {
        debug_assert!(self.should_split_at(i), "get_column({i}) on an unset SplitSet index");
        self.entries.get(&i).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
