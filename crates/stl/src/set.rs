//! Ordered set of unique keys

use core::cmp::Ordering;
use core::fmt;

use crate::tree::{Compare, Identity, IntoIter, Iter, Less, Position, RbTree, Range};

/// Sorted set backed by [`RbTree`] with unique insertion.
///
/// # Examples
/// ```
/// use nebula_stl::set::TreeSet;
///
/// let mut set: TreeSet<i32> = [3, 1, 3, 2].into_iter().collect();
/// assert_eq!(set.len(), 3);
/// assert!(set.remove(&3));
/// assert!(set.iter().copied().eq([1, 2]));
/// ```
#[derive(Clone)]
pub struct TreeSet<K, C = Less> {
    tree: RbTree<K, Identity, C>,
}

impl<K> TreeSet<K> {
    pub fn new() -> Self {
        Self {
            tree: RbTree::new(),
        }
    }
}

impl<K, C> TreeSet<K, C> {
    pub fn with_compare(compare: C) -> Self {
        Self {
            tree: RbTree::with_compare(compare),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn swap(&mut self, other: &mut Self) {
        self.tree.swap(&mut other.tree);
    }

    pub fn iter(&self) -> Iter<'_, K> {
        self.tree.iter()
    }

    pub fn range(&self, first: Position, last: Position) -> Range<'_, K> {
        self.tree.range(first, last)
    }

    pub fn begin(&self) -> Position {
        self.tree.begin()
    }

    pub fn end(&self) -> Position {
        self.tree.end()
    }

    pub fn next(&self, pos: Position) -> Position {
        self.tree.next(pos)
    }

    pub fn prev(&self, pos: Position) -> Position {
        self.tree.prev(pos)
    }

    pub fn get_at(&self, pos: Position) -> Option<&K> {
        self.tree.value(pos)
    }

    pub fn first(&self) -> Option<&K> {
        self.tree.first()
    }

    pub fn last(&self) -> Option<&K> {
        self.tree.last()
    }

    /// The underlying tree.
    pub fn as_tree(&self) -> &RbTree<K, Identity, C> {
        &self.tree
    }
}

impl<K, C: Compare<K>> TreeSet<K, C> {
    /// Adds `key`; `false` with the existing position when already present.
    pub fn insert(&mut self, key: K) -> (Position, bool) {
        self.tree.insert_unique(key)
    }

    pub fn insert_hint(&mut self, hint: Position, key: K) -> Position {
        self.tree.insert_unique_hint(hint, key)
    }

    /// Removes `key`; `true` when it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.tree.erase_key(key) > 0
    }

    pub fn erase(&mut self, pos: Position) -> Option<K> {
        self.tree.erase(pos)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.tree.contains(key)
    }

    pub fn find(&self, key: &K) -> Position {
        self.tree.find(key)
    }

    /// 0 or 1.
    pub fn count(&self, key: &K) -> usize {
        self.tree.count(key)
    }

    pub fn lower_bound(&self, key: &K) -> Position {
        self.tree.lower_bound(key)
    }

    pub fn upper_bound(&self, key: &K) -> Position {
        self.tree.upper_bound(key)
    }

    pub fn equal_range(&self, key: &K) -> (Position, Position) {
        self.tree.equal_range(key)
    }
}

impl<K, C: Default> Default for TreeSet<K, C> {
    fn default() -> Self {
        Self {
            tree: RbTree::default(),
        }
    }
}

impl<K, C: Compare<K>> Extend<K> for TreeSet<K, C> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, keys: I) {
        self.tree.extend_unique(keys);
    }
}

impl<K, C: Compare<K> + Default> FromIterator<K> for TreeSet<K, C> {
    fn from_iter<I: IntoIterator<Item = K>>(keys: I) -> Self {
        let mut set = Self::default();
        set.extend(keys);
        set
    }
}

impl<'a, K, C> IntoIterator for &'a TreeSet<K, C> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, C> IntoIterator for TreeSet<K, C> {
    type Item = K;
    type IntoIter = IntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.into_iter()
    }
}

impl<K: PartialEq, C> PartialEq for TreeSet<K, C> {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree
    }
}

impl<K: Eq, C> Eq for TreeSet<K, C> {}

impl<K: PartialOrd, C> PartialOrd for TreeSet<K, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.tree.partial_cmp(&other.tree)
    }
}

impl<K: Ord, C> Ord for TreeSet<K, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tree.cmp(&other.tree)
    }
}

impl<K: fmt::Debug, C> fmt::Debug for TreeSet<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tree, f)
    }
}
