//! Red-black tree keyed by an extracted key

use core::cmp::Ordering;
use core::fmt;

use super::compare::{Compare, Identity, KeyOfValue, Less};
use super::iter::{IntoIter, Iter, Range};
use super::node::{Arena, HEADER, NodeId};

/// A location in a tree: a node, or the end sentinel.
///
/// Positions stay valid across inserts and across erasure of other nodes.
/// After its node is erased a position is stale: lookups through it return
/// `None` until the slot is reused by a later insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position(NodeId);

impl Position {
    /// Arena slot of this position.
    #[inline]
    pub const fn node(self) -> NodeId {
        self.0
    }
}

/// Balanced binary search tree over values `V`, ordered by the key `X`
/// extracts with the comparator `C`.
///
/// Supports unique ([`RbTree::insert_unique`]) and multi-value
/// ([`RbTree::insert_equal`]) insertion on the same instance.
///
/// # Examples
/// ```
/// use nebula_stl::tree::RbTree;
///
/// let mut tree = RbTree::new();
/// for key in [10, 7, 8, 15, 5, 6] {
///     tree.insert_unique(key);
/// }
///
/// assert_eq!(tree.len(), 6);
/// assert!(tree.iter().copied().eq([5, 6, 7, 8, 10, 15]));
/// assert!(tree.rb_verify());
/// ```
#[derive(Clone)]
pub struct RbTree<V, X = Identity, C = Less> {
    pub(super) arena: Arena<V>,
    pub(super) len: usize,
    pub(super) extract: X,
    pub(super) compare: C,
}

impl<V> RbTree<V> {
    /// Empty tree ordered by `V: Ord`.
    pub fn new() -> Self {
        Self::with_parts(Identity, Less)
    }
}

impl<V, X: Default, C> RbTree<V, X, C> {
    /// Empty tree with the given comparator.
    pub fn with_compare(compare: C) -> Self {
        Self::with_parts(X::default(), compare)
    }
}

impl<V, X, C> RbTree<V, X, C> {
    pub fn with_parts(extract: X, compare: C) -> Self {
        Self {
            arena: Arena::new(),
            len: 0,
            extract,
            compare,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The comparator.
    pub fn compare(&self) -> &C {
        &self.compare
    }

    /// Position of the smallest element; `end()` when empty.
    #[inline]
    pub fn begin(&self) -> Position {
        Position(self.arena.leftmost())
    }

    /// The past-the-end sentinel.
    #[inline]
    pub fn end(&self) -> Position {
        Position(HEADER)
    }

    /// In-order successor. `next(end())` stays at `end()`.
    pub fn next(&self, pos: Position) -> Position {
        if !self.arena.is_live(pos.0) {
            return self.end();
        }
        Position(self.arena.successor(pos.0))
    }

    /// In-order predecessor. `prev(end())` is the largest element and
    /// `prev(begin())` is `end()`.
    pub fn prev(&self, pos: Position) -> Position {
        if pos.0 != HEADER && !self.arena.is_live(pos.0) {
            return self.end();
        }
        Position(self.arena.predecessor(pos.0))
    }

    /// Value at `pos`; `None` for `end()` and stale positions.
    #[inline]
    pub fn value(&self, pos: Position) -> Option<&V> {
        self.arena.value(pos.0)
    }

    pub fn first(&self) -> Option<&V> {
        self.value(self.begin())
    }

    pub fn last(&self) -> Option<&V> {
        self.value(Position(self.arena.rightmost()))
    }

    /// In-order iterator over all values.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(&self.arena, self.arena.leftmost(), self.arena.rightmost(), self.len)
    }

    /// Values in `[first, last)`.
    pub fn range(&self, first: Position, last: Position) -> Range<'_, V> {
        Range::new(&self.arena, first.0, last.0)
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.arena.reset();
        self.len = 0;
    }

    /// Exchanges the contents (and comparators) of two trees. Positions keep
    /// referring to the same elements, now in the other tree.
    pub fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Node ids in order.
    pub(super) fn in_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.len);
        let mut node = self.arena.leftmost();
        while node != HEADER && order.len() < self.len {
            order.push(node);
            node = self.arena.successor(node);
        }
        order
    }
}

impl<V, X, C> RbTree<V, X, C>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
{
    #[inline]
    fn less(&self, a: &X::Key, b: &X::Key) -> bool {
        self.compare.less(a, b)
    }

    #[inline]
    pub(super) fn key_of<'a>(&self, value: &'a V) -> &'a X::Key {
        self.extract.key(value)
    }

    /// Key of a node linked into the tree.
    #[inline]
    pub(super) fn node_key(&self, id: NodeId) -> &X::Key {
        match self.arena.value(id) {
            Some(value) => self.extract.key(value),
            None => unreachable!("linked tree node without a value"),
        }
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Links `value` as a child of `parent`: on the left when `parent` is the
    /// header, when `force_left` is set, or when the key orders before
    /// `parent`'s; otherwise on the right.
    fn insert_at(&mut self, force_left: bool, parent: NodeId, value: V) -> Position {
        let go_left = parent == HEADER
            || force_left
            || self.less(self.key_of(&value), self.node_key(parent));

        let z = self.arena.alloc(value);
        if go_left {
            // For the header this also sets the leftmost link.
            self.arena.set_left(parent, Some(z));
            if parent == HEADER {
                self.arena.set_root(Some(z));
                self.arena.set_rightmost(z);
            } else if parent == self.arena.leftmost() {
                self.arena.set_leftmost(z);
            }
        } else {
            self.arena.set_right(parent, Some(z));
            if parent == self.arena.rightmost() {
                self.arena.set_rightmost(z);
            }
        }
        self.arena.set_parent(z, Some(parent));

        self.arena.rebalance_after_insert(z);
        self.len += 1;
        Position(z)
    }

    /// Inserts `value` unless an equivalent key is present.
    ///
    /// Returns the position of the new element, or of the existing equivalent
    /// one together with `false`.
    pub fn insert_unique(&mut self, value: V) -> (Position, bool) {
        let mut parent = HEADER;
        let mut cursor = self.arena.root();
        let mut went_left = true;
        while let Some(node) = cursor {
            parent = node;
            went_left = self.less(self.key_of(&value), self.node_key(node));
            cursor = if went_left {
                self.arena.left(node)
            } else {
                self.arena.right(node)
            };
        }

        // The only candidate for an equivalent key is the in-order
        // predecessor of the insertion point.
        let mut candidate = parent;
        if went_left {
            if candidate == self.arena.leftmost() {
                return (self.insert_at(false, parent, value), true);
            }
            candidate = self.arena.predecessor(candidate);
        }

        if self.less(self.node_key(candidate), self.key_of(&value)) {
            return (self.insert_at(false, parent, value), true);
        }
        (Position(candidate), false)
    }

    /// Inserts `value` after any equivalent elements already present.
    pub fn insert_equal(&mut self, value: V) -> Position {
        let mut parent = HEADER;
        let mut cursor = self.arena.root();
        while let Some(node) = cursor {
            parent = node;
            cursor = if self.less(self.key_of(&value), self.node_key(node)) {
                self.arena.left(node)
            } else {
                self.arena.right(node)
            };
        }
        self.insert_at(false, parent, value)
    }

    /// [`RbTree::insert_unique`] with a hint: when `value` belongs right
    /// before `hint`, insertion skips the search. A wrong or stale hint falls
    /// back to the full search.
    pub fn insert_unique_hint(&mut self, hint: Position, value: V) -> Position {
        let pos = hint.0;
        if pos != HEADER && !self.arena.is_live(pos) {
            return self.insert_unique(value).0;
        }

        if pos == self.arena.leftmost() {
            if self.len > 0 && self.less(self.key_of(&value), self.node_key(pos)) {
                return self.insert_at(true, pos, value);
            }
            return self.insert_unique(value).0;
        }

        if pos == HEADER {
            let rightmost = self.arena.rightmost();
            if self.less(self.node_key(rightmost), self.key_of(&value)) {
                return self.insert_at(false, rightmost, value);
            }
            return self.insert_unique(value).0;
        }

        let before = self.arena.predecessor(pos);
        if self.less(self.node_key(before), self.key_of(&value))
            && self.less(self.key_of(&value), self.node_key(pos))
        {
            return if self.arena.right(before).is_none() {
                self.insert_at(false, before, value)
            } else {
                self.insert_at(true, pos, value)
            };
        }
        self.insert_unique(value).0
    }

    /// [`RbTree::insert_equal`] with a hint, see
    /// [`RbTree::insert_unique_hint`].
    pub fn insert_equal_hint(&mut self, hint: Position, value: V) -> Position {
        let pos = hint.0;
        if pos != HEADER && !self.arena.is_live(pos) {
            return self.insert_equal(value);
        }

        if pos == self.arena.leftmost() {
            if self.len > 0 && self.less(self.key_of(&value), self.node_key(pos)) {
                return self.insert_at(true, pos, value);
            }
            return self.insert_equal(value);
        }

        if pos == HEADER {
            let rightmost = self.arena.rightmost();
            if !self.less(self.key_of(&value), self.node_key(rightmost)) {
                return self.insert_at(false, rightmost, value);
            }
            return self.insert_equal(value);
        }

        let before = self.arena.predecessor(pos);
        if !self.less(self.key_of(&value), self.node_key(before))
            && !self.less(self.node_key(pos), self.key_of(&value))
        {
            return if self.arena.right(before).is_none() {
                self.insert_at(false, before, value)
            } else {
                self.insert_at(true, pos, value)
            };
        }
        self.insert_equal(value)
    }

    /// Unique-inserts every value; duplicates are dropped.
    pub fn extend_unique<I: IntoIterator<Item = V>>(&mut self, values: I) {
        for value in values {
            self.insert_unique(value);
        }
    }

    /// Inserts every value, keeping duplicates.
    pub fn extend_equal<I: IntoIterator<Item = V>>(&mut self, values: I) {
        for value in values {
            self.insert_equal(value);
        }
    }

    // ------------------------------------------------------------------
    // Erasure
    // ------------------------------------------------------------------

    /// Removes the element at `pos` and returns it. `end()` and stale
    /// positions return `None` and leave the tree untouched.
    pub fn erase(&mut self, pos: Position) -> Option<V> {
        if pos.0 == HEADER || !self.arena.is_live(pos.0) {
            return None;
        }

        self.arena.unlink(pos.0);
        self.len -= 1;
        self.arena.release(pos.0)
    }

    /// Removes every element equivalent to `key`; returns how many.
    pub fn erase_key(&mut self, key: &X::Key) -> usize {
        let (first, last) = self.equal_range(key);
        self.erase_range(first, last)
    }

    /// Removes `[first, last)`; returns how many elements were removed.
    pub fn erase_range(&mut self, first: Position, last: Position) -> usize {
        if first == self.begin() && last == self.end() {
            let removed = self.len;
            self.clear();
            return removed;
        }

        let mut removed = 0;
        let mut cursor = first;
        while cursor != last && self.arena.is_live(cursor.0) {
            let next = self.next(cursor);
            self.erase(cursor);
            removed += 1;
            cursor = next;
        }
        removed
    }

    /// Removes every element equivalent to any of `keys`.
    pub fn erase_keys<'k, I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'k X::Key>,
        X::Key: 'k,
    {
        keys.into_iter().map(|key| self.erase_key(key)).sum()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// First element whose key is not less than `key`.
    pub fn lower_bound(&self, key: &X::Key) -> Position {
        let mut bound = HEADER;
        let mut cursor = self.arena.root();
        while let Some(node) = cursor {
            if self.less(self.node_key(node), key) {
                cursor = self.arena.right(node);
            } else {
                bound = node;
                cursor = self.arena.left(node);
            }
        }
        Position(bound)
    }

    /// First element whose key is greater than `key`.
    pub fn upper_bound(&self, key: &X::Key) -> Position {
        let mut bound = HEADER;
        let mut cursor = self.arena.root();
        while let Some(node) = cursor {
            if self.less(key, self.node_key(node)) {
                bound = node;
                cursor = self.arena.left(node);
            } else {
                cursor = self.arena.right(node);
            }
        }
        Position(bound)
    }

    /// `(lower_bound(key), upper_bound(key))`
    pub fn equal_range(&self, key: &X::Key) -> (Position, Position) {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Some element equivalent to `key` (the first in order), or `end()`.
    pub fn find(&self, key: &X::Key) -> Position {
        let bound = self.lower_bound(key);
        if bound.0 == HEADER || self.less(key, self.node_key(bound.0)) {
            return self.end();
        }
        bound
    }

    /// Number of elements equivalent to `key`.
    pub fn count(&self, key: &X::Key) -> usize {
        let (first, last) = self.equal_range(key);
        self.range(first, last).count()
    }

    pub fn get(&self, key: &X::Key) -> Option<&V> {
        self.value(self.find(key))
    }

    pub fn contains(&self, key: &X::Key) -> bool {
        self.find(key) != self.end()
    }
}

impl<V, X, C> RbTree<V, X, C>
where
    X: KeyOfValue<V> + Default,
    C: Compare<X::Key> + Default,
{
    /// Builds a tree from fallible values with unique insertion.
    ///
    /// Stops at the first error: the partially built tree is dropped and the
    /// error returned.
    pub fn try_from_iter_unique<I, E>(values: I) -> Result<Self, E>
    where
        I: IntoIterator<Item = Result<V, E>>,
    {
        let mut tree = Self::with_parts(X::default(), C::default());
        for value in values {
            tree.insert_unique(value?);
        }
        Ok(tree)
    }
}

impl<V, X: Default, C: Default> Default for RbTree<V, X, C> {
    fn default() -> Self {
        Self::with_parts(X::default(), C::default())
    }
}

/// Multi-value insertion, like [`RbTree::extend_equal`].
impl<V, X, C> Extend<V> for RbTree<V, X, C>
where
    X: KeyOfValue<V>,
    C: Compare<X::Key>,
{
    fn extend<I: IntoIterator<Item = V>>(&mut self, values: I) {
        self.extend_equal(values);
    }
}

impl<V: PartialEq, X, C> PartialEq for RbTree<V, X, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<V: Eq, X, C> Eq for RbTree<V, X, C> {}

impl<V: PartialOrd, X, C> PartialOrd for RbTree<V, X, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<V: Ord, X, C> Ord for RbTree<V, X, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<V: fmt::Debug, X, C> fmt::Debug for RbTree<V, X, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, V, X, C> IntoIterator for &'a RbTree<V, X, C> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V, X, C> IntoIterator for RbTree<V, X, C> {
    type Item = V;
    type IntoIter = IntoIter<V>;

    fn into_iter(mut self) -> Self::IntoIter {
        let order = self.in_order();
        IntoIter::new(self.arena.take_values_in(&order))
    }
}
