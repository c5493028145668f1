//! Tree iterators

use core::iter::FusedIterator;

use super::node::{Arena, HEADER, NodeId};

/// In-order iterator over a tree's values.
#[derive(Debug)]
pub struct Iter<'a, V> {
    arena: &'a Arena<V>,
    front: NodeId,
    back: NodeId,
    remaining: usize,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(arena: &'a Arena<V>, front: NodeId, back: NodeId, len: usize) -> Self {
        Self {
            arena,
            front,
            back,
            remaining: len,
        }
    }
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.arena.value(self.front)?;
        self.front = self.arena.successor(self.front);
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.arena.value(self.back)?;
        self.back = self.arena.predecessor(self.back);
        self.remaining -= 1;
        Some(value)
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

/// Values in a half-open position range.
///
/// Stops at the end position, or at the end sentinel if the end position is
/// never reached.
#[derive(Debug)]
pub struct Range<'a, V> {
    arena: &'a Arena<V>,
    cursor: NodeId,
    last: NodeId,
}

impl<'a, V> Range<'a, V> {
    pub(crate) fn new(arena: &'a Arena<V>, first: NodeId, last: NodeId) -> Self {
        Self {
            arena,
            cursor: first,
            last,
        }
    }
}

impl<V> Clone for Range<'_, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, V> Iterator for Range<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == self.last || self.cursor == HEADER {
            return None;
        }
        let value = self.arena.value(self.cursor)?;
        self.cursor = self.arena.successor(self.cursor);
        Some(value)
    }
}

impl<V> FusedIterator for Range<'_, V> {}

/// Owning in-order iterator.
#[derive(Debug, Clone)]
pub struct IntoIter<V> {
    values: std::vec::IntoIter<V>,
}

impl<V> IntoIter<V> {
    pub(crate) fn new(values: Vec<V>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.values.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<V> DoubleEndedIterator for IntoIter<V> {
    fn next_back(&mut self) -> Option<V> {
        self.values.next_back()
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

impl<V> FusedIterator for IntoIter<V> {}

#[cfg(test)]
mod tests {
    use crate::tree::RbTree;

    #[test]
    fn test_double_ended_meets_in_middle() {
        let mut tree = RbTree::new();
        tree.extend_unique(1..=5);

        let mut iter = tree.iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next_back(), Some(&5));
        assert_eq!(iter.next_back(), Some(&4));
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn test_range_between_positions() {
        let mut tree = RbTree::new();
        tree.extend_unique([10, 20, 30, 40]);

        let values: Vec<_> = tree.range(tree.find(&20), tree.find(&40)).copied().collect();
        assert_eq!(values, vec![20, 30]);

        assert_eq!(tree.range(tree.find(&30), tree.end()).count(), 2);
        assert_eq!(tree.range(tree.end(), tree.end()).count(), 0);
    }

    #[test]
    fn test_rev_iteration() {
        let mut tree = RbTree::new();
        tree.extend_equal([3, 1, 3, 2]);
        assert!(tree.iter().rev().copied().eq([3, 3, 2, 1]));
    }
}
