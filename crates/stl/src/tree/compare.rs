//! Key extraction and ordering seams
//!
//! A tree stores values `V`, orders them by a key pulled out of each value by
//! a [`KeyOfValue`], and compares keys with a strict-weak-ordering
//! [`Compare`]. Two keys are equivalent when neither is less than the other.

/// Extracts the ordering key from a stored value.
pub trait KeyOfValue<V> {
    type Key: ?Sized;

    fn key<'a>(&self, value: &'a V) -> &'a Self::Key;
}

/// The value is its own key (sets).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl<V> KeyOfValue<V> for Identity {
    type Key = V;

    #[inline]
    fn key<'a>(&self, value: &'a V) -> &'a V {
        value
    }
}

/// First element of a pair is the key (maps).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct First;

impl<K, T> KeyOfValue<(K, T)> for First {
    type Key = K;

    #[inline]
    fn key<'a>(&self, value: &'a (K, T)) -> &'a K {
        &value.0
    }
}

/// Strict weak ordering over keys.
///
/// Any `Fn(&K, &K) -> bool` closure is a comparator.
pub trait Compare<K: ?Sized> {
    /// `true` when `a` orders strictly before `b`.
    fn less(&self, a: &K, b: &K) -> bool;
}

/// Ascending order by [`Ord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Less;

impl<K: Ord + ?Sized> Compare<K> for Less {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

/// Descending order by [`Ord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Greater;

impl<K: Ord + ?Sized> Compare<K> for Greater {
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        a > b
    }
}

impl<K: ?Sized, F> Compare<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn less(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}
