//! An ordered map with order-statistic queries, based on a WAVL tree.

use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;

use crate::error::WavlError;
use crate::raw::{InOrder, RawWavlMap};

/// An ordered map based on a [WAVL tree] with order statistics.
///
/// Given a key type with a [total order], an ordered map stores its entries in
/// key order. That means that keys must be of a type that implements the
/// [`Ord`] trait, such that two keys can always be compared to determine their
/// ordering.
///
/// On top of the usual ordered-map operations, a `WavlMap` answers
/// order-statistic queries: [`select`](WavlMap::select) returns the entry with
/// the k-th smallest key in O(log n), and [`min`](WavlMap::min) and
/// [`max`](WavlMap::max) answer in O(1).
///
/// [`insert`](WavlMap::insert) and [`remove`](WavlMap::remove) report how many
/// rebalancing operations (promotions, demotions and rotations) they needed.
/// The count is fully determined by the sequence of operations performed, which
/// makes the rebalancing behavior observable and reproducible.
///
/// It is a logic error for a key to be modified in such a way that the key's
/// ordering relative to any other key, as determined by the [`Ord`] trait,
/// changes while it is in the map. This is normally only possible through
/// [`Cell`], [`RefCell`], global state, I/O, or unsafe code. The behavior
/// resulting from such a logic error is not specified, but will be
/// encapsulated to the `WavlMap` that observed the logic error and not result
/// in undefined behavior.
///
/// # Examples
///
/// ```
/// use wavl_tree::{WavlError, WavlMap};
///
/// let mut seen = WavlMap::new();
///
/// seen.insert("first", 1)?;
/// seen.insert("second", 2)?;
/// seen.insert("third", 3)?;
///
/// // keys are unique; a duplicate is rejected and the map is unchanged.
/// assert_eq!(seen.insert("second", 99), Err(WavlError::DuplicateKey));
/// assert_eq!(seen.get("second"), Some(&2));
///
/// // entries come out in key order.
/// let keys: Vec<&str> = seen.keys().copied().collect();
/// assert_eq!(keys, ["first", "second", "third"]);
///
/// // the 2nd-smallest key is "second".
/// assert_eq!(seen.select(2), Ok(&2));
/// # Ok::<(), WavlError>(())
/// ```
///
/// # Background
///
/// A WAVL (weak AVL) tree is a rank-balanced binary search tree. Every node
/// carries an integer rank, and the tree maintains the invariant that the rank
/// difference between a node and each of its children is 1 or 2, where an
/// absent child counts as rank -1. This bounds the height of a tree with n
/// keys by 2·log₂(n+1), so searches, insertions and removals are all
/// O(log n) worst case.
///
/// Every node additionally caches the size of its subtree, which is what makes
/// [`select`](WavlMap::select) logarithmic: the search descends by comparing
/// the requested rank against left-subtree sizes instead of keys.
///
/// [WAVL tree]: https://en.wikipedia.org/wiki/WAVL_tree
/// [total order]: https://en.wikipedia.org/wiki/Total_order
/// [`Cell`]: core::cell::Cell
/// [`RefCell`]: core::cell::RefCell
pub struct WavlMap<K, V> {
    raw: RawWavlMap<K, V>,
}

impl<K, V> WavlMap<K, V> {
    /// Makes a new, empty `WavlMap`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    ///
    /// // entries can now be inserted into the empty map
    /// map.insert(1, "a").unwrap();
    /// ```
    #[must_use]
    pub const fn new() -> WavlMap<K, V> {
        WavlMap {
            raw: RawWavlMap::new(),
        }
    }

    /// Returns the number of elements in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut a = WavlMap::new();
    /// assert_eq!(a.len(), 0);
    /// a.insert(1, "a").unwrap();
    /// assert_eq!(a.len(), 1);
    /// ```
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no elements.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut a = WavlMap::new();
    /// assert!(a.is_empty());
    /// a.insert(1, "a").unwrap();
    /// assert!(!a.is_empty());
    /// ```
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Clears the map, removing all elements.
    ///
    /// # Complexity
    ///
    /// O(n)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut a = WavlMap::new();
    /// a.insert(1, "a").unwrap();
    /// a.clear();
    /// assert!(a.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns a reference to the value of the smallest key in the map, or
    /// `None` if the map is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// assert_eq!(map.min(), None);
    /// map.insert(2, "b").unwrap();
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.min(), Some(&"a"));
    /// ```
    #[must_use]
    pub fn min(&self) -> Option<&V> {
        Some(self.raw.min_key_value()?.1)
    }

    /// Returns a reference to the value of the largest key in the map, or
    /// `None` if the map is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// assert_eq!(map.max(), None);
    /// map.insert(1, "a").unwrap();
    /// map.insert(2, "b").unwrap();
    /// assert_eq!(map.max(), Some(&"b"));
    /// ```
    #[must_use]
    pub fn max(&self) -> Option<&V> {
        Some(self.raw.max_key_value()?.1)
    }

    /// Returns the entry with the smallest key in the map, or `None` if the
    /// map is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// map.insert(2, "b").unwrap();
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.min_key_value(), Some((&1, &"a")));
    /// ```
    #[must_use]
    pub fn min_key_value(&self) -> Option<(&K, &V)> {
        self.raw.min_key_value()
    }

    /// Returns the entry with the largest key in the map, or `None` if the
    /// map is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// map.insert(1, "a").unwrap();
    /// map.insert(2, "b").unwrap();
    /// assert_eq!(map.max_key_value(), Some((&2, &"b")));
    /// ```
    #[must_use]
    pub fn max_key_value(&self) -> Option<(&K, &V)> {
        self.raw.max_key_value()
    }

    /// Returns a reference to the value of the `rank`-th smallest key,
    /// 1-based, or `Err(RankOutOfRange)` when `rank` is 0 or exceeds the
    /// number of elements.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::{WavlError, WavlMap};
    ///
    /// let mut map = WavlMap::new();
    /// for key in [5, 2, 8] {
    ///     map.insert(key, key * 10).unwrap();
    /// }
    /// assert_eq!(map.select(1), Ok(&20));
    /// assert_eq!(map.select(3), Ok(&80));
    /// assert_eq!(map.select(0), Err(WavlError::RankOutOfRange));
    /// assert_eq!(map.select(4), Err(WavlError::RankOutOfRange));
    /// ```
    pub fn select(&self, rank: usize) -> Result<&V, WavlError> {
        Ok(self.select_key_value(rank)?.1)
    }

    /// Returns the entry with the `rank`-th smallest key, 1-based, or
    /// `Err(RankOutOfRange)` when `rank` is 0 or exceeds the number of
    /// elements.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// for key in [5, 2, 8] {
    ///     map.insert(key, key * 10).unwrap();
    /// }
    /// assert_eq!(map.select_key_value(2), Ok((&5, &50)));
    /// ```
    pub fn select_key_value(&self, rank: usize) -> Result<(&K, &V), WavlError> {
        self.raw.select(rank).ok_or(WavlError::RankOutOfRange)
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Complexity
    ///
    /// O(n) over the full iteration.
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// map.insert(3, "c").unwrap();
    /// map.insert(1, "a").unwrap();
    /// map.insert(2, "b").unwrap();
    ///
    /// let entries: Vec<(&i32, &&str)> = map.iter().collect();
    /// assert_eq!(entries, [(&1, &"a"), (&2, &"b"), (&3, &"c")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.raw.iter(),
        }
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    ///
    /// # Complexity
    ///
    /// O(n) over the full iteration.
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut a = WavlMap::new();
    /// a.insert(2, "b").unwrap();
    /// a.insert(1, "a").unwrap();
    ///
    /// let keys: Vec<i32> = a.keys().copied().collect();
    /// assert_eq!(keys, [1, 2]);
    /// ```
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.raw.iter(),
        }
    }

    /// Gets an iterator over the values of the map, in order by key.
    ///
    /// # Complexity
    ///
    /// O(n) over the full iteration.
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut a = WavlMap::new();
    /// a.insert(1, "hello").unwrap();
    /// a.insert(2, "goodbye").unwrap();
    ///
    /// let values: Vec<&str> = a.values().copied().collect();
    /// assert_eq!(values, ["hello", "goodbye"]);
    /// ```
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.raw.iter(),
        }
    }
}

impl<K: Ord, V> WavlMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the
    /// ordering on the borrowed form *must* match the ordering on the key
    /// type.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get(key)
    }

    /// Returns the key-value pair corresponding to the supplied key.
    ///
    /// The supplied key may be any borrowed form of the map's key type, but
    /// the ordering on the borrowed form *must* match the ordering on the key
    /// type.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// map.insert(1, "a").unwrap();
    /// assert_eq!(map.get_key_value(&1), Some((&1, &"a")));
    /// assert_eq!(map.get_key_value(&2), None);
    /// ```
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.get_key_value(key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// The key may be any borrowed form of the map's key type, but the
    /// ordering on the borrowed form *must* match the ordering on the key
    /// type.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::WavlMap;
    ///
    /// let mut map = WavlMap::new();
    /// map.insert(1, "a").unwrap();
    /// assert!(map.contains_key(&1));
    /// assert!(!map.contains_key(&2));
    /// ```
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.contains_key(key)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// Keys are unique: if the key is already present, `Err(DuplicateKey)` is
    /// returned and the map is not modified. On success the result carries the
    /// number of rebalancing operations (promotions, demotions and rotations)
    /// the insertion needed; the count is deterministic for a given sequence
    /// of operations.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::{WavlError, WavlMap};
    ///
    /// let mut map = WavlMap::new();
    /// assert_eq!(map.insert(37, "a"), Ok(0));
    /// assert_eq!(map.insert(37, "b"), Err(WavlError::DuplicateKey));
    /// assert_eq!(map.get(&37), Some(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<usize, WavlError> {
        self.raw.insert(key, value)
    }

    /// Removes a key from the map.
    ///
    /// If the key is not present, `Err(KeyNotFound)` is returned and the map
    /// is not modified. On success the result carries the number of
    /// rebalancing operations the removal needed; the count is deterministic
    /// for a given sequence of operations.
    ///
    /// The key may be any borrowed form of the map's key type, but the
    /// ordering on the borrowed form *must* match the ordering on the key
    /// type.
    ///
    /// # Complexity
    ///
    /// O(log n)
    ///
    /// # Examples
    ///
    /// ```
    /// use wavl_tree::{WavlError, WavlMap};
    ///
    /// let mut map = WavlMap::new();
    /// map.insert(1, "a").unwrap();
    /// assert!(map.remove(&1).is_ok());
    /// assert_eq!(map.remove(&1), Err(WavlError::KeyNotFound));
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Result<usize, WavlError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove(key)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for WavlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Default for WavlMap<K, V> {
    /// Creates an empty `WavlMap`.
    fn default() -> WavlMap<K, V> {
        WavlMap::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for WavlMap<K, V> {
    /// Builds a map from the key-value pairs of an iterator. Keys are unique,
    /// so when the iterator yields a key more than once the first occurrence
    /// wins and the rest are dropped.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> WavlMap<K, V> {
        let mut map = WavlMap::new();
        for (key, value) in iter {
            let _ = map.insert(key, value);
        }
        map
    }
}

impl<'a, K, V> IntoIterator for &'a WavlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// An iterator over the entries of a `WavlMap`, sorted by key.
///
/// This `struct` is created by the [`iter`] method on [`WavlMap`]. See its
/// documentation for more.
///
/// [`iter`]: WavlMap::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    inner: InOrder<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An iterator over the keys of a `WavlMap`, in sorted order.
///
/// This `struct` is created by the [`keys`] method on [`WavlMap`]. See its
/// documentation for more.
///
/// [`keys`]: WavlMap::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: InOrder<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An iterator over the values of a `WavlMap`, in order by key.
///
/// This `struct` is created by the [`values`] method on [`WavlMap`]. See its
/// documentation for more.
///
/// [`values`]: WavlMap::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: InOrder<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.inner.next()?.1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}
