use core::borrow::Borrow;
use core::cmp::Ordering;

use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Link, WavlNode};
use crate::error::WavlError;

/// The core WAVL tree implementation backing `WavlMap`.
///
/// Nodes and values live in two separate arenas (keys and links are walked on
/// every descent, values only on a hit). `root` is the single entry point into
/// the node graph; `min` and `max` cache the leftmost and rightmost nodes for
/// O(1) boundary queries and are maintained incrementally by insert and remove.
///
/// Rank invariant: for every real node, the rank difference to each child
/// (absent children have rank -1) is 1 or 2. This bounds the height by
/// 2*log2(n+1). `insert` and `remove` restore the invariant with a bottom-up
/// repair walk and report how many promotions, demotions and rotations it took.
pub(crate) struct RawWavlMap<K, V> {
    nodes: Arena<WavlNode<K>>,
    values: Arena<V>,
    root: Link,
    min: Link,
    max: Link,
}

impl<K, V> RawWavlMap<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Arena::new(),
            root: None,
            min: None,
            max: None,
        }
    }

    /// Returns the number of keys in the tree. O(1): the root caches the size
    /// of the whole tree.
    pub(crate) fn len(&self) -> usize {
        self.size(self.root)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Removes all elements.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.values.clear();
        self.root = None;
        self.min = None;
        self.max = None;
    }

    #[inline]
    fn node(&self, handle: Handle) -> &WavlNode<K> {
        self.nodes.get(handle)
    }

    #[inline]
    fn node_mut(&mut self, handle: Handle) -> &mut WavlNode<K> {
        self.nodes.get_mut(handle)
    }

    /// Rank of a link; the absent node has rank -1 so rank arithmetic is
    /// uniform for real and absent children.
    #[inline]
    fn rank(&self, link: Link) -> i32 {
        link.map_or(-1, |h| self.node(h).rank())
    }

    /// Subtree size of a link; the absent node has size 0.
    #[inline]
    fn size(&self, link: Link) -> usize {
        link.map_or(0, |h| self.node(h).size())
    }

    /// Rank difference between the left and right subtrees of a node.
    #[inline]
    fn balance_factor(&self, handle: Handle) -> i32 {
        let node = self.node(handle);
        self.rank(node.left()) - self.rank(node.right())
    }

    /// The key-value pair with the smallest key. O(1) via the boundary cache.
    pub(crate) fn min_key_value(&self) -> Option<(&K, &V)> {
        let node = self.node(self.min?);
        Some((node.key(), self.values.get(node.value())))
    }

    /// The key-value pair with the largest key. O(1) via the boundary cache.
    pub(crate) fn max_key_value(&self) -> Option<(&K, &V)> {
        let node = self.node(self.max?);
        Some((node.key(), self.values.get(node.value())))
    }

    /// The key-value pair of the `rank`-th smallest key, 1-based. Descends by
    /// left-subtree size, O(log n). `None` when `rank` is 0 or exceeds the
    /// size; the public boundary turns that into `RankOutOfRange`.
    pub(crate) fn select(&self, rank: usize) -> Option<(&K, &V)> {
        if rank == 0 || rank > self.len() {
            return None;
        }
        let mut current = self.root?;
        let mut remaining = rank;
        loop {
            let (left, right) = {
                let node = self.node(current);
                (node.left(), node.right())
            };
            let position = self.size(left) + 1;
            match remaining.cmp(&position) {
                Ordering::Equal => {
                    let node = self.node(current);
                    return Some((node.key(), self.values.get(node.value())));
                }
                Ordering::Less => {
                    current = left.expect("rank falls inside the left subtree");
                }
                Ordering::Greater => {
                    remaining -= position;
                    current = right.expect("rank falls inside the right subtree");
                }
            }
        }
    }

    /// An in-order iterator over the whole tree.
    pub(crate) fn iter(&self) -> InOrder<'_, K, V> {
        InOrder::new(self)
    }

    /// Leftmost node of the subtree rooted at `handle`.
    fn min_in(&self, mut handle: Handle) -> Handle {
        while let Some(left) = self.node(handle).left() {
            handle = left;
        }
        handle
    }

    /// Rightmost node of the subtree rooted at `handle`.
    fn max_in(&self, mut handle: Handle) -> Handle {
        while let Some(right) = self.node(handle).right() {
            handle = right;
        }
        handle
    }

    /// The node following `handle` in key order.
    fn successor(&self, handle: Handle) -> Link {
        if let Some(right) = self.node(handle).right() {
            return Some(self.min_in(right));
        }
        let mut child = handle;
        let mut parent = self.node(handle).parent();
        while let Some(p) = parent {
            if self.node(p).right() != Some(child) {
                break;
            }
            child = p;
            parent = self.node(p).parent();
        }
        parent
    }

    /// The node preceding `handle` in key order.
    fn predecessor(&self, handle: Handle) -> Link {
        if let Some(left) = self.node(handle).left() {
            return Some(self.max_in(left));
        }
        let mut child = handle;
        let mut parent = self.node(handle).parent();
        while let Some(p) = parent {
            if self.node(p).left() != Some(child) {
                break;
            }
            child = p;
            parent = self.node(p).parent();
        }
        parent
    }

    /// Recomputes subtree sizes from `start` up to the root.
    fn update_sizes_upward(&mut self, start: Link) {
        let mut current = start;
        while let Some(handle) = current {
            let size = 1 + self.size(self.node(handle).left()) + self.size(self.node(handle).right());
            let node = self.node_mut(handle);
            node.set_size(size);
            current = node.parent();
        }
    }

    /// Rotates the subtree rooted at `y` to the right: `y`'s left child takes
    /// its place and `y` becomes that child's right child. Parent links are
    /// rewired on both sides, subtree sizes of the demoted then the promoted
    /// node are recomputed, and the stored root is updated when the pivot
    /// happens at the root. Ranks are never touched; callers adjust them.
    /// Returns the new subtree root. O(1).
    fn rotate_right(&mut self, y: Handle) -> Handle {
        let x = self.node(y).left().expect("`rotate_right()` requires a left child");
        let middle = self.node(x).right();
        let parent = self.node(y).parent();

        self.node_mut(y).set_left(middle);
        if let Some(m) = middle {
            self.node_mut(m).set_parent(Some(y));
        }
        self.node_mut(x).set_right(Some(y));
        self.node_mut(x).set_parent(parent);
        self.node_mut(y).set_parent(Some(x));
        match parent {
            None => self.root = Some(x),
            Some(p) => {
                let parent_node = self.node_mut(p);
                if parent_node.left() == Some(y) {
                    parent_node.set_left(Some(x));
                } else {
                    parent_node.set_right(Some(x));
                }
            }
        }

        let y_size = 1 + self.size(self.node(y).left()) + self.size(self.node(y).right());
        self.node_mut(y).set_size(y_size);
        let x_size = 1 + self.size(self.node(x).left()) + self.size(self.node(x).right());
        self.node_mut(x).set_size(x_size);
        x
    }

    /// Mirror of [`rotate_right`](Self::rotate_right).
    fn rotate_left(&mut self, y: Handle) -> Handle {
        let x = self.node(y).right().expect("`rotate_left()` requires a right child");
        let middle = self.node(x).left();
        let parent = self.node(y).parent();

        self.node_mut(y).set_right(middle);
        if let Some(m) = middle {
            self.node_mut(m).set_parent(Some(y));
        }
        self.node_mut(x).set_left(Some(y));
        self.node_mut(x).set_parent(parent);
        self.node_mut(y).set_parent(Some(x));
        match parent {
            None => self.root = Some(x),
            Some(p) => {
                let parent_node = self.node_mut(p);
                if parent_node.left() == Some(y) {
                    parent_node.set_left(Some(x));
                } else {
                    parent_node.set_right(Some(x));
                }
            }
        }

        let y_size = 1 + self.size(self.node(y).left()) + self.size(self.node(y).right());
        self.node_mut(y).set_size(y_size);
        let x_size = 1 + self.size(self.node(x).left()) + self.size(self.node(x).right());
        self.node_mut(x).set_size(x_size);
        x
    }
}

impl<K: Ord, V> RawWavlMap<K, V> {
    /// Finds the node holding `key`, descending by comparison. O(log n).
    fn find<Q>(&self, key: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        while let Some(handle) = current {
            let node = self.node(handle);
            match key.cmp(node.key().borrow()) {
                Ordering::Less => current = node.left(),
                Ordering::Greater => current = node.right(),
                Ordering::Equal => return Some(handle),
            }
        }
        None
    }

    /// Finds the node holding `key`, or the last node visited on the descent:
    /// the attachment anchor for an insertion, or proof of absence for a
    /// removal. `None` only on an empty tree. O(log n).
    fn position<Q>(&self, key: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut last = None;
        let mut current = self.root;
        while let Some(handle) = current {
            last = Some(handle);
            let node = self.node(handle);
            match key.cmp(node.key().borrow()) {
                Ordering::Less => current = node.left(),
                Ordering::Greater => current = node.right(),
                Ordering::Equal => break,
            }
        }
        last
    }

    /// Returns a reference to the value corresponding to the key.
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.find(key)?;
        Some(self.values.get(self.node(handle).value()))
    }

    /// Returns the key-value pair corresponding to the key.
    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.node(self.find(key)?);
        Some((node.key(), self.values.get(node.value())))
    }

    /// Returns true if the tree contains the specified key.
    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.find(key).is_some()
    }

    /// Inserts a key-value pair, or reports `DuplicateKey` leaving the tree
    /// unchanged. On success returns the number of repair operations
    /// (promotions, demotions and rotations) the insertion needed; the count
    /// is deterministic for a given operation sequence.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<usize, WavlError> {
        let anchor = match self.position(&key) {
            None => {
                let value = self.values.alloc(value);
                let node = self.nodes.alloc(WavlNode::new(key, value, None));
                self.root = Some(node);
                self.min = Some(node);
                self.max = Some(node);
                return Ok(0);
            }
            Some(handle) => handle,
        };
        let ordering = key.cmp(self.node(anchor).key());
        if ordering == Ordering::Equal {
            return Err(WavlError::DuplicateKey);
        }

        let min = self.min.expect("non-empty tree has a minimum");
        let max = self.max.expect("non-empty tree has a maximum");
        let extends_min = key < *self.node(min).key();
        let extends_max = key > *self.node(max).key();

        let value = self.values.alloc(value);
        let node = self.nodes.alloc(WavlNode::new(key, value, Some(anchor)));
        if ordering == Ordering::Less {
            self.node_mut(anchor).set_left(Some(node));
        } else {
            self.node_mut(anchor).set_right(Some(node));
        }
        self.update_sizes_upward(Some(anchor));
        if extends_min {
            self.min = Some(node);
        } else if extends_max {
            self.max = Some(node);
        }
        Ok(self.repair_after_insert(anchor))
    }

    /// Restores the rank invariant after a leaf was attached under `start`.
    ///
    /// The walk continues while the current node shares its rank with a child
    /// (a 0-child, the only violation an insertion can create):
    /// - case 1: the node is 0,1 - promote it and climb;
    /// - case 2: the node is 0,2 and the raised child leans outward - demote
    ///   and rotate once;
    /// - case 3: the raised child leans inward - demote both, promote the
    ///   inner grandchild and rotate twice.
    /// Rotations leave the new subtree root satisfying the invariant locally,
    /// so the walk terminates there or at the root.
    fn repair_after_insert(&mut self, start: Handle) -> usize {
        let mut ops = 0;
        let mut current = Some(start);
        while let Some(z) = current {
            let (left, right) = {
                let node = self.node(z);
                (node.left(), node.right())
            };
            let rank = self.node(z).rank();
            if rank != self.rank(left) && rank != self.rank(right) {
                break;
            }
            let subtree = match self.rank(left) - self.rank(right) {
                1 | -1 => {
                    // Case 1.
                    self.node_mut(z).promote();
                    ops += 1;
                    z
                }
                2 => {
                    let x = left.expect("0,2 node has a left child");
                    if self.balance_factor(x) == 1 {
                        // Case 2.
                        self.node_mut(z).demote();
                        ops += 2;
                        self.rotate_right(z)
                    } else {
                        // Case 3.
                        let inner = self.node(x).right().expect("inward-leaning child has an inner grandchild");
                        self.node_mut(z).demote();
                        self.node_mut(x).demote();
                        self.node_mut(inner).promote();
                        self.rotate_left(x);
                        ops += 5;
                        self.rotate_right(z)
                    }
                }
                -2 => {
                    let x = right.expect("2,0 node has a right child");
                    if self.balance_factor(x) == -1 {
                        // Case 2, mirrored.
                        self.node_mut(z).demote();
                        ops += 2;
                        self.rotate_left(z)
                    } else {
                        // Case 3, mirrored.
                        let inner = self.node(x).left().expect("inward-leaning child has an inner grandchild");
                        self.node_mut(z).demote();
                        self.node_mut(x).demote();
                        self.node_mut(inner).promote();
                        self.rotate_right(x);
                        ops += 5;
                        self.rotate_left(z)
                    }
                }
                factor => unreachable!("insertion repair reached balance factor {factor}"),
            };
            current = self.node(subtree).parent();
        }
        ops
    }

    /// Removes a key, or reports `KeyNotFound` leaving the tree unchanged.
    /// On success returns the number of repair operations the removal needed.
    ///
    /// A node with two real children trades key and value with its in-order
    /// successor, and the successor's node is the one spliced out. External
    /// observers of node identity would see content move; no such handles are
    /// exposed, and none are guaranteed stable across removals.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Result<usize, WavlError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut target = match self.position(key) {
            Some(handle) if self.node(handle).key().borrow() == key => handle,
            _ => return Err(WavlError::KeyNotFound),
        };

        // Advance the boundary caches before any structural change.
        if Some(target) == self.min {
            self.min = match self.node(target).right() {
                None => self.node(target).parent(),
                Some(_) => self.successor(target),
            };
        } else if Some(target) == self.max {
            self.max = match self.node(target).left() {
                None => self.node(target).parent(),
                Some(_) => self.predecessor(target),
            };
        }

        if self.node(target).left().is_some() && self.node(target).right().is_some() {
            // The successor of a node with a right child is the minimum of
            // that subtree, so it has no left child and can be spliced.
            let next = self.successor(target).expect("node with a right child has a successor");
            let (a, b) = self.nodes.get2_mut(target, next);
            a.swap_contents(b);
            target = next;
        }

        // Splice: link the at-most-one real child directly to the parent.
        let parent = self.node(target).parent();
        let child = self.node(target).left().or(self.node(target).right());
        if let Some(c) = child {
            self.node_mut(c).set_parent(parent);
        }
        match parent {
            None => self.root = child,
            Some(p) => {
                let parent_node = self.node_mut(p);
                if parent_node.left() == Some(target) {
                    parent_node.set_left(child);
                } else {
                    parent_node.set_right(child);
                }
            }
        }

        // The content swap can land a boundary cache on the spliced node.
        if Some(target) == self.min {
            self.min = parent;
        }
        if Some(target) == self.max {
            self.max = parent;
        }

        let spliced = self.nodes.take(target);
        self.values.free(spliced.value());
        self.update_sizes_upward(parent);
        Ok(self.repair_after_delete(parent))
    }

    /// Restores the rank invariant after a splice, starting at the spliced
    /// node's former parent.
    ///
    /// A splice can leave that parent as a rank-1 leaf (a 2,2-leaf); it is
    /// demoted once before the generic loop. The loop continues while the
    /// current node has a 3-child:
    /// - case 1: the other child is a 2-child - demote and climb;
    /// - case 2: the sibling is 2,2 - demote the node and the sibling;
    /// - case 3: the sibling's outer child is a 1-child - promote the sibling,
    ///   demote the node (twice when the sibling's inner child is a 2-child)
    ///   and rotate once;
    /// - case 4: the sibling's outer child is a 2-child and its inner child a
    ///   1-child - double-demote the node, double-promote the inner
    ///   grandchild, demote the sibling and rotate twice.
    fn repair_after_delete(&mut self, start: Link) -> usize {
        let mut ops = 0;
        let mut current = start;
        if let Some(z) = current {
            if self.node(z).is_2_2_leaf() {
                self.node_mut(z).demote();
                ops += 1;
                current = self.node(z).parent();
            }
        }
        while let Some(z) = current {
            let (left, right) = {
                let node = self.node(z);
                (node.left(), node.right())
            };
            let rank = self.node(z).rank();
            if rank != self.rank(left) + 3 && rank != self.rank(right) + 3 {
                break;
            }
            let subtree = match self.rank(left) - self.rank(right) {
                1 | -1 => {
                    // Case 1.
                    self.node_mut(z).demote();
                    ops += 1;
                    z
                }
                -2 => {
                    // The left child is the 3-child; repair borrows from the
                    // right sibling subtree.
                    let y = right.expect("3-child repair has a sibling");
                    let outer = self.node(y).right();
                    let inner = self.node(y).left();
                    let y_rank = self.node(y).rank();
                    if y_rank - self.rank(outer) == 2 {
                        if y_rank - self.rank(inner) == 2 {
                            // Case 2.
                            self.node_mut(z).demote();
                            self.node_mut(y).demote();
                            ops += 2;
                            z
                        } else {
                            // Case 4.
                            let x = inner.expect("1-child of the sibling is real");
                            self.node_mut(z).demote();
                            self.node_mut(z).demote();
                            self.node_mut(x).promote();
                            self.node_mut(x).promote();
                            self.node_mut(y).demote();
                            self.rotate_right(y);
                            ops += 7;
                            self.rotate_left(z)
                        }
                    } else {
                        // Case 3.
                        if y_rank - self.rank(inner) == 2 {
                            self.node_mut(z).demote();
                            ops += 1;
                        }
                        self.node_mut(z).demote();
                        self.node_mut(y).promote();
                        ops += 3;
                        self.rotate_left(z)
                    }
                }
                2 => {
                    // Mirror: the right child is the 3-child.
                    let y = left.expect("3-child repair has a sibling");
                    let outer = self.node(y).left();
                    let inner = self.node(y).right();
                    let y_rank = self.node(y).rank();
                    if y_rank - self.rank(outer) == 2 {
                        if y_rank - self.rank(inner) == 2 {
                            // Case 2, mirrored.
                            self.node_mut(z).demote();
                            self.node_mut(y).demote();
                            ops += 2;
                            z
                        } else {
                            // Case 4, mirrored.
                            let x = inner.expect("1-child of the sibling is real");
                            self.node_mut(z).demote();
                            self.node_mut(z).demote();
                            self.node_mut(x).promote();
                            self.node_mut(x).promote();
                            self.node_mut(y).demote();
                            self.rotate_left(y);
                            ops += 7;
                            self.rotate_right(z)
                        }
                    } else {
                        // Case 3, mirrored.
                        if y_rank - self.rank(inner) == 2 {
                            self.node_mut(z).demote();
                            ops += 1;
                        }
                        self.node_mut(z).demote();
                        self.node_mut(y).promote();
                        ops += 3;
                        self.rotate_right(z)
                    }
                }
                factor => unreachable!("deletion repair reached balance factor {factor}"),
            };
            current = self.node(subtree).parent();
        }
        ops
    }
}

/// An in-order walk over a tree, driven by an explicit stack of the left spine
/// (the repair loops are iterative; traversal is too). Fresh state per call,
/// non-destructive.
pub(crate) struct InOrder<'a, K, V> {
    tree: &'a RawWavlMap<K, V>,
    stack: SmallVec<[Handle; 16]>,
    remaining: usize,
}

impl<'a, K, V> InOrder<'a, K, V> {
    fn new(tree: &'a RawWavlMap<K, V>) -> Self {
        let mut iter = Self {
            tree,
            stack: SmallVec::new(),
            remaining: tree.len(),
        };
        iter.push_left_spine(tree.root);
        iter
    }

    fn push_left_spine(&mut self, mut link: Link) {
        while let Some(handle) = link {
            self.stack.push(handle);
            link = self.tree.node(handle).left();
        }
    }
}

impl<'a, K, V> Iterator for InOrder<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.stack.pop()?;
        let node = self.tree.node(handle);
        self.push_left_spine(node.right());
        self.remaining -= 1;
        Some((node.key(), self.tree.values.get(node.value())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for InOrder<'_, K, V> {}
impl<K, V> core::iter::FusedIterator for InOrder<'_, K, V> {}

impl<K, V> Clone for InOrder<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            stack: self.stack.clone(),
            remaining: self.remaining,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    impl<K: Ord + core::fmt::Debug, V> RawWavlMap<K, V> {
        /// Validates every tree invariant. Panics with a collected report if
        /// any is violated. Test-only corruption detector.
        pub(crate) fn validate_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();

            match self.root {
                None => {
                    if self.min.is_some() || self.max.is_some() {
                        errors.push("empty tree has a min/max cache".into());
                    }
                    if !self.nodes.is_empty() || !self.values.is_empty() {
                        errors.push("empty tree retains arena slots".into());
                    }
                }
                Some(root) => {
                    if self.node(root).parent().is_some() {
                        errors.push("root has a parent link".into());
                    }
                    self.validate_node(root, &mut errors);

                    // Boundary caches are exactly the leftmost/rightmost nodes.
                    if self.min != Some(self.min_in(root)) {
                        errors.push(format!("min cache mismatch: {:?} vs {:?}", self.min, self.min_in(root)));
                    }
                    if self.max != Some(self.max_in(root)) {
                        errors.push(format!("max cache mismatch: {:?} vs {:?}", self.max, self.max_in(root)));
                    }

                    // BST ordering: in-order keys strictly increase.
                    let mut previous: Option<&K> = None;
                    for (key, _) in self.iter() {
                        if let Some(prev) = previous {
                            if prev >= key {
                                errors.push(format!("keys out of order: {prev:?} before {key:?}"));
                            }
                        }
                        previous = Some(key);
                    }

                    // No leaked arena slots.
                    if self.nodes.len() != self.len() || self.values.len() != self.len() {
                        errors.push(format!(
                            "arena leak: {} nodes / {} values for {} keys",
                            self.nodes.len(),
                            self.values.len(),
                            self.len()
                        ));
                    }
                }
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        fn validate_node(&self, handle: Handle, errors: &mut Vec<String>) -> usize {
            let node = self.node(handle);

            for (label, child) in [("left", node.left()), ("right", node.right())] {
                let diff = node.rank() - self.rank(child);
                if !(1..=2).contains(&diff) {
                    errors.push(format!(
                        "rank difference {diff} to {label} child at key {:?} (rank {})",
                        node.key(),
                        node.rank()
                    ));
                }
                if let Some(c) = child {
                    if self.node(c).parent() != Some(handle) {
                        errors.push(format!("broken parent backlink under key {:?}", node.key()));
                    }
                }
            }

            let mut size = 1;
            if let Some(left) = node.left() {
                size += self.validate_node(left, errors);
            }
            if let Some(right) = node.right() {
                size += self.validate_node(right, errors);
            }
            if size != node.size() {
                errors.push(format!(
                    "size mismatch at key {:?}: stored {}, computed {size}",
                    node.key(),
                    node.size()
                ));
            }
            size
        }
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..1000).prop_map(Op::Insert),
            1 => (0i32..1000).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Invariants 1-4 hold after every single operation, and the size
        /// always equals the number of keys currently present.
        #[test]
        fn invariants_maintained_after_every_operation(ops in prop::collection::vec(op_strategy(), 0..500)) {
            let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
            let mut model: BTreeMap<i32, i32> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        let inserted = tree.insert(key, key * 2).is_ok();
                        prop_assert_eq!(inserted, model.insert(key, key * 2).is_none());
                    }
                    Op::Remove(key) => {
                        let removed = tree.remove(&key).is_ok();
                        prop_assert_eq!(removed, model.remove(&key).is_some());
                    }
                }
                tree.validate_invariants();
                prop_assert_eq!(tree.len(), model.len());
            }

            let keys: Vec<i32> = tree.iter().map(|(&k, _)| k).collect();
            let expected: Vec<i32> = model.keys().copied().collect();
            prop_assert_eq!(keys, expected);
        }

        /// `select` agrees with the sorted model at every rank, and rejects
        /// rank 0 and rank len+1.
        #[test]
        fn select_matches_sorted_order(keys in prop::collection::btree_set(0i32..500, 1..200)) {
            let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
            for &key in &keys {
                tree.insert(key, key * 2).unwrap();
            }
            tree.validate_invariants();

            for (index, &key) in keys.iter().enumerate() {
                let (k, v) = tree.select(index + 1).expect("rank in range");
                prop_assert_eq!(*k, key);
                prop_assert_eq!(*v, key * 2);
            }
            prop_assert!(tree.select(0).is_none());
            prop_assert!(tree.select(keys.len() + 1).is_none());
        }

        /// Identical operation sequences produce identical repair-op counts.
        #[test]
        fn repair_counts_are_deterministic(ops in prop::collection::vec(op_strategy(), 0..300)) {
            let mut first: RawWavlMap<i32, i32> = RawWavlMap::new();
            let mut second: RawWavlMap<i32, i32> = RawWavlMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        prop_assert_eq!(first.insert(key, key), second.insert(key, key));
                    }
                    Op::Remove(key) => {
                        prop_assert_eq!(first.remove(&key), second.remove(&key));
                    }
                }
            }
        }

        /// min/max caches track the boundary keys through arbitrary churn.
        #[test]
        fn boundary_caches_track_extremes(ops in prop::collection::vec(op_strategy(), 0..300)) {
            let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
            let mut model: BTreeMap<i32, i32> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        let _ = tree.insert(key, key);
                        model.insert(key, key);
                    }
                    Op::Remove(key) => {
                        let _ = tree.remove(&key);
                        model.remove(&key);
                    }
                }
                prop_assert_eq!(tree.min_key_value(), model.first_key_value());
                prop_assert_eq!(tree.max_key_value(), model.last_key_value());
            }
        }
    }

    #[test]
    fn empty_tree() {
        let tree: RawWavlMap<i32, i32> = RawWavlMap::new();
        tree.validate_invariants();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.get(&1), None);
        assert_eq!(tree.min_key_value(), None);
        assert_eq!(tree.max_key_value(), None);
        assert!(tree.select(1).is_none());
        assert!(tree.iter().next().is_none());
    }

    #[test]
    fn ascending_insert_op_counts() {
        let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
        // Root attach costs nothing; the second insert promotes the root; the
        // third forces the first rotation (promote, then demote + rotate).
        assert_eq!(tree.insert(1, 10), Ok(0));
        assert_eq!(tree.insert(2, 20), Ok(1));
        assert_eq!(tree.insert(3, 30), Ok(3));
        tree.validate_invariants();
        assert_eq!(tree.insert(2, 99), Err(WavlError::DuplicateKey));
        // The duplicate left everything untouched.
        tree.validate_invariants();
        assert_eq!(tree.get(&2), Some(&20));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn remove_root_of_three() {
        let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
        tree.insert(2, 20).unwrap();
        tree.insert(1, 10).unwrap();
        tree.insert(3, 30).unwrap();

        let ops = tree.remove(&2).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.min_key_value(), Some((&1, &10)));
        assert_eq!(tree.max_key_value(), Some((&3, &30)));
        // The root swap splices a leaf; no rank deficiency arises.
        assert_eq!(ops, 0);
    }

    #[test]
    fn remove_unary_root_keeps_child() {
        let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
        tree.insert(2, 20).unwrap();
        tree.insert(3, 30).unwrap();

        tree.remove(&2).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&3), Some(&30));
        assert_eq!(tree.min_key_value(), Some((&3, &30)));
        assert_eq!(tree.max_key_value(), Some((&3, &30)));
    }

    #[test]
    fn remove_leaf_demotes_2_2_parent() {
        let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
        tree.insert(1, 10).unwrap();
        tree.insert(2, 20).unwrap();

        // The root was promoted to rank 1 by the second insert; removing its
        // only child leaves a rank-1 leaf that repair must demote.
        let ops = tree.remove(&2).unwrap();
        assert_eq!(ops, 1);
        tree.validate_invariants();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn remove_missing_key_is_a_no_op() {
        let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
        assert_eq!(tree.remove(&7), Err(WavlError::KeyNotFound));
        tree.insert(1, 10).unwrap();
        assert_eq!(tree.remove(&7), Err(WavlError::KeyNotFound));
        tree.validate_invariants();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn drain_to_empty_and_reuse() {
        let mut tree: RawWavlMap<i32, i32> = RawWavlMap::new();
        for key in 0..64 {
            tree.insert(key, key).unwrap();
        }
        for key in 0..64 {
            tree.remove(&key).unwrap();
            tree.validate_invariants();
        }
        assert!(tree.is_empty());

        // Freed slots are reused by a second fill.
        for key in (0..64).rev() {
            tree.insert(key, key).unwrap();
        }
        tree.validate_invariants();
        assert_eq!(tree.len(), 64);
    }
}
