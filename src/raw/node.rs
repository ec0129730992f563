use super::handle::Handle;

/// A child or parent slot.
///
/// `None` is the absent (external) node: it has rank -1 and subtree size 0 by
/// convention, carries no payload and belongs to no tree. Every slot of every
/// real node always holds either a live handle or `None`; there is no separate
/// "unset" state.
pub(crate) type Link = Option<Handle>;

/// A single tree node.
///
/// The value payload lives in a separate arena (keys are walked far more often
/// than values are touched); `value` is the handle into it. `rank` is the WAVL
/// balance potential and `size` the number of real nodes in this subtree,
/// including this one.
pub(crate) struct WavlNode<K> {
    key: K,
    value: Handle,
    rank: i32,
    size: usize,
    parent: Link,
    left: Link,
    right: Link,
}

impl<K> WavlNode<K> {
    /// Creates a fresh leaf: rank 0, size 1, both children absent.
    pub(crate) const fn new(key: K, value: Handle, parent: Link) -> Self {
        Self {
            key,
            value,
            rank: 0,
            size: 1,
            parent,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub(crate) const fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) const fn value(&self) -> Handle {
        self.value
    }

    #[inline]
    pub(crate) const fn rank(&self) -> i32 {
        self.rank
    }

    #[inline]
    pub(crate) const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) const fn parent(&self) -> Link {
        self.parent
    }

    #[inline]
    pub(crate) const fn left(&self) -> Link {
        self.left
    }

    #[inline]
    pub(crate) const fn right(&self) -> Link {
        self.right
    }

    pub(crate) const fn set_parent(&mut self, parent: Link) {
        self.parent = parent;
    }

    pub(crate) const fn set_left(&mut self, left: Link) {
        self.left = left;
    }

    pub(crate) const fn set_right(&mut self, right: Link) {
        self.right = right;
    }

    pub(crate) const fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    /// Increases the rank by 1.
    pub(crate) const fn promote(&mut self) {
        self.rank += 1;
    }

    /// Decreases the rank by 1.
    pub(crate) const fn demote(&mut self) {
        self.rank -= 1;
    }

    /// Returns true if this node is a leaf with rank 1, the "2,2-leaf" that
    /// deletion repair must demote before its generic loop.
    pub(crate) const fn is_2_2_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.rank == 1
    }

    /// Exchanges the key and value payload with another node, leaving rank,
    /// size and links untouched. Used by two-child deletion, which removes the
    /// successor's node after moving its content into place.
    pub(crate) fn swap_contents(&mut self, other: &mut Self) {
        core::mem::swap(&mut self.key, &mut other.key);
        core::mem::swap(&mut self.value, &mut other.value);
    }
}
