use thiserror::Error;

/// The failure outcomes of [`WavlMap`](crate::WavlMap) operations.
///
/// None of these are fatal: every variant leaves the tree exactly as it was
/// before the call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum WavlError {
    /// An insert found the key already present; the tree is unchanged.
    #[error("key already present in the tree")]
    DuplicateKey,
    /// A removal did not find the key; the tree is unchanged.
    #[error("key not found in the tree")]
    KeyNotFound,
    /// A rank-select was called with a rank of 0 or greater than the size.
    #[error("rank out of range")]
    RankOutOfRange,
}
