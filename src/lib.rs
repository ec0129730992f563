//! A rank-balanced ordered map for Rust.
//!
//! This crate provides [`WavlMap`], an ordered map built on a [WAVL tree]
//! (weak AVL tree) with subtree-size augmentation. On top of the usual ordered
//! map operations it offers:
//!
//! - [`min`](WavlMap::min) / [`max`](WavlMap::max) - O(1) boundary access via
//!   cached min/max nodes
//! - [`select`](WavlMap::select) - O(log n) access to the value of the i-th
//!   smallest key
//! - Repair-operation counts returned from [`insert`](WavlMap::insert) and
//!   [`remove`](WavlMap::remove), for rebalancing-cost verification
//!
//! # Example
//!
//! ```
//! use wavl_tree::WavlMap;
//!
//! let mut map = WavlMap::new();
//! for key in [5, 2, 8, 1, 9] {
//!     map.insert(key, key * 10).unwrap();
//! }
//!
//! assert_eq!(map.get(&8), Some(&80));
//! assert_eq!(map.min(), Some(&10));
//! assert_eq!(map.max(), Some(&90));
//!
//! // 1-based rank select: the 3rd smallest key is 5.
//! assert_eq!(map.select(3), Ok(&50));
//!
//! // Keys come out in sorted order.
//! let keys: Vec<_> = map.keys().copied().collect();
//! assert_eq!(keys, [1, 2, 5, 8, 9]);
//! ```
//!
//! # Implementation
//!
//! A WAVL tree assigns every node an integer rank and restricts the rank
//! difference between a node and each child to 1 or 2, which bounds the height
//! by 2*log2(n+1). Rebalancing after insertion and deletion is a bottom-up walk
//! of promotions, demotions and at most two rotations per operation. Nodes live
//! in a contiguous arena and link to each other through stable indices, so the
//! parent back-references never form ownership cycles and the whole crate is
//! safe code.
//!
//! [WAVL tree]: https://en.wikipedia.org/wiki/WAVL_tree

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;

pub mod wavl_map;

pub use error::WavlError;
pub use wavl_map::WavlMap;
