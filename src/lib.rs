//! # libdarts
//!
//! A compact, immutable [double-array trie](https://linux.thai.net/~thep/datrie/datrie.html)
//! mapping byte-string keys to non-negative 31-bit values.
//!
//! Keys are first minimized into a DAWG (a trie with shared suffixes) and then
//! packed into one flat array of 32-bit units where a child is found by XOR-ing
//! its parent's position, offset and label. The result is a few bytes per node,
//! needs no pointer fix-up to load, and answers lookups in O(key length).
//!
//! ## Features
//!
//! - **Exact match**, **common-prefix search** and **resumable traversal**
//! - **Suffix sharing**: keys with equal suffixes and values share units
//! - **Plain format**: little-endian `u32` words, loadable from bytes, any
//!   reader, or a section of a file (the `mmap` feature, enabled by default)
//! - **Thread-safe reads**: a built [`DoubleArray`] is never mutated by a lookup
//!
//! ## Quick Start
//!
//! ```
//! use libdarts::DoubleArray;
//!
//! // keys must be sorted; without values each key maps to its index
//! let trie = DoubleArray::build(&["BAKE", "BAKER", "CAKE"], None, None).unwrap();
//!
//! assert_eq!(trie.get(b"BAKER"), Some(1));
//! assert_eq!(trie.get(b"BAK"), None);
//! assert_eq!(trie.common_prefix_search(b"BAKERY", 0, 8), [(0, 4), (1, 5)]);
//! ```
//!
//! ## Values and traversal
//!
//! ```
//! use libdarts::{DoubleArray, TraverseStatus};
//!
//! let keys = ["a", "ab", "cd"];
//! let trie = DoubleArray::build(&keys, Some(&[10, 20, 30][..]), None).unwrap();
//!
//! let a = trie.traverse_from(b"a", 0, 0);
//! assert_eq!(a.status(), TraverseStatus::Found(10));
//!
//! // continue from where the first walk stopped
//! let ab = trie.traverse_from(b"b", 0, a.node_position);
//! assert_eq!(ab.status(), TraverseStatus::Found(20));
//!
//! let ac = trie.traverse_from(b"ac", 0, 0);
//! assert_eq!(ac.status(), TraverseStatus::Mismatch);
//! assert_eq!(ac.offset, 1);
//! ```
//!
//! ## Saving and loading
//!
//! ```
//! use libdarts::DoubleArray;
//!
//! let trie = DoubleArray::build(&["x", "y"], None, None).unwrap();
//! let bytes = trie.to_bytes();
//! assert_eq!(bytes.len(), trie.total_size());
//!
//! let loaded = DoubleArray::from_bytes(&bytes).unwrap();
//! assert_eq!(loaded.get(b"y"), Some(1));
//! ```

#![warn(missing_docs)]

/// Error type for building and loading.
pub mod error;
/// Double-array trie: builders, the array itself, and its building blocks.
pub mod trie;

pub use error::{Error, Result};
pub use trie::{DoubleArray, DoubleArrayBuilder, KeySet, TraverseResult, TraverseStatus};
