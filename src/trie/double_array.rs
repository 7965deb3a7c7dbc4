//! Read-only double array and its lookups.
//!
//! Lookups never fail with an error: a key that leaves the array, or hits a
//! unit whose label differs from the byte consumed, simply does not match.
//! That holds for arrays loaded from untrusted bytes too.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::iter::FusedIterator;
use std::path::Path;

use tracing::debug;

use super::builder::DoubleArrayBuilder;
use super::key_set::KeySet;
use super::unit::Unit;
use crate::error::{Error, Result};

/// Result value for a walk that consumed its input without reaching a key.
pub const NO_VALUE: i32 = -1;
/// Result value for a walk stopped by a byte with no matching edge.
pub const MISMATCH: i32 = -2;

/// Bytes per serialized unit.
pub const UNIT_SIZE: usize = 4;

/// An immutable double-array trie.
///
/// ```
/// use libdarts::trie::DoubleArray;
///
/// let keys = ["a", "ab", "cd"];
/// let trie = DoubleArray::build(&keys, None, None).unwrap();
/// assert_eq!(trie.exact_match_search(b"ab"), (1, 2));
/// assert_eq!(trie.exact_match_search(b"c"), (-1, 0));
/// assert_eq!(trie.common_prefix_search(b"abc", 0, 8), [(0, 1), (1, 2)]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoubleArray {
    units: Vec<u32>,
}

/// Outcome of [`DoubleArray::traverse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraverseResult {
    /// The value found, [`NO_VALUE`] or [`MISMATCH`].
    pub result: i32,
    /// Key index the walk stopped at.
    pub offset: usize,
    /// Node to resume from: the last node reached by a matching byte.
    pub node_position: usize,
}

/// [`TraverseResult::result`] as an enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraverseStatus {
    /// The whole range matched and ends on a key with this value.
    Found(i32),
    /// The whole range matched but does not end on a key.
    Incomplete,
    /// A byte had no matching edge.
    Mismatch,
}

impl TraverseResult {
    /// Decodes [`Self::result`].
    pub fn status(&self) -> TraverseStatus {
        match self.result {
            value if value >= 0 => TraverseStatus::Found(value),
            NO_VALUE => TraverseStatus::Incomplete,
            _ => TraverseStatus::Mismatch,
        }
    }
}

impl DoubleArray {
    /// Builds a trie from keys in strictly ascending byte order.
    ///
    /// Without `values`, each key maps to its index. `progress` is called
    /// with `(keys done, keys + 1)` as the build advances.
    ///
    /// # Errors
    ///
    /// See [`DoubleArrayBuilder::build`]. A failed build returns nothing.
    pub fn build<K: AsRef<[u8]>>(
        keys: &[K],
        values: Option<&[i32]>,
        progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<Self> {
        let key_set = KeySet::new(keys, values)?;
        let mut builder = DoubleArrayBuilder::new();
        if let Some(progress) = progress {
            builder = builder.progress(progress);
        }
        let units = builder.build(&key_set)?;
        Ok(DoubleArray { units })
    }

    /// Wraps an existing unit array.
    pub fn from_units(units: Vec<u32>) -> Self {
        DoubleArray { units }
    }

    /// The unit array.
    pub fn units(&self) -> &[u32] {
        &self.units
    }

    /// Takes the unit array out.
    pub fn into_units(self) -> Vec<u32> {
        self.units
    }

    /// Number of units.
    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// Size in bytes when serialized.
    pub fn total_size(&self) -> usize {
        UNIT_SIZE * self.size()
    }

    /// True if there are no units. Every lookup on an empty array fails.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Drops all units.
    pub fn clear(&mut self) {
        self.units = Vec::new();
    }

    #[inline]
    fn unit(&self, pos: usize) -> Option<Unit> {
        self.units.get(pos).copied().map(Unit::new)
    }

    /// Looks up a whole key.
    ///
    /// Returns `(value, key.len())`, or `(-1, 0)` if the key is absent.
    pub fn exact_match_search(&self, key: &[u8]) -> (i32, usize) {
        const NOT_FOUND: (i32, usize) = (NO_VALUE, 0);

        let mut node_pos = 0;
        let Some(mut unit) = self.unit(node_pos) else {
            return NOT_FOUND;
        };

        for &k in key {
            node_pos ^= unit.offset() as usize ^ usize::from(k);
            match self.unit(node_pos) {
                Some(next) if next.label() == u32::from(k) => unit = next,
                _ => return NOT_FOUND,
            }
        }

        if !unit.has_leaf() {
            return NOT_FOUND;
        }
        match self.unit(node_pos ^ unit.offset() as usize) {
            Some(leaf) => (leaf.value(), key.len()),
            None => NOT_FOUND,
        }
    }

    /// Looks up a whole key, returning its value if present.
    pub fn get(&self, key: &[u8]) -> Option<i32> {
        match self.exact_match_search(key) {
            (value, _) if value >= 0 => Some(value),
            _ => None,
        }
    }

    /// Finds the keys that are prefixes of `key[offset..]`.
    ///
    /// Returns up to `max_results` pairs of `(value, end)` where `end` is the
    /// index in `key` just past the matched prefix, shortest first.
    pub fn common_prefix_search(
        &self,
        key: &[u8],
        offset: usize,
        max_results: usize,
    ) -> Vec<(i32, usize)> {
        self.common_prefix_iter(key, offset)
            .take(max_results)
            .collect()
    }

    /// Lazy form of [`Self::common_prefix_search`] without a result limit.
    pub fn common_prefix_iter<'a>(&'a self, key: &'a [u8], offset: usize) -> CommonPrefixIter<'a> {
        let node_pos = self.unit(0).map(|root| root.offset() as usize);
        CommonPrefixIter {
            trie: self,
            key,
            key_pos: offset,
            node_pos,
        }
    }

    /// Walks `key[offset..length]` starting from `node_position`.
    ///
    /// Pass 0 as `node_position` to start at the root, or the
    /// [`TraverseResult::node_position`] of an earlier walk to continue it.
    /// On a mismatch the returned offset is the index of the failing byte
    /// and the node is the last one matched, so the walk can be retried from
    /// there with other bytes.
    pub fn traverse(
        &self,
        key: &[u8],
        offset: usize,
        length: usize,
        node_position: usize,
    ) -> TraverseResult {
        let mut node_position = node_position;
        let mismatch = |offset, node_position| TraverseResult {
            result: MISMATCH,
            offset,
            node_position,
        };

        let Some(mut unit) = self.unit(node_position) else {
            return mismatch(offset, node_position);
        };

        let mut id = node_position;
        for i in offset..length {
            let Some(&k) = key.get(i) else {
                return mismatch(i, node_position);
            };
            id ^= unit.offset() as usize ^ usize::from(k);
            match self.unit(id) {
                Some(next) if next.label() == u32::from(k) => unit = next,
                _ => return mismatch(i, node_position),
            }
            node_position = id;
        }

        let result = if unit.has_leaf() {
            self.unit(id ^ unit.offset() as usize)
                .map_or(NO_VALUE, Unit::value)
        } else {
            NO_VALUE
        };
        TraverseResult {
            result,
            offset: length,
            node_position,
        }
    }

    /// [`Self::traverse`] to the end of `key`.
    pub fn traverse_from(&self, key: &[u8], offset: usize, node_position: usize) -> TraverseResult {
        self.traverse(key, offset, key.len(), node_position)
    }

    /// Serializes the units as little-endian words.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.units.iter().flat_map(|unit| unit.to_le_bytes()).collect()
    }

    /// Reads units from little-endian words.
    ///
    /// # Errors
    ///
    /// Fails if the length is not a multiple of [`UNIT_SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % UNIT_SIZE != 0 {
            return Err(Error::InvalidBuffer(bytes.len()));
        }
        let units = bytes
            .chunks_exact(UNIT_SIZE)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect();
        debug!(bytes = bytes.len(), "double array loaded");
        Ok(DoubleArray { units })
    }

    /// Writes [`Self::to_bytes`] to `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        debug!(bytes = self.total_size(), "double array written");
        Ok(())
    }

    /// Reads `reader` to its end and loads the bytes.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Writes the array to a new file at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads `size` bytes starting at byte `position` of the file at `path`.
    ///
    /// `None` for `position` starts at the beginning of the file, `None` for
    /// `size` reads to its end. The file is mapped, copied out and unmapped
    /// before returning.
    #[cfg(feature = "mmap")]
    pub fn open(path: impl AsRef<Path>, position: Option<u64>, size: Option<usize>) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the map is only read while `file` is open and is dropped
        // before this function returns.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };

        let start = usize::try_from(position.unwrap_or(0)).unwrap_or(usize::MAX);
        let end = match size {
            Some(size) => start.saturating_add(size),
            None => mmap.len(),
        };
        let bytes = mmap
            .get(start..end)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))?;
        Self::from_bytes(bytes)
    }
}

/// Iterator returned by [`DoubleArray::common_prefix_iter`].
#[derive(Clone, Debug)]
pub struct CommonPrefixIter<'a> {
    trie: &'a DoubleArray,
    key: &'a [u8],
    key_pos: usize,
    node_pos: Option<usize>,
}

impl Iterator for CommonPrefixIter<'_> {
    type Item = (i32, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(mut node_pos) = self.node_pos {
            let Some(&k) = self.key.get(self.key_pos) else {
                break;
            };
            node_pos ^= usize::from(k);
            let unit = match self.trie.unit(node_pos) {
                Some(unit) if unit.label() == u32::from(k) => unit,
                _ => break,
            };
            node_pos ^= unit.offset() as usize;
            self.node_pos = Some(node_pos);
            self.key_pos += 1;

            if unit.has_leaf() {
                match self.trie.unit(node_pos) {
                    Some(leaf) => return Some((leaf.value(), self.key_pos)),
                    None => break,
                }
            }
        }
        self.node_pos = None;
        None
    }
}

impl FusedIterator for CommonPrefixIter<'_> {}
