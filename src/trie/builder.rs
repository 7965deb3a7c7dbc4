//! Double-array layout.
//!
//! Every trie node becomes one [`Unit`] in a single array. A node at
//! position `p` with offset `o` finds the child labelled `c` at
//! `p ^ o ^ c`, so placing a node means finding a base `p ^ o` at which all
//! of its children's slots are still free.
//!
//! Free slots are kept on a circular doubly linked list threaded through
//! the `extras` window by index. Only the last [`NUM_EXTRA_BLOCKS`] blocks
//! of [`BLOCK_SIZE`] slots are searched; when the array grows past that
//! window the oldest block is *fixed*: its leftover free slots get labels
//! that no walk can match, and it is never reconsidered.

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::dawg::{Dawg, DawgBuilder};
use super::key_set::KeySet;
use super::unit::Unit;
use crate::error::{Error, Result};

/// Slots per block.
pub const BLOCK_SIZE: u32 = 256;
/// Blocks kept open for placement.
pub const NUM_EXTRA_BLOCKS: u32 = 16;
const NUM_EXTRAS: u32 = BLOCK_SIZE * NUM_EXTRA_BLOCKS;

const UPPER_MASK: u32 = 0xFF << 21;
const LOWER_MASK: u32 = 0xFF;

type Labels = SmallVec<[u8; 32]>;

#[derive(Clone, Copy, Debug, Default)]
struct ExtraUnit {
    prev: u32,
    next: u32,
    is_fixed: bool,
    is_used: bool,
}

/// Keys `begin..end` share their first `depth` bytes and sit below the
/// unit at `dic_id`.
#[derive(Clone, Copy, Debug)]
struct KeyRange {
    begin: usize,
    end: usize,
    depth: usize,
    dic_id: u32,
}

/// Lays keys out into a double array.
///
/// With values, the keys are first minimized into a [`Dawg`] so that shared
/// suffixes are placed once. Without values, each key's value is its index
/// and the trie is laid out directly from the sorted keys.
///
/// ```
/// use libdarts::trie::{DoubleArrayBuilder, KeySet};
///
/// let keys = ["apple", "banana", "cherry"];
/// let key_set = KeySet::new(&keys, None).unwrap();
/// let mut seen = 0;
/// let units = DoubleArrayBuilder::new()
///     .progress(|current, _total| seen = current)
///     .build(&key_set)
///     .unwrap();
/// assert_eq!(seen, 3);
/// assert_eq!(units.len() % 256, 0);
/// ```
pub struct DoubleArrayBuilder<'p> {
    progress: Option<Box<dyn FnMut(usize, usize) + 'p>>,
    units: Vec<Unit>,
    extras: Vec<ExtraUnit>,
    table: Vec<u32>,
    extras_head: u32,
}

impl Default for DoubleArrayBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> DoubleArrayBuilder<'p> {
    /// Creates a builder without a progress callback.
    pub fn new() -> Self {
        DoubleArrayBuilder {
            progress: None,
            units: Vec::new(),
            extras: Vec::new(),
            table: Vec::new(),
            extras_head: 0,
        }
    }

    /// Installs a callback invoked with `(keys done, keys + 1)` as keys are
    /// consumed.
    pub fn progress(mut self, progress: impl FnMut(usize, usize) + 'p) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Builds the unit array for `key_set`.
    ///
    /// # Errors
    ///
    /// Fails on empty keys, keys with 0 bytes, negative values, keys out of
    /// ascending order or repeated, or when the array outgrows the offset
    /// range. Nothing is returned on failure.
    pub fn build<K: AsRef<[u8]>>(mut self, key_set: &KeySet<'_, K>) -> Result<Vec<u32>> {
        debug!(
            keys = key_set.len(),
            with_values = key_set.has_values(),
            "building double array"
        );
        if key_set.has_values() {
            let dawg = self.build_dawg(key_set)?;
            self.build_from_dawg(&dawg)?;
        } else {
            self.build_from_key_set(key_set)?;
        }
        debug!(units = self.units.len(), "double array built");
        Ok(self.units.into_iter().map(Unit::raw).collect())
    }

    fn report(&mut self, current: usize, total: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(current, total);
        }
    }

    fn build_dawg<K: AsRef<[u8]>>(&mut self, key_set: &KeySet<'_, K>) -> Result<Dawg> {
        let mut dawg_builder = DawgBuilder::new();
        for i in 0..key_set.len() {
            dawg_builder.insert(key_set.key(i), key_set.value(i))?;
            self.report(i + 1, key_set.len() + 1);
        }
        Ok(dawg_builder.finish())
    }

    fn init(&mut self, capacity: usize) -> Result<()> {
        self.units.reserve(capacity.next_power_of_two());
        self.extras = vec![ExtraUnit::default(); NUM_EXTRAS as usize];

        self.reserve_id(0);
        self.extras_mut(0).is_used = true;
        self.units[0].set_offset(1)?;
        self.units[0].set_label(0);
        Ok(())
    }

    fn build_from_dawg(&mut self, dawg: &Dawg) -> Result<()> {
        self.init(dawg.size())?;
        self.table = vec![0; dawg.num_intersections()];

        if dawg.child(dawg.root()) != 0 {
            let mut stack = vec![(dawg.root(), 0)];
            while let Some((dawg_id, dic_id)) = stack.pop() {
                self.build_from_dawg_node(dawg, dawg_id, dic_id, &mut stack)?;
            }
        }

        self.fix_all_blocks();
        self.extras = Vec::new();
        self.table = Vec::new();
        Ok(())
    }

    /// Places the children of one DAWG unit and pushes the inner ones onto
    /// `stack`, smallest label on top.
    fn build_from_dawg_node(
        &mut self,
        dawg: &Dawg,
        dawg_id: u32,
        dic_id: u32,
        stack: &mut Vec<(u32, u32)>,
    ) -> Result<()> {
        let dawg_child_id = dawg.child(dawg_id);
        let intersection = dawg
            .is_intersection(dawg_child_id)
            .then(|| dawg.intersection_id(dawg_child_id));

        // A shared run already placed elsewhere can be pointed at directly
        // when the relative offset is encodable.
        if let Some(intersection_id) = intersection {
            let stored_offset = self.table[intersection_id];
            if stored_offset != 0 {
                let offset = stored_offset ^ dic_id;
                if offset & UPPER_MASK == 0 || offset & LOWER_MASK == 0 {
                    if dawg.is_leaf(dawg_child_id) {
                        self.units[dic_id as usize].set_has_leaf(true);
                    }
                    return self.units[dic_id as usize].set_offset(offset);
                }
            }
        }

        let offset = self.arrange_from_dawg(dawg, dawg_id, dic_id)?;
        if let Some(intersection_id) = intersection {
            self.table[intersection_id] = offset;
        }

        let first = stack.len();
        for child in dawg.children(dawg_id) {
            let label = dawg.label(child);
            if label != 0 {
                stack.push((child, offset ^ u32::from(label)));
            }
        }
        stack[first..].reverse();
        Ok(())
    }

    fn arrange_from_dawg(&mut self, dawg: &Dawg, dawg_id: u32, dic_id: u32) -> Result<u32> {
        let labels: Labels = dawg.children(dawg_id).map(|child| dawg.label(child)).collect();

        let offset = self.find_valid_offset(dic_id, &labels);
        self.units[dic_id as usize].set_offset(dic_id ^ offset)?;

        for (child, &label) in dawg.children(dawg_id).zip(&labels) {
            let dic_child_id = offset ^ u32::from(label);
            self.reserve_id(dic_child_id);
            if dawg.is_leaf(child) {
                self.units[dic_id as usize].set_has_leaf(true);
                self.units[dic_child_id as usize].set_value(dawg.value(child));
            } else {
                self.units[dic_child_id as usize].set_label(label);
            }
        }

        self.extras_mut(offset).is_used = true;
        Ok(offset)
    }

    fn build_from_key_set<K: AsRef<[u8]>>(&mut self, key_set: &KeySet<'_, K>) -> Result<()> {
        self.init(key_set.len())?;

        if !key_set.is_empty() {
            let mut stack = vec![KeyRange {
                begin: 0,
                end: key_set.len(),
                depth: 0,
                dic_id: 0,
            }];
            while let Some(range) = stack.pop() {
                self.build_from_key_range(key_set, range, &mut stack)?;
            }
        }

        self.fix_all_blocks();
        self.extras = Vec::new();
        Ok(())
    }

    /// Places the node shared by the keys of `range`, then pushes one range
    /// per child group onto `stack`, smallest label on top.
    fn build_from_key_range<K: AsRef<[u8]>>(
        &mut self,
        key_set: &KeySet<'_, K>,
        range: KeyRange,
        stack: &mut Vec<KeyRange>,
    ) -> Result<()> {
        let KeyRange {
            begin,
            end,
            depth,
            dic_id,
        } = range;
        let offset = self.arrange_from_key_set(key_set, begin, end, depth, dic_id)?;

        let first = stack.len();
        let mut child_begin = begin;
        while child_begin < end {
            let label = key_set.key_byte(child_begin, depth);
            let child_end = (child_begin + 1..end)
                .find(|&i| key_set.key_byte(i, depth) != label)
                .unwrap_or(end);
            if label != 0 {
                stack.push(KeyRange {
                    begin: child_begin,
                    end: child_end,
                    depth: depth + 1,
                    dic_id: offset ^ u32::from(label),
                });
            }
            child_begin = child_end;
        }
        stack[first..].reverse();
        Ok(())
    }

    fn arrange_from_key_set<K: AsRef<[u8]>>(
        &mut self,
        key_set: &KeySet<'_, K>,
        begin: usize,
        end: usize,
        depth: usize,
        dic_id: u32,
    ) -> Result<u32> {
        let mut labels = Labels::new();
        let mut value = None;

        for i in begin..end {
            let label = key_set.key_byte(i, depth);
            if label == 0 {
                let key = key_set.key(i);
                if key.is_empty() {
                    return Err(Error::EmptyKey);
                }
                if depth < key.len() {
                    return Err(Error::NulByte {
                        key: key.to_vec(),
                        position: depth,
                    });
                }
                let key_value = key_set.value(i);
                if key_value < 0 {
                    return Err(Error::NegativeValue {
                        key: key.to_vec(),
                        value: key_value,
                    });
                }
                if value.is_some() {
                    return Err(Error::DuplicateKey { key: key.to_vec() });
                }
                value = Some(key_value as u32);
                self.report(i + 1, key_set.len() + 1);
            }

            match labels.last() {
                Some(&last) if label == last => {}
                Some(&last) if label < last => {
                    return Err(Error::WrongKeyOrder {
                        key: key_set.key(i).to_vec(),
                    });
                }
                _ => labels.push(label),
            }
        }

        let offset = self.find_valid_offset(dic_id, &labels);
        self.units[dic_id as usize].set_offset(dic_id ^ offset)?;

        for &label in &labels {
            let dic_child_id = offset ^ u32::from(label);
            self.reserve_id(dic_child_id);
            match (label, value) {
                (0, Some(value)) => {
                    self.units[dic_id as usize].set_has_leaf(true);
                    self.units[dic_child_id as usize].set_value(value);
                }
                _ => self.units[dic_child_id as usize].set_label(label),
            }
        }

        self.extras_mut(offset).is_used = true;
        Ok(offset)
    }

    fn find_valid_offset(&self, id: u32, labels: &[u8]) -> u32 {
        let fresh = self.num_units() | (id & LOWER_MASK);
        if self.extras_head >= self.num_units() {
            return fresh;
        }

        let mut unfixed_id = self.extras_head;
        loop {
            let offset = unfixed_id ^ u32::from(labels[0]);
            if self.is_valid_offset(id, offset, labels) {
                return offset;
            }
            unfixed_id = self.extras(unfixed_id).next;
            if unfixed_id == self.extras_head {
                return fresh;
            }
        }
    }

    fn is_valid_offset(&self, id: u32, offset: u32, labels: &[u8]) -> bool {
        if self.extras(offset).is_used {
            return false;
        }

        let rel_offset = id ^ offset;
        if rel_offset & LOWER_MASK != 0 && rel_offset & UPPER_MASK != 0 {
            return false;
        }

        !labels[1..]
            .iter()
            .any(|&label| self.extras(offset ^ u32::from(label)).is_fixed)
    }

    /// Takes `id` off the free list, growing the array if needed.
    fn reserve_id(&mut self, id: u32) {
        if id >= self.num_units() {
            self.expand_units();
        }

        if id == self.extras_head {
            self.extras_head = self.extras(id).next;
            if self.extras_head == id {
                self.extras_head = self.num_units();
            }
        }

        let ExtraUnit { prev, next, .. } = *self.extras(id);
        self.extras_mut(prev).next = next;
        self.extras_mut(next).prev = prev;
        self.extras_mut(id).is_fixed = true;
    }

    /// Appends one block of free slots and splices it into the free list.
    fn expand_units(&mut self) {
        let src_num_units = self.num_units();
        let src_num_blocks = self.num_blocks();
        let dest_num_units = src_num_units + BLOCK_SIZE;
        let dest_num_blocks = src_num_blocks + 1;

        if dest_num_blocks > NUM_EXTRA_BLOCKS {
            self.fix_block(src_num_blocks - NUM_EXTRA_BLOCKS);
        }

        self.units.resize(dest_num_units as usize, Unit::default());

        if dest_num_blocks > NUM_EXTRA_BLOCKS {
            for id in src_num_units..dest_num_units {
                let extra = self.extras_mut(id);
                extra.is_used = false;
                extra.is_fixed = false;
            }
        }

        for id in src_num_units + 1..dest_num_units {
            self.extras_mut(id - 1).next = id;
            self.extras_mut(id).prev = id - 1;
        }

        let head = self.extras_head;
        self.extras_mut(src_num_units).prev = dest_num_units - 1;
        self.extras_mut(dest_num_units - 1).next = src_num_units;

        let head_prev = self.extras(head).prev;
        self.extras_mut(src_num_units).prev = head_prev;
        self.extras_mut(dest_num_units - 1).next = head;
        let head_prev = self.extras(head).prev;
        self.extras_mut(head_prev).next = src_num_units;
        self.extras_mut(head).prev = dest_num_units - 1;
    }

    fn fix_all_blocks(&mut self) {
        let end = self.num_blocks();
        let begin = end.saturating_sub(NUM_EXTRA_BLOCKS);
        for block_id in begin..end {
            self.fix_block(block_id);
        }
    }

    /// Reserves every free slot of a block, labelling each so that no walk
    /// from a real node lands on it.
    fn fix_block(&mut self, block_id: u32) {
        let begin = block_id * BLOCK_SIZE;
        let end = begin + BLOCK_SIZE;

        let unused_offset = (begin..end)
            .find(|&id| !self.extras(id).is_used)
            .unwrap_or(0);

        for id in begin..end {
            if !self.extras(id).is_fixed {
                self.reserve_id(id);
                self.units[id as usize].set_label((id ^ unused_offset) as u8);
            }
        }
        trace!(block_id, "fixed block");
    }

    #[inline]
    fn num_units(&self) -> u32 {
        self.units.len() as u32
    }

    #[inline]
    fn num_blocks(&self) -> u32 {
        self.num_units() / BLOCK_SIZE
    }

    #[inline]
    fn extras(&self, id: u32) -> &ExtraUnit {
        &self.extras[(id % NUM_EXTRAS) as usize]
    }

    #[inline]
    fn extras_mut(&mut self, id: u32) -> &mut ExtraUnit {
        &mut self.extras[(id % NUM_EXTRAS) as usize]
    }
}
