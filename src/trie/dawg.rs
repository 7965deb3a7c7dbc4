//! Minimizing DAWG builder.
//!
//! Keys are inserted in strictly ascending order into a trie of transient
//! nodes. Whenever a branch can no longer change (the next key diverges
//! above it), its sibling runs are frozen bottom-up into packed units. Each
//! run is hash-consed: a run whose content (labels, children, flags) is
//! byte-for-byte identical to one already stored reuses the stored run, and
//! that run is flagged as an *intersection*.
//!
//! The finished [`Dawg`] is a flat array of units where the children of a
//! unit are one contiguous run `child(id), child(id) + 1, ...` terminated by
//! a unit without the sibling flag.

use std::cmp::Ordering;
use std::iter;

use hashbrown::HashTable;
use itertools::{Itertools, Position};
use tracing::debug;

use super::bit_vector::BitVector;
use super::node_arena::NodeArena;
use crate::error::{Error, Result};

const INITIAL_TABLE_SIZE: usize = 1 << 10;

/// Builds a [`Dawg`] from keys added in ascending byte order.
pub struct DawgBuilder {
    nodes: NodeArena,
    units: Vec<u32>,
    labels: Vec<u8>,
    is_intersections: BitVector,
    table: HashTable<u32>,
    node_stack: Vec<u32>,
}

impl Default for DawgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DawgBuilder {
    /// Creates a builder holding only the synthetic root.
    pub fn new() -> Self {
        let mut builder = DawgBuilder {
            nodes: NodeArena::new(),
            units: Vec::new(),
            labels: Vec::new(),
            is_intersections: BitVector::new(),
            table: HashTable::with_capacity(INITIAL_TABLE_SIZE),
            node_stack: Vec::new(),
        };
        let root = builder.nodes.alloc();
        builder.append_unit();
        builder.nodes[root].label = 0xFF;
        builder.node_stack.push(root);
        builder
    }

    /// Adds a key with its value.
    ///
    /// # Errors
    ///
    /// Fails if the key is empty or contains a 0 byte, if the value is
    /// negative, or if the key is not strictly greater than the previous one.
    pub fn insert(&mut self, key: &[u8], value: i32) -> Result<()> {
        if value < 0 {
            return Err(Error::NegativeValue {
                key: key.to_vec(),
                value,
            });
        }
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        if let Some(position) = key.iter().position(|&b| b == 0) {
            return Err(Error::NulByte {
                key: key.to_vec(),
                position,
            });
        }

        let mut id = 0;
        let mut key_pos = 0;
        while key_pos <= key.len() {
            let child_id = self.nodes[id].child;
            if child_id == 0 {
                break;
            }

            let key_label = key.get(key_pos).copied().unwrap_or(0);
            let unit_label = self.nodes[child_id].label;
            match key_label.cmp(&unit_label) {
                Ordering::Less => return Err(Error::WrongKeyOrder { key: key.to_vec() }),
                Ordering::Greater => {
                    self.nodes[child_id].has_sibling = true;
                    self.flush(child_id);
                    break;
                }
                Ordering::Equal => {}
            }
            id = child_id;
            key_pos += 1;
        }

        // Matched the terminal edge too: the key was already inserted.
        if key_pos > key.len() {
            return Err(Error::DuplicateKey { key: key.to_vec() });
        }

        let suffix = key[key_pos..].iter().copied().chain(iter::once(0));
        for (position, label) in suffix.with_position() {
            let child_id = self.nodes.alloc();
            let first_child = self.nodes[id].child;
            let node = &mut self.nodes[child_id];
            node.is_state = first_child == 0;
            node.sibling = first_child;
            node.label = label;
            if matches!(position, Position::Last | Position::Only) {
                node.child = value as u32;
            }
            self.nodes[id].child = child_id;
            self.node_stack.push(child_id);
            id = child_id;
        }
        Ok(())
    }

    /// Freezes every open branch and returns the minimized automaton.
    pub fn finish(mut self) -> Dawg {
        self.flush(0);

        self.units[0] = self.nodes[0].unit();
        self.labels[0] = self.nodes[0].label;
        self.is_intersections.build();

        debug!(
            units = self.units.len(),
            intersections = self.is_intersections.num_ones(),
            arena = self.nodes.len(),
            "dawg finished"
        );

        Dawg {
            units: self.units,
            labels: self.labels,
            is_intersections: self.is_intersections,
        }
    }

    /// Pops and freezes sibling runs until `id` is on top of the stack, then
    /// pops `id` itself. The root is never frozen here, so every popped run
    /// has a parent below it.
    fn flush(&mut self, id: u32) {
        while let [.., parent, node_id] = self.node_stack[..] {
            if node_id == id {
                break;
            }
            self.node_stack.pop();

            let hash = hash_node(&self.nodes, node_id);
            let found = self
                .table
                .find(hash, |&unit_id| {
                    are_equal(&self.nodes, &self.units, &self.labels, node_id, unit_id)
                })
                .copied();

            let match_id = match found {
                Some(unit_id) => {
                    self.is_intersections.set(unit_id as usize, true);
                    unit_id
                }
                None => {
                    let num_siblings = siblings(&self.nodes, node_id).count();
                    let mut unit_id = 0;
                    for _ in 0..num_siblings {
                        unit_id = self.append_unit();
                    }
                    // The chain runs from the largest label down; store it ascending.
                    for i in siblings(&self.nodes, node_id) {
                        self.units[unit_id as usize] = self.nodes[i].unit();
                        self.labels[unit_id as usize] = self.nodes[i].label;
                        unit_id -= 1;
                    }
                    let match_id = unit_id + 1;
                    self.table.insert_unique(hash, match_id, |&uid| {
                        hash_unit(&self.units, &self.labels, uid)
                    });
                    match_id
                }
            };

            let mut i = node_id;
            while i != 0 {
                let next = self.nodes[i].sibling;
                self.nodes.free(i);
                i = next;
            }

            self.nodes[parent].child = match_id;
        }
        self.node_stack.pop();
    }

    fn append_unit(&mut self) -> u32 {
        self.is_intersections.append();
        self.units.push(0);
        self.labels.push(0);
        (self.units.len() - 1) as u32
    }
}

/// A minimized automaton over byte keys, produced by [`DawgBuilder::finish`].
#[derive(Clone, Debug)]
pub struct Dawg {
    units: Vec<u32>,
    labels: Vec<u8>,
    is_intersections: BitVector,
}

impl Dawg {
    /// Id of the root unit.
    #[inline]
    pub fn root(&self) -> u32 {
        0
    }

    /// First unit of the child run of `id`, or 0 if it has none. Leaf
    /// units never have children.
    #[inline]
    pub fn child(&self, id: u32) -> u32 {
        if self.is_leaf(id) {
            0
        } else {
            self.units[id as usize] >> 2
        }
    }

    /// Next unit in the same sibling run, or 0 at the end of the run.
    #[inline]
    pub fn sibling(&self, id: u32) -> u32 {
        if self.units[id as usize] & 1 == 1 {
            id + 1
        } else {
            0
        }
    }

    /// Iterates over the child run of `id` in ascending label order.
    pub fn children(&self, id: u32) -> impl Iterator<Item = u32> + '_ {
        let first = self.child(id);
        iter::successors((first != 0).then_some(first), move |&child| {
            let next = self.sibling(child);
            (next != 0).then_some(next)
        })
    }

    /// Value stored in a leaf unit.
    #[inline]
    pub fn value(&self, id: u32) -> u32 {
        self.units[id as usize] >> 1
    }

    /// True for the terminal (label 0) unit of a key.
    #[inline]
    pub fn is_leaf(&self, id: u32) -> bool {
        self.label(id) == 0
    }

    /// Edge label of a unit.
    #[inline]
    pub fn label(&self, id: u32) -> u8 {
        self.labels[id as usize]
    }

    /// True if the run starting at `id` is reached from more than one place.
    #[inline]
    pub fn is_intersection(&self, id: u32) -> bool {
        self.is_intersections.get(id as usize)
    }

    /// Dense index of an intersection among all intersections.
    #[inline]
    pub fn intersection_id(&self, id: u32) -> usize {
        self.is_intersections.rank(id as usize) - 1
    }

    /// Number of intersection runs.
    pub fn num_intersections(&self) -> usize {
        self.is_intersections.num_ones()
    }

    /// Number of units, including the root.
    pub fn size(&self) -> usize {
        self.units.len()
    }
}

/// Walks a transient sibling chain, from the given node towards smaller labels.
fn siblings(nodes: &NodeArena, first: u32) -> impl Iterator<Item = u32> + '_ {
    iter::successors((first != 0).then_some(first), move |&i| {
        let next = nodes[i].sibling;
        (next != 0).then_some(next)
    })
}

fn hash_node(nodes: &NodeArena, id: u32) -> u64 {
    let hash = siblings(nodes, id).fold(0, |acc, i| {
        let node = &nodes[i];
        acc ^ hash((u32::from(node.label) << 24) ^ node.unit())
    });
    table_hash(hash)
}

fn hash_unit(units: &[u32], labels: &[u8], id: u32) -> u64 {
    let mut hash_value = 0;
    let mut id = id as usize;
    loop {
        let unit = units[id];
        hash_value ^= hash((u32::from(labels[id]) << 24) ^ unit);
        if unit & 1 == 0 {
            break;
        }
        id += 1;
    }
    table_hash(hash_value)
}

/// Widens a run hash for the table. hashbrown filters probes on the top
/// bits, so the 32-bit hash is repeated there.
#[inline]
fn table_hash(hash: u32) -> u64 {
    let hash = u64::from(hash);
    (hash << 32) | hash
}

/// Compares a transient sibling chain against a stored run, unit by unit.
fn are_equal(nodes: &NodeArena, units: &[u32], labels: &[u8], node_id: u32, unit_id: u32) -> bool {
    let mut unit_id = unit_id as usize;
    for _ in siblings(nodes, nodes[node_id].sibling) {
        if units[unit_id] & 1 == 0 {
            return false;
        }
        unit_id += 1;
    }
    if units[unit_id] & 1 == 1 {
        return false;
    }

    for i in siblings(nodes, node_id) {
        let node = &nodes[i];
        if node.unit() != units[unit_id] || node.label != labels[unit_id] {
            return false;
        }
        unit_id -= 1;
    }
    true
}

/// 32-bit integer mix.
#[inline]
fn hash(key: u32) -> u32 {
    let mut key = (!key).wrapping_add(key << 15);
    key ^= key >> 12;
    key = key.wrapping_add(key << 2);
    key ^= key >> 4;
    key = key.wrapping_mul(2057);
    key ^= key >> 16;
    key
}

#[cfg(test)]
mod test {
    use super::*;
    use itertools::Itertools;

    fn build(keys: &[&str], values: &[i32]) -> Result<Dawg> {
        let mut builder = DawgBuilder::new();
        for (key, &value) in keys.iter().zip(values) {
            builder.insert(key.as_bytes(), value)?;
        }
        Ok(builder.finish())
    }

    fn lookup(dawg: &Dawg, key: &[u8]) -> Option<u32> {
        let mut id = dawg.root();
        for &label in key.iter().chain(iter::once(&0)) {
            let mut child = dawg.child(id);
            loop {
                if child == 0 {
                    return None;
                }
                if dawg.label(child) == label {
                    break;
                }
                child = dawg.sibling(child);
            }
            id = child;
        }
        Some(dawg.value(id))
    }

    fn order_err(key: &str) -> Error {
        Error::WrongKeyOrder {
            key: key.as_bytes().to_vec(),
        }
    }

    #[test]
    fn empty_builder_has_only_root() {
        let dawg = DawgBuilder::new().finish();
        assert_eq!(dawg.size(), 1);
        assert_eq!(dawg.child(dawg.root()), 0);
        assert_eq!(dawg.num_intersections(), 0);
    }

    #[test]
    fn single_key_is_a_chain() {
        let dawg = build(&["ABCDEF"], &[7]).unwrap();
        // root + six labels + terminal
        assert_eq!(dawg.size(), 1 + 6 + 1);
        assert_eq!(lookup(&dawg, b"ABCDEF"), Some(7));
        assert_eq!(lookup(&dawg, b"ABCDE"), None);
    }

    #[test]
    fn graph_shares_suffixes_with_equal_values() {
        let dawg = build(&["ABCDEF", "XBCDEF"], &[0, 0]).unwrap();
        // root + [A, X] + one shared BCDEF chain + terminal
        assert_eq!(dawg.size(), 1 + 2 + 5 + 1);
        assert_eq!(dawg.num_intersections(), 6);

        let a = dawg.child(dawg.root());
        let x = dawg.sibling(a);
        assert_eq!(dawg.label(a), b'A');
        assert_eq!(dawg.label(x), b'X');
        assert_eq!(dawg.child(a), dawg.child(x));
        assert!(dawg.is_intersection(dawg.child(a)));
    }

    #[test]
    fn different_values_prevent_sharing() {
        let dawg = build(&["ABCDEF", "XBCDEF"], &[0, 1]).unwrap();
        assert_eq!(dawg.size(), 1 + 2 + 2 * 6);
        assert_eq!(dawg.num_intersections(), 0);
        assert_eq!(lookup(&dawg, b"ABCDEF"), Some(0));
        assert_eq!(lookup(&dawg, b"XBCDEF"), Some(1));
    }

    #[test]
    fn suffixes_are_shared() {
        let testdata = [
            "ASUFFIX",
            "BSUFFIX",
            "CDESUFFIX",
            "FFFFFFFSUFFIX",
            "INBETWEEN",
            "JSUFFIX",
            "XXSUFFIX",
        ];
        let dawg = build(&testdata, &[1; 7]).unwrap();

        let a = dawg.child(dawg.root());
        let suffix_run = dawg.child(a);
        assert!(dawg.is_intersection(suffix_run));

        let b = dawg.sibling(a);
        assert_eq!(dawg.label(b), b'B');
        assert_eq!(dawg.child(b), suffix_run);

        for word in testdata {
            assert_eq!(lookup(&dawg, word.as_bytes()), Some(1), "{word}");
        }
    }

    #[test]
    fn intersection_ids_are_dense() {
        let dawg = build(&["AB", "CB", "DE", "FE"], &[3, 3, 3, 3]).unwrap();
        let mut ids: Vec<usize> = (0..dawg.size() as u32)
            .filter(|&id| dawg.is_intersection(id))
            .map(|id| dawg.intersection_id(id))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..dawg.num_intersections()).collect::<Vec<_>>());
    }

    #[test]
    fn prefix_keys_keep_their_own_values() {
        let dawg = build(&["a", "ab", "abc", "b"], &[10, 20, 30, 40]).unwrap();
        assert_eq!(lookup(&dawg, b"a"), Some(10));
        assert_eq!(lookup(&dawg, b"ab"), Some(20));
        assert_eq!(lookup(&dawg, b"abc"), Some(30));
        assert_eq!(lookup(&dawg, b"b"), Some(40));
        assert_eq!(lookup(&dawg, b"abcd"), None);
    }

    #[test]
    fn sorted_input_words_gives_no_error() {
        assert!(build(&["ALFA", "BRAVO", "CHARLIE", "DELTA"], &[0, 1, 2, 3]).is_ok());
    }

    #[test]
    fn unsorted_input_words_gives_error() {
        const SORTED_WORDS: [&str; 6] = ["ALFA", "BRAVO", "CHARLIE", "DELTA", "ECHO", "FOXTROT"];
        let mut sorted_count = 0;
        // Every permutation except the sorted one must be rejected.
        for wordlist in SORTED_WORDS.iter().copied().permutations(SORTED_WORDS.len()) {
            let is_sorted = wordlist == SORTED_WORDS;
            let res = build(&wordlist, &[0; 6]);
            assert_eq!(res.is_ok(), is_sorted);
            sorted_count += is_sorted as i32;
        }
        assert_eq!(sorted_count, 1);
    }

    #[test]
    fn unsorted_input_words_gives_unsorted_word_in_error() {
        let err = build(&["ALFA", "BRAVO", "GOLF", "FOXTROT"], &[0; 4]).unwrap_err();
        assert_eq!(err.to_string(), order_err("FOXTROT").to_string());

        let err = build(&["ab", "a"], &[0; 2]).unwrap_err();
        assert!(matches!(err, Error::WrongKeyOrder { key } if key == b"a"));
    }

    #[test]
    fn same_word_twice_gives_error() {
        let err = build(&["ALFA", "BRAVO", "CHARLIE", "CHARLIE"], &[0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { key } if key == b"CHARLIE"));
    }

    #[test]
    fn invalid_keys_and_values_are_rejected() {
        let mut builder = DawgBuilder::new();
        assert!(matches!(builder.insert(b"", 0), Err(Error::EmptyKey)));
        assert!(matches!(
            builder.insert(b"a\0b", 0),
            Err(Error::NulByte { position: 1, .. })
        ));
        assert!(matches!(
            builder.insert(b"a", -1),
            Err(Error::NegativeValue { value: -1, .. })
        ));
    }

    #[test]
    fn largest_value_survives_packing() {
        let dawg = build(&["k"], &[i32::MAX]).unwrap();
        assert_eq!(lookup(&dawg, b"k"), Some(i32::MAX as u32));
    }

    #[test]
    fn leaves_have_no_children() {
        // a large value would otherwise read as a child id past the end
        let dawg = build(&["a", "ab"], &[i32::MAX, 1]).unwrap();
        let a = dawg.child(dawg.root());
        let leaf = dawg.child(a);
        assert!(dawg.is_leaf(leaf));
        assert_eq!(dawg.value(leaf), i32::MAX as u32);
        assert_eq!(dawg.child(leaf), 0);
        assert_eq!(dawg.children(leaf).count(), 0);
        assert_eq!(dawg.children(a).map(|id| dawg.label(id)).collect::<Vec<_>>(), [0, b'b']);
    }

    #[test]
    fn table_hash_fills_the_tag_bits() {
        let tags: std::collections::HashSet<u64> = (0..1000).map(|key| table_hash(hash(key)) >> 57).collect();
        assert!(tags.len() > 64, "only {} distinct tags", tags.len());
        assert_eq!(table_hash(0xDEAD_BEEF) as u32, 0xDEAD_BEEF);
    }

    #[test]
    fn stored_runs_hash_like_their_nodes() {
        let mut builder = DawgBuilder::new();
        for (key, value) in [("ab", 1), ("cb", 1), ("db", 2)] {
            builder.insert(key.as_bytes(), value).unwrap();
        }
        // every stored run is found again under the hash it was stored with
        builder.flush(0);
        let runs: Vec<u32> = builder.table.iter().copied().collect();
        assert!(!runs.is_empty());
        for run in runs {
            let hash = hash_unit(&builder.units, &builder.labels, run);
            assert_eq!(builder.table.find(hash, |&id| id == run), Some(&run));
        }
    }

    #[test]
    fn hash_mix_is_stable() {
        assert_eq!(hash(0), hash(0));
        assert_ne!(hash(1), hash(2));
        let spread: std::collections::HashSet<u32> = (0..1000).map(hash).collect();
        assert_eq!(spread.len(), 1000);
    }
}
