//! Recycling arena for the DAWG builder's transient nodes.
//!
//! Nodes are addressed by `u32` index into one growable vector. Freed nodes
//! go onto a recycle stack and are handed out again, reset, by the next
//! allocation, so the arena only grows to the size of the widest unfinished
//! branch rather than the whole key set.

use std::ops::{Index, IndexMut};

/// A transient trie node that has not yet been folded into a DAWG unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Node {
    /// First child id while the node is open, the unit id of its frozen
    /// children once flushed, or the value when `label == 0`.
    pub child: u32,
    /// Next (smaller-labelled) sibling, 0 if none.
    pub sibling: u32,
    /// Edge label; 0 marks the terminal edge.
    pub label: u8,
    /// True for the first node of a sibling run.
    pub is_state: bool,
    /// True if a larger-labelled sibling follows this node.
    pub has_sibling: bool,
}

impl Node {
    /// Packs the node into the unit word it will be stored as.
    #[inline]
    pub fn unit(&self) -> u32 {
        if self.label == 0 {
            (self.child << 1) | u32::from(self.has_sibling)
        } else {
            (self.child << 2) | (u32::from(self.is_state) << 1) | u32::from(self.has_sibling)
        }
    }
}

/// A vector of nodes with a free-list of recyclable slots.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<Node>,
    recycle_bin: Vec<u32>,
}

impl NodeArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of a zeroed node, reusing a freed slot if one exists.
    pub fn alloc(&mut self) -> u32 {
        match self.recycle_bin.pop() {
            Some(id) => {
                self.nodes[id as usize] = Node::default();
                id
            }
            None => {
                let id = self.nodes.len() as u32;
                self.nodes.push(Node::default());
                id
            }
        }
    }

    /// Returns a node's slot to the recycle bin.
    pub fn free(&mut self, id: u32) {
        debug_assert!((id as usize) < self.nodes.len());
        self.recycle_bin.push(id);
    }

    /// Number of slots ever allocated, including recycled ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl Index<u32> for NodeArena {
    type Output = Node;

    #[inline]
    fn index(&self, id: u32) -> &Node {
        &self.nodes[id as usize]
    }
}

impl IndexMut<u32> for NodeArena {
    #[inline]
    fn index_mut(&mut self, id: u32) -> &mut Node {
        &mut self.nodes[id as usize]
    }
}
