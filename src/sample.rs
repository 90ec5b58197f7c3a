//! Bounded adjacency previews: per-node neighbor samples and the small
//! forward/reverse graph over a first-N id window.
//!
//! Sampled node ids are dense and 0-based, so both structures are
//! index-addressed vectors rather than id-keyed maps.

use serde::Serialize;

/// One sampled node: its true degree plus a bounded neighbor preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSample {
    /// Node id within the scanned graph.
    pub id: u64,
    /// True out-degree, even when the preview is capped below it.
    pub degree: u64,
    /// First `min(degree, cap)` neighbor ids.
    pub neighbors: Vec<u32>,
}

/// Adjacency preview over the first nodes of a graph, in id order. May hold
/// fewer nodes than requested when the source is truncated or smaller.
#[derive(Debug, Clone, Serialize)]
pub struct AdjacencySample {
    /// Traversal-start node id from the header.
    pub entry_point: u32,
    /// Number of nodes the caller asked for.
    pub requested: usize,
    /// Sampled nodes, ids `0..nodes.len()`.
    pub nodes: Vec<NodeSample>,
}

/// Forward plus derived reverse ("referenced-by") adjacency restricted to a
/// first-N id window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmallGraph {
    /// Traversal-start node id from the header.
    pub entry_point: u32,
    /// Forward neighbor lists as scanned; edges leaving the window are kept.
    pub out_neighbors: Vec<Vec<u32>>,
    /// For each node `v`, the in-window sources `u` of edges `u -> v`.
    pub referenced_by: Vec<Vec<u32>>,
}

impl SmallGraph {
    /// Number of nodes actually captured.
    pub fn len(&self) -> usize {
        self.out_neighbors.len()
    }

    /// True when the window captured no nodes.
    pub fn is_empty(&self) -> bool {
        self.out_neighbors.is_empty()
    }
}

/// Builds a [`SmallGraph`] as nodes 0, 1, 2, ... are scanned in id order.
///
/// Reverse entries are produced only for edges whose target lies inside the
/// requested window; everything else is dropped by construction. If the scan
/// ends early, [`finish`](Self::finish) shrinks the reverse side to match the
/// nodes actually seen.
#[derive(Debug)]
pub struct SmallGraphBuilder {
    window: usize,
    entry_point: u32,
    out_neighbors: Vec<Vec<u32>>,
    referenced_by: Vec<Vec<u32>>,
}

impl SmallGraphBuilder {
    /// Creates a builder for the id window `0..window`.
    pub fn new(window: usize, entry_point: u32) -> Self {
        Self {
            window,
            entry_point,
            out_neighbors: Vec::with_capacity(window),
            referenced_by: vec![Vec::new(); window],
        }
    }

    /// True once the window holds `window` nodes.
    pub fn is_full(&self) -> bool {
        self.out_neighbors.len() >= self.window
    }

    /// Appends the next node's forward list and derives its reverse entries.
    /// Nodes must arrive in id order starting from 0.
    pub fn push_node(&mut self, neighbors: Vec<u32>) {
        debug_assert!(!self.is_full(), "window already full");
        let id = self.out_neighbors.len() as u32;
        for &target in &neighbors {
            if (target as usize) < self.window {
                self.referenced_by[target as usize].push(id);
            }
        }
        self.out_neighbors.push(neighbors);
    }

    /// Shrinks both sides to the nodes actually read and yields the graph.
    pub fn finish(mut self) -> SmallGraph {
        self.referenced_by.truncate(self.out_neighbors.len());
        SmallGraph {
            entry_point: self.entry_point,
            out_neighbors: self.out_neighbors,
            referenced_by: self.referenced_by,
        }
    }
}
