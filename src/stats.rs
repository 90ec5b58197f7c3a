//! Streaming degree statistics shared by both scanners.

use serde::Serialize;

/// Default out-degree below which a node counts as weak.
pub const DEFAULT_WEAK_THRESHOLD: u32 = 2;

/// Connectivity summary of one persisted graph. Constructed fresh per call,
/// never persisted or shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    /// Total node records.
    pub total_nodes: u64,
    /// Nodes not declared frozen by the header.
    pub active_nodes: u64,
    /// Header-declared frozen-node count.
    pub frozen_nodes: u64,
    /// Sum of all out-degrees.
    pub total_edges: u64,
    /// Smallest out-degree seen (0 for an empty degree stream).
    pub degree_min: u64,
    /// `total_edges / total_nodes` (0.0 when there are no nodes).
    pub degree_avg: f64,
    /// Largest out-degree seen.
    pub degree_max: u64,
    /// Nodes whose out-degree is below the weak threshold.
    pub weak_count: u64,
    /// Traversal-start node id, carried as metadata only.
    pub entry_point: u32,
}

/// Options shared by the stats entry points.
#[derive(Debug, Clone)]
pub struct StatsOptions {
    /// Out-degree below which a node is counted as weak.
    pub weak_threshold: u32,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            weak_threshold: DEFAULT_WEAK_THRESHOLD,
        }
    }
}

/// Node totals known from a header (or derived by the caller from the scan
/// itself) rather than from the degree stream.
#[derive(Debug, Clone, Copy)]
pub struct NodeTotals {
    /// Total node records.
    pub total_nodes: u64,
    /// Total minus frozen.
    pub active_nodes: u64,
    /// Header-declared frozen-node count.
    pub frozen_nodes: u64,
    /// Traversal-start node id.
    pub entry_point: u32,
}

/// Single-pass reducer over a stream of per-node out-degrees. O(1) auxiliary
/// memory regardless of graph size.
#[derive(Debug)]
pub struct DegreeAccumulator {
    weak_threshold: u64,
    nodes_seen: u64,
    total_edges: u64,
    degree_min: u64,
    degree_max: u64,
    weak_count: u64,
}

impl DegreeAccumulator {
    /// Creates an empty accumulator with the given weak threshold.
    pub fn new(weak_threshold: u32) -> Self {
        Self {
            weak_threshold: u64::from(weak_threshold),
            nodes_seen: 0,
            total_edges: 0,
            degree_min: u64::MAX,
            degree_max: 0,
            weak_count: 0,
        }
    }

    /// Folds one node's out-degree into the running aggregates.
    pub fn record(&mut self, degree: u32) {
        let degree = u64::from(degree);
        self.nodes_seen += 1;
        self.total_edges += degree;
        if degree < self.degree_min {
            self.degree_min = degree;
        }
        if degree > self.degree_max {
            self.degree_max = degree;
        }
        if degree < self.weak_threshold {
            self.weak_count += 1;
        }
    }

    /// Number of degrees recorded so far.
    pub fn nodes_seen(&self) -> u64 {
        self.nodes_seen
    }

    /// Assembles the final record from the aggregates plus the node totals
    /// the caller trusts. An untouched accumulator yields zero-valued degree
    /// fields, which is exactly the degraded result for layouts whose edges
    /// cannot be walked.
    pub fn finish(self, totals: NodeTotals) -> GraphStats {
        GraphStats {
            total_nodes: totals.total_nodes,
            active_nodes: totals.active_nodes,
            frozen_nodes: totals.frozen_nodes,
            total_edges: self.total_edges,
            degree_min: if self.degree_min == u64::MAX {
                0
            } else {
                self.degree_min
            },
            degree_avg: if totals.total_nodes > 0 {
                self.total_edges as f64 / totals.total_nodes as f64
            } else {
                0.0
            },
            degree_max: self.degree_max,
            weak_count: self.weak_count,
            entry_point: totals.entry_point,
        }
    }
}
